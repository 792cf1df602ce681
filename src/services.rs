//! Collaborator interfaces consumed by the builder and dispatcher
//!
//! Both collaborators are injected; this crate never constructs a real one.
//! - [`Signer`]: the active identity; signs and submits finalized operations
//! - [`NetworkClient`]: finalizes (freezes) operations against the network
//!
//! Every method that touches the network is async. These are the only
//! suspension points of a dispatch.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::operation::keys::PublicKey;
use crate::operation::StagedOperation;
use crate::types::EntityId;

/// Confirmation returned once the network has accepted an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationReceipt {
    /// Network status code, e.g. `SUCCESS`
    pub status: String,
    pub operation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_sequence_number: Option<u64>,
}

impl OperationReceipt {
    /// A bare `SUCCESS` receipt for `operation_id`
    pub fn success(operation_id: impl Into<String>) -> Self {
        Self {
            status: "SUCCESS".to_string(),
            operation_id: operation_id.into(),
            account_id: None,
            token_id: None,
            topic_id: None,
            schedule_id: None,
            topic_sequence_number: None,
        }
    }
}

/// Async signer interface
///
/// Implementations hold (or reach) the credential of one identity.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Account id this signer acts as
    fn identity_id(&self) -> EntityId;

    /// Public key of this signer
    async fn public_key(&self) -> anyhow::Result<PublicKey>;

    /// Sign a finalized operation and submit it, waiting for the receipt
    async fn sign_and_submit(&self, op: &StagedOperation) -> anyhow::Result<OperationReceipt>;
}

/// Network client interface
#[async_trait]
pub trait NetworkClient: Send + Sync {
    /// The operating identity: the account that pays for operations by default
    fn operator_id(&self) -> EntityId;

    /// Freeze `op` against the network
    ///
    /// Must assign an operation id (payer = operator) when none is set and
    /// target endpoints when none are set, then mark the operation frozen.
    async fn finalize(&self, op: StagedOperation) -> anyhow::Result<StagedOperation>;
}

/// Injected collaborators for one dispatch
///
/// `signer` is optional: without one, symbolic keys cannot be resolved and
/// nothing can be submitted, but bytes can still be produced.
#[derive(Clone)]
pub struct Services {
    pub signer: Option<Arc<dyn Signer>>,
    pub client: Arc<dyn NetworkClient>,
}

impl Services {
    pub fn new(signer: Option<Arc<dyn Signer>>, client: Arc<dyn NetworkClient>) -> Self {
        Self { signer, client }
    }

    pub fn operator_id(&self) -> EntityId {
        self.client.operator_id()
    }
}
