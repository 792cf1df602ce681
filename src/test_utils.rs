//! Test Utilities Module
//!
//! Deterministic stand-ins for the injected collaborators. Nothing here talks
//! to a network: the mock signer keeps every submitted operation and answers
//! with a synthetic receipt, the mock client freezes operations against a
//! fixed clock.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use anyhow::{bail, Result};
use async_trait::async_trait;
use ed25519_dalek::{Signer as _, SigningKey};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};

use crate::operation::keys::PublicKey;
use crate::operation::{OperationBody, StagedOperation};
use crate::services::{NetworkClient, OperationReceipt, Signer};
use crate::types::{EntityId, OperationId};

/// Operating identity used by both mocks unless told otherwise
pub const MOCK_OPERATOR: EntityId = EntityId::from_num(2);

/// Node the mock client targets by default
pub const MOCK_NODE: EntityId = EntityId::from_num(3);

/// Valid-start seconds of every id the mock client assigns
pub const MOCK_VALID_START_SECONDS: i64 = 1_700_000_000;

/// First entity number handed out by the mock signer
const FIRST_CREATED_ENTITY: u64 = 9_000;

/// Mock signer that records submissions
///
/// Receipts carry a fresh entity id for create-style operations, so a
/// schedule-create submission yields a schedule id.
pub struct MockSigner {
    identity: EntityId,
    key: SigningKey,
    failure: Mutex<Option<String>>,
    submitted: Mutex<Vec<StagedOperation>>,
    signatures: Mutex<Vec<Vec<u8>>>,
    next_entity: AtomicU64,
    sequence: AtomicU64,
}

impl MockSigner {
    /// Signer acting as [`MOCK_OPERATOR`]
    pub fn new() -> Self {
        Self::with_identity(MOCK_OPERATOR)
    }

    pub fn with_identity(identity: EntityId) -> Self {
        let mut seed = [1u8; 32];
        seed[..8].copy_from_slice(&identity.num.to_le_bytes());
        Self {
            identity,
            key: SigningKey::from_bytes(&seed),
            failure: Mutex::new(None),
            submitted: Mutex::new(Vec::new()),
            signatures: Mutex::new(Vec::new()),
            next_entity: AtomicU64::new(FIRST_CREATED_ENTITY),
            sequence: AtomicU64::new(0),
        }
    }

    /// Signer whose every submission fails with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        let signer = Self::new();
        signer.set_failure(Some(message.into()));
        signer
    }

    pub fn set_failure(&self, message: Option<String>) {
        *self.failure.lock() = message;
    }

    pub fn public_key_value(&self) -> PublicKey {
        self.key.verifying_key().into()
    }

    /// Operations accepted so far, in submission order
    pub fn submitted(&self) -> Vec<StagedOperation> {
        self.submitted.lock().clone()
    }

    pub fn signature_count(&self) -> usize {
        self.signatures.lock().len()
    }

    fn next_entity(&self) -> EntityId {
        EntityId::from_num(self.next_entity.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for MockSigner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Signer for MockSigner {
    fn identity_id(&self) -> EntityId {
        self.identity
    }

    async fn public_key(&self) -> Result<PublicKey> {
        Ok(self.public_key_value())
    }

    async fn sign_and_submit(&self, op: &StagedOperation) -> Result<OperationReceipt> {
        if let Some(message) = self.failure.lock().clone() {
            bail!(message);
        }
        if !op.is_frozen() {
            bail!("operation must be finalized before signing");
        }
        let Some(id) = op.id() else {
            bail!("operation has no id");
        };

        let bytes = op.to_bytes()?;
        self.signatures
            .lock()
            .push(self.key.sign(&bytes).to_bytes().to_vec());

        let mut receipt = OperationReceipt::success(id.to_string());
        match op.body() {
            OperationBody::AccountCreate { .. } => receipt.account_id = Some(self.next_entity()),
            OperationBody::TokenCreate(_) => receipt.token_id = Some(self.next_entity()),
            OperationBody::TopicCreate { .. } => receipt.topic_id = Some(self.next_entity()),
            OperationBody::ScheduleCreate { .. } => receipt.schedule_id = Some(self.next_entity()),
            OperationBody::TopicMessageSubmit { .. } => {
                receipt.topic_sequence_number = Some(self.sequence.fetch_add(1, Ordering::Relaxed) + 1)
            }
            _ => {}
        }

        self.submitted.lock().push(op.clone());
        Ok(receipt)
    }
}

/// Mock network client with a fixed clock
///
/// Assigned ids are `<operator>@1700000000.<n>` with `n` counting up, so ids
/// are unique within one client.
pub struct MockNetworkClient {
    operator: EntityId,
    nodes: Vec<EntityId>,
    nanos: AtomicU32,
    finalize_calls: AtomicUsize,
    failure: Mutex<Option<String>>,
}

impl MockNetworkClient {
    pub fn new() -> Self {
        Self::with_operator(MOCK_OPERATOR)
    }

    pub fn with_operator(operator: EntityId) -> Self {
        Self {
            operator,
            nodes: vec![MOCK_NODE],
            nanos: AtomicU32::new(0),
            finalize_calls: AtomicUsize::new(0),
            failure: Mutex::new(None),
        }
    }

    /// Make every finalize fail with `message`
    pub fn set_failure(&self, message: Option<String>) {
        *self.failure.lock() = message;
    }

    pub fn finalize_calls(&self) -> usize {
        self.finalize_calls.load(Ordering::Relaxed)
    }
}

impl Default for MockNetworkClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkClient for MockNetworkClient {
    fn operator_id(&self) -> EntityId {
        self.operator
    }

    async fn finalize(&self, mut op: StagedOperation) -> Result<StagedOperation> {
        self.finalize_calls.fetch_add(1, Ordering::Relaxed);
        if let Some(message) = self.failure.lock().clone() {
            bail!(message);
        }
        if op.is_frozen() {
            return Ok(op);
        }
        if op.id().is_none() {
            op.set_id(OperationId {
                payer: self.operator,
                valid_start_seconds: MOCK_VALID_START_SECONDS,
                valid_start_nanos: self.nanos.fetch_add(1, Ordering::Relaxed),
            });
        }
        if op.target_endpoints().is_empty() {
            op.set_target_endpoints(self.nodes.clone());
        }
        op.freeze();
        Ok(op)
    }
}
