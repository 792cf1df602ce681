//! Staged operations
//!
//! A [`StagedOperation`] is one not-yet-submitted network action: a body plus
//! the cross-cutting framing (id, memo, target endpoints) and a frozen flag.
//! Its byte form is the bincode encoding of the whole value, so decoding the
//! bytes returned by the bytes path reconstructs every field that was set.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha384};
use std::fmt;

use super::errors::DispatchError;
use super::keys::Key;
use crate::types::{EntityId, OperationId};

/// One leg of an hbar transfer; negative amounts debit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountAmount {
    pub account_id: EntityId,
    pub tinybars: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCreateBody {
    pub name: String,
    pub symbol: String,
    pub decimals: u32,
    /// In the smallest unit, i.e. already scaled by `10^decimals`
    pub initial_supply: u64,
    pub treasury: EntityId,
    pub admin_key: Option<Key>,
    pub supply_key: Option<Key>,
    pub token_memo: Option<String>,
}

/// The operation a schedule entry will eventually execute
///
/// Carries the inner operation's body and memo. The inner id and target
/// endpoints are dropped: the network assigns those when the schedule fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledOperation {
    pub body: OperationBody,
    pub memo: Option<String>,
}

/// Body of a staged operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationBody {
    CryptoTransfer {
        transfers: Vec<AccountAmount>,
    },
    AccountCreate {
        key: Key,
        initial_balance_tinybars: i64,
        max_automatic_token_associations: i32,
        account_memo: Option<String>,
    },
    TopicCreate {
        admin_key: Option<Key>,
        submit_key: Option<Key>,
        topic_memo: Option<String>,
    },
    TopicMessageSubmit {
        topic_id: EntityId,
        message: Vec<u8>,
    },
    TokenCreate(TokenCreateBody),
    ScheduleCreate {
        scheduled: Box<ScheduledOperation>,
        payer_account_id: Option<EntityId>,
        admin_key: Option<Key>,
        schedule_memo: Option<String>,
    },
    ScheduleSign {
        schedule_id: EntityId,
    },
    ScheduleDelete {
        schedule_id: EntityId,
    },
}

/// Discriminant of [`OperationBody`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    CryptoTransfer,
    AccountCreate,
    TopicCreate,
    TopicMessageSubmit,
    TokenCreate,
    ScheduleCreate,
    ScheduleSign,
    ScheduleDelete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CryptoTransfer => "crypto_transfer",
            Self::AccountCreate => "account_create",
            Self::TopicCreate => "topic_create",
            Self::TopicMessageSubmit => "topic_message_submit",
            Self::TokenCreate => "token_create",
            Self::ScheduleCreate => "schedule_create",
            Self::ScheduleSign => "schedule_sign",
            Self::ScheduleDelete => "schedule_delete",
        }
    }

    /// Whether an operation of this kind may be wrapped in a schedule
    ///
    /// Schedule management operations cannot themselves be scheduled.
    pub fn is_schedulable(&self) -> bool {
        !matches!(
            self,
            Self::ScheduleCreate | Self::ScheduleSign | Self::ScheduleDelete
        )
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl OperationBody {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::CryptoTransfer { .. } => OperationKind::CryptoTransfer,
            Self::AccountCreate { .. } => OperationKind::AccountCreate,
            Self::TopicCreate { .. } => OperationKind::TopicCreate,
            Self::TopicMessageSubmit { .. } => OperationKind::TopicMessageSubmit,
            Self::TokenCreate(_) => OperationKind::TokenCreate,
            Self::ScheduleCreate { .. } => OperationKind::ScheduleCreate,
            Self::ScheduleSign { .. } => OperationKind::ScheduleSign,
            Self::ScheduleDelete { .. } => OperationKind::ScheduleDelete,
        }
    }
}

/// One not-yet-submitted network operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedOperation {
    id: Option<OperationId>,
    memo: Option<String>,
    target_endpoints: Vec<EntityId>,
    body: OperationBody,
    frozen: bool,
}

impl StagedOperation {
    pub fn new(body: OperationBody) -> Self {
        Self {
            id: None,
            memo: None,
            target_endpoints: Vec::new(),
            body,
            frozen: false,
        }
    }

    pub fn id(&self) -> Option<&OperationId> {
        self.id.as_ref()
    }

    pub fn memo(&self) -> Option<&str> {
        self.memo.as_deref()
    }

    pub fn target_endpoints(&self) -> &[EntityId] {
        &self.target_endpoints
    }

    pub fn body(&self) -> &OperationBody {
        &self.body
    }

    pub fn kind(&self) -> OperationKind {
        self.body.kind()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Payer the operation is framed for, once it has an id
    pub fn payer(&self) -> Option<EntityId> {
        self.id.map(|id| id.payer)
    }

    pub fn set_memo(&mut self, memo: impl Into<String>) {
        self.memo = Some(memo.into());
    }

    pub fn set_id(&mut self, id: OperationId) {
        self.id = Some(id);
    }

    pub fn set_target_endpoints(&mut self, endpoints: Vec<EntityId>) {
        self.target_endpoints = endpoints;
    }

    /// Mark the framing final; used by network clients during finalize
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Split into the parts a schedule entry keeps
    pub fn into_scheduled(self) -> ScheduledOperation {
        ScheduledOperation {
            body: self.body,
            memo: self.memo,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DispatchError> {
        bincode::serialize(self).map_err(|e| DispatchError::Serialization(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DispatchError> {
        bincode::deserialize(bytes).map_err(|e| DispatchError::Serialization(e.to_string()))
    }

    pub fn to_base64(&self) -> Result<String, DispatchError> {
        Ok(STANDARD.encode(self.to_bytes()?))
    }

    pub fn from_base64(encoded: &str) -> Result<Self, DispatchError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| DispatchError::Serialization(format!("invalid base64: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// SHA-384 of the byte form, hex encoded
    pub fn digest_hex(&self) -> Result<String, DispatchError> {
        Ok(hex::encode(Sha384::digest(self.to_bytes()?)))
    }
}
