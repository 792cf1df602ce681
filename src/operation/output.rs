//! Normalized dispatch results
//!
//! Three disjoint JSON shapes come out of a dispatch:
//!
//! - [`ExecuteResult`]: direct execution (and every failure that happens
//!   before a mode-specific path is chosen)
//!   `{ success, receipt?, scheduleId?, operationId?, error? }`
//! - [`BytesResult`]: bytes mode, unscheduled
//!   `{ success: true, operationBytes, operationId? }`
//! - [`ScheduleCreateResult`]: a schedule entity was created (or failed to be)
//!   `{ success, op: "schedule_create", schedule_id?, description?, ... }`
//!
//! [`DispatchOutcome`] is the untagged union of the three.

use serde::{Deserialize, Serialize};

use super::errors::DispatchError;
use crate::services::OperationReceipt;

/// Value of the `op` field on schedule results
pub const SCHEDULE_CREATE_OP: &str = "schedule_create";

/// Result of executing (or attempting to execute) an operation
///
/// Invariant: `success` implies `receipt` or `schedule_id`; failure implies `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<OperationReceipt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
}

impl ExecuteResult {
    /// The network accepted the operation
    pub fn executed(receipt: OperationReceipt) -> Self {
        Self {
            success: true,
            operation_id: Some(receipt.operation_id.clone()),
            receipt: Some(receipt),
            schedule_id: None,
            error: None,
        }
    }

    /// A schedule-create operation was accepted and produced `schedule_id`
    pub fn scheduled(receipt: OperationReceipt, schedule_id: impl Into<String>) -> Self {
        Self {
            success: true,
            operation_id: Some(receipt.operation_id.clone()),
            receipt: Some(receipt),
            schedule_id: Some(schedule_id.into()),
            error: None,
        }
    }

    pub fn failed(error: &DispatchError) -> Self {
        Self {
            success: false,
            receipt: None,
            schedule_id: None,
            error: Some(error.to_string()),
            operation_id: error.operation_id().map(str::to_string),
        }
    }

    pub fn is_consistent(&self) -> bool {
        if self.success {
            self.receipt.is_some() || self.schedule_id.is_some()
        } else {
            self.error.is_some()
        }
    }
}

/// Bytes-mode result for an unscheduled operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BytesResult {
    pub success: bool,
    /// Base64 of the finalized operation
    pub operation_bytes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
}

impl BytesResult {
    pub fn new(operation_bytes: String, operation_id: Option<String>) -> Self {
        Self {
            success: true,
            operation_bytes,
            operation_id,
        }
    }
}

/// Result of the schedule path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleCreateResult {
    pub success: bool,
    pub op: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Who is expected to pay for the inner operation when it executes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer_account_id_scheduled_op: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo_scheduled_op: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScheduleCreateResult {
    pub fn created(
        schedule_id: String,
        description: String,
        payer_account_id_scheduled_op: String,
        memo_scheduled_op: Option<String>,
    ) -> Self {
        Self {
            success: true,
            op: SCHEDULE_CREATE_OP.to_string(),
            schedule_id: Some(schedule_id),
            description: Some(description),
            payer_account_id_scheduled_op: Some(payer_account_id_scheduled_op),
            memo_scheduled_op,
            error: None,
        }
    }

    pub fn failed(error: &DispatchError) -> Self {
        Self {
            success: false,
            op: SCHEDULE_CREATE_OP.to_string(),
            schedule_id: None,
            description: None,
            payer_account_id_scheduled_op: None,
            memo_scheduled_op: None,
            error: Some(error.to_string()),
        }
    }
}

/// Any of the three result shapes
///
/// Variant order matters for deserialization: the shapes with a required
/// discriminating field come first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DispatchOutcome {
    ScheduleCreated(ScheduleCreateResult),
    Bytes(BytesResult),
    Executed(ExecuteResult),
}

impl DispatchOutcome {
    pub fn is_success(&self) -> bool {
        match self {
            Self::ScheduleCreated(r) => r.success,
            Self::Bytes(r) => r.success,
            Self::Executed(r) => r.success,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::ScheduleCreated(r) => r.error.as_deref(),
            Self::Bytes(_) => None,
            Self::Executed(r) => r.error.as_deref(),
        }
    }

    /// Short label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::ScheduleCreated(_) => "schedule_created",
            Self::Bytes(_) => "bytes_returned",
            Self::Executed(_) => "executed_direct",
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            serde_json::json!({ "success": false, "error": format!("failed to encode result: {}", e) })
        })
    }
}
