//! Operation builder base contract
//!
//! [`OperationBuilder`] owns at most one [`StagedOperation`] and provides the
//! cross-cutting surface every operation family inherits: memo, explicit id
//! and target endpoints setters, plus the three consumers (`execute`,
//! `get_bytes`, `execute_with_signer`). Consumers take the builder by value,
//! so a staged operation is realized exactly once.
//!
//! Concrete families only stage: see [`crate::tools::OperationTool`].
//!
//! Errors are split the same way everywhere:
//! - misuse of the builder (nothing staged, stale framing) comes back as `Err`
//! - everything else (finalization, signing, submission) is folded into an
//!   [`ExecuteResult`] with `success: false`

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::errors::DispatchError;
use super::output::{BytesResult, ExecuteResult};
use super::schedule::{ScheduleOptions, ScheduleWrapper};
use super::staged::StagedOperation;
use crate::services::{NetworkClient, OperationReceipt, Services, Signer};
use crate::types::{check_memo, EntityId, OperationId};

/// Cross-cutting fields applied to the staged operation
///
/// Only fields that are `Some` are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrossCuttingOptions {
    pub memo: Option<String>,
    pub explicit_id: Option<OperationId>,
    pub target_endpoints: Option<Vec<EntityId>>,
}

impl CrossCuttingOptions {
    pub fn is_empty(&self) -> bool {
        self.memo.is_none() && self.explicit_id.is_none() && self.target_endpoints.is_none()
    }
}

/// Finalize (freeze) `op` unless it already is
///
/// Re-finalizing is a no-op, so calling this twice yields byte-identical output.
pub async fn finalize_operation(
    client: &dyn NetworkClient,
    op: StagedOperation,
) -> Result<StagedOperation, DispatchError> {
    if op.is_frozen() {
        debug!(kind = %op.kind(), "Operation already finalized, skipping");
        return Ok(op);
    }

    let kind = op.kind();
    let finalized = client
        .finalize(op)
        .await
        .map_err(|e| DispatchError::Finalization(e.to_string()))?;

    if !finalized.is_frozen() || finalized.id().is_none() {
        return Err(DispatchError::internal(format!(
            "network client returned an unfinalized {} operation",
            kind
        )));
    }
    debug!(
        kind = %kind,
        operation_id = ?finalized.id().map(|id| id.to_string()),
        "Operation finalized"
    );
    Ok(finalized)
}

/// Finalize `op` and hand it to `signer`
async fn submit_with(
    client: &dyn NetworkClient,
    signer: &dyn Signer,
    op: StagedOperation,
) -> Result<OperationReceipt, DispatchError> {
    let op = finalize_operation(client, op).await?;
    let operation_id = op.id().map(|id| id.to_string());

    info!(
        kind = %op.kind(),
        operation_id = ?operation_id,
        signer = %signer.identity_id(),
        "Submitting operation"
    );

    signer
        .sign_and_submit(&op)
        .await
        .map_err(|e| DispatchError::submission(e.to_string(), operation_id))
}

/// Builder holding the single staged operation of one logical call
pub struct OperationBuilder {
    services: Services,
    staged: Option<StagedOperation>,
}

impl OperationBuilder {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            staged: None,
        }
    }

    /// Stage `op`, replacing anything staged before
    pub fn stage(&mut self, op: StagedOperation) -> &mut Self {
        if let Some(previous) = &self.staged {
            warn!(
                previous = %previous.kind(),
                next = %op.kind(),
                "Replacing a staged operation that was never consumed"
            );
        }
        self.staged = Some(op);
        self
    }

    fn staged_mut(&mut self) -> Result<&mut StagedOperation, DispatchError> {
        self.staged.as_mut().ok_or(DispatchError::NoStagedOperation)
    }

    pub fn set_memo(&mut self, memo: impl Into<String>) -> Result<&mut Self, DispatchError> {
        let memo = memo.into();
        let op = self.staged_mut()?;
        check_memo("memo", &memo)?;
        op.set_memo(memo);
        Ok(self)
    }

    pub fn set_explicit_id(&mut self, id: OperationId) -> Result<&mut Self, DispatchError> {
        self.staged_mut()?.set_id(id);
        Ok(self)
    }

    pub fn set_target_endpoints(
        &mut self,
        endpoints: Vec<EntityId>,
    ) -> Result<&mut Self, DispatchError> {
        self.staged_mut()?.set_target_endpoints(endpoints);
        Ok(self)
    }

    /// Apply every present field of `options`
    pub fn apply(&mut self, options: &CrossCuttingOptions) -> Result<&mut Self, DispatchError> {
        // Precondition holds even when there is nothing to apply.
        self.staged_mut()?;
        if let Some(memo) = &options.memo {
            self.set_memo(memo.clone())?;
        }
        if let Some(id) = options.explicit_id {
            self.set_explicit_id(id)?;
        }
        if let Some(endpoints) = &options.target_endpoints {
            self.set_target_endpoints(endpoints.clone())?;
        }
        Ok(self)
    }

    pub fn staged_operation(&self) -> Option<&StagedOperation> {
        self.staged.as_ref()
    }

    /// Consume the builder and take the staged operation
    pub fn into_staged(self) -> Result<StagedOperation, DispatchError> {
        self.staged.ok_or(DispatchError::NoStagedOperation)
    }

    fn into_parts(self) -> Result<(Services, StagedOperation), DispatchError> {
        let op = self.staged.ok_or(DispatchError::NoStagedOperation)?;
        Ok((self.services, op))
    }

    /// Submit the staged operation, or a schedule wrapping it
    ///
    /// With `schedule` set, the outer schedule-create operation is submitted
    /// instead and the created schedule id is reported. Failures after the
    /// precondition check come back as `success: false`.
    pub async fn execute(
        self,
        schedule: Option<&ScheduleOptions>,
    ) -> Result<ExecuteResult, DispatchError> {
        let (services, op) = self.into_parts()?;
        Ok(match execute_inner(&services, op, schedule).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, category = e.category(), "Execution failed");
                ExecuteResult::failed(&e)
            }
        })
    }

    /// Like [`Self::execute`], but every failure comes back as `Err`
    pub async fn try_execute(
        self,
        schedule: Option<&ScheduleOptions>,
    ) -> Result<ExecuteResult, DispatchError> {
        let (services, op) = self.into_parts()?;
        execute_inner(&services, op, schedule).await
    }

    /// Finalize the staged operation (or a schedule wrapping it) and serialize it
    ///
    /// No submission happens; the only network interaction is finalizing.
    pub async fn get_bytes(
        self,
        schedule: Option<&ScheduleOptions>,
    ) -> Result<String, DispatchError> {
        Ok(self.finalize_bytes(schedule).await?.operation_bytes)
    }

    /// Like [`Self::get_bytes`], also reporting the finalized operation id
    pub async fn finalize_bytes(
        self,
        schedule: Option<&ScheduleOptions>,
    ) -> Result<BytesResult, DispatchError> {
        let (services, op) = self.into_parts()?;
        let op = match schedule {
            Some(options) => ScheduleWrapper::wrap(op, options)?,
            None => op,
        };
        let op = finalize_operation(services.client.as_ref(), op).await?;
        let operation_bytes = op.to_base64()?;
        let digest = op.digest_hex()?;
        debug!(kind = %op.kind(), digest = %digest, "Serialized finalized operation");
        Ok(BytesResult::new(
            operation_bytes,
            op.id().map(|id| id.to_string()),
        ))
    }

    /// Submit the staged operation through a caller-supplied signer
    ///
    /// An operation already frozen for a different payer is refused with
    /// [`DispatchError::FrozenForDifferentPayer`]. An operation without an id
    /// is framed with the signer as payer before finalizing.
    pub async fn execute_with_signer(
        self,
        signer: Arc<dyn Signer>,
    ) -> Result<ExecuteResult, DispatchError> {
        let (services, mut op) = self.into_parts()?;
        let signer_id = signer.identity_id();

        if op.is_frozen() {
            if let Some(frozen_payer) = op.payer() {
                if frozen_payer != signer_id {
                    return Err(DispatchError::FrozenForDifferentPayer {
                        frozen_payer: frozen_payer.to_string(),
                        signer: signer_id.to_string(),
                    });
                }
            }
        } else if op.id().is_none() {
            op.set_id(OperationId::new(signer_id, Utc::now()));
        }

        Ok(
            match submit_with(services.client.as_ref(), signer.as_ref(), op).await {
                Ok(receipt) => ExecuteResult::executed(receipt),
                Err(e) => {
                    warn!(error = %e, signer = %signer_id, "Execution with caller signer failed");
                    ExecuteResult::failed(&e)
                }
            },
        )
    }
}

async fn execute_inner(
    services: &Services,
    op: StagedOperation,
    schedule: Option<&ScheduleOptions>,
) -> Result<ExecuteResult, DispatchError> {
    let signer = services
        .signer
        .as_ref()
        .ok_or_else(|| DispatchError::Configuration("no signer configured to submit with".to_string()))?;

    match schedule {
        None => {
            let receipt = submit_with(services.client.as_ref(), signer.as_ref(), op).await?;
            Ok(ExecuteResult::executed(receipt))
        }
        Some(options) => {
            let outer = ScheduleWrapper::wrap(op, options)?;
            let receipt = submit_with(services.client.as_ref(), signer.as_ref(), outer).await?;
            let schedule_id = receipt.schedule_id.ok_or_else(|| {
                DispatchError::submission(
                    "schedule-create receipt did not carry a schedule id",
                    Some(receipt.operation_id.clone()),
                )
            })?;
            info!(schedule_id = %schedule_id, "Schedule created");
            Ok(ExecuteResult::scheduled(receipt, schedule_id.to_string()))
        }
    }
}
