//! Schedule wrapping
//!
//! Wraps a staged operation into an outer `ScheduleCreate` operation. The
//! outer operation carries its own payer, memo and admin key, set from
//! [`ScheduleOptions`] and independent of the inner operation's framing.
//! Wrapping is pure staging: no network call happens here.

use super::errors::DispatchError;
use super::keys::Key;
use super::staged::{OperationBody, StagedOperation};
use crate::types::{check_memo, EntityId};

/// Options for the outer schedule-create operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleOptions {
    /// Schedule memo
    pub memo: Option<String>,
    /// Account that pays when the scheduled operation executes
    pub payer_id: Option<EntityId>,
    /// Key allowed to delete the schedule
    pub admin_key: Option<Key>,
}

impl ScheduleOptions {
    pub fn with_payer(mut self, payer_id: EntityId) -> Self {
        self.payer_id = Some(payer_id);
        self
    }
}

pub struct ScheduleWrapper;

impl ScheduleWrapper {
    /// Build the outer schedule-create operation for `inner`
    ///
    /// The inner operation's body and memo become the scheduled payload; its
    /// id and target endpoints are not carried over.
    pub fn wrap(
        inner: StagedOperation,
        options: &ScheduleOptions,
    ) -> Result<StagedOperation, DispatchError> {
        let kind = inner.kind();
        if !kind.is_schedulable() {
            return Err(DispatchError::invalid_input(
                "schedule",
                format!("{} operations cannot be scheduled", kind),
            ));
        }
        if let Some(memo) = &options.memo {
            check_memo("scheduleMemo", memo)?;
        }

        Ok(StagedOperation::new(OperationBody::ScheduleCreate {
            scheduled: Box::new(inner.into_scheduled()),
            payer_account_id: options.payer_id,
            admin_key: options.admin_key.clone(),
            schedule_memo: options.memo.clone(),
        }))
    }
}
