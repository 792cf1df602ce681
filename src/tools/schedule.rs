//! Schedule management: `sign_schedule` and `delete_schedule`
//!
//! Neither can be wrapped in a schedule itself.

use async_trait::async_trait;
use serde::Deserialize;

use super::OperationTool;
use crate::operation::{DispatchError, OperationBody, StageContext, StagedOperation};
use crate::types::parse_entity_id;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleIdParams {
    pub schedule_id: String,
}

pub struct SignScheduleTool;

impl SignScheduleTool {
    pub const NAME: &'static str = "sign_schedule";
}

#[async_trait]
impl OperationTool for SignScheduleTool {
    type Params = ScheduleIdParams;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn schedulable(&self) -> bool {
        false
    }

    async fn stage(
        &self,
        params: ScheduleIdParams,
        _ctx: &StageContext,
    ) -> Result<StagedOperation, DispatchError> {
        let schedule_id = parse_entity_id("scheduleId", &params.schedule_id)?;
        Ok(StagedOperation::new(OperationBody::ScheduleSign { schedule_id }))
    }
}

pub struct DeleteScheduleTool;

impl DeleteScheduleTool {
    pub const NAME: &'static str = "delete_schedule";
}

#[async_trait]
impl OperationTool for DeleteScheduleTool {
    type Params = ScheduleIdParams;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn schedulable(&self) -> bool {
        false
    }

    async fn stage(
        &self,
        params: ScheduleIdParams,
        _ctx: &StageContext,
    ) -> Result<StagedOperation, DispatchError> {
        let schedule_id = parse_entity_id("scheduleId", &params.schedule_id)?;
        Ok(StagedOperation::new(OperationBody::ScheduleDelete { schedule_id }))
    }
}
