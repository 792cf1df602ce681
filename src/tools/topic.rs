//! Consensus topics: `create_topic` and `submit_topic_message`

use async_trait::async_trait;
use serde::Deserialize;

use super::{require_non_empty, OperationTool};
use crate::operation::{
    DispatchError, KeyField, KeyRef, OperationBody, StageContext, StagedOperation,
};
use crate::types::{check_memo, parse_entity_id};

/// Largest message accepted in a single submission
pub const MAX_MESSAGE_BYTES: usize = 1024;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTopicParams {
    #[serde(default)]
    pub admin_key: Option<KeyRef>,
    #[serde(default)]
    pub submit_key: Option<KeyRef>,
    #[serde(default)]
    pub topic_memo: Option<String>,
}

pub struct CreateTopicTool;

impl CreateTopicTool {
    pub const NAME: &'static str = "create_topic";
}

#[async_trait]
impl OperationTool for CreateTopicTool {
    type Params = CreateTopicParams;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn key_fields<'a>(&self, params: &'a mut CreateTopicParams) -> Vec<KeyField<'a>> {
        vec![
            KeyField {
                name: "adminKey",
                value: &mut params.admin_key,
            },
            KeyField {
                name: "submitKey",
                value: &mut params.submit_key,
            },
        ]
    }

    async fn stage(
        &self,
        params: CreateTopicParams,
        ctx: &StageContext,
    ) -> Result<StagedOperation, DispatchError> {
        if let Some(memo) = &params.topic_memo {
            check_memo("topicMemo", memo)?;
        }
        let admin_key = ctx
            .resolver
            .resolve("adminKey", params.admin_key.as_ref())
            .await?;
        let submit_key = ctx
            .resolver
            .resolve("submitKey", params.submit_key.as_ref())
            .await?;

        Ok(StagedOperation::new(OperationBody::TopicCreate {
            admin_key,
            submit_key,
            topic_memo: params.topic_memo,
        }))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTopicMessageParams {
    pub topic_id: String,
    pub message: String,
}

pub struct SubmitTopicMessageTool;

impl SubmitTopicMessageTool {
    pub const NAME: &'static str = "submit_topic_message";
}

#[async_trait]
impl OperationTool for SubmitTopicMessageTool {
    type Params = SubmitTopicMessageParams;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn stage(
        &self,
        params: SubmitTopicMessageParams,
        _ctx: &StageContext,
    ) -> Result<StagedOperation, DispatchError> {
        let topic_id = parse_entity_id("topicId", &params.topic_id)?;
        require_non_empty("message", &params.message)?;
        if params.message.len() > MAX_MESSAGE_BYTES {
            return Err(DispatchError::invalid_input(
                "message",
                format!(
                    "message is {} bytes, limit is {}",
                    params.message.len(),
                    MAX_MESSAGE_BYTES
                ),
            ));
        }

        Ok(StagedOperation::new(OperationBody::TopicMessageSubmit {
            topic_id,
            message: params.message.into_bytes(),
        }))
    }
}
