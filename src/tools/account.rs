//! `create_account`

use async_trait::async_trait;
use serde::Deserialize;

use super::{HbarAmount, OperationTool};
use crate::operation::{
    DispatchError, KeyField, KeyRef, OperationBody, StageContext, StagedOperation,
};
use crate::types::check_memo;

fn default_account_key() -> Option<KeyRef> {
    Some(KeyRef::CurrentSigner)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountParams {
    /// Key of the new account; the caller's own key unless given
    #[serde(default = "default_account_key")]
    pub public_key: Option<KeyRef>,
    #[serde(default)]
    pub initial_balance: Option<HbarAmount>,
    #[serde(default)]
    pub max_automatic_token_associations: Option<i32>,
    #[serde(default)]
    pub account_memo: Option<String>,
}

pub struct CreateAccountTool;

impl CreateAccountTool {
    pub const NAME: &'static str = "create_account";
}

#[async_trait]
impl OperationTool for CreateAccountTool {
    type Params = CreateAccountParams;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn key_fields<'a>(&self, params: &'a mut CreateAccountParams) -> Vec<KeyField<'a>> {
        vec![KeyField {
            name: "publicKey",
            value: &mut params.public_key,
        }]
    }

    async fn stage(
        &self,
        params: CreateAccountParams,
        ctx: &StageContext,
    ) -> Result<StagedOperation, DispatchError> {
        let initial_balance_tinybars = match &params.initial_balance {
            Some(amount) => amount
                .to_tinybars()
                .map_err(|reason| DispatchError::invalid_input("initialBalance", reason))?,
            None => 0,
        };
        if initial_balance_tinybars < 0 {
            return Err(DispatchError::invalid_input(
                "initialBalance",
                "must not be negative",
            ));
        }

        // -1 means unlimited
        let max_automatic_token_associations = params.max_automatic_token_associations.unwrap_or(0);
        if max_automatic_token_associations < -1 {
            return Err(DispatchError::invalid_input(
                "maxAutomaticTokenAssociations",
                "must be -1 (unlimited) or greater",
            ));
        }

        if let Some(memo) = &params.account_memo {
            check_memo("accountMemo", memo)?;
        }

        let key = ctx
            .resolver
            .resolve_required("publicKey", params.public_key.as_ref())
            .await?;

        Ok(StagedOperation::new(OperationBody::AccountCreate {
            key,
            initial_balance_tinybars,
            max_automatic_token_associations,
            account_memo: params.account_memo,
        }))
    }
}
