//! `create_fungible_token`

use async_trait::async_trait;
use serde::Deserialize;

use super::{require_non_empty, OperationTool};
use crate::operation::{
    DispatchError, KeyField, KeyRef, OperationBody, StageContext, StagedOperation,
    TokenCreateBody,
};
use crate::types::{check_memo, parse_entity_id};

/// Largest `decimals` the network accepts
pub const MAX_DECIMALS: u32 = 18;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFungibleTokenParams {
    pub token_name: String,
    pub token_symbol: String,
    #[serde(default)]
    pub decimals: Option<u32>,
    /// In display units, scaled by `10^decimals` when staged
    #[serde(default)]
    pub initial_supply: Option<u64>,
    #[serde(default)]
    pub treasury_account_id: Option<String>,
    #[serde(default)]
    pub admin_key: Option<KeyRef>,
    #[serde(default)]
    pub supply_key: Option<KeyRef>,
    #[serde(default)]
    pub token_memo: Option<String>,
}

pub struct CreateFungibleTokenTool;

impl CreateFungibleTokenTool {
    pub const NAME: &'static str = "create_fungible_token";
}

/// Scale a display-unit supply to the smallest unit
pub fn scale_supply(initial_supply: u64, decimals: u32) -> Result<u64, DispatchError> {
    if decimals > MAX_DECIMALS {
        return Err(DispatchError::invalid_input(
            "decimals",
            format!("must be at most {}", MAX_DECIMALS),
        ));
    }
    10u64
        .checked_pow(decimals)
        .and_then(|factor| initial_supply.checked_mul(factor))
        .ok_or_else(|| {
            DispatchError::invalid_input(
                "initialSupply",
                format!("{} with {} decimals overflows", initial_supply, decimals),
            )
        })
}

#[async_trait]
impl OperationTool for CreateFungibleTokenTool {
    type Params = CreateFungibleTokenParams;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn key_fields<'a>(&self, params: &'a mut CreateFungibleTokenParams) -> Vec<KeyField<'a>> {
        vec![
            KeyField {
                name: "adminKey",
                value: &mut params.admin_key,
            },
            KeyField {
                name: "supplyKey",
                value: &mut params.supply_key,
            },
        ]
    }

    async fn stage(
        &self,
        params: CreateFungibleTokenParams,
        ctx: &StageContext,
    ) -> Result<StagedOperation, DispatchError> {
        require_non_empty("tokenName", &params.token_name)?;
        require_non_empty("tokenSymbol", &params.token_symbol)?;
        if let Some(memo) = &params.token_memo {
            check_memo("tokenMemo", memo)?;
        }

        let decimals = params.decimals.unwrap_or(0);
        let initial_supply = scale_supply(params.initial_supply.unwrap_or(0), decimals)?;
        let treasury = match params.treasury_account_id.as_deref() {
            Some(id) => parse_entity_id("treasuryAccountId", id)?,
            None => ctx.default_account(),
        };

        let admin_key = ctx
            .resolver
            .resolve("adminKey", params.admin_key.as_ref())
            .await?;
        let supply_key = ctx
            .resolver
            .resolve("supplyKey", params.supply_key.as_ref())
            .await?;

        Ok(StagedOperation::new(OperationBody::TokenCreate(
            TokenCreateBody {
                name: params.token_name,
                symbol: params.token_symbol,
                decimals,
                initial_supply,
                treasury,
                admin_key,
                supply_key,
                token_memo: params.token_memo,
            },
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::KeyResolver;
    use crate::types::EntityId;
    use serde_json::json;

    #[test]
    fn test_scale_supply() {
        assert_eq!(scale_supply(1_000, 2).unwrap(), 100_000);
        assert_eq!(scale_supply(7, 0).unwrap(), 7);
        assert!(scale_supply(u64::MAX, 1).is_err());
        assert!(scale_supply(1, MAX_DECIMALS + 1).is_err());
    }

    #[tokio::test]
    async fn test_stage_defaults() {
        let params: CreateFungibleTokenParams = serde_json::from_value(json!({
            "tokenName": "Gold",
            "tokenSymbol": "GLD",
            "decimals": 2,
            "initialSupply": 500
        }))
        .unwrap();
        let ctx = StageContext::new(EntityId::from_num(2), KeyResolver::default())
            .acting_on_behalf_of(Some(EntityId::from_num(1001)));
        let op = CreateFungibleTokenTool.stage(params, &ctx).await.unwrap();

        let OperationBody::TokenCreate(body) = op.body() else {
            panic!("expected a token create");
        };
        assert_eq!(body.initial_supply, 50_000);
        assert_eq!(body.treasury, EntityId::from_num(1001));
        assert!(body.admin_key.is_none());
        assert!(body.supply_key.is_none());
    }

    #[tokio::test]
    async fn test_supply_key_token_without_signer() {
        let params: CreateFungibleTokenParams = serde_json::from_value(json!({
            "tokenName": "Gold",
            "tokenSymbol": "GLD",
            "supplyKey": "current_signer"
        }))
        .unwrap();
        let ctx = StageContext::new(EntityId::from_num(2), KeyResolver::default());
        let err = CreateFungibleTokenTool.stage(params, &ctx).await.unwrap_err();
        assert!(matches!(err, DispatchError::NoSignerAvailable { ref field } if field == "supplyKey"));
    }

    #[tokio::test]
    async fn test_name_required() {
        let params: CreateFungibleTokenParams =
            serde_json::from_value(json!({ "tokenName": "", "tokenSymbol": "GLD" })).unwrap();
        let ctx = StageContext::new(EntityId::from_num(2), KeyResolver::default());
        let err = CreateFungibleTokenTool.stage(params, &ctx).await.unwrap_err();
        assert!(matches!(err, DispatchError::InvalidInput { ref field, .. } if field == "tokenName"));
    }
}
