//! `transfer_hbar`: move hbar from one account to one or more recipients

use async_trait::async_trait;
use nonempty::NonEmpty;
use serde::Deserialize;
use serde_json::Value;

use super::{HbarAmount, OperationTool};
use crate::operation::{
    AccountAmount, DispatchError, OperationBody, StageContext, StagedOperation,
};
use crate::types::{check_memo, parse_entity_id, EntityId};

/// Recipients as supplied: a JSON list, or the same list encoded as JSON text
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TransfersInput {
    List(Vec<Value>),
    Text(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferHbarParams {
    pub transfers: TransfersInput,
    #[serde(default)]
    pub source_account_id: Option<String>,
    #[serde(default)]
    pub transaction_memo: Option<String>,
}

/// One validated credit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recipient {
    pub account_id: EntityId,
    pub tinybars: i64,
}

/// Parse and validate the recipient list, in order
///
/// The first bad item is reported with its index and the offending field.
pub fn parse_transfers(input: &TransfersInput) -> Result<NonEmpty<Recipient>, DispatchError> {
    let items = match input {
        TransfersInput::List(items) => items.clone(),
        TransfersInput::Text(text) => {
            let parsed: Value = serde_json::from_str(text).map_err(|e| {
                DispatchError::invalid_input("transfers", format!("malformed JSON: {}", e))
            })?;
            match parsed {
                Value::Array(items) => items,
                _ => {
                    return Err(DispatchError::invalid_input(
                        "transfers",
                        "expected a JSON array of transfers",
                    ))
                }
            }
        }
    };

    let recipients = items
        .iter()
        .enumerate()
        .map(|(index, item)| parse_recipient(index, item))
        .collect::<Result<Vec<_>, _>>()?;

    NonEmpty::from_vec(recipients)
        .ok_or_else(|| DispatchError::invalid_input("transfers", "at least one recipient is required"))
}

fn parse_recipient(index: usize, item: &Value) -> Result<Recipient, DispatchError> {
    let Value::Object(fields) = item else {
        return Err(DispatchError::invalid_item(
            "transfers",
            index,
            "expected an object with accountId and amount",
        ));
    };

    let account_id = match fields.get("accountId") {
        None | Some(Value::Null) => {
            return Err(DispatchError::invalid_item("accountId", index, "missing"))
        }
        Some(Value::String(s)) => s
            .parse::<EntityId>()
            .map_err(|reason| DispatchError::invalid_item("accountId", index, reason))?,
        Some(_) => {
            return Err(DispatchError::invalid_item(
                "accountId",
                index,
                "expected a string",
            ))
        }
    };

    let amount = match fields.get("amount") {
        None | Some(Value::Null) => {
            return Err(DispatchError::invalid_item("amount", index, "missing"))
        }
        Some(value) => HbarAmount::deserialize(value)
            .map_err(|_| DispatchError::invalid_item("amount", index, "expected a number"))?,
    };
    let tinybars = amount
        .to_tinybars()
        .map_err(|reason| DispatchError::invalid_item("amount", index, reason))?;
    if tinybars <= 0 {
        return Err(DispatchError::invalid_item(
            "amount",
            index,
            "must be greater than zero",
        ));
    }

    Ok(Recipient {
        account_id,
        tinybars,
    })
}

pub struct TransferHbarTool;

impl TransferHbarTool {
    pub const NAME: &'static str = "transfer_hbar";
}

#[async_trait]
impl OperationTool for TransferHbarTool {
    type Params = TransferHbarParams;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn stage(
        &self,
        params: TransferHbarParams,
        ctx: &StageContext,
    ) -> Result<StagedOperation, DispatchError> {
        let recipients = parse_transfers(&params.transfers)?;
        let source = match params.source_account_id.as_deref() {
            Some(id) => parse_entity_id("sourceAccountId", id)?,
            None => ctx.default_account(),
        };

        let total = recipients
            .iter()
            .try_fold(0i64, |acc, r| acc.checked_add(r.tinybars))
            .ok_or_else(|| DispatchError::invalid_input("transfers", "total amount overflows"))?;

        let mut transfers = Vec::with_capacity(recipients.len() + 1);
        transfers.push(AccountAmount {
            account_id: source,
            tinybars: -total,
        });
        transfers.extend(recipients.iter().map(|r| AccountAmount {
            account_id: r.account_id,
            tinybars: r.tinybars,
        }));

        let mut op = StagedOperation::new(OperationBody::CryptoTransfer { transfers });
        if let Some(memo) = params.transaction_memo {
            check_memo("transactionMemo", &memo)?;
            op.set_memo(memo);
        }
        Ok(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::KeyResolver;
    use serde_json::json;

    fn ctx() -> StageContext {
        StageContext::new(EntityId::from_num(2), KeyResolver::default())
    }

    fn params(value: Value) -> TransferHbarParams {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_stage_nets_to_zero() {
        let p = params(json!({
            "transfers": [
                { "accountId": "0.0.1001", "amount": 1.5 },
                { "accountId": "0.0.1002", "amount": "0.5" }
            ],
            "transactionMemo": "rent"
        }));
        let op = TransferHbarTool.stage(p, &ctx()).await.unwrap();
        assert_eq!(op.memo(), Some("rent"));

        let OperationBody::CryptoTransfer { transfers } = op.body() else {
            panic!("expected a crypto transfer");
        };
        assert_eq!(transfers.len(), 3);
        assert_eq!(transfers[0].account_id, EntityId::from_num(2));
        assert_eq!(transfers[0].tinybars, -200_000_000);
        assert_eq!(transfers.iter().map(|t| t.tinybars).sum::<i64>(), 0);
    }

    #[tokio::test]
    async fn test_source_defaults_to_acting_identity() {
        let ctx = ctx().acting_on_behalf_of(Some(EntityId::from_num(1001)));
        let p = params(json!({ "transfers": [{ "accountId": "0.0.5", "amount": 1 }] }));
        let op = TransferHbarTool.stage(p, &ctx).await.unwrap();
        let OperationBody::CryptoTransfer { transfers } = op.body() else {
            panic!("expected a crypto transfer");
        };
        assert_eq!(transfers[0].account_id, EntityId::from_num(1001));
    }

    #[test]
    fn test_json_text_input() {
        let input = TransfersInput::Text(r#"[{"accountId":"0.0.7","amount":2}]"#.to_string());
        let recipients = parse_transfers(&input).unwrap();
        assert_eq!(recipients.head.account_id, EntityId::from_num(7));
        assert_eq!(recipients.head.tinybars, 200_000_000);
    }

    #[test]
    fn test_empty_recipients_rejected() {
        let err = parse_transfers(&TransfersInput::List(vec![])).unwrap_err();
        assert!(matches!(err, DispatchError::InvalidInput { ref field, index: None, .. } if field == "transfers"));

        let err = parse_transfers(&TransfersInput::Text("[]".to_string())).unwrap_err();
        assert!(err.to_string().contains("at least one recipient"));
    }

    #[test]
    fn test_malformed_text_rejected() {
        let err = parse_transfers(&TransfersInput::Text("[{".to_string())).unwrap_err();
        assert!(err.to_string().contains("malformed JSON"));
    }

    #[test]
    fn test_sub_microhbar_number_amount() {
        let input = TransfersInput::List(vec![json!({ "accountId": "0.0.7", "amount": 0.000005 })]);
        let recipients = parse_transfers(&input).unwrap();
        assert_eq!(recipients.head.tinybars, 500);
    }

    #[test]
    fn test_doubled_sign_amount_rejected() {
        for amount in ["--1", "1.-5", "-+1"] {
            let input = TransfersInput::List(vec![json!({ "accountId": "0.0.7", "amount": amount })]);
            let err = parse_transfers(&input).unwrap_err();
            assert!(
                matches!(err, DispatchError::InvalidInput { ref field, index: Some(0), .. } if field == "amount"),
                "{amount:?} accepted"
            );
        }
    }

    #[test]
    fn test_item_errors_name_index_and_field() {
        let input = TransfersInput::List(vec![
            json!({ "accountId": "0.0.7", "amount": 1 }),
            json!({ "amount": 1 }),
        ]);
        let err = parse_transfers(&input).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::InvalidInput { ref field, index: Some(1), .. } if field == "accountId"
        ));
        assert_eq!(err.to_string(), "Invalid input at item 1 (accountId): missing");

        let input = TransfersInput::List(vec![json!({ "accountId": "0.0.7", "amount": -1 })]);
        let err = parse_transfers(&input).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::InvalidInput { ref field, index: Some(0), .. } if field == "amount"
        ));
    }
}
