//! Operation families
//!
//! Each family maps typed parameters onto one staged operation. Families
//! only stage: memo, explicit id, target endpoints and the execute / bytes /
//! schedule decision are applied uniformly by the dispatcher.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::operation::{DispatchError, KeyField, StageContext, StagedOperation};
use crate::types::{hbar_to_tinybars, TINYBARS_PER_HBAR};

pub mod account;
pub mod schedule;
pub mod token;
pub mod topic;
pub mod transfer;

pub use account::CreateAccountTool;
pub use schedule::{DeleteScheduleTool, SignScheduleTool};
pub use token::CreateFungibleTokenTool;
pub use topic::{CreateTopicTool, SubmitTopicMessageTool};
pub use transfer::TransferHbarTool;

/// One operation family
#[async_trait]
pub trait OperationTool: Send + Sync {
    /// Parameters as deserialized from the caller's JSON
    type Params: DeserializeOwned + Send;

    fn name(&self) -> &'static str;

    /// Whether operations of this family may be wrapped in a schedule
    fn schedulable(&self) -> bool {
        true
    }

    /// Key-bearing fields, for `current_signer` substitution before staging
    fn key_fields<'a>(&self, _params: &'a mut Self::Params) -> Vec<KeyField<'a>> {
        Vec::new()
    }

    /// Validate `params` and stage the operation they describe
    async fn stage(
        &self,
        params: Self::Params,
        ctx: &StageContext,
    ) -> Result<StagedOperation, DispatchError>;
}

/// Every tool name the dispatcher can route by name
pub const TOOL_NAMES: [&str; 7] = [
    TransferHbarTool::NAME,
    CreateAccountTool::NAME,
    CreateTopicTool::NAME,
    SubmitTopicMessageTool::NAME,
    CreateFungibleTokenTool::NAME,
    SignScheduleTool::NAME,
    DeleteScheduleTool::NAME,
];

/// An hbar amount as callers write it: a JSON number or a decimal string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum HbarAmount {
    Number(serde_json::Number),
    Text(String),
}

impl HbarAmount {
    pub fn to_tinybars(&self) -> Result<i64, String> {
        match self {
            HbarAmount::Number(n) => number_to_tinybars(n),
            HbarAmount::Text(s) => hbar_to_tinybars(s),
        }
    }
}

/// `Number::to_string` writes small floats in exponent form, so integers
/// are scaled directly and floats go through fixed eight-place text.
fn number_to_tinybars(n: &serde_json::Number) -> Result<i64, String> {
    if let Some(whole) = n.as_i64() {
        return whole
            .checked_mul(TINYBARS_PER_HBAR)
            .ok_or_else(|| format!("'{}' is out of range", n));
    }
    if n.is_u64() {
        return Err(format!("'{}' is out of range", n));
    }
    let value = n
        .as_f64()
        .ok_or_else(|| format!("'{}' is not a number", n))?;
    let fixed = format!("{:.8}", value);
    if fixed.parse::<f64>().ok() != Some(value) {
        return Err(format!("'{}' has more than 8 decimal places", n));
    }
    hbar_to_tinybars(&fixed)
}

/// Reject an empty (or whitespace-only) required string
pub(crate) fn require_non_empty(field: &str, value: &str) -> Result<(), DispatchError> {
    if value.trim().is_empty() {
        return Err(DispatchError::invalid_input(field, "must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hbar_amount_accepts_number_and_text() {
        let n: HbarAmount = serde_json::from_value(json!(1.5)).unwrap();
        assert_eq!(n.to_tinybars(), Ok(150_000_000));
        let s: HbarAmount = serde_json::from_value(json!("0.25")).unwrap();
        assert_eq!(s.to_tinybars(), Ok(25_000_000));
        let i: HbarAmount = serde_json::from_value(json!(3)).unwrap();
        assert_eq!(i.to_tinybars(), Ok(300_000_000));
    }

    #[test]
    fn test_hbar_amount_small_and_large_numbers() {
        let amount = |v: serde_json::Value| serde_json::from_value::<HbarAmount>(v).unwrap();
        assert_eq!(amount(json!(0.000005)).to_tinybars(), Ok(500));
        assert_eq!(amount(json!(0.00000001)).to_tinybars(), Ok(1));
        assert_eq!(amount(json!(-0.000002)).to_tinybars(), Ok(-200));
        assert_eq!(amount(json!(-7)).to_tinybars(), Ok(-700_000_000));
        assert!(amount(json!(0.000000001)).to_tinybars().is_err());
        assert!(amount(json!(u64::MAX)).to_tinybars().is_err());
        assert!(amount(json!(i64::MAX)).to_tinybars().is_err());
        assert!(amount(json!(1e30)).to_tinybars().is_err());
    }

    #[test]
    fn test_tool_names_are_unique() {
        let mut names = TOOL_NAMES.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), TOOL_NAMES.len());
    }
}
