//! Per-call options
//!
//! Every field is independently optional. Text fields are parsed here so a
//! malformed option fails the dispatch before anything reaches the network.

use serde::{Deserialize, Serialize};

use crate::operation::{
    CrossCuttingOptions, DispatchError, KeyField, KeyRef, KeyResolver, ScheduleOptions,
};
use crate::types::{check_memo, parse_entity_id, EntityId, OperationId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    /// `<payer>@<seconds>.<nanos>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_endpoints: Option<Vec<String>>,
    /// Per-call schedule override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_memo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_payer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule_admin_key: Option<KeyRef>,
}

impl MetaOptions {
    pub fn with_schedule(mut self, schedule: bool) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// Key-bearing option fields, for `current_signer` substitution
    pub fn key_fields(&mut self) -> Vec<KeyField<'_>> {
        vec![KeyField {
            name: "scheduleAdminKey",
            value: &mut self.schedule_admin_key,
        }]
    }

    /// Memo, explicit id and target endpoints, parsed
    pub fn cross_cutting(&self) -> Result<CrossCuttingOptions, DispatchError> {
        if let Some(memo) = &self.memo {
            check_memo("memo", memo)?;
        }
        let explicit_id = self
            .explicit_id
            .as_deref()
            .map(|id| {
                id.parse::<OperationId>()
                    .map_err(|reason| DispatchError::invalid_input("explicitId", reason))
            })
            .transpose()?;
        let target_endpoints = self
            .target_endpoints
            .as_ref()
            .map(|endpoints| {
                endpoints
                    .iter()
                    .enumerate()
                    .map(|(index, endpoint)| {
                        endpoint.parse::<EntityId>().map_err(|reason| {
                            DispatchError::invalid_item("targetEndpoints", index, reason)
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;

        Ok(CrossCuttingOptions {
            memo: self.memo.clone(),
            explicit_id,
            target_endpoints,
        })
    }

    /// Options for the outer schedule-create operation
    ///
    /// The schedule payer defaults to `default_payer`, the operating identity.
    pub async fn schedule_options(
        &self,
        resolver: &KeyResolver,
        default_payer: EntityId,
    ) -> Result<ScheduleOptions, DispatchError> {
        if let Some(memo) = &self.schedule_memo {
            check_memo("scheduleMemo", memo)?;
        }
        let payer_id = match self.schedule_payer_id.as_deref() {
            Some(id) => parse_entity_id("schedulePayerId", id)?,
            None => default_payer,
        };
        let admin_key = resolver
            .resolve("scheduleAdminKey", self.schedule_admin_key.as_ref())
            .await?;

        Ok(ScheduleOptions {
            memo: self.schedule_memo.clone(),
            payer_id: Some(payer_id),
            admin_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_every_field() {
        let options: MetaOptions = serde_json::from_value(json!({
            "memo": "m",
            "explicitId": "0.0.2@1700000000.000000001",
            "targetEndpoints": ["0.0.3", "0.0.4"],
            "schedule": true,
            "scheduleMemo": "later",
            "schedulePayerId": "0.0.1001",
            "scheduleAdminKey": "current_signer"
        }))
        .unwrap();
        assert_eq!(options.schedule, Some(true));
        assert_eq!(options.schedule_admin_key, Some(KeyRef::CurrentSigner));

        let cc = options.cross_cutting().unwrap();
        assert_eq!(cc.memo.as_deref(), Some("m"));
        assert_eq!(
            cc.target_endpoints,
            Some(vec![EntityId::from_num(3), EntityId::from_num(4)])
        );
        assert_eq!(
            cc.explicit_id.map(|id| id.to_string()).as_deref(),
            Some("0.0.2@1700000000.000000001")
        );
    }

    #[test]
    fn test_empty_options() {
        let options: MetaOptions = serde_json::from_value(json!({})).unwrap();
        assert_eq!(options, MetaOptions::default());
        assert!(options.cross_cutting().unwrap().is_empty());
    }

    #[test]
    fn test_bad_endpoint_reports_index() {
        let options = MetaOptions {
            target_endpoints: Some(vec!["0.0.3".to_string(), "node".to_string()]),
            ..Default::default()
        };
        let err = options.cross_cutting().unwrap_err();
        assert!(matches!(
            err,
            DispatchError::InvalidInput { ref field, index: Some(1), .. } if field == "targetEndpoints"
        ));
    }

    #[tokio::test]
    async fn test_schedule_payer_defaults_to_operator() {
        let options = MetaOptions::default();
        let schedule = options
            .schedule_options(&KeyResolver::default(), EntityId::from_num(2))
            .await
            .unwrap();
        assert_eq!(schedule.payer_id, Some(EntityId::from_num(2)));
        assert!(schedule.admin_key.is_none());

        let options = MetaOptions {
            schedule_payer_id: Some("0.0.1001".to_string()),
            ..Default::default()
        };
        let schedule = options
            .schedule_options(&KeyResolver::default(), EntityId::from_num(2))
            .await
            .unwrap();
        assert_eq!(schedule.payer_id, Some(EntityId::from_num(1001)));
    }

    #[tokio::test]
    async fn test_schedule_admin_token_without_signer() {
        let options = MetaOptions {
            schedule_admin_key: Some(KeyRef::CurrentSigner),
            ..Default::default()
        };
        let err = options
            .schedule_options(&KeyResolver::default(), EntityId::from_num(2))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::NoSignerAvailable { .. }));
    }
}
