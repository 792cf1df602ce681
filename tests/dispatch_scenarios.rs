//! End-to-end dispatch scenarios
//!
//! This test validates:
//! - Direct execution, bytes mode and schedule creation result shapes
//! - Validation failures before any network interaction
//! - Signer failures surfacing the signer's message and the attempted id
//! - Non-schedulable tools never producing a schedule
//! - `current_signer` substitution

use opdispatch::dispatch::{Dispatcher, MetaOptions, OperationalMode, Session, SessionConfig};
use opdispatch::metrics::DispatchMetrics;
use opdispatch::operation::{
    DispatchOutcome, Key, KeyResolver, KeyRef, OperationBody, OperationKind, StagedOperation,
};
use opdispatch::services::{Services, Signer};
use opdispatch::test_utils::{MockNetworkClient, MockSigner, MOCK_OPERATOR};
use opdispatch::tools::{
    CreateTopicTool, DeleteScheduleTool, OperationTool, SignScheduleTool, TransferHbarTool,
};
use opdispatch::types::EntityId;
use serde_json::{json, Value};
use std::sync::Arc;

struct Harness {
    signer: Arc<MockSigner>,
    client: Arc<MockNetworkClient>,
    dispatcher: Dispatcher,
}

fn harness(config: SessionConfig) -> Harness {
    harness_with_signer(config, Arc::new(MockSigner::new()))
}

fn harness_with_signer(config: SessionConfig, signer: Arc<MockSigner>) -> Harness {
    let client = Arc::new(MockNetworkClient::new());
    let services = Services::new(Some(signer.clone() as Arc<dyn Signer>), client.clone());
    let dispatcher = Dispatcher::new(
        services,
        Arc::new(Session::new(config)),
        Arc::new(DispatchMetrics::new().expect("metrics")),
    );
    Harness {
        signer,
        client,
        dispatcher,
    }
}

fn bytes_mode(schedule_by_default: bool, acting: Option<EntityId>) -> SessionConfig {
    SessionConfig {
        mode: OperationalMode::ProvideBytes,
        schedule_by_default_in_bytes_mode: schedule_by_default,
        acting_on_behalf_of: acting,
    }
}

fn transfer_params() -> Value {
    json!({
        "transfers": [{ "accountId": "0.0.1002", "amount": 1 }],
        "transactionMemo": "lunch"
    })
}

#[tokio::test]
async fn scenario_a_direct_execution_returns_receipt() {
    let h = harness(SessionConfig::default());
    let outcome = h
        .dispatcher
        .dispatch(&TransferHbarTool, transfer_params(), MetaOptions::default())
        .await;

    let value = outcome.to_json();
    assert_eq!(value["success"], json!(true));
    assert_eq!(value["receipt"]["status"], json!("SUCCESS"));
    assert!(value.get("scheduleId").is_none());
    assert!(value.get("op").is_none());

    let submitted = h.signer.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].kind(), OperationKind::CryptoTransfer);
    assert_eq!(submitted[0].memo(), Some("lunch"));
}

#[tokio::test]
async fn scenario_b_bytes_mode_returns_decodable_bytes() {
    let h = harness(bytes_mode(false, None));
    let options = MetaOptions {
        memo: Some("override".to_string()),
        explicit_id: Some("0.0.1001@1700000100.000000009".to_string()),
        target_endpoints: Some(vec!["0.0.5".to_string()]),
        ..Default::default()
    };
    let outcome = h
        .dispatcher
        .dispatch(&TransferHbarTool, transfer_params(), options)
        .await;

    let DispatchOutcome::Bytes(result) = outcome else {
        panic!("expected a bytes outcome, got {outcome:?}");
    };
    assert!(result.success);
    assert_eq!(
        result.operation_id.as_deref(),
        Some("0.0.1001@1700000100.000000009")
    );

    let decoded = StagedOperation::from_base64(&result.operation_bytes).expect("decode");
    assert_eq!(decoded.memo(), Some("override"));
    assert_eq!(decoded.target_endpoints(), &[EntityId::from_num(5)]);
    assert!(decoded.is_frozen());
    assert!(h.signer.submitted().is_empty());
}

#[tokio::test]
async fn scenario_c_bytes_mode_schedules_by_default() {
    let acting = EntityId::from_num(1001);
    let h = harness(bytes_mode(true, Some(acting)));
    let outcome = h
        .dispatcher
        .dispatch(&TransferHbarTool, transfer_params(), MetaOptions::default())
        .await;

    let value = outcome.to_json();
    assert_eq!(value["success"], json!(true));
    assert_eq!(value["op"], json!("schedule_create"));
    assert!(value["schedule_id"].is_string());
    assert_eq!(value["payer_account_id_scheduled_op"], json!("0.0.1001"));
    assert_eq!(value["memo_scheduled_op"], json!("lunch"));
    assert!(value["description"].is_string());

    let submitted = h.signer.submitted();
    assert_eq!(submitted.len(), 1);
    match submitted[0].body() {
        OperationBody::ScheduleCreate {
            scheduled,
            payer_account_id,
            ..
        } => {
            assert_eq!(scheduled.body.kind(), OperationKind::CryptoTransfer);
            // The schedule is paid by the operating identity
            assert_eq!(*payer_account_id, Some(MOCK_OPERATOR));
            // The transfer itself debits the acting identity
            let OperationBody::CryptoTransfer { transfers } = &scheduled.body else {
                panic!("expected a transfer inside the schedule");
            };
            assert_eq!(transfers[0].account_id, acting);
        }
        other => panic!("unexpected body: {other:?}"),
    }
}

#[tokio::test]
async fn scenario_c_without_acting_identity_reports_unknown_payer() {
    let h = harness(bytes_mode(true, None));
    let options = MetaOptions {
        schedule_memo: Some("monthly rent".to_string()),
        ..Default::default()
    };
    let value = h
        .dispatcher
        .dispatch(&TransferHbarTool, transfer_params(), options)
        .await
        .to_json();
    assert_eq!(value["payer_account_id_scheduled_op"], json!("unknown"));
    assert_eq!(value["description"], json!("monthly rent"));
}

#[tokio::test]
async fn scenario_d_empty_recipients_fail_without_network() {
    for config in [SessionConfig::default(), bytes_mode(true, None)] {
        let h = harness(config);
        let outcome = h
            .dispatcher
            .dispatch(&TransferHbarTool, json!({ "transfers": [] }), MetaOptions::default())
            .await;

        let DispatchOutcome::Executed(result) = outcome else {
            panic!("expected an execute-shaped failure, got {outcome:?}");
        };
        assert!(!result.success);
        assert!(result.error.unwrap_or_default().contains("transfers"));
        assert!(h.signer.submitted().is_empty());
        assert_eq!(h.client.finalize_calls(), 0);
    }
}

#[tokio::test]
async fn scenario_d_malformed_transfer_text_names_item() {
    let h = harness(SessionConfig::default());
    let params = json!({
        "transfers": r#"[{"accountId":"0.0.7","amount":1},{"accountId":"0.0.8"}]"#
    });
    let outcome = h
        .dispatcher
        .dispatch(&TransferHbarTool, params, MetaOptions::default())
        .await;
    assert_eq!(
        outcome.error(),
        Some("Invalid input at item 1 (amount): missing")
    );
    assert_eq!(h.client.finalize_calls(), 0);
}

#[tokio::test]
async fn scenario_e_signer_failure_reports_message_and_id() {
    let h = harness_with_signer(
        SessionConfig::default(),
        Arc::new(MockSigner::failing("INSUFFICIENT_PAYER_BALANCE")),
    );
    let value = h
        .dispatcher
        .dispatch(&TransferHbarTool, transfer_params(), MetaOptions::default())
        .await
        .to_json();

    assert_eq!(value["success"], json!(false));
    assert_eq!(value["error"], json!("INSUFFICIENT_PAYER_BALANCE"));
    assert_eq!(value["operationId"], json!("0.0.2@1700000000.000000000"));
    assert_eq!(h.dispatcher.metrics().failure_count("submission"), 1);
}

#[tokio::test]
async fn non_schedulable_tools_never_schedule() {
    let configs = [
        SessionConfig::default(),
        bytes_mode(false, None),
        bytes_mode(true, Some(EntityId::from_num(1001))),
    ];
    for config in configs {
        for schedule in [None, Some(true), Some(false)] {
            let h = harness(config.clone());
            let options = MetaOptions {
                schedule,
                ..Default::default()
            };
            let params = json!({ "scheduleId": "0.0.9000" });

            let sign = h.dispatcher.dispatch(&SignScheduleTool, params.clone(), options.clone()).await;
            let delete = h.dispatcher.dispatch(&DeleteScheduleTool, params, options).await;

            for outcome in [sign, delete] {
                assert!(outcome.is_success(), "{outcome:?}");
                assert!(!matches!(outcome, DispatchOutcome::ScheduleCreated(_)));
            }
            assert!(h
                .signer
                .submitted()
                .iter()
                .all(|op| op.kind() != OperationKind::ScheduleCreate));
        }
    }
}

#[tokio::test]
async fn current_signer_is_substituted_with_canonical_key() {
    let signer = Arc::new(MockSigner::new());
    let resolver = KeyResolver::new(Some(signer.clone() as Arc<dyn Signer>));
    let mut params: <CreateTopicTool as OperationTool>::Params =
        serde_json::from_value(json!({ "adminKey": "current_signer" })).expect("params");

    let substituted = resolver
        .substitute(CreateTopicTool.key_fields(&mut params))
        .await;
    assert_eq!(substituted, 1);
    assert_eq!(
        params.admin_key,
        Some(KeyRef::Literal(signer.public_key_value().to_string()))
    );
}

#[tokio::test]
async fn current_signer_end_to_end() {
    let h = harness(SessionConfig::default());
    let outcome = h
        .dispatcher
        .dispatch(
            &CreateTopicTool,
            json!({ "adminKey": "current_signer", "submitKey": "current_signer" }),
            MetaOptions::default(),
        )
        .await;
    assert!(outcome.is_success());

    let expected = Some(Key::Ed25519(h.signer.public_key_value()));
    match h.signer.submitted()[0].body() {
        OperationBody::TopicCreate {
            admin_key,
            submit_key,
            ..
        } => {
            assert_eq!(*admin_key, expected);
            assert_eq!(*submit_key, expected);
        }
        other => panic!("unexpected body: {other:?}"),
    }
}

#[tokio::test]
async fn current_signer_without_signer_fails_staging() {
    let client = Arc::new(MockNetworkClient::new());
    let dispatcher = Dispatcher::new(
        Services::new(None, client.clone()),
        Arc::new(Session::new(bytes_mode(false, None))),
        Arc::new(DispatchMetrics::new().expect("metrics")),
    );
    let outcome = dispatcher
        .dispatch(
            &CreateTopicTool,
            json!({ "adminKey": "current_signer" }),
            MetaOptions::default(),
        )
        .await;

    assert!(!outcome.is_success());
    assert!(outcome.error().unwrap_or_default().contains("adminKey"));
    assert_eq!(client.finalize_calls(), 0);
    assert_eq!(dispatcher.metrics().failure_count("resolution"), 1);
}

#[tokio::test]
async fn in_flight_dispatch_keeps_its_snapshot() {
    let h = harness(SessionConfig::default());
    let before = h.dispatcher.session().snapshot();
    h.dispatcher.session().change_mode(OperationalMode::ProvideBytes);

    assert_eq!(before.mode, OperationalMode::DirectExecution);
    let outcome = h
        .dispatcher
        .dispatch(&TransferHbarTool, transfer_params(), MetaOptions::default())
        .await;
    assert!(matches!(outcome, DispatchOutcome::Bytes(_)));
}

#[tokio::test]
async fn dispatch_by_name() {
    let h = harness(SessionConfig::default());
    let outcome = h
        .dispatcher
        .dispatch_named(
            "submit_topic_message",
            json!({ "topicId": "0.0.800", "message": "gm" }),
            MetaOptions::default(),
        )
        .await;
    assert!(outcome.is_success());
    assert_eq!(
        h.signer.submitted()[0].kind(),
        OperationKind::TopicMessageSubmit
    );
}
