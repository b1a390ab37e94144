//! Checkout flow runs against a fake cluster, storefront and broker

use std::sync::Arc;
use std::time::Duration;

use odc_capture::{InMemorySource, MessageCapture};
use odc_cluster::{DeploymentRef, PollPolicy, ReplicaController};
use odc_schema::{PactFile, PactWriteMode, ValidationFailure};
use odc_test_utils::{order_result, order_result_json, FakeOrchestrator, FakeStorefront};
use odc_verify::contracts::accounting_checkout_pact;
use odc_verify::{CaptureOrder, CheckoutFlow, FlowError, FlowReport, FlowState, HttpStorefront};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const TOPIC: &str = "orders";

struct Harness {
    orchestrator: FakeOrchestrator,
    source: InMemorySource,
    storefront: Arc<FakeStorefront>,
    flow: CheckoutFlow,
}

fn harness(orchestrator: FakeOrchestrator, storefront: impl FnOnce(FakeStorefront) -> FakeStorefront) -> Harness {
    let source = InMemorySource::new();
    let storefront = Arc::new(storefront(FakeStorefront::new(source.clone(), TOPIC)));
    let replicas = ReplicaController::new(Arc::new(orchestrator.clone()))
        .with_poll_policy(PollPolicy::bounded(Duration::from_millis(5), 20));
    let capture = MessageCapture::new(Arc::new(source.clone()), TOPIC).with_timeout(Duration::from_millis(300));
    let flow = CheckoutFlow::new(DeploymentRef::new("accounting"), replicas, storefront.clone(), capture).unwrap();

    Harness {
        orchestrator,
        source,
        storefront,
        flow,
    }
}

fn failed_path(report: &FlowReport) -> &[FlowState] {
    let n = report.visited.len();
    &report.visited[n - 3..]
}

#[tokio::test]
async fn happy_path_validates_and_restores() {
    let h = harness(FakeOrchestrator::with_replicas(2), |s| s);

    let report = h.flow.run().await;

    assert!(report.passed(), "{}", report.summary());
    assert_eq!(report.exit_code(), 0);
    assert_eq!(
        report.visited,
        vec![
            FlowState::ScalingDown,
            FlowState::WaitingHealthy,
            FlowState::Triggering,
            FlowState::Capturing,
            FlowState::Validating,
            FlowState::ScalingUp,
            FlowState::Done,
        ]
    );
    assert_eq!(report.order, Some(order_result()));
    assert_eq!(h.orchestrator.scale_calls(), vec![0, 2]);
    assert_eq!(h.orchestrator.replicas(), 2);
    assert!(report.replicas.is_restored());
    assert_eq!(h.source.subscriptions(), 1);
    assert_eq!(h.source.releases(), 1);
}

#[tokio::test]
async fn trigger_failure_still_restores_replicas() {
    let h = harness(FakeOrchestrator::with_replicas(3), |s| s.rejecting(500));

    let report = h.flow.run().await;

    assert_eq!(report.exit_code(), 1);
    assert!(matches!(report.failure, Some(FlowError::Trigger(ref e)) if e.status() == Some(500)));
    assert!(report.cleanup_error.is_none());
    assert_eq!(failed_path(&report), [FlowState::Failed, FlowState::ScalingUp, FlowState::Done]);
    assert_eq!(h.orchestrator.scale_calls(), vec![0, 3]);
    assert_eq!(report.replicas.current_count(), 3);
    assert_eq!(h.source.releases(), 1, "subscription opened before the trigger is released");
}

#[tokio::test]
async fn silent_topic_times_out() {
    let h = harness(FakeOrchestrator::with_replicas(1), FakeStorefront::silent);

    let report = h.flow.run().await;

    assert_eq!(report.exit_code(), 1);
    let failure = report.failure.as_ref().unwrap();
    assert!(failure.is_timeout(), "{failure}");
    assert!(report.visited.contains(&FlowState::Capturing));
    assert_eq!(h.orchestrator.replicas(), 1);
    assert_eq!(h.source.releases(), 1);
}

#[tokio::test]
async fn malformed_record_is_a_decode_failure() {
    let h = harness(FakeOrchestrator::with_replicas(1), |s| s.publishing(b"{not json".to_vec()));

    let report = h.flow.run().await;

    assert!(matches!(report.failure, Some(FlowError::Capture(ref e)) if e.is_decode()));
    assert!(!report.failure.as_ref().unwrap().is_timeout());
    assert_eq!(h.source.releases(), 1);
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn schema_failure_reports_every_field() {
    let mut order = order_result_json();
    order.as_object_mut().unwrap().remove("order_id");
    order["shipping_cost"]["currency_code"] = "usd".into();
    let h = harness(FakeOrchestrator::with_replicas(1), |s| s.publishing(order.to_string()));

    let report = h.flow.run().await;

    assert!(report.visited.contains(&FlowState::Validating));
    match &report.failure {
        Some(FlowError::Validation(ValidationFailure::Schema { report, .. })) => {
            assert!(report.len() >= 2, "{report}");
        }
        other => panic!("expected a schema failure, got {other:?}"),
    }
    assert_eq!(h.orchestrator.replicas(), 1);
}

#[tokio::test]
async fn cleanup_failure_is_reported_with_the_original_failure() {
    let h = harness(FakeOrchestrator::with_replicas(2).failing_scale_up(), |s| s.rejecting(503));

    let report = h.flow.run().await;

    assert!(matches!(report.failure, Some(FlowError::Trigger(_))));
    assert!(report.cleanup_error.is_some());
    assert_eq!(report.exit_code(), 1);
    assert!(report.summary().contains("cleanup failure"));
    assert_eq!(report.visited.last(), Some(&FlowState::Done));
}

#[tokio::test]
async fn cleanup_failure_alone_fails_the_run() {
    let h = harness(FakeOrchestrator::with_replicas(2).failing_scale_up(), |s| s);

    let report = h.flow.run().await;

    assert!(report.failure.is_none());
    assert!(report.order.is_some());
    assert!(report.cleanup_error.is_some());
    assert_eq!(report.exit_code(), 1);
}

#[tokio::test]
async fn failed_scale_down_still_runs_cleanup() {
    let h = harness(FakeOrchestrator::with_replicas(2).failing_scale_down(), |s| s);

    let report = h.flow.run().await;

    assert!(matches!(report.failure, Some(FlowError::ScaleDown(_))));
    assert_eq!(
        report.visited,
        vec![FlowState::ScalingDown, FlowState::Failed, FlowState::ScalingUp, FlowState::Done]
    );
    assert_eq!(h.orchestrator.scale_calls(), vec![0, 2]);
    assert_eq!(h.storefront.orders(), 0);
    assert_eq!(h.source.subscriptions(), 0);
}

#[tokio::test]
async fn unreadable_replicas_restore_to_one() {
    let h = harness(FakeOrchestrator::with_replicas(4).unreadable(), |s| s);

    let report = h.flow.run().await;

    assert!(report.passed());
    assert_eq!(report.replicas.original_count(), 1);
    assert_eq!(h.orchestrator.scale_calls(), vec![0, 1]);
}

#[tokio::test]
async fn unhealthy_frontend_skips_the_order() {
    let h = harness(FakeOrchestrator::with_replicas(1), FakeStorefront::unhealthy);

    let report = h.flow.run().await;

    assert!(matches!(report.failure, Some(FlowError::Frontend(_))));
    assert!(report.failure.as_ref().unwrap().is_timeout());
    assert_eq!(h.storefront.orders(), 0);
    assert_eq!(h.orchestrator.replicas(), 1);
}

#[tokio::test]
async fn frontend_that_never_answers_still_restores_replicas() {
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let orchestrator = FakeOrchestrator::with_replicas(2);
    let storefront = HttpStorefront::new(
        reqwest::Client::new(),
        format!("http://{addr}/health"),
        format!("http://{addr}/api/checkout"),
    )
    .with_health_wait(Duration::from_millis(300), Duration::from_millis(50));
    let replicas = ReplicaController::new(Arc::new(orchestrator.clone()))
        .with_poll_policy(PollPolicy::bounded(Duration::from_millis(5), 20));
    let capture = MessageCapture::new(Arc::new(InMemorySource::new()), TOPIC);
    let flow = CheckoutFlow::new(DeploymentRef::new("accounting"), replicas, Arc::new(storefront), capture).unwrap();

    let report = tokio::time::timeout(Duration::from_secs(10), flow.run())
        .await
        .expect("run did not finish while the frontend stayed silent");

    assert!(matches!(report.failure, Some(FlowError::Frontend(ref e)) if e.is_timeout()));
    assert_eq!(failed_path(&report), [FlowState::Failed, FlowState::ScalingUp, FlowState::Done]);
    assert_eq!(orchestrator.scale_calls(), vec![0, 2]);
    assert_eq!(orchestrator.replicas(), 2);
}

#[tokio::test]
async fn trigger_first_misses_an_immediate_message() {
    let h = harness(FakeOrchestrator::with_replicas(1), |s| s);
    let flow = h.flow.with_capture_order(CaptureOrder::TriggerFirst);

    let report = flow.run().await;

    assert!(report.failure.as_ref().is_some_and(FlowError::is_timeout));
    assert_eq!(h.storefront.orders(), 1);
    assert_eq!(h.source.releases(), 1);
}

#[tokio::test]
async fn trigger_first_sees_a_late_message() {
    let h = harness(FakeOrchestrator::with_replicas(1), |s| {
        s.publishing_after(Duration::from_millis(50))
    });
    let flow = h.flow.with_capture_order(CaptureOrder::TriggerFirst);

    let report = flow.run().await;

    assert!(report.passed(), "{}", report.summary());
}

#[tokio::test]
async fn contract_metadata_and_file_are_used() {
    let dir = tempfile::tempdir().unwrap();
    let path = accounting_checkout_pact().write(dir.path(), PactWriteMode::Overwrite).unwrap();

    let h = harness(FakeOrchestrator::with_replicas(1), |s| s);
    let flow = h.flow.with_contract_file(&path).unwrap();

    let report = flow.run().await;
    assert!(report.passed(), "{}", report.summary());
}

#[tokio::test]
async fn contract_file_without_the_order_message_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = PactFile::new("accounting", "checkout")
        .write(dir.path(), PactWriteMode::Overwrite)
        .unwrap();

    let h = harness(FakeOrchestrator::with_replicas(1), |s| s);
    let err = h.flow.with_contract_file(&path).unwrap_err();
    assert!(matches!(err, FlowError::Contract(_)));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_trigger_failure_restores_original_count(original in 0u32..6, status in 400u16..600) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let report = runtime.block_on(async {
            let h = harness(FakeOrchestrator::with_replicas(original), |s| s.rejecting(status));
            let report = h.flow.run().await;
            prop_assert_eq!(h.orchestrator.scale_calls(), vec![0, original]);
            prop_assert_eq!(h.orchestrator.replicas(), original);
            Ok(report)
        })?;

        prop_assert_eq!(report.exit_code(), 1);
        prop_assert!(report.visited.contains(&FlowState::Failed));
        prop_assert_eq!(report.visited.last(), Some(&FlowState::Done));
    }
}
