//! Capture racing a concurrent producer

use std::sync::Arc;
use std::time::Duration;

use odc_capture::{CaptureError, InMemorySource, MessageCapture};

#[tokio::test]
async fn producer_after_subscribe_is_captured() {
    let source = InMemorySource::new();
    let capture = MessageCapture::new(Arc::new(source.clone()), "orders")
        .with_timeout(Duration::from_secs(2));

    let subscription = capture.subscribe().await.unwrap();
    let producer = source.clone();
    let handle = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        producer.publish("orders", br#"{"order_id":"ORDER-9"}"#.to_vec())
    });

    let message = subscription.first_message().await.unwrap();
    assert_eq!(handle.await.unwrap(), 1);
    assert_eq!(message.value["order_id"], "ORDER-9");
    assert_eq!(source.releases(), 1);
}

#[tokio::test]
async fn late_producer_loses_the_race() {
    let source = InMemorySource::new();
    let capture = MessageCapture::new(Arc::new(source.clone()), "orders")
        .with_timeout(Duration::from_millis(20));

    let subscription = capture.subscribe().await.unwrap();
    let err = subscription.first_message().await.unwrap_err();
    assert!(matches!(err, CaptureError::Timeout { waited, .. } if waited == Duration::from_millis(20)));

    // the released subscription no longer receives anything
    assert_eq!(source.publish("orders", b"{}".to_vec()), 0);
    assert_eq!(source.releases(), 1);
}

#[tokio::test]
async fn each_capture_uses_its_own_group() {
    let source = InMemorySource::new();
    let capture = MessageCapture::new(Arc::new(source.clone()), "orders")
        .with_timeout(Duration::from_millis(10));

    let first = capture.subscribe().await.unwrap();
    let second = capture.subscribe().await.unwrap();
    assert_ne!(first.group_id(), second.group_id());

    first.close().await;
    second.close().await;
    assert_eq!(source.subscriptions(), 2);
    assert_eq!(source.releases(), 2);
}
