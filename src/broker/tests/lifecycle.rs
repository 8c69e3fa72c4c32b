use super::*;

#[tokio::test]
async fn shutdown_refuses_new_downloads_and_cancels_live_tasks() {
    let hold = CancellationToken::new();
    let fetcher = Arc::new(ScriptedFetcher {
        hold: Some(hold.clone()),
        ..Default::default()
    });
    let (broker, _dir) = create_test_broker(fetcher).await;

    broker.request_download("abc123").await.unwrap();
    let releaser = tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        hold.cancel();
    });

    broker.shutdown().await.unwrap();
    releaser.await.unwrap();

    assert!(!broker.is_accepting());
    assert!(matches!(
        broker.request_download("def456").await,
        Err(Error::ShuttingDown)
    ));
    assert_eq!(
        broker.status("abc123").await.unwrap().status,
        TaskStatus::Cancelled
    );
    assert_eq!(broker.registry().worker_count().await, 0);
}
