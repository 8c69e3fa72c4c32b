//! Polling helpers for integration tests

use media_cache_broker::{MediaBroker, Task, TaskStatus};
use std::time::Duration;

/// Poll until the task for `id` reaches `status`, panicking after `timeout`
pub async fn wait_for_status(
    broker: &MediaBroker,
    id: &str,
    status: TaskStatus,
    timeout: Duration,
) -> Task {
    let waited = tokio::time::timeout(timeout, async {
        loop {
            if let Ok(task) = broker.status(id).await
                && task.status == status
            {
                return task;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;

    match waited {
        Ok(task) => task,
        Err(_) => panic!(
            "task {id} did not reach {status} within {timeout:?} (now {:?})",
            broker.status(id).await.map(|t| t.status)
        ),
    }
}

/// Poll until no worker is registered
pub async fn wait_for_idle(broker: &MediaBroker, timeout: Duration) {
    tokio::time::timeout(timeout, async {
        while broker.registry().worker_count().await > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("workers did not exit in time");
}
