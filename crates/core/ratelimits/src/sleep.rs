use std::time::Duration;

/// Suspend the current task for the given duration
pub async fn sleep(duration: Duration) {
    tokio::time::sleep(duration).await
}
