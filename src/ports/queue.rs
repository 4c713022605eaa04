use async_trait::async_trait;
use std::error::Error;

/// A received message. `receipt_handle` is what acknowledges it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub id: String,
    pub body: String,
    pub receipt_handle: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueuePort: Send + Sync {
    /// Long-poll for messages.
    /// wait_seconds: 0 returns immediately, up to 20 blocks until a message arrives.
    /// Received messages stay hidden from other consumers for `visibility_timeout_seconds`.
    async fn receive(
        &self,
        wait_seconds: u32,
        visibility_timeout_seconds: u32,
    ) -> Result<Vec<QueueMessage>, Box<dyn Error + Send + Sync>>;

    /// Acknowledge a message so it is never redelivered
    async fn delete(&self, receipt_handle: &str) -> Result<(), Box<dyn Error + Send + Sync>>;
}
