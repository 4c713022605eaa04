use crate::ports::queue::{QueueMessage, QueuePort};
use async_trait::async_trait;
use aws_sdk_sqs::Client;
use std::error::Error;
use tracing::warn;

/// SqsAdapter implements QueuePort for AWS SQS.
#[derive(Clone)]
pub struct SqsAdapter {
    client: Client,
    queue_url: String,
}

impl SqsAdapter {
    pub fn new(client: Client, queue_url: String) -> Self {
        Self { client, queue_url }
    }

    /// Look up the queue URL for `queue_name`.
    pub async fn from_queue_name(
        client: Client,
        queue_name: &str,
    ) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let resp = client.get_queue_url().queue_name(queue_name).send().await?;
        let queue_url = resp
            .queue_url()
            .ok_or_else(|| format!("No URL returned for queue {}", queue_name))?
            .to_string();
        Ok(Self::new(client, queue_url))
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

#[async_trait]
impl QueuePort for SqsAdapter {
    async fn receive(
        &self,
        wait_seconds: u32,
        visibility_timeout_seconds: u32,
    ) -> Result<Vec<QueueMessage>, Box<dyn Error + Send + Sync>> {
        let resp = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .wait_time_seconds(wait_seconds as i32)
            .visibility_timeout(visibility_timeout_seconds as i32)
            .send()
            .await?;

        let messages = resp
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|msg| {
                let id = msg.message_id.unwrap_or_default();
                match msg.receipt_handle {
                    Some(receipt_handle) => Some(QueueMessage {
                        id,
                        body: msg.body.unwrap_or_default(),
                        receipt_handle,
                    }),
                    None => {
                        warn!(message_id = %id, "Skipping message without receipt handle");
                        None
                    }
                }
            })
            .collect();
        Ok(messages)
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await?;
        Ok(())
    }
}
