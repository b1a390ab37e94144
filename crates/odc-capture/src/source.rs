//! Broker seams

use crate::error::CaptureError;

/// Something that can open a consumer on a topic
#[async_trait::async_trait]
pub trait MessageSource: Send + Sync {
    /// Join `group_id` on `topic`, starting from the latest offset
    async fn subscribe(
        &self,
        topic: &str,
        group_id: &str,
    ) -> Result<Box<dyn MessageStream>, CaptureError>;

    /// Address shown in logs
    fn describe(&self) -> String;
}

/// An open consumer
#[async_trait::async_trait]
pub trait MessageStream: Send {
    /// Wait for the next record's value (empty when the record has none)
    async fn recv(&mut self) -> Result<Vec<u8>, CaptureError>;

    /// Leave the group and release the consumer
    async fn disconnect(&mut self);
}
