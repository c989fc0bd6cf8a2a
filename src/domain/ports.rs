use crate::domain::outcome::{DeliveryOutcome, PollOutcome};
use anyhow::Result;
use futures::future::BoxFuture;
use std::time::Duration;

/// Resolves once the broker has accepted or rejected a submitted payload.
pub type DeliveryFuture = BoxFuture<'static, DeliveryOutcome>;

/// Producer-side broker handle. One per producer loop.
pub trait RecordSink: Send + Sync {
    /// Fails when the broker cannot be reached; called once before the first submission.
    fn ensure_connected(&self) -> Result<()>;

    /// Hands `payload` to the broker and returns without waiting for the acknowledgment.
    fn submit(&self, topic: &str, payload: Vec<u8>) -> DeliveryFuture;
}

/// Consumer-side broker handle. One per consumer loop.
pub trait RecordSource: Send {
    fn ensure_connected(&mut self) -> Result<()>;

    fn subscribe(&mut self, topics: &[String]) -> Result<()>;

    /// Blocks for at most `timeout` and classifies what came back.
    fn poll(&mut self, timeout: Duration) -> PollOutcome;

    fn close(&mut self);
}
