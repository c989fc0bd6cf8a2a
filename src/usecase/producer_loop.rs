use crate::domain::outcome::{DeliveryOutcome, ProduceReport};
use crate::domain::ports::{DeliveryFuture, RecordSink};
use crate::domain::record::{display_payload, RecordGenerator};
use crate::{Error, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};

/// Default cap on unacknowledged records in pipelined mode, well under
/// librdkafka's `queue.buffering.max.messages`.
pub const DEFAULT_PIPELINE_WINDOW: usize = 10_000;

/// How submissions relate to acknowledgments within one run.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProduceMode {
    /// Each record is acknowledged before the next one is submitted.
    #[default]
    Sequential,
    /// Up to a window of records is in flight at once; everything is drained
    /// before the report is returned.
    Pipelined,
}

pub struct ProducerLoop<S: RecordSink> {
    sink: S,
    generator: RecordGenerator,
    mode: ProduceMode,
    window: usize,
}

impl<S: RecordSink> ProducerLoop<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            generator: RecordGenerator::new(),
            mode: ProduceMode::Sequential,
            window: DEFAULT_PIPELINE_WINDOW,
        }
    }

    pub fn with_generator(mut self, generator: RecordGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_mode(mut self, mode: ProduceMode) -> Self {
        self.mode = mode;
        self
    }

    /// Caps in-flight submissions in pipelined mode. Zero is treated as one.
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window.max(1);
        self
    }

    /// Publishes `count` synthetic records to `topic`.
    ///
    /// Every submission resolves to exactly one outcome, so on return
    /// `acknowledged + errors.len() == count`. Rejected records are reported,
    /// not retried. An unreachable broker fails the run before anything is sent.
    pub async fn run(&mut self, topic: &str, count: usize) -> Result<ProduceReport> {
        if topic.is_empty() {
            return Err(Error::InvalidInput("topic name must not be empty".into()));
        }

        let mut report = ProduceReport::default();
        if count == 0 {
            return Ok(report);
        }

        self.sink
            .ensure_connected()
            .map_err(|e| Error::Connection(format!("{e:#}")))?;

        match self.mode {
            ProduceMode::Sequential => {
                for _ in 0..count {
                    let outcome = self.submit_next(topic).await;
                    observe(&outcome);
                    report.record(&outcome);
                }
            }
            ProduceMode::Pipelined => {
                let mut in_flight: FuturesUnordered<DeliveryFuture> = FuturesUnordered::new();
                for _ in 0..count {
                    if in_flight.len() >= self.window {
                        if let Some(outcome) = in_flight.next().await {
                            observe(&outcome);
                            report.record(&outcome);
                        }
                    }
                    in_flight.push(self.submit_next(topic));
                }
                while let Some(outcome) = in_flight.next().await {
                    observe(&outcome);
                    report.record(&outcome);
                }
            }
        }

        tracing::info!(
            topic,
            acknowledged = report.acknowledged,
            failed = report.errors.len(),
            "producer run drained"
        );
        Ok(report)
    }

    fn submit_next(&mut self, topic: &str) -> DeliveryFuture {
        let record = self.generator.next_record();
        match record.encode() {
            Ok(payload) => self.sink.submit(topic, payload),
            Err(e) => {
                let outcome = DeliveryOutcome::Failed {
                    reason: format!("failed to encode record {}: {}", record.user_id, e),
                };
                Box::pin(futures::future::ready(outcome))
            }
        }
    }
}

fn observe(outcome: &DeliveryOutcome) {
    match outcome {
        DeliveryOutcome::Acknowledged { topic, payload } => {
            tracing::info!(
                topic = %topic,
                payload = %display_payload(payload),
                "Produced message"
            );
        }
        DeliveryOutcome::Failed { reason } => {
            tracing::warn!(reason = %reason, "Delivery failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Acknowledges everything except every `fail_every`-th submission.
    #[derive(Clone, Default)]
    struct CountingSink {
        submitted: Arc<AtomicUsize>,
        probes: Arc<AtomicUsize>,
        fail_every: Option<usize>,
        unreachable: bool,
    }

    impl RecordSink for CountingSink {
        fn ensure_connected(&self) -> anyhow::Result<()> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            if self.unreachable {
                return Err(anyhow!("Failed to fetch metadata from localhost:1"));
            }
            Ok(())
        }

        fn submit(&self, topic: &str, payload: Vec<u8>) -> DeliveryFuture {
            let n = self.submitted.fetch_add(1, Ordering::SeqCst) + 1;
            let outcome = match self.fail_every {
                Some(k) if n % k == 0 => DeliveryOutcome::Failed {
                    reason: format!("Broker: Message size too large ({n})"),
                },
                _ => DeliveryOutcome::Acknowledged {
                    topic: topic.to_string(),
                    payload,
                },
            };
            Box::pin(async move {
                tokio::task::yield_now().await;
                outcome
            })
        }
    }

    #[tokio::test]
    async fn zero_count_touches_nothing() {
        let sink = CountingSink::default();
        let mut producer = ProducerLoop::new(sink.clone());
        let report = producer.run("topicX", 0).await.unwrap();
        assert_eq!(report, ProduceReport::default());
        assert_eq!(sink.probes.load(Ordering::SeqCst), 0);
        assert_eq!(sink.submitted.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failures_are_reported_and_run_continues() {
        let sink = CountingSink {
            fail_every: Some(3),
            ..Default::default()
        };
        let mut producer = ProducerLoop::new(sink.clone()).with_generator(RecordGenerator::seeded(1));
        let report = producer.run("topic1", 10).await.unwrap();
        assert_eq!(sink.submitted.load(Ordering::SeqCst), 10);
        assert_eq!(report.acknowledged, 7);
        assert_eq!(report.errors.len(), 3);
        assert!(report.errors[0].contains("Message size too large"));
    }

    #[tokio::test]
    async fn pipelined_mode_drains_everything() {
        let sink = CountingSink {
            fail_every: Some(4),
            ..Default::default()
        };
        let mut producer = ProducerLoop::new(sink.clone()).with_mode(ProduceMode::Pipelined);
        let report = producer.run("topic2", 9).await.unwrap();
        assert_eq!(sink.submitted.load(Ordering::SeqCst), 9);
        assert_eq!(report.resolved(), 9);
        assert_eq!(report.errors.len(), 2);
    }

    #[tokio::test]
    async fn unreachable_broker_fails_before_submitting() {
        let sink = CountingSink {
            unreachable: true,
            ..Default::default()
        };
        let mut producer = ProducerLoop::new(sink.clone());
        let err = producer.run("topic1", 5).await.unwrap_err();
        assert!(matches!(err, Error::Connection(ref m) if m.contains("localhost:1")));
        assert_eq!(sink.submitted.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_topic_is_rejected() {
        let mut producer = ProducerLoop::new(CountingSink::default());
        assert!(matches!(
            producer.run("", 1).await,
            Err(Error::InvalidInput(_))
        ));
    }

    /// Tracks unacknowledged submissions. With a capacity it behaves like a
    /// full local queue and rejects anything past it.
    #[derive(Clone, Default)]
    struct WindowSink {
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        capacity: Option<usize>,
    }

    impl RecordSink for WindowSink {
        fn ensure_connected(&self) -> anyhow::Result<()> {
            Ok(())
        }

        fn submit(&self, topic: &str, payload: Vec<u8>) -> DeliveryFuture {
            if let Some(cap) = self.capacity {
                if self.in_flight.load(Ordering::SeqCst) >= cap {
                    return Box::pin(futures::future::ready(DeliveryOutcome::Failed {
                        reason: "Message production error: QueueFull (Local: Queue full)".into(),
                    }));
                }
            }
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let in_flight = self.in_flight.clone();
            let topic = topic.to_string();
            Box::pin(async move {
                tokio::task::yield_now().await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                DeliveryOutcome::Acknowledged { topic, payload }
            })
        }
    }

    #[tokio::test]
    async fn sequential_mode_waits_for_each_acknowledgment() {
        let sink = WindowSink::default();
        let mut producer = ProducerLoop::new(sink.clone());
        let report = producer.run("topic1", 12).await.unwrap();
        assert_eq!(report.acknowledged, 12);
        assert_eq!(sink.peak.load(Ordering::SeqCst), 1);
        assert_eq!(sink.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn pipelined_mode_stays_within_window() {
        let sink = WindowSink::default();
        let mut producer = ProducerLoop::new(sink.clone())
            .with_mode(ProduceMode::Pipelined)
            .with_window(3);
        let report = producer.run("topic1", 10).await.unwrap();
        assert_eq!(report.acknowledged, 10);
        assert_eq!(sink.peak.load(Ordering::SeqCst), 3);
        assert_eq!(sink.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn pipelined_run_larger_than_queue_has_no_spurious_failures() {
        let sink = WindowSink {
            capacity: Some(4),
            ..Default::default()
        };
        let mut producer = ProducerLoop::new(sink.clone())
            .with_mode(ProduceMode::Pipelined)
            .with_window(4);
        let report = producer.run("topic1", 50).await.unwrap();
        assert!(report.errors.is_empty(), "{:?}", report.errors);
        assert_eq!(report.acknowledged, 50);
    }
}
