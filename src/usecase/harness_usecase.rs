use crate::config::Effective;
use crate::domain::cluster::cluster::ConsumerSettings;
use crate::domain::outcome::ProduceReport;
use crate::domain::record::{display_payload, Record, RecordGenerator};
use crate::domain::topic::{PlanEntry, Topic};
use crate::infrastructure::kafka::KafkaInfrastructure;
use crate::infrastructure::persistence::keyring_secret_repository::KeyringSecretRepository;
use crate::usecase::consumer_loop::ConsumerLoop;
use crate::usecase::producer_loop::{ProduceMode, ProducerLoop};
use crate::{Error, Result};
use std::time::{Duration, Instant};

pub const KEYRING_SERVICE: &str = "broker-harness";

#[derive(Debug, Clone)]
pub struct TimedProduce {
    pub topic: String,
    pub report: ProduceReport,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct TimedConsume {
    pub topics: Vec<String>,
    pub payloads: Vec<Vec<u8>>,
    pub elapsed: Duration,
}

impl TimedConsume {
    /// Payloads that parse back into records. Anything else is logged and skipped.
    pub fn records(&self) -> Vec<Record> {
        self.payloads
            .iter()
            .filter_map(|p| match Record::decode(p) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(payload = %display_payload(p), error = %e, "undecodable payload");
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct TopicSummary {
    pub topic: String,
    pub produced: TimedProduce,
    pub consumed: TimedConsume,
}

/// Sequences producer and consumer runs against one broker. Each run gets
/// its own freshly built connection handle.
pub struct HarnessUsecase {
    kafka_infra: KafkaInfrastructure,
    consumer_settings: ConsumerSettings,
    poll_timeout: Duration,
    deadline: Option<Duration>,
    mode: ProduceMode,
    pipeline_window: usize,
    seed: Option<u64>,
}

impl HarnessUsecase {
    pub fn new(kafka_infra: KafkaInfrastructure, eff: &Effective) -> Self {
        Self {
            kafka_infra,
            consumer_settings: eff.consumer.clone(),
            poll_timeout: eff.poll_timeout,
            deadline: eff.deadline,
            mode: eff.mode,
            pipeline_window: eff.pipeline_window,
            seed: eff.seed,
        }
    }

    /// Builds the infrastructure from merged settings, looking up a SASL
    /// password in the keyring when none was supplied.
    pub fn from_effective(eff: &Effective) -> Self {
        let password = KeyringSecretRepository::new(KEYRING_SERVICE).resolve(
            &eff.broker.security,
            &eff.broker.brokers,
            eff.sasl_password.as_deref(),
        );
        let kafka_infra = KafkaInfrastructure::new(eff.broker.clone(), password);
        Self::new(kafka_infra, eff)
    }

    pub fn list_topics(&self) -> Result<Vec<Topic>> {
        self.kafka_infra
            .list_topics()
            .map_err(|e| Error::Connection(format!("{e:#}")))
    }

    pub async fn produce(&self, topic: &str, count: usize) -> Result<TimedProduce> {
        if topic.is_empty() {
            return Err(Error::InvalidInput("topic name must not be empty".into()));
        }
        // No client at all: librdkafka starts connecting as soon as one exists.
        if count == 0 {
            return Ok(TimedProduce {
                topic: topic.to_string(),
                report: ProduceReport::default(),
                elapsed: Duration::ZERO,
            });
        }

        let sink = self
            .kafka_infra
            .producer()
            .map_err(|e| Error::Config(format!("{e:#}")))?;
        let generator = match self.seed {
            Some(seed) => RecordGenerator::seeded(seed),
            None => RecordGenerator::new(),
        };
        let mut producer = ProducerLoop::new(sink)
            .with_generator(generator)
            .with_mode(self.mode)
            .with_window(self.pipeline_window);

        tracing::info!(topic, count, brokers = %self.kafka_infra.brokers(), "Kafka producer has been initiated");
        let started = Instant::now();
        let report = producer.run(topic, count).await?;
        let elapsed = started.elapsed();
        tracing::info!(
            topic,
            acknowledged = report.acknowledged,
            failed = report.errors.len(),
            elapsed_s = format_args!("{:.3}", elapsed.as_secs_f64()),
            "produce complete"
        );

        Ok(TimedProduce {
            topic: topic.to_string(),
            report,
            elapsed,
        })
    }

    pub async fn consume(&self, topics: &[String], target: usize) -> Result<TimedConsume> {
        if topics.is_empty() || topics.iter().any(|t| t.is_empty()) {
            return Err(Error::InvalidInput(
                "at least one non-empty topic is required".into(),
            ));
        }
        if target == 0 {
            return Ok(TimedConsume {
                topics: topics.to_vec(),
                payloads: Vec::new(),
                elapsed: Duration::ZERO,
            });
        }

        let source = self
            .kafka_infra
            .consumer(&self.consumer_settings)
            .map_err(|e| Error::Config(format!("{e:#}")))?;
        let mut consumer = ConsumerLoop::new(source).with_deadline(self.deadline);
        let poll_timeout = self.poll_timeout;
        let owned_topics = topics.to_vec();

        let started = Instant::now();
        // The poll loop blocks, keep it off the async workers.
        let payloads = tokio::task::spawn_blocking(move || {
            consumer.run(&owned_topics, target, poll_timeout)
        })
        .await
        .map_err(|e| Error::Internal(format!("consumer task failed: {e}")))??;
        let elapsed = started.elapsed();

        tracing::info!(
            ?topics,
            delivered = payloads.len(),
            elapsed_s = format_args!("{:.3}", elapsed.as_secs_f64()),
            "consume complete"
        );

        Ok(TimedConsume {
            topics: topics.to_vec(),
            payloads,
            elapsed,
        })
    }

    /// Produces every plan entry, waits `settle`, then reads each topic back
    /// with the same count it was given.
    pub async fn demo(&self, plan: &[PlanEntry], settle: Duration) -> Result<Vec<TopicSummary>> {
        let mut produced = Vec::with_capacity(plan.len());
        for entry in plan {
            produced.push(self.produce(&entry.topic, entry.count).await?);
        }

        if !settle.is_zero() {
            tracing::info!(settle_ms = settle.as_millis() as u64, "waiting before consuming");
            tokio::time::sleep(settle).await;
        }

        let mut summaries = Vec::with_capacity(plan.len());
        for (entry, produced) in plan.iter().zip(produced) {
            let consumed = self
                .consume(std::slice::from_ref(&entry.topic), entry.count)
                .await?;
            summaries.push(TopicSummary {
                topic: entry.topic.clone(),
                produced,
                consumed,
            });
        }
        Ok(summaries)
    }
}
