use crate::domain::cluster::cluster::{BrokerConfig, ConsumerSettings, SecurityConfig};
use crate::domain::outcome::{DeliveryOutcome, PollOutcome};
use crate::domain::ports::{DeliveryFuture, RecordSink, RecordSource};
use crate::domain::topic::Topic;
use anyhow::Result;
use futures::FutureExt;
use rdkafka::admin::AdminClient;
use rdkafka::client::DefaultClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::message::Message;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use std::time::Duration;

const METADATA_TIMEOUT: Duration = Duration::from_secs(5);

/// Builds broker handles from one connection configuration. Every call hands
/// out a fresh, exclusively owned client.
pub struct KafkaInfrastructure {
    config: BrokerConfig,
    password: Option<String>,
    probe_timeout: Duration,
}

impl KafkaInfrastructure {
    pub fn new(config: BrokerConfig, password: Option<String>) -> Self {
        Self {
            config,
            password,
            probe_timeout: METADATA_TIMEOUT,
        }
    }

    pub fn brokers(&self) -> &str {
        &self.config.brokers
    }

    fn create_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", &self.config.brokers);

        match &self.config.security {
            SecurityConfig::Plaintext => {
                config.set("security.protocol", "plaintext");
            }
            SecurityConfig::Ssl {
                ca_location,
                certificate_location,
                key_location,
                key_password,
            } => {
                config.set("security.protocol", "ssl");
                if let Some(ca) = ca_location {
                    config.set("ssl.ca.location", ca);
                }
                if let Some(cert) = certificate_location {
                    config.set("ssl.certificate.location", cert);
                }
                if let Some(key) = key_location {
                    config.set("ssl.key.location", key);
                }
                if let Some(kp) = key_password {
                    config.set("ssl.key.password", kp);
                }
            }
            SecurityConfig::SaslSsl {
                mechanism,
                username,
                ca_location,
            } => {
                config.set("security.protocol", "sasl_ssl");
                config.set("sasl.mechanism", mechanism.as_str());
                config.set("sasl.username", username);
                if let Some(p) = &self.password {
                    config.set("sasl.password", p);
                }
                if let Some(ca) = ca_location {
                    config.set("ssl.ca.location", ca);
                }
            }
        }
        config
    }

    pub fn producer(&self) -> Result<KafkaSink> {
        let mut config = self.create_config();
        if let Some(timeout) = self.config.delivery_timeout {
            config.set("message.timeout.ms", timeout.as_millis().to_string());
        }
        let producer: FutureProducer = config
            .create()
            .map_err(|e| anyhow::anyhow!("Failed to create producer for {}: {}", self.config.brokers, e))?;
        Ok(KafkaSink {
            producer,
            brokers: self.config.brokers.clone(),
            probe_timeout: self.probe_timeout,
        })
    }

    pub fn consumer(&self, settings: &ConsumerSettings) -> Result<KafkaSource> {
        let mut config = self.create_config();
        config.set("group.id", settings.effective_group_id());
        config.set("auto.offset.reset", settings.offset_reset.as_str());

        let consumer: BaseConsumer = config
            .create()
            .map_err(|e| anyhow::anyhow!("Failed to create consumer for {}: {}", self.config.brokers, e))?;
        Ok(KafkaSource {
            consumer,
            brokers: self.config.brokers.clone(),
            probe_timeout: self.probe_timeout,
        })
    }

    pub fn list_topics(&self) -> Result<Vec<Topic>> {
        let client: AdminClient<DefaultClientContext> = self.create_config().create()?;

        tracing::debug!(brokers = %self.config.brokers, "fetching metadata");
        let metadata = client
            .inner()
            .fetch_metadata(None, self.probe_timeout)
            .map_err(|e| {
                anyhow::anyhow!("Failed to fetch metadata from {}: {}", self.config.brokers, e)
            })?;

        let mut topics: Vec<Topic> = metadata
            .topics()
            .iter()
            .map(|t| Topic {
                name: t.name().to_string(),
                partitions: t.partitions().len() as i32,
            })
            .collect();
        topics.sort_by(|a, b| a.name.cmp(&b.name));

        tracing::debug!(count = topics.len(), "fetched topics");
        Ok(topics)
    }
}

pub struct KafkaSink {
    producer: FutureProducer,
    brokers: String,
    probe_timeout: Duration,
}

impl RecordSink for KafkaSink {
    fn ensure_connected(&self) -> Result<()> {
        self.producer
            .client()
            .fetch_metadata(None, self.probe_timeout)
            .map_err(|e| anyhow::anyhow!("Connection check failed for {}: {}", self.brokers, e))?;
        Ok(())
    }

    fn submit(&self, topic: &str, payload: Vec<u8>) -> DeliveryFuture {
        let queued = self
            .producer
            .send_result(FutureRecord::<(), Vec<u8>>::to(topic).payload(&payload))
            .map_err(|(e, _)| e);

        match queued {
            Ok(delivery) => {
                let topic = topic.to_string();
                async move {
                    match delivery.await {
                        Ok(Ok(_)) => DeliveryOutcome::Acknowledged { topic, payload },
                        Ok(Err((e, _))) => DeliveryOutcome::Failed {
                            reason: e.to_string(),
                        },
                        Err(_) => DeliveryOutcome::Failed {
                            reason: "delivery canceled: producer dropped".to_string(),
                        },
                    }
                }
                .boxed()
            }
            // Local queue is full: wait for room instead of dropping the record.
            Err(KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull)) => {
                let producer = self.producer.clone();
                let topic = topic.to_string();
                async move {
                    let sent = producer
                        .send(
                            FutureRecord::<(), Vec<u8>>::to(&topic).payload(&payload),
                            Timeout::Never,
                        )
                        .await
                        .map(|_| ())
                        .map_err(|(e, _)| e.to_string());
                    match sent {
                        Ok(()) => DeliveryOutcome::Acknowledged { topic, payload },
                        Err(reason) => DeliveryOutcome::Failed { reason },
                    }
                }
                .boxed()
            }
            Err(e) => futures::future::ready(DeliveryOutcome::Failed {
                reason: e.to_string(),
            })
            .boxed(),
        }
    }
}

pub struct KafkaSource {
    consumer: BaseConsumer,
    brokers: String,
    probe_timeout: Duration,
}

impl RecordSource for KafkaSource {
    fn ensure_connected(&mut self) -> Result<()> {
        self.consumer
            .fetch_metadata(None, self.probe_timeout)
            .map_err(|e| anyhow::anyhow!("Connection check failed for {}: {}", self.brokers, e))?;
        Ok(())
    }

    fn subscribe(&mut self, topics: &[String]) -> Result<()> {
        let names: Vec<&str> = topics.iter().map(String::as_str).collect();
        self.consumer
            .subscribe(&names)
            .map_err(|e| anyhow::anyhow!("Failed to subscribe to {:?}: {}", names, e))
    }

    fn poll(&mut self, timeout: Duration) -> PollOutcome {
        match self.consumer.poll(timeout) {
            None => PollOutcome::Empty,
            Some(Err(e)) => PollOutcome::BrokerError(e.to_string()),
            Some(Ok(msg)) => PollOutcome::Delivered(msg.payload().map(<[u8]>::to_vec).unwrap_or_default()),
        }
    }

    fn close(&mut self) {
        self.consumer.unsubscribe();
    }
}
