use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BROKERS: &str = "localhost:9092";
pub const DEFAULT_GROUP_ID: &str = "harness-consumer";

/// Connection settings shared by producer and consumer handles.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct BrokerConfig {
    pub brokers: String,
    #[serde(default)]
    pub security: SecurityConfig,
    /// Upper bound librdkafka puts on a single delivery before reporting it failed.
    #[serde(default, with = "millis")]
    pub delivery_timeout: Option<Duration>,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            brokers: DEFAULT_BROKERS.to_string(),
            security: SecurityConfig::Plaintext,
            delivery_timeout: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(tag = "type", content = "config")]
pub enum SecurityConfig {
    #[default]
    Plaintext,
    Ssl {
        ca_location: Option<String>,
        certificate_location: Option<String>,
        key_location: Option<String>,
        key_password: Option<String>,
    },
    SaslSsl {
        mechanism: SaslMechanism,
        username: String,
        // Password comes from the environment or the keyring
        ca_location: Option<String>,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum SaslMechanism {
    Plain,
    ScramSha256,
    ScramSha512,
    Gssapi,
    OAuthBearer,
}

impl SaslMechanism {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaslMechanism::Plain => "PLAIN",
            SaslMechanism::ScramSha256 => "SCRAM-SHA-256",
            SaslMechanism::ScramSha512 => "SCRAM-SHA-512",
            SaslMechanism::Gssapi => "GSSAPI",
            SaslMechanism::OAuthBearer => "OAUTHBEARER",
        }
    }
}

/// Where a fresh consumer group starts reading.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OffsetReset {
    #[default]
    Earliest,
    Latest,
}

impl OffsetReset {
    pub fn as_str(&self) -> &'static str {
        match self {
            OffsetReset::Earliest => "earliest",
            OffsetReset::Latest => "latest",
        }
    }
}

impl std::str::FromStr for OffsetReset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "earliest" | "smallest" | "beginning" => Ok(OffsetReset::Earliest),
            "latest" | "largest" | "end" => Ok(OffsetReset::Latest),
            other => Err(format!("unknown offset reset policy: {other}")),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ConsumerSettings {
    pub group_id: String,
    #[serde(default)]
    pub offset_reset: OffsetReset,
    /// Append a random suffix to `group_id` so every run reads from scratch.
    #[serde(default)]
    pub fresh_group: bool,
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self {
            group_id: DEFAULT_GROUP_ID.to_string(),
            offset_reset: OffsetReset::Earliest,
            fresh_group: false,
        }
    }
}

impl ConsumerSettings {
    pub fn effective_group_id(&self) -> String {
        if self.fresh_group {
            format!("{}-{}", self.group_id, uuid::Uuid::new_v4())
        } else {
            self.group_id.clone()
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_reset_parses_librdkafka_aliases() {
        assert_eq!("earliest".parse::<OffsetReset>(), Ok(OffsetReset::Earliest));
        assert_eq!("Smallest".parse::<OffsetReset>(), Ok(OffsetReset::Earliest));
        assert_eq!("latest".parse::<OffsetReset>(), Ok(OffsetReset::Latest));
        assert!("sideways".parse::<OffsetReset>().is_err());
    }

    #[test]
    fn fresh_group_gets_unique_suffix() {
        let settings = ConsumerSettings {
            fresh_group: true,
            ..Default::default()
        };
        let a = settings.effective_group_id();
        let b = settings.effective_group_id();
        assert!(a.starts_with("harness-consumer-"));
        assert_ne!(a, b);

        let fixed = ConsumerSettings::default();
        assert_eq!(fixed.effective_group_id(), "harness-consumer");
    }

    #[test]
    fn broker_config_reads_from_toml() {
        let cfg: BrokerConfig = toml::from_str(
            r#"
            brokers = "kafka-1:9092,kafka-2:9092"
            delivery_timeout = 2500

            [security]
            type = "SaslSsl"
            config = { mechanism = "ScramSha256", username = "bench" }
            "#,
        )
        .unwrap();
        assert_eq!(cfg.brokers, "kafka-1:9092,kafka-2:9092");
        assert_eq!(cfg.delivery_timeout, Some(Duration::from_millis(2500)));
        match cfg.security {
            SecurityConfig::SaslSsl {
                mechanism,
                username,
                ca_location,
            } => {
                assert_eq!(mechanism, SaslMechanism::ScramSha256);
                assert_eq!(username, "bench");
                assert!(ca_location.is_none());
            }
            other => panic!("unexpected security config: {other:?}"),
        }
    }
}
