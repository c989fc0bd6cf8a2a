pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod usecase;

use thiserror::Error;

pub use crate::domain::cluster::cluster::{BrokerConfig, ConsumerSettings, OffsetReset, SecurityConfig};
pub use crate::domain::outcome::{DeliveryOutcome, PollOutcome, ProduceReport};
pub use crate::domain::ports::{DeliveryFuture, RecordSink, RecordSource};
pub use crate::domain::record::{Platform, Record, RecordGenerator};
pub use crate::usecase::consumer_loop::{ConsumerLoop, ConsumerState};
pub use crate::usecase::producer_loop::{ProduceMode, ProducerLoop};

#[derive(Error, Debug)]
pub enum Error {
    /// The broker could not be reached when a loop started. Nothing was produced or consumed.
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Config error: {0}")]
    Config(String),
    /// A caller-imposed deadline expired before the consumer reached its target.
    #[error("Run timed out after {} of {target} records", .partial.len())]
    RunTimedOut { partial: Vec<Vec<u8>>, target: usize },
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
