use crate::domain::outcome::PollOutcome;
use crate::domain::ports::RecordSource;
use crate::domain::record::display_payload;
use crate::{Error, Result};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Polling,
    Done,
}

/// Applies one poll result. Only a delivery can move the loop to `Done`.
pub fn transition(
    outcome: PollOutcome,
    delivered: &mut Vec<Vec<u8>>,
    target: usize,
) -> ConsumerState {
    match outcome {
        PollOutcome::Empty => ConsumerState::Polling,
        PollOutcome::BrokerError(reason) => {
            tracing::warn!(reason = %reason, "Poll returned broker error");
            ConsumerState::Polling
        }
        PollOutcome::Delivered(payload) => {
            tracing::info!(
                delivered = delivered.len() + 1,
                target,
                payload = %display_payload(&payload),
                "Consumed message"
            );
            delivered.push(payload);
            if delivered.len() == target {
                ConsumerState::Done
            } else {
                ConsumerState::Polling
            }
        }
    }
}

pub struct ConsumerLoop<S: RecordSource> {
    source: S,
    deadline: Option<Duration>,
}

impl<S: RecordSource> ConsumerLoop<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            deadline: None,
        }
    }

    /// Bounds the whole run. Without it the loop keeps polling until the target
    /// is reached, however long that takes.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Reads exactly `target` delivered payloads from `topics`.
    ///
    /// Empty polls and broker errors never count toward the target. A target
    /// of zero returns at once without subscribing.
    pub fn run(
        &mut self,
        topics: &[String],
        target: usize,
        poll_timeout: Duration,
    ) -> Result<Vec<Vec<u8>>> {
        if topics.is_empty() || topics.iter().any(|t| t.is_empty()) {
            return Err(Error::InvalidInput(
                "at least one non-empty topic is required".into(),
            ));
        }
        if poll_timeout.is_zero() {
            return Err(Error::InvalidInput("poll timeout must be positive".into()));
        }
        if target == 0 {
            return Ok(Vec::new());
        }

        self.source
            .ensure_connected()
            .map_err(|e| Error::Connection(format!("{e:#}")))?;
        self.source
            .subscribe(topics)
            .map_err(|e| Error::Connection(format!("{e:#}")))?;
        tracing::debug!(?topics, target, "subscribed");

        let started = Instant::now();
        let mut delivered = Vec::with_capacity(target);
        let mut state = ConsumerState::Polling;

        while state == ConsumerState::Polling {
            if let Some(limit) = self.deadline {
                if started.elapsed() >= limit {
                    self.source.close();
                    return Err(Error::RunTimedOut {
                        partial: delivered,
                        target,
                    });
                }
            }
            let outcome = self.source.poll(poll_timeout);
            state = transition(outcome, &mut delivered, target);
        }

        self.source.close();
        Ok(delivered)
    }
}
