/// Result of one produce attempt, reported exactly once per submitted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Acknowledged { topic: String, payload: Vec<u8> },
    Failed { reason: String },
}

/// Result of one bounded-wait poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Empty,
    BrokerError(String),
    Delivered(Vec<u8>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProduceReport {
    pub acknowledged: usize,
    pub errors: Vec<String>,
}

impl ProduceReport {
    pub fn record(&mut self, outcome: &DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Acknowledged { .. } => self.acknowledged += 1,
            DeliveryOutcome::Failed { reason } => self.errors.push(reason.clone()),
        }
    }

    pub fn resolved(&self) -> usize {
        self.acknowledged + self.errors.len()
    }
}
