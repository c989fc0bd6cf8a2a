use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Topic {
    pub name: String,
    pub partitions: i32,
}

/// One `topic:count` step of a demo run.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub topic: String,
    pub count: usize,
}

impl PlanEntry {
    pub fn new(topic: impl Into<String>, count: usize) -> Self {
        Self {
            topic: topic.into(),
            count,
        }
    }

    pub fn default_plan() -> Vec<PlanEntry> {
        vec![
            PlanEntry::new("topic1", 5),
            PlanEntry::new("topic2", 4),
            PlanEntry::new("topic3", 3),
        ]
    }
}

impl std::str::FromStr for PlanEntry {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (topic, count) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("expected topic:count, got {s}"))?;
        if topic.is_empty() {
            return Err(format!("empty topic name in {s}"));
        }
        let count = count
            .trim()
            .parse()
            .map_err(|e| format!("bad count in {s}: {e}"))?;
        Ok(PlanEntry::new(topic.trim(), count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_entry_parses_topic_and_count() {
        assert_eq!("topic1:5".parse::<PlanEntry>(), Ok(PlanEntry::new("topic1", 5)));
        assert_eq!("ns:events:12".parse::<PlanEntry>(), Ok(PlanEntry::new("ns:events", 12)));
        assert!("topic1".parse::<PlanEntry>().is_err());
        assert!(":3".parse::<PlanEntry>().is_err());
        assert!("topic1:-1".parse::<PlanEntry>().is_err());
    }
}
