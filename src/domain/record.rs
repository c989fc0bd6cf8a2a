use chrono::{Datelike, NaiveDate, NaiveDateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const ADDRESS_SEPARATOR: &str = " | ";
pub const SIGNUP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const USER_ID_RANGE: std::ops::RangeInclusive<i64> = 20_000..=100_000;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Mobile,
    Laptop,
    Tablet,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Mobile, Platform::Laptop, Platform::Tablet];
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Mobile => "Mobile",
            Platform::Laptop => "Laptop",
            Platform::Tablet => "Tablet",
        };
        f.write_str(name)
    }
}

/// A synthetic signup event. Lives only for one produce or consume call.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    pub user_id: i64,
    pub user_name: String,
    pub user_address: String,
    pub platform: Platform,
    pub signup_at: String,
}

impl Record {
    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn decode(payload: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(payload)
    }
}

/// Renders a payload for log output, falling back to a lossy view for
/// anything that is not UTF-8.
pub fn display_payload(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload).into_owned()
}

const FIRST_NAMES: &[&str] = &[
    "Amelia", "Bruno", "Chloe", "Dmitri", "Elena", "Farid", "Grace", "Hiro", "Ines", "Jonas",
    "Kara", "Luca", "Maya", "Nikolai", "Olivia", "Pedro", "Quinn", "Rosa", "Samir", "Tess",
];

const LAST_NAMES: &[&str] = &[
    "Anderson", "Baptiste", "Costa", "Dubois", "Eriksen", "Fischer", "Garcia", "Hansen",
    "Ivanova", "Jensen", "Kowalski", "Lopez", "Morrison", "Nakamura", "Okafor", "Petrov",
];

const STREETS: &[&str] = &[
    "Maple Avenue", "Harbor Road", "Station Street", "Mill Lane", "Park Drive", "Church Street",
    "Orchard Way", "River Terrace", "Hillcrest Court", "King Street",
];

const CITIES: &[&str] = &[
    "Lisbon", "Oslo", "Toronto", "Melbourne", "Osaka", "Nairobi", "Valparaiso", "Krakow",
    "Dublin", "Tallinn",
];

const COUNTRY_CODES: &[&str] = &["PT", "NO", "CA", "AU", "JP", "KE", "CL", "PL", "IE", "EE"];

/// Produces random records. Construct one per run; it is not shared between loops.
pub struct RecordGenerator {
    rng: StdRng,
}

impl RecordGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_record(&mut self) -> Record {
        let user_id = self.rng.gen_range(USER_ID_RANGE);
        let user_name = format!("{} {}", self.pick(FIRST_NAMES), self.pick(LAST_NAMES));
        let user_address = [
            format!("{} {}", self.rng.gen_range(1..=999), self.pick(STREETS)),
            self.pick(CITIES).to_string(),
            self.pick(COUNTRY_CODES).to_string(),
        ]
        .join(ADDRESS_SEPARATOR);
        let platform = *Platform::ALL
            .choose(&mut self.rng)
            .unwrap_or(&Platform::Mobile);
        let signup_at = self.signup_this_month().format(SIGNUP_FORMAT).to_string();

        Record {
            user_id,
            user_name,
            user_address,
            platform,
            signup_at,
        }
    }

    fn pick(&mut self, items: &[&'static str]) -> &'static str {
        items.choose(&mut self.rng).copied().unwrap_or_default()
    }

    // Somewhere between the first second of the current month and now.
    fn signup_this_month(&mut self) -> NaiveDateTime {
        let now = Utc::now().naive_utc();
        let month_start = NaiveDate::from_ymd_opt(now.year(), now.month(), 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or(now);
        let span = (now - month_start).num_seconds().max(0);
        month_start + chrono::Duration::seconds(self.rng.gen_range(0..=span))
    }
}

impl Default for RecordGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for RecordGenerator {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        Some(self.next_record())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_record_decodes_to_same_value() {
        let mut generator = RecordGenerator::seeded(7);
        for record in generator.by_ref().take(16) {
            let payload = record.encode().unwrap();
            assert_eq!(Record::decode(&payload).unwrap(), record);
        }
    }

    #[test]
    fn payload_keeps_field_names() {
        let record = Record {
            user_id: 42_000,
            user_name: "Grace Hansen".into(),
            user_address: "12 Mill Lane | Oslo | NO".into(),
            platform: Platform::Tablet,
            signup_at: "2026-10-03 08:15:00".into(),
        };
        let json: serde_json::Value = serde_json::from_slice(&record.encode().unwrap()).unwrap();
        assert_eq!(json["user_id"], 42_000);
        assert_eq!(json["user_name"], "Grace Hansen");
        assert_eq!(json["user_address"], "12 Mill Lane | Oslo | NO");
        assert_eq!(json["platform"], "Tablet");
        assert_eq!(json["signup_at"], "2026-10-03 08:15:00");
    }

    #[test]
    fn generated_fields_stay_in_range() {
        let mut generator = RecordGenerator::seeded(99);
        for _ in 0..64 {
            let r = generator.next_record();
            assert!(USER_ID_RANGE.contains(&r.user_id));
            assert_eq!(r.user_address.split(ADDRESS_SEPARATOR).count(), 3);
            let ts = NaiveDateTime::parse_from_str(&r.signup_at, SIGNUP_FORMAT).unwrap();
            let now = Utc::now().naive_utc();
            // At most one month back, even if the month turned over mid-test.
            assert!(ts <= now);
            assert!(now - ts <= chrono::Duration::days(31));
        }
    }

    #[test]
    fn same_seed_same_identity_fields() {
        let a: Vec<_> = RecordGenerator::seeded(3).take(5).collect();
        let b: Vec<_> = RecordGenerator::seeded(3).take(5).collect();
        let ids = |v: &[Record]| v.iter().map(|r| (r.user_id, r.user_name.clone())).collect::<Vec<_>>();
        assert_eq!(ids(&a), ids(&b));
    }

    #[test]
    fn garbage_payload_does_not_decode() {
        assert!(Record::decode(b"not json").is_err());
        assert!(Record::decode(br#"{"user_id":1}"#).is_err());
    }
}
