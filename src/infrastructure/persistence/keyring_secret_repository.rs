use crate::domain::cluster::cluster::SecurityConfig;
use anyhow::{anyhow, Result};
use keyring::Entry;

/// Looks up SASL passwords in the OS keyring. Entries live under
/// `service_name`, one per `username@brokers` pair, so the same user on two
/// clusters can hold different secrets.
pub struct KeyringSecretRepository {
    service_name: String,
}

impl KeyringSecretRepository {
    pub fn new(service_name: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
        }
    }

    pub fn account(username: &str, brokers: &str) -> String {
        format!("{username}@{brokers}")
    }

    pub fn sasl_password(&self, username: &str, brokers: &str) -> Result<String> {
        let account = Self::account(username, brokers);
        let entry = Entry::new(&self.service_name, &account)
            .map_err(|e| anyhow!("Failed to open keyring entry {}: {}", account, e))?;
        entry
            .get_password()
            .map_err(|e| anyhow!("No SASL password in keyring for {}: {}", account, e))
    }

    /// Password for a connection: an explicit one wins, the keyring is only
    /// consulted for SASL, and a missing entry is logged rather than fatal.
    pub fn resolve(
        &self,
        security: &SecurityConfig,
        brokers: &str,
        explicit: Option<&str>,
    ) -> Option<String> {
        if let Some(p) = explicit {
            return Some(p.to_string());
        }
        let SecurityConfig::SaslSsl { username, .. } = security else {
            return None;
        };
        match self.sasl_password(username, brokers) {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::warn!(error = %e, "no SASL password available");
                None
            }
        }
    }
}
