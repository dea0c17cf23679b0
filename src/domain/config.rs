// ============================================================================
// Engine Configuration
// Channel identities, polling cadence and matching tolerance
// ============================================================================

use crate::domain::Channel;
use crate::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

fn default_check_interval_secs() -> u64 {
    30 * 60
}

fn default_notify_interval_secs() -> u64 {
    24 * 60 * 60
}

fn default_migration_window_secs() -> u64 {
    10 * 60
}

fn default_fetch_timeout_secs() -> u64 {
    60
}

fn default_similarity_threshold() -> f64 {
    0.80
}

/// Complete configuration for a stock engine instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Entity whose contracts are listed (the issuer-side owner)
    pub owner_id: i64,

    /// Assignee id of listings pledged to the group channel
    pub group_a_assignee: i64,

    /// Assignee id of listings pledged to the federation channel
    pub group_b_assignee: i64,

    /// Transport channel that receives low-stock alerts
    pub alert_channel: String,

    /// How often the poll loop checks the marketplace
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,

    /// Cool-down before the same doctrine is announced again
    #[serde(default = "default_notify_interval_secs")]
    pub notify_interval_secs: u64,

    /// How long a proposed migration can be confirmed
    #[serde(default = "default_migration_window_secs")]
    pub migration_window_secs: u64,

    /// Upper bound for one full listing fetch
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Minimum bigram similarity for fuzzy title matches
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
}

impl EngineConfig {
    /// Create a new configuration with required parameters
    pub fn new(
        owner_id: i64,
        group_a_assignee: i64,
        group_b_assignee: i64,
        alert_channel: impl Into<String>,
    ) -> Self {
        Self {
            owner_id,
            group_a_assignee,
            group_b_assignee,
            alert_channel: alert_channel.into(),
            check_interval_secs: default_check_interval_secs(),
            notify_interval_secs: default_notify_interval_secs(),
            migration_window_secs: default_migration_window_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            similarity_threshold: default_similarity_threshold(),
        }
    }

    /// Builder method: Set the poll interval
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval_secs = interval.as_secs();
        self
    }

    /// Builder method: Set the notification cool-down
    pub fn with_notify_interval(mut self, interval: Duration) -> Self {
        self.notify_interval_secs = interval.as_secs();
        self
    }

    /// Builder method: Set the migration confirmation window
    pub fn with_migration_window(mut self, window: Duration) -> Self {
        self.migration_window_secs = window.as_secs();
        self
    }

    /// Builder method: Set the listing fetch timeout
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout_secs = timeout.as_secs();
        self
    }

    /// Builder method: Set the fuzzy match threshold
    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn notify_interval(&self) -> Duration {
        Duration::from_secs(self.notify_interval_secs)
    }

    pub fn migration_window(&self) -> Duration {
        Duration::from_secs(self.migration_window_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Assignee id listings must carry to count for `channel`
    pub fn assignee_for(&self, channel: Channel) -> i64 {
        match channel {
            Channel::GroupA => self.group_a_assignee,
            Channel::GroupB => self.group_b_assignee,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.group_a_assignee == self.group_b_assignee {
            return Err("Channel assignees must differ".to_string());
        }

        if self.alert_channel.trim().is_empty() {
            return Err("Alert channel cannot be empty".to_string());
        }

        if self.check_interval_secs == 0 {
            return Err("Check interval must be positive".to_string());
        }

        if self.notify_interval_secs == 0 {
            return Err("Notify interval must be positive".to_string());
        }

        if self.migration_window_secs == 0 {
            return Err("Migration window must be positive".to_string());
        }

        if self.fetch_timeout_secs == 0 {
            return Err("Fetch timeout must be positive".to_string());
        }

        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err("Similarity threshold must be within (0, 1]".to_string());
        }

        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self, EngineError> {
        let config: EngineConfig =
            toml::from_str(s).map_err(|e| EngineError::InvalidConfig(e.to_string()))?;
        config.validate().map_err(EngineError::InvalidConfig)?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, EngineError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            EngineError::InvalidConfig(format!(
                "unable to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&contents)
    }
}
