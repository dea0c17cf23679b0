// ============================================================================
// Doctrine Requirement Domain Model
// ============================================================================

use crate::errors::EngineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Value Objects
// ============================================================================

/// Distribution channel a requirement and its listings are pledged against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// The smaller group (a single corporation)
    GroupA,
    /// The larger federation (an alliance of groups)
    GroupB,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::GroupA, Channel::GroupB];

    pub fn label(&self) -> &'static str {
        match self {
            Channel::GroupA => "Group A",
            Channel::GroupB => "Group B",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Channel {
    type Err = EngineError;

    /// Accepts the canonical names as well as the marketplace aliases
    /// (`corp`/`corporation` for the group, `alliance` for the federation).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "group_a" | "a" | "corp" | "corporation" => Ok(Channel::GroupA),
            "group_b" | "b" | "alliance" => Ok(Channel::GroupB),
            other => Err(EngineError::InvalidChannel(other.to_string())),
        }
    }
}

/// Last known price a doctrine was bought for, in whole currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencePrice {
    pub amount: u64,
    pub timestamp: DateTime<Utc>,
}

impl ReferencePrice {
    pub fn new(amount: u64, timestamp: DateTime<Utc>) -> Self {
        Self { amount, timestamp }
    }
}

// ============================================================================
// Requirement Entity
// ============================================================================

/// Configured target stock for one doctrine, keyed by `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctrineRequirement {
    pub name: String,
    pub required_count: u32,
    pub channel: Channel,
    #[serde(default)]
    pub reference_price: Option<ReferencePrice>,
}

impl DoctrineRequirement {
    pub fn new(name: impl Into<String>, required_count: u32, channel: Channel) -> Self {
        Self {
            name: name.into(),
            required_count,
            channel,
            reference_price: None,
        }
    }

    /// Builder method: Set the reference price
    pub fn with_reference_price(mut self, price: ReferencePrice) -> Self {
        self.reference_price = Some(price);
        self
    }

    /// A zero count marks the record for deletion and never produces a gap.
    pub fn is_active(&self) -> bool {
        self.required_count > 0
    }

    /// Reference amount, zero when no price was ever recorded.
    pub fn reference_amount(&self) -> u64 {
        self.reference_price.map(|p| p.amount).unwrap_or(0)
    }
}
