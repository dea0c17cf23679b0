// ============================================================================
// Listing Snapshot Domain Model
// Read-only view of an external marketplace contract
// ============================================================================

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Title prefix marking a listing that records a sale price instead of stock.
pub const PRICE_TRACKING_MARKER: char = '*';

// ============================================================================
// Value Objects
// ============================================================================

/// Lifecycle status of a listing as reported by the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Outstanding,
    InProgress,
    Finished,
    FinishedIssuer,
    FinishedContractor,
    Cancelled,
    Rejected,
    Failed,
    Deleted,
    Reversed,
}

impl ListingStatus {
    /// Statuses that count as a completed sale.
    pub const FINISHED: [ListingStatus; 3] = [
        ListingStatus::Finished,
        ListingStatus::FinishedIssuer,
        ListingStatus::FinishedContractor,
    ];

    pub fn is_finished(&self) -> bool {
        Self::FINISHED.contains(self)
    }

    /// Listings in these states are no longer actionable and never raise alerts.
    pub fn is_closed(&self) -> bool {
        self.is_finished() || matches!(self, ListingStatus::Cancelled | ListingStatus::Deleted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeType {
    ItemExchange,
    Auction,
    Courier,
    Loan,
    Unknown,
}

// ============================================================================
// Listing Entity
// ============================================================================

/// One marketplace contract as seen during a single poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingSnapshot {
    pub contract_id: i64,
    pub title: String,
    pub status: ListingStatus,
    pub exchange_type: ExchangeType,
    pub assignee_id: i64,
    pub issuer_id: i64,
    pub price: Decimal,
    pub date_issued: DateTime<Utc>,
    pub date_expired: DateTime<Utc>,
}

impl ListingSnapshot {
    /// True when the title starts with the price-tracking marker.
    pub fn is_price_tracking(&self) -> bool {
        self.title.starts_with(PRICE_TRACKING_MARKER)
    }

    /// Doctrine name priced by a tracking listing (`"* Shield Drake"` -> `"Shield Drake"`).
    pub fn tracked_doctrine_name(&self) -> Option<&str> {
        self.title
            .strip_prefix(PRICE_TRACKING_MARKER)
            .map(str::trim)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.date_expired < now
    }

    /// Price truncated to whole currency units; negative prices clamp to zero.
    pub fn whole_price(&self) -> u64 {
        self.price.trunc().to_u64().unwrap_or(0)
    }
}
