// ============================================================================
// Price Observation Domain Model
// ============================================================================

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Issuer id of observations that were set by hand or produced by a migration.
/// Such observations never count towards issuer statistics.
pub const MANUAL_ISSUER_ID: i64 = 0;

/// One settled sale price for a doctrine. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub doctrine_name: String,
    pub timestamp: DateTime<Utc>,
    pub contract_id: i64,
    pub issuer_id: i64,
    pub price: u64,
}

impl PriceObservation {
    pub fn new(
        doctrine_name: impl Into<String>,
        timestamp: DateTime<Utc>,
        contract_id: i64,
        issuer_id: i64,
        price: u64,
    ) -> Self {
        Self {
            doctrine_name: doctrine_name.into(),
            timestamp,
            contract_id,
            issuer_id,
            price,
        }
    }

    /// Observation without issuer attribution (manual price or migration).
    pub fn synthetic(doctrine_name: impl Into<String>, timestamp: DateTime<Utc>, price: u64) -> Self {
        Self::new(doctrine_name, timestamp, 0, MANUAL_ISSUER_ID, price)
    }

    pub fn is_synthetic(&self) -> bool {
        self.issuer_id == MANUAL_ISSUER_ID
    }

    /// Deduplication key within one doctrine's history.
    pub fn timestamp_key(&self) -> String {
        timestamp_key(self.timestamp)
    }
}

/// RFC 3339 UTC at second resolution; lexical order equals time order.
pub fn timestamp_key(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// First maximum-priced observation in iteration order.
pub fn max_price(observations: &[PriceObservation]) -> Option<&PriceObservation> {
    observations.iter().fold(None, |best, candidate| match best {
        Some(current) if current.price >= candidate.price => Some(current),
        _ => Some(candidate),
    })
}
