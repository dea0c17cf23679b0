// ============================================================================
// Store Module
// Repository contract and its persistent implementation
// ============================================================================
//
// Two logical namespaces:
// - requirements:  keyed by doctrine name
// - price history: keyed by (doctrine name, RFC 3339 second timestamp), so a
//                  doctrine's history is one contiguous ordered key range

mod sqlite;

pub use sqlite::SqliteStore;

use crate::domain::{DoctrineRequirement, PriceObservation};
use crate::errors::StoreResult;
use chrono::{DateTime, Utc};

/// Persistence contract consumed by every engine component
///
/// Implementations must make each multi-key operation atomic with respect to
/// readers and must serialize writers.
pub trait Repository: Send + Sync {
    /// Requirement stored under `name`, `None` when unknown
    fn get_requirement(&self, name: &str) -> StoreResult<Option<DoctrineRequirement>>;

    /// Upsert under `name`; a zero `required_count` deletes the record
    fn set_requirement(&self, name: &str, requirement: &DoctrineRequirement) -> StoreResult<()>;

    /// All stored requirements, ordered by name
    fn list_requirements(&self) -> StoreResult<Vec<DoctrineRequirement>>;

    /// Replace the full requirement set; names absent from `requirements` are deleted
    fn replace_all_requirements(&self, requirements: &[DoctrineRequirement]) -> StoreResult<()>;

    /// Store one observation; an existing one with the same (doctrine, timestamp) is overwritten
    fn record_price_observation(&self, observation: &PriceObservation) -> StoreResult<()>;

    /// Write a batch of observations in one transaction, overwriting same-key
    /// entries and keeping the rest of the ledger
    fn replace_all_price_observations(&self, observations: &[PriceObservation]) -> StoreResult<()>;

    /// Rename pass of a migration: replace the requirement set and write the
    /// carried-over observations in one transaction
    fn apply_migration(
        &self,
        requirements: &[DoctrineRequirement],
        observations: &[PriceObservation],
    ) -> StoreResult<()>;

    /// Observations with `start <= timestamp <= end`, for one doctrine (time
    /// ordered) or for every doctrine (doctrine, then time ordered)
    fn query_prices_in_range(
        &self,
        doctrine_name: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<PriceObservation>>;

    /// The `n` most recent observations of a doctrine, newest first
    fn last_n_prices(&self, doctrine_name: &str, n: usize) -> StoreResult<Vec<PriceObservation>>;

    /// The entire price ledger, doctrine then time ordered
    fn list_price_observations(&self) -> StoreResult<Vec<PriceObservation>>;
}
