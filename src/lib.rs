// ============================================================================
// Doctrine Stock Library
// Stock reconciliation and price-history engine for marketplace contracts
// ============================================================================

//! # Doctrine Stock
//!
//! Tracks whether a community's doctrine inventory, pledged on two marketplace
//! channels, meets its configured targets and alerts when it does not.
//!
//! ## Features
//!
//! - **Fuzzy title matching** of free-text listings against doctrine names
//! - **Per-channel reconciliation** of required versus available stock
//! - **Price history** from `*`-prefixed tracking listings, with reference prices
//! - **Throttled notifications** with whole-batch alerting
//! - **Two-phase migrations** renaming doctrines inside a confirmation window
//! - **SQLite persistence** with atomic multi-key updates
//!
//! ## Example
//!
//! ```rust
//! use doctrine_stock::prelude::*;
//! use std::sync::Arc;
//!
//! struct Marketplace;
//!
//! #[async_trait::async_trait]
//! impl ListingSource for Marketplace {
//!     async fn fetch_all(&self, _owner_id: i64) -> Result<Vec<ListingSnapshot>, SourceError> {
//!         Ok(Vec::new())
//!     }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let service = StockServiceBuilder::new(98000001, 98000002, 99000003, "doctrine-alerts")
//!     .build(
//!         Arc::new(Marketplace),
//!         Arc::new(SqliteStore::open_in_memory().unwrap()),
//!     )
//!     .unwrap();
//!
//! service
//!     .handle(Command::SetRequirement {
//!         name: "Shield Drake".to_string(),
//!         required_count: 5,
//!         channel: Channel::GroupA,
//!     })
//!     .await
//!     .unwrap();
//!
//! let outcome = service.run_iteration().await.unwrap();
//! assert_eq!(outcome.gaps[0].have, 0);
//! # });
//! ```

pub mod domain;
pub mod engine;
pub mod errors;
pub mod interfaces;
pub mod matching;
pub mod store;
pub mod utils;

#[cfg(feature = "logging")]
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports for convenience
pub mod prelude {
    pub use crate::domain::{
        Channel, DoctrineRequirement, EngineConfig, ExchangeType, ListingSnapshot, ListingStatus,
        PriceObservation, ReferencePrice,
    };
    pub use crate::engine::{
        create_from_config, Command, CommandOutcome, DoctrineGap, FullReport, IterationOutcome,
        MissingReport, StockService, StockServiceBuilder,
    };
    pub use crate::errors::{EngineError, EngineResult, SourceError, StoreError, TransportError};
    pub use crate::interfaces::{
        CachingNameResolver, ListingPages, ListingSource, LoggingTransport, NameLookup,
        NameResolver, OutboundMessage, PaginatedSource, Transport,
    };
    pub use crate::matching::{ListingClassifier, NameMatcher};
    pub use crate::store::{Repository, SqliteStore};
    pub use crate::utils::{Clock, ManualClock, SystemClock};
}
