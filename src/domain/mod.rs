// ============================================================================
// Domain Models Module
// Contains all core domain entities and value objects
// ============================================================================

pub mod config;
pub mod listing;
pub mod price;
pub mod requirement;

pub use config::EngineConfig;
pub use listing::{ExchangeType, ListingSnapshot, ListingStatus, PRICE_TRACKING_MARKER};
pub use price::{max_price, timestamp_key, PriceObservation, MANUAL_ISSUER_ID};
pub use requirement::{Channel, DoctrineRequirement, ReferencePrice};
