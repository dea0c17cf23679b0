// ============================================================================
// Engine Module
// Reconciliation, price tracking, throttling, migration and the service facade
// ============================================================================

mod leaderboard;
mod migration;
mod notification;
mod price_tracker;
mod reconciliation;
mod service;

pub mod factory;
pub mod messages;

pub use factory::{create_from_config, StockServiceBuilder};
pub use leaderboard::{
    build_leaderboard, month_bounds, rank_issuers, Leaderboard, LeaderboardEntry,
    LEADERBOARD_SIZE,
};
pub use migration::{MigrationOutcome, MigrationWorkflow, PendingMigration};
pub use notification::NotificationGate;
pub use price_tracker::{PriceTracker, PriceTrackingSummary};
pub use reconciliation::{
    reconcile, AlertReason, DoctrineGap, DoctrineStatus, FullReport, ListingAlert, MissingReport,
    ReconciliationEngine,
};
pub use service::{Command, CommandOutcome, IterationOutcome, StockService};
