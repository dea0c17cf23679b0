// ============================================================================
// Error Types
// Failures surfaced by the store, the collaborators and the engine
// ============================================================================

use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

/// Persistence failures. Always propagated; a failed write never reports success.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("unable to encode or decode stored value: {0}")]
    Codec(#[from] serde_json::Error),
}

/// Failures of the external listing API or the name lookup service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("listing request failed: {0}")]
    Request(String),

    #[error("listing request timed out after {0:?}")]
    Timeout(Duration),

    #[error("unable to decode listing response: {0}")]
    Decode(String),
}

/// Outbound delivery failure. The caller retries on the next cycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("unable to send message: {0}")]
    Send(String),
}

/// Errors returned by engine operations and command handling.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unable to load listings: {0}")]
    Listings(#[from] SourceError),

    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    #[error("delivery failure: {0}")]
    Transport(#[from] TransportError),

    #[error("doctrine not found: {0}")]
    UnknownDoctrine(String),

    #[error("invalid requirement: {0}")]
    InvalidRequirement(String),

    #[error("unknown channel: {0}")]
    InvalidChannel(String),

    #[error("invalid migration: {0}")]
    InvalidMigration(String),

    #[error("no pending migration for message {0}")]
    MigrationNotFound(String),

    #[error("migration request from {created_at} expired, requests are only valid for {window_secs} seconds")]
    MigrationExpired {
        created_at: DateTime<Utc>,
        window_secs: i64,
    },

    #[error("refusing to import an empty requirement list")]
    EmptyImport,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EngineError {
    /// True for not-found and validation errors that should be shown to the
    /// requesting user rather than treated as an operational failure.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            EngineError::UnknownDoctrine(_)
                | EngineError::InvalidRequirement(_)
                | EngineError::InvalidChannel(_)
                | EngineError::InvalidMigration(_)
                | EngineError::MigrationNotFound(_)
                | EngineError::MigrationExpired { .. }
                | EngineError::EmptyImport
        )
    }

    /// True for failures that are expected to clear up on the next poll.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::Listings(_) | EngineError::Transport(_))
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
