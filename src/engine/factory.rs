// ============================================================================
// Stock Service Factory
// Creates stock services with validated configuration
// ============================================================================

use crate::domain::EngineConfig;
use crate::engine::StockService;
use crate::errors::{EngineError, EngineResult};
use crate::interfaces::{IdNameResolver, ListingSource, LoggingTransport, NameResolver, Transport};
use crate::store::Repository;
use crate::utils::{Clock, SystemClock};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Factory Functions
// ============================================================================

/// Creates a stock service from configuration
///
/// Uses the wall clock and resolves issuer names to their ids.
///
/// # Example
/// ```
/// use doctrine_stock::prelude::*;
/// use doctrine_stock::engine::factory::create_from_config;
/// use std::sync::Arc;
///
/// # struct NoListings;
/// # #[async_trait::async_trait]
/// # impl ListingSource for NoListings {
/// #     async fn fetch_all(&self, _: i64) -> Result<Vec<ListingSnapshot>, SourceError> { Ok(vec![]) }
/// # }
/// let config = EngineConfig::new(1, 2, 3, "alerts");
/// let service = create_from_config(
///     config,
///     Arc::new(NoListings),
///     Arc::new(SqliteStore::open_in_memory().unwrap()),
///     Arc::new(LoggingTransport),
/// )
/// .unwrap();
/// ```
pub fn create_from_config(
    config: EngineConfig,
    source: Arc<dyn ListingSource>,
    repository: Arc<dyn Repository>,
    transport: Arc<dyn Transport>,
) -> EngineResult<StockService> {
    StockServiceBuilder::from_config(config)
        .with_transport(transport)
        .build(source, repository)
}

// ============================================================================
// Builder Pattern for Advanced Configuration
// ============================================================================

/// Builder for stock services with a fluent API
///
/// # Example
/// ```
/// use doctrine_stock::prelude::*;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # struct NoListings;
/// # #[async_trait::async_trait]
/// # impl ListingSource for NoListings {
/// #     async fn fetch_all(&self, _: i64) -> Result<Vec<ListingSnapshot>, SourceError> { Ok(vec![]) }
/// # }
/// let service = StockServiceBuilder::new(98000001, 98000002, 99000003, "doctrine-alerts")
///     .with_check_interval(Duration::from_secs(900))
///     .with_similarity_threshold(0.85)
///     .build(Arc::new(NoListings), Arc::new(SqliteStore::open_in_memory().unwrap()))
///     .unwrap();
/// assert_eq!(service.config().check_interval_secs, 900);
/// ```
pub struct StockServiceBuilder {
    config: EngineConfig,
    transport: Arc<dyn Transport>,
    resolver: Arc<dyn NameResolver>,
    clock: Arc<dyn Clock>,
}

impl StockServiceBuilder {
    /// Create a builder for the given owner and channel assignees
    pub fn new(
        owner_id: i64,
        group_a_assignee: i64,
        group_b_assignee: i64,
        alert_channel: impl Into<String>,
    ) -> Self {
        Self::from_config(EngineConfig::new(
            owner_id,
            group_a_assignee,
            group_b_assignee,
            alert_channel,
        ))
    }

    /// Start from an existing (e.g. file-loaded) configuration
    pub fn from_config(config: EngineConfig) -> Self {
        Self {
            config,
            transport: Arc::new(LoggingTransport),
            resolver: Arc::new(IdNameResolver),
            clock: Arc::new(SystemClock),
        }
    }

    // ========================================================================
    // Timing Configuration
    // ========================================================================

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.config = self.config.with_check_interval(interval);
        self
    }

    pub fn with_notify_interval(mut self, interval: Duration) -> Self {
        self.config = self.config.with_notify_interval(interval);
        self
    }

    pub fn with_migration_window(mut self, window: Duration) -> Self {
        self.config = self.config.with_migration_window(window);
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_fetch_timeout(timeout);
        self
    }

    // ========================================================================
    // Matching Configuration
    // ========================================================================

    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.config = self.config.with_similarity_threshold(threshold);
        self
    }

    // ========================================================================
    // Collaborators
    // ========================================================================

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_name_resolver(mut self, resolver: Arc<dyn NameResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validate the configuration and assemble the service
    pub fn build(
        self,
        source: Arc<dyn ListingSource>,
        repository: Arc<dyn Repository>,
    ) -> EngineResult<StockService> {
        self.config.validate().map_err(EngineError::InvalidConfig)?;

        Ok(StockService::new(
            self.config,
            source,
            repository,
            self.transport,
            self.resolver,
            self.clock,
        ))
    }
}
