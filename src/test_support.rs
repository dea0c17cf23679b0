// ============================================================================
// Test Support
// Fixtures and scripted collaborators shared by unit and integration tests
// ============================================================================

use crate::domain::{
    Channel, DoctrineRequirement, EngineConfig, ExchangeType, ListingSnapshot, ListingStatus,
    PriceObservation,
};
use crate::errors::{SourceError, StoreError, StoreResult, TransportError};
use crate::interfaces::{ListingSource, OutboundMessage, Transport};
use crate::store::Repository;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub const OWNER: i64 = 98_000_001;
pub const GROUP_A: i64 = 98_000_002;
pub const GROUP_B: i64 = 99_000_003;
pub const ALERT_CHANNEL: &str = "doctrine-alerts";

pub fn config() -> EngineConfig {
    EngineConfig::new(OWNER, GROUP_A, GROUP_B, ALERT_CHANNEL)
}

/// Outstanding item exchange listing expiring in a week
pub fn listing(id: i64, title: &str, assignee: i64) -> ListingSnapshot {
    let now = Utc::now();
    ListingSnapshot {
        contract_id: id,
        title: title.to_string(),
        status: ListingStatus::Outstanding,
        exchange_type: ExchangeType::ItemExchange,
        assignee_id: assignee,
        issuer_id: 1000 + id,
        price: Decimal::new(150_000_000, 0),
        date_issued: now - Duration::days(1),
        date_expired: now + Duration::days(7),
    }
}

/// Finished price-tracking listing (`"* <doctrine>"`)
pub fn sale(
    id: i64,
    doctrine: &str,
    assignee: i64,
    issuer: i64,
    price: i64,
    issued: DateTime<Utc>,
) -> ListingSnapshot {
    let mut sold = listing(id, &format!("* {}", doctrine), assignee);
    sold.status = ListingStatus::Finished;
    sold.issuer_id = issuer;
    sold.price = Decimal::new(price, 0);
    sold.date_issued = issued;
    sold.date_expired = issued + Duration::days(14);
    sold
}

pub fn requirement(name: &str, count: u32, channel: Channel) -> DoctrineRequirement {
    DoctrineRequirement::new(name, count, channel)
}

/// Listing source answering with a settable listing set
#[derive(Default)]
pub struct ScriptedSource {
    listings: Mutex<Vec<ListingSnapshot>>,
    failure: Mutex<Option<SourceError>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(listings: Vec<ListingSnapshot>) -> Self {
        Self {
            listings: Mutex::new(listings),
            ..Default::default()
        }
    }

    pub fn set(&self, listings: Vec<ListingSnapshot>) {
        *self.listings.lock() = listings;
    }

    pub fn push(&self, listing: ListingSnapshot) {
        self.listings.lock().push(listing);
    }

    pub fn fail_with(&self, err: SourceError) {
        *self.failure.lock() = Some(err);
    }

    pub fn recover(&self) {
        *self.failure.lock() = None;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ListingSource for ScriptedSource {
    async fn fetch_all(&self, _owner_id: i64) -> Result<Vec<ListingSnapshot>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failure.lock().clone() {
            return Err(err);
        }
        Ok(self.listings.lock().clone())
    }
}

/// Listing source that never answers
pub struct StalledSource;

#[async_trait]
impl ListingSource for StalledSource {
    async fn fetch_all(&self, _owner_id: i64) -> Result<Vec<ListingSnapshot>, SourceError> {
        std::future::pending().await
    }
}

/// Transport recording every delivered message
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(String, OutboundMessage)>>,
    failing: AtomicBool,
}

impl RecordingTransport {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<(String, OutboundMessage)> {
        self.sent.lock().clone()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, channel: &str, message: &OutboundMessage) -> Result<(), TransportError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransportError::Send("channel unavailable".to_string()));
        }
        self.sent.lock().push((channel.to_string(), message.clone()));
        Ok(())
    }
}

/// Repository whose writes can be switched to fail; reads always pass through
pub struct FailingStore {
    inner: Arc<dyn Repository>,
    failing: AtomicBool,
}

impl FailingStore {
    pub fn new(inner: Arc<dyn Repository>) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_write(&self) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Sqlite(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_FULL),
                Some("database or disk is full".to_string()),
            )));
        }
        Ok(())
    }
}

impl Repository for FailingStore {
    fn get_requirement(&self, name: &str) -> StoreResult<Option<DoctrineRequirement>> {
        self.inner.get_requirement(name)
    }

    fn set_requirement(&self, name: &str, requirement: &DoctrineRequirement) -> StoreResult<()> {
        self.check_write()?;
        self.inner.set_requirement(name, requirement)
    }

    fn list_requirements(&self) -> StoreResult<Vec<DoctrineRequirement>> {
        self.inner.list_requirements()
    }

    fn replace_all_requirements(&self, requirements: &[DoctrineRequirement]) -> StoreResult<()> {
        self.check_write()?;
        self.inner.replace_all_requirements(requirements)
    }

    fn record_price_observation(&self, observation: &PriceObservation) -> StoreResult<()> {
        self.check_write()?;
        self.inner.record_price_observation(observation)
    }

    fn replace_all_price_observations(&self, observations: &[PriceObservation]) -> StoreResult<()> {
        self.check_write()?;
        self.inner.replace_all_price_observations(observations)
    }

    fn apply_migration(
        &self,
        requirements: &[DoctrineRequirement],
        observations: &[PriceObservation],
    ) -> StoreResult<()> {
        self.check_write()?;
        self.inner.apply_migration(requirements, observations)
    }

    fn query_prices_in_range(
        &self,
        doctrine_name: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<PriceObservation>> {
        self.inner.query_prices_in_range(doctrine_name, start, end)
    }

    fn last_n_prices(&self, doctrine_name: &str, n: usize) -> StoreResult<Vec<PriceObservation>> {
        self.inner.last_n_prices(doctrine_name, n)
    }

    fn list_price_observations(&self) -> StoreResult<Vec<PriceObservation>> {
        self.inner.list_price_observations()
    }
}
