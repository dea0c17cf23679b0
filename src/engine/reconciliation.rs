// ============================================================================
// Reconciliation Engine
// Required versus available doctrine stock, per distribution channel
// ============================================================================

use crate::domain::{
    Channel, DoctrineRequirement, EngineConfig, ExchangeType, ListingSnapshot, ListingStatus,
};
use crate::errors::{EngineResult, SourceError};
use crate::interfaces::ListingSource;
use crate::matching::{AvailableCounts, ListingClassifier, NameMatcher};
use crate::store::Repository;
use crate::utils::Clock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

// ============================================================================
// Report Types
// ============================================================================

/// A doctrine whose available count is below its required count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctrineGap {
    pub name: String,
    pub channel: Channel,
    pub required: u32,
    pub have: u32,
}

impl DoctrineGap {
    pub fn shortfall(&self) -> u32 {
        self.required.saturating_sub(self.have)
    }
}

/// Outcome of a missing-stock reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissingReport {
    /// Gaps of group A, sorted by name
    pub group_a: Vec<DoctrineGap>,
    /// Gaps of group B, sorted by name
    pub group_b: Vec<DoctrineGap>,
    /// Number of requirements with a non-zero target
    pub configured: usize,
    /// No gaps and at least one requirement configured
    pub all_satisfied: bool,
}

impl MissingReport {
    pub fn for_channel(&self, channel: Channel) -> &[DoctrineGap] {
        match channel {
            Channel::GroupA => &self.group_a,
            Channel::GroupB => &self.group_b,
        }
    }

    pub fn gaps(&self) -> impl Iterator<Item = &DoctrineGap> {
        self.group_a.iter().chain(self.group_b.iter())
    }

    pub fn gap_count(&self) -> usize {
        self.group_a.len() + self.group_b.len()
    }

    /// True when no requirement has been configured at all
    pub fn is_unconfigured(&self) -> bool {
        self.configured == 0
    }

    pub fn into_gaps(self) -> Vec<DoctrineGap> {
        let mut gaps = self.group_a;
        gaps.extend(self.group_b);
        gaps
    }
}

/// Per-requirement line of a full report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctrineStatus {
    pub name: String,
    pub channel: Channel,
    pub required: u32,
    pub have: u32,
    /// Matching listings that reached the finished state
    pub sold: u32,
}

impl DoctrineStatus {
    pub fn is_missing(&self) -> bool {
        self.have < self.required
    }
}

/// Why an outstanding listing needs attention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertReason {
    /// The doctrine was bought for more than this listing asks
    Price { reference: u64, listed: u64 },
    Expired,
    WrongExchangeType(ExchangeType),
}

impl AlertReason {
    pub fn label(&self) -> &'static str {
        match self {
            AlertReason::Price { .. } => "Price",
            AlertReason::Expired => "Expired",
            AlertReason::WrongExchangeType(_) => "Wrong contract type",
        }
    }
}

/// An outstanding listing matching a requirement but individually suspect
#[derive(Debug, Clone, PartialEq)]
pub struct ListingAlert {
    pub listing: ListingSnapshot,
    pub doctrine: String,
    pub reason: AlertReason,
}

/// Full status of every configured doctrine plus the alert list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FullReport {
    pub group_a: Vec<DoctrineStatus>,
    pub group_b: Vec<DoctrineStatus>,
    pub alerts: Vec<ListingAlert>,
    /// Display names of alert issuers, filled in by the caller
    pub issuer_names: BTreeMap<i64, String>,
}

impl FullReport {
    /// Distinct issuers of alerted listings
    pub fn alert_issuers(&self) -> BTreeSet<i64> {
        self.alerts.iter().map(|alert| alert.listing.issuer_id).collect()
    }

    /// Resolved name of `issuer_id`, or the id itself
    pub fn issuer_name(&self, issuer_id: i64) -> String {
        self.issuer_names
            .get(&issuer_id)
            .cloned()
            .unwrap_or_else(|| issuer_id.to_string())
    }

    pub fn for_channel(&self, channel: Channel) -> &[DoctrineStatus] {
        match channel {
            Channel::GroupA => &self.group_a,
            Channel::GroupB => &self.group_b,
        }
    }
}

// ============================================================================
// Pure Reconciliation
// ============================================================================

/// Diff requirements against available counts.
///
/// A requirement's `have` is the sum over every available group whose title
/// matches its name. Requirements with a zero target are ignored.
pub fn reconcile(
    requirements: &[DoctrineRequirement],
    group_a: &AvailableCounts,
    group_b: &AvailableCounts,
    matcher: &NameMatcher,
) -> MissingReport {
    let mut report = MissingReport::default();

    for requirement in requirements.iter().filter(|r| r.is_active()) {
        report.configured += 1;

        let counts = match requirement.channel {
            Channel::GroupA => group_a,
            Channel::GroupB => group_b,
        };
        let have = counts.matching_total(matcher, &requirement.name);
        if have >= requirement.required_count {
            continue;
        }

        let gap = DoctrineGap {
            name: requirement.name.clone(),
            channel: requirement.channel,
            required: requirement.required_count,
            have,
        };
        match requirement.channel {
            Channel::GroupA => report.group_a.push(gap),
            Channel::GroupB => report.group_b.push(gap),
        }
    }

    report.group_a.sort_by(|a, b| a.name.cmp(&b.name));
    report.group_b.sort_by(|a, b| a.name.cmp(&b.name));
    report.all_satisfied = report.gap_count() == 0 && report.configured > 0;
    report
}

// ============================================================================
// Reconciliation Engine
// ============================================================================

/// Loads listings and requirements and produces stock reports
pub struct ReconciliationEngine {
    /// Owning entity whose listings are fetched
    owner_id: i64,

    /// Upper bound for one listing fetch
    fetch_timeout: Duration,

    /// Channel partitioning and title grouping
    classifier: ListingClassifier,

    /// External listing API
    source: Arc<dyn ListingSource>,

    /// Requirement storage
    repository: Arc<dyn Repository>,

    clock: Arc<dyn Clock>,
}

impl ReconciliationEngine {
    pub fn new(
        config: &EngineConfig,
        source: Arc<dyn ListingSource>,
        repository: Arc<dyn Repository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            owner_id: config.owner_id,
            fetch_timeout: config.fetch_timeout(),
            classifier: ListingClassifier::from_config(config),
            source,
            repository,
            clock,
        }
    }

    pub fn classifier(&self) -> &ListingClassifier {
        &self.classifier
    }

    /// Fetch every listing of the owner, bounded by the fetch timeout
    pub async fn load_listings(&self) -> EngineResult<Vec<ListingSnapshot>> {
        let fetch = self.source.fetch_all(self.owner_id);
        match tokio::time::timeout(self.fetch_timeout, fetch).await {
            Ok(Ok(listings)) => {
                debug!(count = listings.len(), "loaded listings");
                Ok(listings)
            },
            Ok(Err(err)) => {
                warn!(error = %err, "listing fetch failed");
                Err(err.into())
            },
            Err(_) => {
                warn!(timeout = ?self.fetch_timeout, "listing fetch timed out");
                Err(SourceError::Timeout(self.fetch_timeout).into())
            },
        }
    }

    /// Fetch listings and report missing stock
    pub async fn report_missing(&self) -> EngineResult<MissingReport> {
        let listings = self.load_listings().await?;
        self.report_missing_from(&listings)
    }

    /// Report missing stock over an already fetched listing set
    pub fn report_missing_from(&self, listings: &[ListingSnapshot]) -> EngineResult<MissingReport> {
        let (group_a, group_b) = self.stock_counts(listings);
        let requirements = self.repository.list_requirements()?;
        Ok(reconcile(
            &requirements,
            &group_a,
            &group_b,
            self.classifier.matcher(),
        ))
    }

    /// Fetch listings and build the full report
    pub async fn full_report(&self) -> EngineResult<FullReport> {
        let listings = self.load_listings().await?;
        self.full_report_from(&listings)
    }

    /// Full report over an already fetched listing set
    pub fn full_report_from(&self, listings: &[ListingSnapshot]) -> EngineResult<FullReport> {
        let matcher = self.classifier.matcher();
        let (stock_a, stock_b) = self.stock_counts(listings);

        let finished = self.classifier.classify(
            listings,
            ListingStatus::Finished,
            ExchangeType::ItemExchange,
            false,
            self.clock.now(),
        );
        let sold_a = self.classifier.available_counts(finished.group_a.iter().copied());
        let sold_b = self.classifier.available_counts(finished.group_b.iter().copied());

        let requirements = self.repository.list_requirements()?;
        let mut report = FullReport::default();

        for requirement in requirements.iter().filter(|r| r.is_active()) {
            let (stock, sold) = match requirement.channel {
                Channel::GroupA => (&stock_a, &sold_a),
                Channel::GroupB => (&stock_b, &sold_b),
            };
            let status = DoctrineStatus {
                name: requirement.name.clone(),
                channel: requirement.channel,
                required: requirement.required_count,
                have: stock.matching_total(matcher, &requirement.name),
                sold: sold.matching_total(matcher, &requirement.name),
            };
            match requirement.channel {
                Channel::GroupA => report.group_a.push(status),
                Channel::GroupB => report.group_b.push(status),
            }
        }

        report.group_a.sort_by(|a, b| a.name.cmp(&b.name));
        report.group_b.sort_by(|a, b| a.name.cmp(&b.name));
        report.alerts = self.alerts(&requirements, listings);
        Ok(report)
    }

    /// Outstanding, non-expired item exchange stock per channel
    pub fn stock_counts(&self, listings: &[ListingSnapshot]) -> (AvailableCounts, AvailableCounts) {
        let outstanding = self.classifier.classify(
            listings,
            ListingStatus::Outstanding,
            ExchangeType::ItemExchange,
            true,
            self.clock.now(),
        );
        (
            self.classifier.available_counts(outstanding.group_a.iter().copied()),
            self.classifier.available_counts(outstanding.group_b.iter().copied()),
        )
    }

    /// Open listings of either channel that match a requirement but are priced
    /// below its reference, expired, or of the wrong exchange type.
    pub fn alerts(
        &self,
        requirements: &[DoctrineRequirement],
        listings: &[ListingSnapshot],
    ) -> Vec<ListingAlert> {
        let matcher = self.classifier.matcher();
        let now = self.clock.now();
        let mut alerts = Vec::new();

        for listing in listings {
            if self.classifier.channel_of(listing).is_none()
                || listing.is_price_tracking()
                || listing.status.is_closed()
            {
                continue;
            }
            let Some(requirement) = requirements
                .iter()
                .filter(|r| r.is_active())
                .find(|r| matcher.matches(&r.name, &listing.title))
            else {
                continue;
            };

            let mut raise = |reason: AlertReason| {
                alerts.push(ListingAlert {
                    listing: listing.clone(),
                    doctrine: requirement.name.clone(),
                    reason,
                })
            };

            let listed = listing.whole_price();
            let reference = requirement.reference_amount();
            if reference > listed {
                raise(AlertReason::Price { reference, listed });
            }
            if listing.is_expired(now) {
                raise(AlertReason::Expired);
            }
            if listing.exchange_type != ExchangeType::ItemExchange {
                raise(AlertReason::WrongExchangeType(listing.exchange_type));
            }
        }

        alerts
    }
}
