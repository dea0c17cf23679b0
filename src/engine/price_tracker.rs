// ============================================================================
// Price Tracker
// Records settled sale prices and refreshes doctrine reference prices
// ============================================================================

use crate::domain::{
    max_price, ExchangeType, ListingSnapshot, ListingStatus, PriceObservation, ReferencePrice,
};
use crate::errors::EngineResult;
use crate::matching::ListingClassifier;
use crate::store::Repository;
use crate::utils::Clock;
use std::sync::Arc;
use tracing::{debug, info};

/// What one tracking pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriceTrackingSummary {
    /// Observations written (re-observations included)
    pub recorded: usize,
    /// Tracking listings naming a doctrine that is not configured
    pub skipped_unknown: usize,
    /// Requirements whose reference price changed
    pub reference_updates: usize,
}

/// Turns finished `* <doctrine>` listings into price history
pub struct PriceTracker {
    classifier: ListingClassifier,
    repository: Arc<dyn Repository>,
    clock: Arc<dyn Clock>,
}

impl PriceTracker {
    pub fn new(
        classifier: ListingClassifier,
        repository: Arc<dyn Repository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            classifier,
            repository,
            clock,
        }
    }

    /// Record prices from finished tracking listings of both channels, then
    /// recompute every reference price from the last `2 x required` sales.
    pub fn track_and_save_prices(
        &self,
        listings: &[ListingSnapshot],
    ) -> EngineResult<PriceTrackingSummary> {
        let mut summary = PriceTrackingSummary::default();
        let now = self.clock.now();

        for status in ListingStatus::FINISHED {
            let finished =
                self.classifier
                    .classify(listings, status, ExchangeType::ItemExchange, false, now);

            for listing in finished.all() {
                let Some(name) = listing.tracked_doctrine_name() else {
                    continue;
                };
                if self.repository.get_requirement(name)?.is_none() {
                    summary.skipped_unknown += 1;
                    continue;
                }

                let observation = PriceObservation::new(
                    name,
                    listing.date_issued,
                    listing.contract_id,
                    listing.issuer_id,
                    listing.whole_price(),
                );
                self.repository.record_price_observation(&observation)?;
                summary.recorded += 1;
            }
        }

        summary.reference_updates = self.refresh_reference_prices()?;

        info!(
            recorded = summary.recorded,
            skipped = summary.skipped_unknown,
            updated = summary.reference_updates,
            "price tracking complete"
        );
        Ok(summary)
    }

    /// Reference price := max of the last `2 x required_count` observations.
    /// Doctrines without any priced observation keep their current value.
    pub fn refresh_reference_prices(&self) -> EngineResult<usize> {
        let mut updated = 0;

        for mut requirement in self.repository.list_requirements()? {
            let window = requirement.required_count as usize * 2;
            let recent = self.repository.last_n_prices(&requirement.name, window)?;

            let Some(best) = max_price(&recent).filter(|obs| obs.price != 0) else {
                continue;
            };
            let reference = ReferencePrice::new(best.price, best.timestamp);
            if requirement.reference_price == Some(reference) {
                continue;
            }

            debug!(
                doctrine = %requirement.name,
                window,
                old = requirement.reference_amount(),
                new = reference.amount,
                "reference price updated"
            );
            requirement.reference_price = Some(reference);
            let name = requirement.name.clone();
            self.repository.set_requirement(&name, &requirement)?;
            updated += 1;
        }

        Ok(updated)
    }
}
