// ============================================================================
// Migration Workflow
// Two-phase, time-boxed bulk rename of doctrine records
// ============================================================================
//
// Proposed --confirm within window--> Applied
// Proposed --confirm after window---> Expired (nothing written)
// Proposed --store write fails------> Proposed (nothing written)
//
// Pending entries live in memory only and are consumed by the first confirm
// that either applies them or finds them expired.

use crate::domain::PriceObservation;
use crate::errors::{EngineError, EngineResult};
use crate::store::Repository;
use crate::utils::Clock;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, warn};

/// A proposed rename awaiting confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMigration {
    pub from: String,
    pub to: String,
    /// Channel the confirmation prompt was posted to
    pub channel_ref: String,
    /// Identity of the confirmation prompt
    pub message_ref: String,
    pub created_at: DateTime<Utc>,
}

impl PendingMigration {
    /// Apply the substring replacement to one name
    pub fn rename(&self, name: &str) -> String {
        name.replace(&self.from, &self.to)
    }
}

/// What an applied migration wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationOutcome {
    /// Requirements whose name changed
    pub renamed_requirements: usize,
    /// Best-known-price snapshots written under the new names
    pub synthetic_observations: usize,
}

pub struct MigrationWorkflow {
    window: Duration,
    repository: Arc<dyn Repository>,
    clock: Arc<dyn Clock>,
    pending: Mutex<HashMap<String, PendingMigration>>,
}

impl MigrationWorkflow {
    pub fn new(
        window: std::time::Duration,
        repository: Arc<dyn Repository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            window: Duration::from_std(window).unwrap_or(Duration::MAX),
            repository,
            clock,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Remember a rename keyed by the confirmation prompt's identity.
    pub fn propose(
        &self,
        from: impl Into<String>,
        to: impl Into<String>,
        channel_ref: impl Into<String>,
        message_ref: impl Into<String>,
    ) -> EngineResult<PendingMigration> {
        let from = from.into();
        if from.is_empty() {
            return Err(EngineError::InvalidMigration(
                "source name must not be empty".to_string(),
            ));
        }

        let pending = PendingMigration {
            from,
            to: to.into(),
            channel_ref: channel_ref.into(),
            message_ref: message_ref.into(),
            created_at: self.clock.now(),
        };
        self.pending
            .lock()
            .insert(pending.message_ref.clone(), pending.clone());

        info!(from = %pending.from, to = %pending.to, message = %pending.message_ref, "migration proposed");
        Ok(pending)
    }

    /// Consume the pending entry and apply it if still inside the window.
    pub fn confirm(&self, message_ref: &str) -> EngineResult<MigrationOutcome> {
        let pending = self
            .pending
            .lock()
            .remove(message_ref)
            .ok_or_else(|| EngineError::MigrationNotFound(message_ref.to_string()))?;

        let now = self.clock.now();
        if now - pending.created_at > self.window {
            info!(message = %message_ref, "migration expired");
            return Err(EngineError::MigrationExpired {
                created_at: pending.created_at,
                window_secs: self.window.num_seconds(),
            });
        }

        self.apply(&pending, now).map_err(|err| {
            warn!(message = %message_ref, error = %err, "migration not applied, proposal kept");
            self.pending
                .lock()
                .insert(pending.message_ref.clone(), pending);
            err
        })
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    fn apply(&self, pending: &PendingMigration, now: DateTime<Utc>) -> EngineResult<MigrationOutcome> {
        let mut outcome = MigrationOutcome::default();

        let mut requirements = self.repository.list_requirements()?;
        for requirement in &mut requirements {
            let renamed = pending.rename(&requirement.name);
            if renamed != requirement.name {
                requirement.name = renamed;
                outcome.renamed_requirements += 1;
            }
        }

        // History stays under the old names; the best known price of each
        // doctrine is carried over as a fresh unattributed observation.
        let mut best: BTreeMap<String, u64> = BTreeMap::new();
        for observation in self.repository.list_price_observations()? {
            let price = best.entry(pending.rename(&observation.doctrine_name)).or_insert(0);
            *price = (*price).max(observation.price);
        }
        let synthetic: Vec<PriceObservation> = best
            .into_iter()
            .map(|(name, price)| PriceObservation::synthetic(name, now, price))
            .collect();
        self.repository.apply_migration(&requirements, &synthetic)?;
        outcome.synthetic_observations = synthetic.len();

        info!(
            from = %pending.from,
            to = %pending.to,
            renamed = outcome.renamed_requirements,
            prices = outcome.synthetic_observations,
            "migration applied"
        );
        Ok(outcome)
    }
}
