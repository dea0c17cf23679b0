// ============================================================================
// Stock Service
// Facade owning the engine components: typed commands and the poll loop
// ============================================================================

use crate::domain::{
    Channel, DoctrineRequirement, EngineConfig, ExchangeType, ListingStatus, ReferencePrice,
};
use crate::engine::leaderboard::{build_leaderboard, month_bounds};
use crate::engine::{
    messages, DoctrineGap, FullReport, Leaderboard, MigrationOutcome, MigrationWorkflow,
    MissingReport, NotificationGate, PendingMigration, PriceTracker, PriceTrackingSummary,
    ReconciliationEngine,
};
use crate::errors::{EngineError, EngineResult};
use crate::interfaces::{ListingSource, NameResolver, OutboundMessage, Transport};
use crate::store::Repository;
use crate::utils::Clock;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};

// ============================================================================
// Commands
// ============================================================================

/// Inbound request, already parsed by the chat layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Upsert a requirement; a zero count deletes it
    SetRequirement {
        name: String,
        required_count: u32,
        channel: Channel,
    },
    /// Replace the whole requirement set
    ImportRequirements(Vec<DoctrineRequirement>),
    ListRequirements,
    Report,
    ReportFull,
    /// Available stock over both channels
    Stock,
    /// Manually set a doctrine's reference price
    SetPrice { name: String, amount: u64 },
    /// Reconcile and track prices right now
    FetchPrices,
    /// Issuer ranking; defaults to the current calendar month
    Leaderboard {
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    },
    ProposeMigration {
        from: String,
        to: String,
        channel_ref: String,
        message_ref: String,
    },
    ConfirmMigration { message_ref: String },
}

/// Result of a handled command
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    RequirementSet {
        requirement: DoctrineRequirement,
        deleted: bool,
    },
    RequirementsImported(usize),
    Requirements(Vec<DoctrineRequirement>),
    Missing(MissingReport),
    Full(FullReport),
    Stock(Vec<(String, u32)>),
    PriceSet(DoctrineRequirement),
    PricesFetched {
        report: MissingReport,
        summary: PriceTrackingSummary,
    },
    Leaderboard(Leaderboard),
    MigrationProposed(PendingMigration),
    MigrationApplied(MigrationOutcome),
}

impl CommandOutcome {
    /// Render the outcome as reply messages
    pub fn to_messages(&self, now: DateTime<Utc>) -> Vec<OutboundMessage> {
        let ack = |text: String| vec![OutboundMessage::new("Done", messages::COLOR_OK, text).at(now)];

        match self {
            CommandOutcome::RequirementSet {
                requirement,
                deleted: true,
            } => ack(format!("Removed **{}**", requirement.name)),
            CommandOutcome::RequirementSet { requirement, .. } => ack(format!(
                "**{}** now requires {} on {}",
                requirement.name, requirement.required_count, requirement.channel
            )),
            CommandOutcome::RequirementsImported(count) => {
                ack(format!("Imported {} requirements", count))
            },
            CommandOutcome::Requirements(requirements) => {
                messages::requirement_messages(requirements, now)
            },
            CommandOutcome::Missing(report) | CommandOutcome::PricesFetched { report, .. } => {
                if report.all_satisfied {
                    vec![messages::all_stocked_message(now)]
                } else if report.is_unconfigured() {
                    ack("Nothing configured yet".to_string())
                } else {
                    let gaps: Vec<DoctrineGap> = report.gaps().cloned().collect();
                    messages::low_stock_messages(&gaps, now)
                }
            },
            CommandOutcome::Full(report) => messages::full_report_messages(report, now),
            CommandOutcome::Stock(counts) => messages::stock_messages(counts, now),
            CommandOutcome::PriceSet(requirement) => ack(format!(
                "**{}** reference price set to {}",
                requirement.name,
                requirement.reference_amount()
            )),
            CommandOutcome::Leaderboard(board) => vec![messages::leaderboard_message(board, now)],
            CommandOutcome::MigrationProposed(pending) => vec![messages::migration_prompt(pending)],
            CommandOutcome::MigrationApplied(outcome) => ack(format!(
                "Renamed {} requirements, carried over {} prices",
                outcome.renamed_requirements, outcome.synthetic_observations
            )),
        }
    }
}

/// What one poll iteration observed and did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationOutcome {
    /// Every currently missing doctrine, both channels
    pub gaps: Vec<DoctrineGap>,
    /// Doctrines announced (and marked) in this iteration
    pub notified: Vec<String>,
    /// `None` when price tracking failed
    pub price_summary: Option<PriceTrackingSummary>,
}

// ============================================================================
// Stock Service
// ============================================================================

/// Owns every engine component and shares them between the poll loop and
/// concurrently handled commands
pub struct StockService {
    config: EngineConfig,

    /// Requirement and price storage shared by all components
    repository: Arc<dyn Repository>,

    /// Alert delivery
    transport: Arc<dyn Transport>,

    /// Issuer display names for the leaderboard and listing alerts
    resolver: Arc<dyn NameResolver>,

    clock: Arc<dyn Clock>,

    reconciliation: ReconciliationEngine,
    price_tracker: PriceTracker,
    gate: NotificationGate,
    migrations: MigrationWorkflow,
}

impl StockService {
    pub fn new(
        config: EngineConfig,
        source: Arc<dyn ListingSource>,
        repository: Arc<dyn Repository>,
        transport: Arc<dyn Transport>,
        resolver: Arc<dyn NameResolver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let reconciliation =
            ReconciliationEngine::new(&config, source, repository.clone(), clock.clone());
        let price_tracker = PriceTracker::new(
            *reconciliation.classifier(),
            repository.clone(),
            clock.clone(),
        );
        let gate = NotificationGate::new(config.notify_interval(), clock.clone());
        let migrations =
            MigrationWorkflow::new(config.migration_window(), repository.clone(), clock.clone());

        Self {
            config,
            repository,
            transport,
            resolver,
            clock,
            reconciliation,
            price_tracker,
            gate,
            migrations,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn gate(&self) -> &NotificationGate {
        &self.gate
    }

    pub fn migrations(&self) -> &MigrationWorkflow {
        &self.migrations
    }

    pub fn reconciliation(&self) -> &ReconciliationEngine {
        &self.reconciliation
    }

    // ========================================================================
    // Poll Loop
    // ========================================================================

    /// One poll: fetch, reconcile, track prices, then alert through the gate.
    ///
    /// Doctrines are marked notified only after every message was delivered.
    pub async fn run_iteration(&self) -> EngineResult<IterationOutcome> {
        let listings = self.reconciliation.load_listings().await?;
        let report = self.reconciliation.report_missing_from(&listings)?;

        let price_summary = match self.price_tracker.track_and_save_prices(&listings) {
            Ok(summary) => Some(summary),
            Err(err) => {
                error!(error = %err, "price tracking failed");
                None
            },
        };

        let gaps = report.into_gaps();
        let batch = self.gate.select_batch(&gaps);
        if batch.is_empty() {
            debug!(gaps = gaps.len(), "nothing to notify");
            return Ok(IterationOutcome {
                gaps,
                notified: Vec::new(),
                price_summary,
            });
        }

        for message in messages::low_stock_messages(&batch, self.clock.now()) {
            self.transport
                .send(&self.config.alert_channel, &message)
                .await?;
        }

        let notified: Vec<String> = batch.into_iter().map(|gap| gap.name).collect();
        self.gate
            .mark_notified_all(notified.iter().map(String::as_str));
        info!(count = notified.len(), "low stock notified");

        Ok(IterationOutcome {
            gaps,
            notified,
            price_summary,
        })
    }

    /// Poll until `shutdown` turns true or its sender is dropped.
    ///
    /// A failed iteration is logged and retried on the next tick.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(interval = ?self.config.check_interval(), "poll loop started");

        while !*shutdown.borrow() {
            tokio::select! {
                result = self.run_iteration() => match result {
                    Ok(outcome) => debug!(
                        gaps = outcome.gaps.len(),
                        notified = outcome.notified.len(),
                        "poll iteration complete"
                    ),
                    Err(err) => error!(
                        error = %err,
                        transient = err.is_transient(),
                        "poll iteration failed"
                    ),
                },
                _ = shutdown.changed() => break,
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.check_interval()) => {},
                _ = shutdown.changed() => break,
            }
        }

        info!("poll loop stopped");
    }

    // ========================================================================
    // Commands
    // ========================================================================

    pub async fn handle(&self, command: Command) -> EngineResult<CommandOutcome> {
        match command {
            Command::SetRequirement {
                name,
                required_count,
                channel,
            } => self.set_requirement(&name, required_count, channel),

            Command::ImportRequirements(mut requirements) => {
                if requirements.is_empty() {
                    return Err(EngineError::EmptyImport);
                }
                for requirement in &mut requirements {
                    requirement.name = validated_name(&requirement.name)?.to_string();
                }
                self.repository.replace_all_requirements(&requirements)?;
                info!(count = requirements.len(), "requirements imported");
                Ok(CommandOutcome::RequirementsImported(requirements.len()))
            },

            Command::ListRequirements => Ok(CommandOutcome::Requirements(
                self.repository.list_requirements()?,
            )),

            Command::Report => Ok(CommandOutcome::Missing(
                self.reconciliation.report_missing().await?,
            )),

            Command::ReportFull => {
                let mut report = self.reconciliation.full_report().await?;
                for issuer_id in report.alert_issuers() {
                    let name = self.resolver.resolve_name(issuer_id).await;
                    report.issuer_names.insert(issuer_id, name);
                }
                Ok(CommandOutcome::Full(report))
            },

            Command::Stock => {
                let listings = self.reconciliation.load_listings().await?;
                let classifier = self.reconciliation.classifier();
                let outstanding = classifier.classify(
                    &listings,
                    ListingStatus::Outstanding,
                    ExchangeType::ItemExchange,
                    true,
                    self.clock.now(),
                );
                let counts = classifier.available_counts(outstanding.all());
                Ok(CommandOutcome::Stock(counts.sorted()))
            },

            Command::SetPrice { name, amount } => self.set_price(name.trim(), amount),

            Command::FetchPrices => {
                let listings = self.reconciliation.load_listings().await?;
                let report = self.reconciliation.report_missing_from(&listings)?;
                let summary = self.price_tracker.track_and_save_prices(&listings)?;
                Ok(CommandOutcome::PricesFetched { report, summary })
            },

            Command::Leaderboard { start, end } => {
                let (month_start, month_end) = month_bounds(self.clock.now());
                let board = build_leaderboard(
                    self.repository.as_ref(),
                    self.resolver.as_ref(),
                    start.unwrap_or(month_start),
                    end.unwrap_or(month_end),
                )
                .await?;
                Ok(CommandOutcome::Leaderboard(board))
            },

            Command::ProposeMigration {
                from,
                to,
                channel_ref,
                message_ref,
            } => Ok(CommandOutcome::MigrationProposed(
                self.migrations.propose(from, to, channel_ref, message_ref)?,
            )),

            Command::ConfirmMigration { message_ref } => Ok(CommandOutcome::MigrationApplied(
                self.migrations.confirm(&message_ref)?,
            )),
        }
    }

    fn set_requirement(
        &self,
        name: &str,
        required_count: u32,
        channel: Channel,
    ) -> EngineResult<CommandOutcome> {
        let name = validated_name(name)?;
        let mut requirement = DoctrineRequirement::new(name, required_count, channel);
        // Keep the known price when only the target changes.
        if let Some(existing) = self.repository.get_requirement(name)? {
            requirement.reference_price = existing.reference_price;
        }

        self.repository.set_requirement(name, &requirement)?;
        info!(doctrine = %name, required_count, channel = %channel, "requirement set");
        Ok(CommandOutcome::RequirementSet {
            deleted: !requirement.is_active(),
            requirement,
        })
    }

    fn set_price(&self, name: &str, amount: u64) -> EngineResult<CommandOutcome> {
        let mut requirement = self
            .repository
            .get_requirement(name)?
            .ok_or_else(|| EngineError::UnknownDoctrine(name.to_string()))?;

        requirement.reference_price = Some(ReferencePrice::new(amount, self.clock.now()));
        self.repository.set_requirement(name, &requirement)?;
        info!(doctrine = %name, amount, "reference price set");
        Ok(CommandOutcome::PriceSet(requirement))
    }
}

/// Trimmed doctrine name; a blank name can never match a listing
fn validated_name(name: &str) -> EngineResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(EngineError::InvalidRequirement(
            "doctrine name must not be blank".to_string(),
        ));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TransportError;
    use crate::interfaces::IdNameResolver;
    use crate::store::SqliteStore;
    use crate::test_support::{
        config, listing, requirement, sale, FailingStore, RecordingTransport, ScriptedSource,
        ALERT_CHANNEL, GROUP_A, GROUP_B,
    };
    use async_trait::async_trait;
    use crate::utils::ManualClock;
    use chrono::{Duration, TimeZone};

    struct Fixture {
        service: Arc<StockService>,
        source: Arc<ScriptedSource>,
        store: Arc<SqliteStore>,
        transport: Arc<RecordingTransport>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let source = Arc::new(ScriptedSource::default());
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let transport = Arc::new(RecordingTransport::default());
        let service = Arc::new(StockService::new(
            config().with_notify_interval(std::time::Duration::from_secs(3600)),
            source.clone(),
            store.clone(),
            transport.clone(),
            Arc::new(IdNameResolver),
            clock.clone(),
        ));
        Fixture {
            service,
            source,
            store,
            transport,
            clock,
        }
    }

    fn service_with(
        source: Arc<ScriptedSource>,
        repository: Arc<dyn Repository>,
        resolver: Arc<dyn NameResolver>,
    ) -> StockService {
        StockService::new(
            config(),
            source,
            repository,
            Arc::new(RecordingTransport::default()),
            resolver,
            Arc::new(ManualClock::new(Utc::now())),
        )
    }

    struct PilotNames;

    #[async_trait]
    impl NameResolver for PilotNames {
        async fn resolve_name(&self, id: i64) -> String {
            format!("Pilot {}", id)
        }
    }

    #[tokio::test]
    async fn test_iteration_notifies_once_per_interval() {
        let f = fixture();
        f.store
            .set_requirement("Svipul", &requirement("Svipul", 2, Channel::GroupA))
            .unwrap();
        f.source.set(vec![listing(1, "Svipul", GROUP_A)]);

        let first = f.service.run_iteration().await.unwrap();
        assert_eq!(first.gaps.len(), 1);
        assert_eq!(first.notified, vec!["Svipul".to_string()]);
        assert_eq!(f.transport.sent_count(), 1);
        assert_eq!(f.transport.sent()[0].0, ALERT_CHANNEL);

        let second = f.service.run_iteration().await.unwrap();
        assert_eq!(second.gaps.len(), 1);
        assert!(second.notified.is_empty());
        assert_eq!(f.transport.sent_count(), 1);

        f.clock.advance(Duration::seconds(3601));
        let third = f.service.run_iteration().await.unwrap();
        assert_eq!(third.notified.len(), 1);
        assert_eq!(f.transport.sent_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_delivery_is_retried() {
        let f = fixture();
        f.store
            .set_requirement("Svipul", &requirement("Svipul", 2, Channel::GroupA))
            .unwrap();
        f.transport.set_failing(true);

        let err = f.service.run_iteration().await.unwrap_err();
        assert!(matches!(err, EngineError::Transport(TransportError::Send(_))));
        assert!(f.service.gate().should_notify("Svipul"));

        f.transport.set_failing(false);
        let retried = f.service.run_iteration().await.unwrap();
        assert_eq!(retried.notified, vec!["Svipul".to_string()]);
    }

    #[tokio::test]
    async fn test_iteration_tracks_prices() {
        let f = fixture();
        f.store
            .set_requirement("Svipul", &requirement("Svipul", 1, Channel::GroupB))
            .unwrap();
        let issued = Utc.with_ymd_and_hms(2024, 3, 3, 3, 3, 3).unwrap();
        f.source.set(vec![
            listing(1, "Svipul", GROUP_B),
            sale(2, "Svipul", GROUP_B, 77, 250_000_000, issued),
        ]);

        let outcome = f.service.run_iteration().await.unwrap();

        assert!(outcome.gaps.is_empty());
        assert_eq!(outcome.price_summary.unwrap().recorded, 1);
        let stored = f.store.get_requirement("Svipul").unwrap().unwrap();
        assert_eq!(stored.reference_amount(), 250_000_000);
    }

    #[tokio::test]
    async fn test_set_requirement_and_delete() {
        let f = fixture();
        let outcome = f
            .service
            .handle(Command::SetRequirement {
                name: " Shield Drake ".to_string(),
                required_count: 4,
                channel: Channel::GroupB,
            })
            .await
            .unwrap();
        assert!(matches!(outcome, CommandOutcome::RequirementSet { deleted: false, .. }));
        assert_eq!(
            f.store.get_requirement("Shield Drake").unwrap().unwrap().required_count,
            4
        );

        f.service
            .handle(Command::SetRequirement {
                name: "Shield Drake".to_string(),
                required_count: 0,
                channel: Channel::GroupB,
            })
            .await
            .unwrap();
        assert!(f.store.get_requirement("Shield Drake").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_requirement_keeps_reference_price() {
        let f = fixture();
        f.store
            .set_requirement("Svipul", &requirement("Svipul", 2, Channel::GroupA))
            .unwrap();
        f.service
            .handle(Command::SetPrice {
                name: "Svipul".to_string(),
                amount: 95_000_000,
            })
            .await
            .unwrap();
        f.service
            .handle(Command::SetRequirement {
                name: "Svipul".to_string(),
                required_count: 6,
                channel: Channel::GroupA,
            })
            .await
            .unwrap();

        let stored = f.store.get_requirement("Svipul").unwrap().unwrap();
        assert_eq!(stored.required_count, 6);
        assert_eq!(stored.reference_amount(), 95_000_000);
    }

    #[tokio::test]
    async fn test_set_price_unknown_doctrine() {
        let f = fixture();
        let err = f
            .service
            .handle(Command::SetPrice {
                name: "Ghost".to_string(),
                amount: 1,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownDoctrine(ref name) if name == "Ghost"));
        assert!(err.is_user_facing());
    }

    #[tokio::test]
    async fn test_import_rejects_empty_and_replaces() {
        let f = fixture();
        f.store
            .set_requirement("Old", &requirement("Old", 1, Channel::GroupA))
            .unwrap();

        let err = f
            .service
            .handle(Command::ImportRequirements(Vec::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::EmptyImport));
        assert!(f.store.get_requirement("Old").unwrap().is_some());

        let outcome = f
            .service
            .handle(Command::ImportRequirements(vec![
                requirement("Svipul", 3, Channel::GroupA),
                requirement("Shield Drake", 2, Channel::GroupB),
            ]))
            .await
            .unwrap();
        assert_eq!(outcome, CommandOutcome::RequirementsImported(2));
        assert!(f.store.get_requirement("Old").unwrap().is_none());

        let CommandOutcome::Requirements(listed) =
            f.service.handle(Command::ListRequirements).await.unwrap()
        else {
            panic!("expected requirement list");
        };
        assert_eq!(listed[0].name, "Shield Drake");
    }

    #[tokio::test]
    async fn test_stock_counts_both_channels() {
        let f = fixture();
        let mut expired = listing(4, "Svipul", GROUP_A);
        expired.date_expired = Utc::now() - Duration::days(1);
        f.source.set(vec![
            listing(1, "Svipul", GROUP_A),
            listing(2, "Svipul", GROUP_B),
            listing(3, "Armor Hurricane", GROUP_B),
            expired,
        ]);

        let outcome = f.service.handle(Command::Stock).await.unwrap();
        assert_eq!(
            outcome,
            CommandOutcome::Stock(vec![
                ("Armor Hurricane".to_string(), 1),
                ("Svipul".to_string(), 2),
            ])
        );
    }

    #[tokio::test]
    async fn test_report_outcome_messages() {
        let f = fixture();
        let CommandOutcome::Missing(report) = f.service.handle(Command::Report).await.unwrap()
        else {
            panic!("expected missing report");
        };
        assert!(report.is_unconfigured());

        let replies = CommandOutcome::Missing(report).to_messages(f.clock.now());
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].body, "Nothing configured yet");
    }

    #[tokio::test]
    async fn test_leaderboard_defaults_to_current_month() {
        let f = fixture();
        let now = Utc.with_ymd_and_hms(2024, 7, 15, 12, 0, 0).unwrap();
        f.clock.set(now);
        f.store
            .replace_all_price_observations(&[
                crate::domain::PriceObservation::new("Svipul", now - Duration::days(2), 1, 42, 10),
                crate::domain::PriceObservation::new("Svipul", now - Duration::days(40), 2, 43, 10),
            ])
            .unwrap();

        let CommandOutcome::Leaderboard(board) = f
            .service
            .handle(Command::Leaderboard {
                start: None,
                end: None,
            })
            .await
            .unwrap()
        else {
            panic!("expected leaderboard");
        };
        assert_eq!(board.entries.len(), 1);
        assert_eq!(board.entries[0].issuer_id, 42);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let f = fixture();
        let (tx, rx) = watch::channel(false);
        let service = f.service.clone();
        let handle = tokio::spawn(async move { service.run(rx).await });

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        assert!(f.source.calls() >= 1);
    }

    #[tokio::test]
    async fn test_blank_requirement_names_rejected() {
        let f = fixture();
        f.store
            .set_requirement("Old", &requirement("Old", 1, Channel::GroupA))
            .unwrap();

        let err = f
            .service
            .handle(Command::SetRequirement {
                name: "   ".to_string(),
                required_count: 3,
                channel: Channel::GroupA,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidRequirement(_)));
        assert!(err.is_user_facing());

        let err = f
            .service
            .handle(Command::ImportRequirements(vec![
                requirement("Svipul", 3, Channel::GroupA),
                requirement(" ", 2, Channel::GroupB),
            ]))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidRequirement(_)));

        let names: Vec<String> = f
            .store
            .list_requirements()
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["Old"]);
    }

    #[tokio::test]
    async fn test_import_trims_names() {
        let f = fixture();
        f.service
            .handle(Command::ImportRequirements(vec![requirement(
                "  Svipul ",
                3,
                Channel::GroupA,
            )]))
            .await
            .unwrap();
        assert!(f.store.get_requirement("Svipul").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failed_store_write_keeps_state() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        let reference = ReferencePrice::new(90_000_000, Utc::now());
        store
            .set_requirement(
                "Svipul",
                &requirement("Svipul", 2, Channel::GroupA).with_reference_price(reference),
            )
            .unwrap();
        let failing = Arc::new(FailingStore::new(store.clone()));
        let service = service_with(
            Arc::new(ScriptedSource::default()),
            failing.clone(),
            Arc::new(IdNameResolver),
        );
        failing.set_failing(true);

        let err = service
            .handle(Command::SetPrice {
                name: "Svipul".to_string(),
                amount: 120_000_000,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Store(_)));
        assert!(!err.is_user_facing());

        let err = service
            .handle(Command::ImportRequirements(vec![requirement(
                "Shield Drake",
                1,
                Channel::GroupB,
            )]))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Store(_)));

        let stored = store.list_requirements().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].name, "Svipul");
        assert_eq!(stored[0].reference_price, Some(reference));
    }

    #[tokio::test]
    async fn test_report_full_resolves_alert_issuers() {
        let store = Arc::new(SqliteStore::open_in_memory().unwrap());
        store
            .set_requirement(
                "Svipul",
                &requirement("Svipul", 1, Channel::GroupA)
                    .with_reference_price(ReferencePrice::new(200_000_000, Utc::now())),
            )
            .unwrap();
        let source = Arc::new(ScriptedSource::new(vec![listing(1, "Svipul", GROUP_A)]));
        let service = service_with(source, store, Arc::new(PilotNames));

        let outcome = service.handle(Command::ReportFull).await.unwrap();
        let CommandOutcome::Full(report) = &outcome else {
            panic!("expected full report");
        };
        assert_eq!(report.alerts.len(), 1);
        assert_eq!(report.issuer_name(1001), "Pilot 1001");

        let rendered = outcome.to_messages(Utc::now());
        assert!(rendered
            .iter()
            .any(|m| m.body.contains("issuer Pilot 1001, reason **Price**")));
    }
}
