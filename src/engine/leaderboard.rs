// ============================================================================
// Leaderboard
// Per-issuer sales statistics over a time range
// ============================================================================

use crate::domain::{PriceObservation, MANUAL_ISSUER_ID};
use crate::errors::EngineResult;
use crate::interfaces::NameResolver;
use crate::store::Repository;
use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use std::collections::HashMap;

pub const LEADERBOARD_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub issuer_id: i64,
    pub issuer_name: String,
    pub contracts: usize,
    pub total_price: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaderboard {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub entries: Vec<LeaderboardEntry>,
}

/// First and last second of the calendar month containing `now`
pub fn month_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let (year, month) = (now.year(), now.month());
    let start = Utc
        .with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or(now);
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let end = Utc
        .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
        .single()
        .map(|next| next - Duration::seconds(1))
        .unwrap_or(now);
    (start, end)
}

/// `(issuer, contracts, total)` ranked by contracts, then total, then issuer id.
/// Unattributed observations are ignored.
pub fn rank_issuers(observations: &[PriceObservation]) -> Vec<(i64, usize, u64)> {
    let mut per_issuer: HashMap<i64, (usize, u64)> = HashMap::new();
    for observation in observations {
        if observation.issuer_id == MANUAL_ISSUER_ID {
            continue;
        }
        let stats = per_issuer.entry(observation.issuer_id).or_default();
        stats.0 += 1;
        stats.1 = stats.1.saturating_add(observation.price);
    }

    let mut ranked: Vec<(i64, usize, u64)> = per_issuer
        .into_iter()
        .map(|(issuer, (contracts, total))| (issuer, contracts, total))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(b.2.cmp(&a.2)).then(a.0.cmp(&b.0)));
    ranked.truncate(LEADERBOARD_SIZE);
    ranked
}

/// Top issuers of price observations in `[start, end]`
pub async fn build_leaderboard(
    repository: &dyn Repository,
    resolver: &dyn NameResolver,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> EngineResult<Leaderboard> {
    let observations = repository.query_prices_in_range(None, start, end)?;

    let mut entries = Vec::new();
    for (issuer_id, contracts, total_price) in rank_issuers(&observations) {
        entries.push(LeaderboardEntry {
            issuer_id,
            issuer_name: resolver.resolve_name(issuer_id).await,
            contracts,
            total_price,
        });
    }

    Ok(Leaderboard {
        start,
        end,
        entries,
    })
}
