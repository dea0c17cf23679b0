// ============================================================================
// Listing Classifier
// Filters raw listings and partitions them by distribution channel
// ============================================================================

use crate::domain::{Channel, EngineConfig, ExchangeType, ListingSnapshot, ListingStatus};
use crate::matching::NameMatcher;
use chrono::{DateTime, Utc};

/// Listings of one poll split by the channel they are pledged to
#[derive(Debug, Clone, Default)]
pub struct ClassifiedListings<'a> {
    pub group_a: Vec<&'a ListingSnapshot>,
    pub group_b: Vec<&'a ListingSnapshot>,
}

impl<'a> ClassifiedListings<'a> {
    pub fn for_channel(&self, channel: Channel) -> &[&'a ListingSnapshot] {
        match channel {
            Channel::GroupA => &self.group_a,
            Channel::GroupB => &self.group_b,
        }
    }

    /// Both channels, group A first
    pub fn all(&self) -> impl Iterator<Item = &'a ListingSnapshot> + '_ {
        self.group_a.iter().chain(self.group_b.iter()).copied()
    }

    pub fn len(&self) -> usize {
        self.group_a.len() + self.group_b.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append another classification (e.g. a second status) to this one
    pub fn extend(&mut self, other: ClassifiedListings<'a>) {
        self.group_a.extend(other.group_a);
        self.group_b.extend(other.group_b);
    }
}

/// Listing counts grouped by representative title, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailableCounts {
    groups: Vec<(String, u32)>,
}

impl AvailableCounts {
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.groups.iter().map(|(title, count)| (title.as_str(), *count))
    }

    /// Count for an exact representative title
    pub fn get(&self, title: &str) -> Option<u32> {
        self.groups
            .iter()
            .find(|(key, _)| key == title)
            .map(|(_, count)| *count)
    }

    /// Sum of every group whose representative title matches `required`
    pub fn matching_total(&self, matcher: &NameMatcher, required: &str) -> u32 {
        self.groups
            .iter()
            .filter(|(title, _)| matcher.matches(required, title))
            .map(|(_, count)| *count)
            .sum()
    }

    pub fn total(&self) -> u32 {
        self.groups.iter().map(|(_, count)| *count).sum()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Groups sorted by title, for display
    pub fn sorted(&self) -> Vec<(String, u32)> {
        let mut out = self.groups.clone();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    fn add(&mut self, matcher: &NameMatcher, title: &str) {
        // First representative wins; later near-duplicates fold into it.
        if let Some((_, count)) = self
            .groups
            .iter_mut()
            .find(|(key, _)| matcher.matches(key, title))
        {
            *count += 1;
            return;
        }
        self.groups.push((title.to_string(), 1));
    }
}

/// Filters and partitions listings by status, exchange type, expiry and channel
#[derive(Debug, Clone, Copy)]
pub struct ListingClassifier {
    group_a_assignee: i64,
    group_b_assignee: i64,
    matcher: NameMatcher,
}

impl ListingClassifier {
    pub fn new(group_a_assignee: i64, group_b_assignee: i64, matcher: NameMatcher) -> Self {
        Self {
            group_a_assignee,
            group_b_assignee,
            matcher,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.group_a_assignee,
            config.group_b_assignee,
            NameMatcher::new(config.similarity_threshold),
        )
    }

    pub fn matcher(&self) -> &NameMatcher {
        &self.matcher
    }

    /// Channel a listing is pledged to, if any
    pub fn channel_of(&self, listing: &ListingSnapshot) -> Option<Channel> {
        if listing.assignee_id == self.group_a_assignee {
            Some(Channel::GroupA)
        } else if listing.assignee_id == self.group_b_assignee {
            Some(Channel::GroupB)
        } else {
            None
        }
    }

    /// Keep listings with the given status and exchange type, optionally
    /// dropping expired ones, and split them by assignee. Listings assigned
    /// to neither channel are dropped.
    pub fn classify<'a>(
        &self,
        listings: &'a [ListingSnapshot],
        status: ListingStatus,
        exchange_type: ExchangeType,
        skip_expired: bool,
        now: DateTime<Utc>,
    ) -> ClassifiedListings<'a> {
        let mut out = ClassifiedListings::default();

        for listing in listings {
            if listing.exchange_type != exchange_type || listing.status != status {
                continue;
            }
            if skip_expired && listing.is_expired(now) {
                continue;
            }
            match self.channel_of(listing) {
                Some(Channel::GroupA) => out.group_a.push(listing),
                Some(Channel::GroupB) => out.group_b.push(listing),
                None => {},
            }
        }

        out
    }

    /// Count stock listings per doctrine title. Price-tracking listings
    /// represent completed sales and are skipped.
    pub fn available_counts<'a, I>(&self, listings: I) -> AvailableCounts
    where
        I: IntoIterator<Item = &'a ListingSnapshot>,
    {
        let mut counts = AvailableCounts::default();
        for listing in listings {
            if listing.is_price_tracking() {
                continue;
            }
            counts.add(&self.matcher, &listing.title);
        }
        counts
    }
}
