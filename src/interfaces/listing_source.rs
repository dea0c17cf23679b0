// ============================================================================
// Listing Source Interface
// Contract for the external marketplace listing API
// ============================================================================

use crate::domain::ListingSnapshot;
use crate::errors::SourceError;
use async_trait::async_trait;
use tracing::debug;

/// Supplies the full, unfiltered listing set of an owning entity
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Every listing of `owner_id`, across all pages
    async fn fetch_all(&self, owner_id: i64) -> Result<Vec<ListingSnapshot>, SourceError>;
}

/// One page of an API response
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    pub listings: Vec<ListingSnapshot>,
    /// Total page count announced by the API
    pub total_pages: u32,
}

/// Page-wise access to a listing API (pages are numbered from 1)
#[async_trait]
pub trait ListingPages: Send + Sync {
    async fn fetch_page(&self, owner_id: i64, page: u32) -> Result<ListingPage, SourceError>;
}

/// `ListingSource` that follows every page of a `ListingPages` API
pub struct PaginatedSource<P> {
    pages: P,
}

impl<P: ListingPages> PaginatedSource<P> {
    pub fn new(pages: P) -> Self {
        Self { pages }
    }
}

#[async_trait]
impl<P: ListingPages> ListingSource for PaginatedSource<P> {
    async fn fetch_all(&self, owner_id: i64) -> Result<Vec<ListingSnapshot>, SourceError> {
        let first = self.pages.fetch_page(owner_id, 1).await?;
        let total_pages = first.total_pages;
        let mut listings = first.listings;

        for page in 2..=total_pages {
            let next = self.pages.fetch_page(owner_id, page).await?;
            listings.extend(next.listings);
        }

        debug!(owner_id, pages = total_pages.max(1), listings = listings.len(), "fetched listings");
        Ok(listings)
    }
}
