// ============================================================================
// Interfaces Module
// Contracts of the external collaborators the engine talks to
// ============================================================================

mod listing_source;
mod name_resolver;
mod transport;

pub use listing_source::{ListingPage, ListingPages, ListingSource, PaginatedSource};
pub use name_resolver::{CachingNameResolver, IdNameResolver, NameLookup, NameResolver};
pub use transport::{LoggingTransport, OutboundMessage, Transport};
