// ============================================================================
// Matching Module
// Fuzzy doctrine name matching and listing classification
// ============================================================================

mod classifier;
mod name_matcher;

pub use classifier::{AvailableCounts, ClassifiedListings, ListingClassifier};
pub use name_matcher::{jaccard_similarity, NameMatcher, DEFAULT_SIMILARITY_THRESHOLD};
