// ============================================================================
// Utilities Module
// Helper types shared across the engine
// ============================================================================

mod clock;

pub use clock::{Clock, ManualClock, SystemClock};
