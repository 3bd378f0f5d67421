//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlProgress`: the resume point (consonant, syllable, page)
//! - `CrawlPhase`: the driver's state machine
//! - `QuotaState`: requests used in the current daily window
//! - `CheckpointStore`: durable storage for `CrawlProgress`

mod checkpoint;
mod crawl_phase;
mod progress;
mod quota_state;

// Re-export main types
pub use checkpoint::{CheckpointError, CheckpointStore, FileCheckpoint, MemoryCheckpoint};
pub use crawl_phase::CrawlPhase;
pub use progress::CrawlProgress;
pub use quota_state::QuotaState;
