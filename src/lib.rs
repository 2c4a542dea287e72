// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod history;
pub mod metrics;
pub mod select;
pub mod sentiment;
pub mod signals;
pub mod text;
pub mod types;

// ---- Re-exports for stable public API ----
pub use crate::aggregate::Weights;
pub use crate::api::router;
pub use crate::config::EngineConfig;
pub use crate::engine::{HotnessEngine, RunOverrides, RunReport};
pub use crate::error::{EmbeddingError, HotnessError};
pub use crate::history::{HistoryStore, HistoryWindow, InMemoryHistory, JsonlHistory};
pub use crate::select::SelectionConfig;
pub use crate::types::{
    CandidateItem, PublishedRecord, ScoredItem, SignalKind, SkipReason, SkippedItem, Source,
    TopicProfile,
};
