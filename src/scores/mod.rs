//! Scores: normalization and caching of AI analysis payloads.

pub mod cache;
pub mod normalize;

pub use cache::ScoreCache;
pub use normalize::{METRICS, ScoreCard, canonical_metric, normalize_scores};
