//! Request and response models for the gateway API
//!
//! Normalized request parameters and the JSON envelopes every route returns.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{decode_component, normalize_path_segment, RankingKind, RequestParams};
pub use responses::{Envelope, ErrorEnvelope, HealthResponse, StatsResponse, StoreStats};
