//! API Module
//!
//! HTTP surface of the gateway.
//!
//! # Endpoints
//! - `GET /api/v2/manga` - Provider list
//! - `GET /api/v2/manga/mangahere/{info,read,rankings,hot,trending,recent-updates,home}`
//! - `GET /api/v2/manga/mangahere/:query` - Search
//! - `GET /health` - Health check endpoint
//! - `GET /v` - Version text
//! - `GET /stats` - Cache statistics

pub mod handlers;
pub mod routes;

pub use handlers::{AppState, CACHE_EXPIRY_HEADER};
pub use routes::{cache_control_value, create_router, BASE_PATH};
