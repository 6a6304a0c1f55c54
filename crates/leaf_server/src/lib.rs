//! HTTP service for the leaf classifier.
//!
//! Routes:
//! - `GET  /api/health`
//! - `GET  /api/labels`
//! - `POST /analyze` (multipart upload or camera capture)
//! - `POST /api/analyze` (JSON `{ "image": "<data URI>" }`)
//! - `GET  /api/fertilizer-shops?lat=..&lng=..[&format=geojson]`

pub mod config;
pub mod error;
pub mod handlers;
pub mod responses;
pub mod server;

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult, ServerError};
pub use handlers::{AppState, create_router};
pub use server::{LeafServer, build_app, wait_for_shutdown};
