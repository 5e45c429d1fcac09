//! HTTP API for the host application
//!
//! This module provides a small REST API around a running bridge:
//! - GET /health - Health check
//! - GET /status - Bridge statistics
//! - POST /interrupt - Barge-in
//! - POST /events - Client event stream (`{"type": "interrupt"}` triggers barge-in)

mod handlers;
mod routes;
mod state;

pub use handlers::{ClientEvent, InterruptResponse};
pub use routes::create_router;
pub use state::AppState;
