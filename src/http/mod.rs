//! HTTP control surface
//!
//! The start/stop affordances and the two status displays of the UI:
//! - POST /record/start - Start recording
//! - POST /record/stop - Stop recording and save the artifact
//! - GET /status - Connection and recording status
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
