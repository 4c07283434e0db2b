//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`download`]: run a task and stream the artifact back
//! - [`progress`]: per-task progress as server-sent events
//! - [`system`]: health, capabilities, OpenAPI

mod download;
mod progress;
mod system;

// Re-export all handlers so `routes::function_name` works
pub use download::*;
pub use progress::*;
pub use system::*;
