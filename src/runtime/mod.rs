//! # Runtime
//!
//! Operator process lifecycle.
//!
//! - `initialization.rs` - startup: tracing, metrics, servers, client
//! - `watch_loop.rs` - the controllers and their restart loop
//! - `error_policy.rs` - per-resource backoff and stream error handling

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;

pub use initialization::{initialize, InitializationResult};
pub use watch_loop::run_watch_loop;
