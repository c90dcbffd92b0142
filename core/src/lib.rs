//! # Vesper Core
//!
//! Engine-wide building blocks shared by the graphics crate:
//!
//! - [`pool`]: fixed-capacity arenas addressed by generation-checked handles
//! - [`parallel`]: scoped fork/join and `parallel_for`
//! - [`profiling`]: optional Tracy instrumentation macros

pub mod parallel;
pub mod pool;
pub mod profiling;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Logs the core version once at startup.
pub fn init() {
    log::info!("Vesper Core v{} initialized", VERSION);
}
