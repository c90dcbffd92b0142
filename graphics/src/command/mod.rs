//! Command recording.
//!
//! - [`CommandBuffer`] validates and records commands into one backend
//!   command stream.
//! - [`CommandBufferManager`] owns the pre-allocated buffers of every
//!   `(frame, thread)` command pool.
//! - [`record_parallel`] records secondary buffers on worker threads and
//!   replays them into a primary buffer.

mod buffer;
mod manager;
mod parallel;

pub use buffer::{CommandBuffer, MAX_CLEAR_COLORS, RecordingState};
pub use manager::{CommandBufferManager, ParallelCommandBuffers};
pub use parallel::record_parallel;
