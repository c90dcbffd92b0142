//! # Vesper Graphics
//!
//! Rendering core built around an explicit frame graph.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`GpuDevice`] - GPU resource registry with generation-checked handles
//! - [`CommandBuffer`] / [`CommandBufferManager`] - validated command
//!   recording over per-frame, per-thread command pools
//! - [`RenderGraph`] - declarative passes, compiled into an execution order
//!   with aliased attachment memory
//! - [`GpuBackend`] - trait for backend implementations: a Dummy backend
//!   for testing and Vulkan conversions behind `vulkan-backend`
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use vesper_graphics::graph::{NodeCreation, ResourceOutputCreation};
//! use vesper_graphics::resources::RenderPassOperation;
//! use vesper_graphics::types::TextureFormat;
//! use vesper_graphics::{CommandBufferManager, DummyBackend, GpuDevice, GraphicsConfig, RenderGraph};
//!
//! let device = GpuDevice::new(Arc::new(DummyBackend::new()), GraphicsConfig::default());
//! device.set_renderer_size(1280, 720);
//!
//! let mut graph = RenderGraph::new(Arc::clone(&device));
//! graph.add_node(&NodeCreation::graphics("main").with_output(
//!     ResourceOutputCreation::attachment("color", TextureFormat::Rgba8Unorm, RenderPassOperation::Clear),
//! ))?;
//! graph.compile()?;
//!
//! let mut commands = CommandBufferManager::new(device)?;
//! commands.reset(0);
//! let cmd = commands.get_primary_cmd(0, 0, true);
//! graph.render(cmd);
//! cmd.end();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod backend;
pub mod command;
pub mod compiler;
pub mod config;
pub mod device;
pub mod error;
pub mod executor;
pub mod graph;
pub mod profiling;
pub mod resources;
pub mod types;

// Re-export main types for convenience
#[cfg(feature = "dummy")]
pub use backend::DummyBackend;
pub use backend::{CommandStream, GpuBackend};
pub use command::{CommandBuffer, CommandBufferManager, record_parallel};
pub use config::{ConfigError, GraphicsConfig};
pub use device::{DeviceCapabilities, GpuDevice};
pub use error::GraphicsError;
pub use graph::{GraphError, NodeCreation, PassContainer, RenderGraph};
pub use resources::ResourceState;
pub use types::{Extent2d, TextureDescriptor, TextureFormat, TextureUsage};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the graphics subsystem.
///
/// This should be called before using any graphics functionality.
pub fn init() {
    vesper_core::init();
    log::info!("Vesper Graphics v{} initialized", VERSION);
}
