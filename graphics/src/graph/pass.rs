//! User callbacks attached to render graph nodes.

use crate::command::CommandBuffer;
use crate::device::GpuDevice;

/// Rendering code of one graph node.
///
/// The executor prepares barriers, viewport and render pass around these
/// calls; implementations only record their own work. Every method
/// defaults to doing nothing.
///
/// ```
/// use vesper_graphics::command::CommandBuffer;
/// use vesper_graphics::graph::PassContainer;
///
/// struct Fullscreen;
///
/// impl PassContainer for Fullscreen {
///     fn render(&mut self, cmd: &mut CommandBuffer) {
///         cmd.draw(0, 3, 0, 1);
///     }
/// }
/// ```
pub trait PassContainer: Send {
    /// Called before the node's render pass is bound.
    fn pre_render(&mut self, _cmd: &mut CommandBuffer) {}

    /// Called with the node's render pass bound (graphics nodes).
    fn render(&mut self, _cmd: &mut CommandBuffer) {}

    /// Called after the node's render pass ended.
    fn post_render(&mut self, _cmd: &mut CommandBuffer) {}

    /// Called after the node's framebuffer was resized.
    fn on_resize(&mut self, _device: &GpuDevice, _width: u32, _height: u32) {}

    /// Called when shaders and pipelines were reloaded.
    fn on_techniques_reloaded(&mut self) {}
}

/// Container used by nodes without registered rendering code.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyPass;

impl PassContainer for EmptyPass {}
