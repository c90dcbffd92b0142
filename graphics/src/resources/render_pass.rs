//! Render pass descriptions.
//!
//! Rendering uses dynamic rendering, so a render pass is only the list of
//! attachment formats and what happens to each attachment when the pass
//! begins. The attachments themselves come from a
//! [`Framebuffer`](super::Framebuffer).

use crate::types::TextureFormat;

/// What happens to an attachment's previous contents when a pass begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RenderPassOperation {
    #[default]
    DontCare,
    Load,
    Clear,
}

/// Descriptor for creating a render pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RenderPassDescriptor {
    pub name: String,
    pub color_formats: Vec<TextureFormat>,
    /// One operation per entry in `color_formats`.
    pub color_operations: Vec<RenderPassOperation>,
    /// `None` when the pass has no depth attachment.
    pub depth_format: Option<TextureFormat>,
    pub depth_operation: RenderPassOperation,
    pub stencil_operation: RenderPassOperation,
}

impl RenderPassDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Appends a color attachment.
    pub fn with_color(mut self, format: TextureFormat, operation: RenderPassOperation) -> Self {
        self.color_formats.push(format);
        self.color_operations.push(operation);
        self
    }

    /// Sets the depth attachment.
    pub fn with_depth(mut self, format: TextureFormat, operation: RenderPassOperation) -> Self {
        self.depth_format = Some(format);
        self.depth_operation = operation;
        self
    }

    pub fn num_render_targets(&self) -> usize {
        self.color_formats.len()
    }
}

/// A render pass living in the device's render pass pool.
#[derive(Debug, Clone)]
pub struct RenderPass {
    pub(crate) descriptor: RenderPassDescriptor,
}

impl RenderPass {
    pub fn descriptor(&self) -> &RenderPassDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}
