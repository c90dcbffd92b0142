//! Framebuffers: the concrete attachments a render pass draws into.

use crate::resources::{RenderPassHandle, TextureHandle};

/// Descriptor for creating a framebuffer.
#[derive(Debug, Clone, PartialEq)]
pub struct FramebufferDescriptor {
    pub name: String,
    pub render_pass: RenderPassHandle,
    pub color_attachments: Vec<TextureHandle>,
    pub depth_stencil_attachment: Option<TextureHandle>,
    pub width: u32,
    pub height: u32,
    /// Attachment size relative to the renderer size, used on resize.
    pub scale_x: f32,
    pub scale_y: f32,
    /// Whether [`GpuDevice::resize_framebuffer`](crate::GpuDevice::resize_framebuffer)
    /// recreates the attachments.
    pub resize: bool,
    /// When set, destroying the framebuffer leaves its attachments alive;
    /// their owner destroys them.
    pub manual_resources_free: bool,
}

impl Default for FramebufferDescriptor {
    fn default() -> Self {
        Self {
            name: String::new(),
            render_pass: RenderPassHandle::INVALID,
            color_attachments: Vec::new(),
            depth_stencil_attachment: None,
            width: 0,
            height: 0,
            scale_x: 1.0,
            scale_y: 1.0,
            resize: true,
            manual_resources_free: false,
        }
    }
}

/// A framebuffer living in the device's framebuffer pool.
#[derive(Debug, Clone)]
pub struct Framebuffer {
    pub(crate) descriptor: FramebufferDescriptor,
}

impl Framebuffer {
    pub fn descriptor(&self) -> &FramebufferDescriptor {
        &self.descriptor
    }

    pub fn width(&self) -> u32 {
        self.descriptor.width
    }

    pub fn height(&self) -> u32 {
        self.descriptor.height
    }

    pub fn color_attachments(&self) -> &[TextureHandle] {
        &self.descriptor.color_attachments
    }

    pub fn depth_stencil_attachment(&self) -> Option<TextureHandle> {
        self.descriptor.depth_stencil_attachment
    }

    /// Every attachment, colors first.
    pub fn attachments(&self) -> impl Iterator<Item = TextureHandle> + '_ {
        self.descriptor
            .color_attachments
            .iter()
            .copied()
            .chain(self.descriptor.depth_stencil_attachment)
    }
}
