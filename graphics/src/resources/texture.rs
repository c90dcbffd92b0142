//! GPU texture record.

use crate::backend::NativeImage;
use crate::resources::{ResourceState, TextureHandle};
use crate::types::{Extent2d, TextureDescriptor, TextureFormat};

/// A texture living in the device's texture pool.
///
/// The record tracks the texture's last [`ResourceState`]; only
/// [`CommandBuffer::add_image_barrier`](crate::command::CommandBuffer::add_image_barrier)
/// changes it after creation.
#[derive(Debug, Clone)]
pub struct Texture {
    pub(crate) descriptor: TextureDescriptor,
    pub(crate) state: ResourceState,
    pub(crate) image: NativeImage,
    pub(crate) alias_of: Option<TextureHandle>,
}

impl Texture {
    pub fn descriptor(&self) -> &TextureDescriptor {
        &self.descriptor
    }

    pub fn size(&self) -> Extent2d {
        self.descriptor.size
    }

    pub fn width(&self) -> u32 {
        self.descriptor.size.width
    }

    pub fn height(&self) -> u32 {
        self.descriptor.size.height
    }

    pub fn format(&self) -> TextureFormat {
        self.descriptor.format
    }

    pub fn mip_level_count(&self) -> u32 {
        self.descriptor.mip_level_count
    }

    /// Current resource state.
    pub fn state(&self) -> ResourceState {
        self.state
    }

    /// Backend image object.
    pub fn image(&self) -> NativeImage {
        self.image
    }

    /// The texture whose memory this one was created on, if aliased.
    pub fn alias_of(&self) -> Option<TextureHandle> {
        self.alias_of
    }

    pub fn label(&self) -> Option<&str> {
        self.descriptor.label.as_deref()
    }
}
