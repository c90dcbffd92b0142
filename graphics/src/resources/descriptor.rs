//! Descriptor set layouts and descriptor sets.
//!
//! A layout lists the binding slots a shader expects; a set fills those
//! slots with textures, buffers and samplers from the device pools. The
//! device checks every write against the layout before the backend sees it.

use crate::backend::{NativeDescriptorSet, NativeDescriptorSetLayout};
use crate::error::GraphicsError;

use super::{BufferHandle, DescriptorSetLayoutHandle, SamplerHandle, TextureHandle};

/// Type of resource a binding slot holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    Sampler,
    CombinedImageSampler,
    SampledImage,
    StorageImage,
    UniformBuffer,
    StorageBuffer,
}

impl DescriptorType {
    pub fn is_image(self) -> bool {
        matches!(
            self,
            Self::CombinedImageSampler | Self::SampledImage | Self::StorageImage
        )
    }

    pub fn is_buffer(self) -> bool {
        matches!(self, Self::UniformBuffer | Self::StorageBuffer)
    }
}

/// One binding slot of a layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DescriptorBinding {
    pub binding: u16,
    pub descriptor_type: DescriptorType,
    /// Array length; at least one.
    pub count: u16,
    pub name: String,
}

/// Descriptor for creating a descriptor set layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DescriptorSetLayoutDescriptor {
    pub name: String,
    /// Set number the layout is bound at.
    pub set_index: u16,
    pub bindings: Vec<DescriptorBinding>,
}

impl DescriptorSetLayoutDescriptor {
    pub fn new(name: impl Into<String>, set_index: u16) -> Self {
        Self {
            name: name.into(),
            set_index,
            bindings: Vec::new(),
        }
    }

    /// Adds a single-element binding.
    pub fn with_binding(
        mut self,
        binding: u16,
        descriptor_type: DescriptorType,
        name: impl Into<String>,
    ) -> Self {
        self.bindings.push(DescriptorBinding {
            binding,
            descriptor_type,
            count: 1,
            name: name.into(),
        });
        self
    }

    pub fn binding(&self, binding: u16) -> Option<&DescriptorBinding> {
        self.bindings.iter().find(|b| b.binding == binding)
    }

    pub(crate) fn validate(&self) -> Result<(), GraphicsError> {
        for (i, binding) in self.bindings.iter().enumerate() {
            if binding.count == 0 {
                return Err(GraphicsError::InvalidParameter(format!(
                    "descriptor set layout {}: binding {} has zero count",
                    self.name, binding.binding
                )));
            }
            if self.bindings[..i].iter().any(|b| b.binding == binding.binding) {
                return Err(GraphicsError::InvalidParameter(format!(
                    "descriptor set layout {}: binding {} declared twice",
                    self.name, binding.binding
                )));
            }
        }
        Ok(())
    }
}

/// A resource written into a descriptor set slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorResource {
    Texture(TextureHandle),
    Buffer(BufferHandle),
    Sampler(SamplerHandle),
}

/// Fills binding `binding` of a set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorWrite {
    pub binding: u16,
    pub resource: DescriptorResource,
    /// Sampler of a combined image sampler binding.
    pub sampler: Option<SamplerHandle>,
}

/// Descriptor for creating a descriptor set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DescriptorSetDescriptor {
    pub name: String,
    pub layout: DescriptorSetLayoutHandle,
    pub writes: Vec<DescriptorWrite>,
}

impl DescriptorSetDescriptor {
    pub fn new(name: impl Into<String>, layout: DescriptorSetLayoutHandle) -> Self {
        Self {
            name: name.into(),
            layout,
            writes: Vec::new(),
        }
    }

    fn with_write(
        mut self,
        binding: u16,
        resource: DescriptorResource,
        sampler: Option<SamplerHandle>,
    ) -> Self {
        self.writes.push(DescriptorWrite {
            binding,
            resource,
            sampler,
        });
        self
    }

    pub fn with_texture(self, binding: u16, texture: TextureHandle) -> Self {
        self.with_write(binding, DescriptorResource::Texture(texture), None)
    }

    pub fn with_texture_sampler(
        self,
        binding: u16,
        texture: TextureHandle,
        sampler: SamplerHandle,
    ) -> Self {
        self.with_write(binding, DescriptorResource::Texture(texture), Some(sampler))
    }

    pub fn with_buffer(self, binding: u16, buffer: BufferHandle) -> Self {
        self.with_write(binding, DescriptorResource::Buffer(buffer), None)
    }

    pub fn with_sampler(self, binding: u16, sampler: SamplerHandle) -> Self {
        self.with_write(binding, DescriptorResource::Sampler(sampler), None)
    }
}

/// A descriptor set layout living in the device's layout pool.
#[derive(Debug, Clone)]
pub struct DescriptorSetLayout {
    pub(crate) descriptor: DescriptorSetLayoutDescriptor,
    pub(crate) layout: NativeDescriptorSetLayout,
}

impl DescriptorSetLayout {
    pub fn descriptor(&self) -> &DescriptorSetLayoutDescriptor {
        &self.descriptor
    }

    pub fn set_index(&self) -> u16 {
        self.descriptor.set_index
    }

    pub fn native(&self) -> NativeDescriptorSetLayout {
        self.layout
    }
}

/// A descriptor set living in the device's descriptor set pool.
#[derive(Debug, Clone)]
pub struct DescriptorSet {
    pub(crate) descriptor: DescriptorSetDescriptor,
    pub(crate) set: NativeDescriptorSet,
}

impl DescriptorSet {
    pub fn descriptor(&self) -> &DescriptorSetDescriptor {
        &self.descriptor
    }

    /// The layout the set was created with. It may have been destroyed
    /// since.
    pub fn layout(&self) -> DescriptorSetLayoutHandle {
        self.descriptor.layout
    }

    pub fn native(&self) -> NativeDescriptorSet {
        self.set
    }
}
