//! GPU resources.
//!
//! Every resource kind lives in its own fixed-capacity [`ResourcePool`] inside
//! a [`ResourceRegistry`] owned by the [`GpuDevice`]. Callers hold typed
//! [`Handle`]s; a handle does not keep its resource alive, and a handle to a
//! destroyed resource resolves to `None` instead of to whatever reused the
//! slot.
//!
//! | Record | Handle | Created by |
//! |--------|--------|------------|
//! | [`Texture`] | [`TextureHandle`] | [`GpuDevice::create_texture`] |
//! | [`Buffer`] | [`BufferHandle`] | [`GpuDevice::create_buffer`] |
//! | [`Pipeline`] | [`PipelineHandle`] | [`GpuDevice::create_pipeline`] |
//! | [`RenderPass`] | [`RenderPassHandle`] | [`GpuDevice::create_render_pass`] |
//! | [`Framebuffer`] | [`FramebufferHandle`] | [`GpuDevice::create_framebuffer`] |
//! | [`Sampler`] | [`SamplerHandle`] | [`GpuDevice::create_sampler`] |
//! | [`DescriptorSetLayout`] | [`DescriptorSetLayoutHandle`] | [`GpuDevice::create_descriptor_set_layout`] |
//! | [`DescriptorSet`] | [`DescriptorSetHandle`] | [`GpuDevice::create_descriptor_set`] |
//! | [`Shader`] | [`ShaderHandle`] | [`GpuDevice::create_shader`] |
//!
//! [`GpuDevice`]: crate::GpuDevice
//! [`GpuDevice::create_texture`]: crate::GpuDevice::create_texture
//! [`GpuDevice::create_buffer`]: crate::GpuDevice::create_buffer
//! [`GpuDevice::create_pipeline`]: crate::GpuDevice::create_pipeline
//! [`GpuDevice::create_render_pass`]: crate::GpuDevice::create_render_pass
//! [`GpuDevice::create_framebuffer`]: crate::GpuDevice::create_framebuffer
//! [`GpuDevice::create_sampler`]: crate::GpuDevice::create_sampler
//! [`GpuDevice::create_descriptor_set_layout`]: crate::GpuDevice::create_descriptor_set_layout
//! [`GpuDevice::create_descriptor_set`]: crate::GpuDevice::create_descriptor_set
//! [`GpuDevice::create_shader`]: crate::GpuDevice::create_shader

mod buffer;
mod descriptor;
mod framebuffer;
mod pipeline;
mod render_pass;
mod sampler;
mod shader;
mod state;
mod texture;

pub use buffer::Buffer;
pub use descriptor::{
    DescriptorBinding, DescriptorResource, DescriptorSet, DescriptorSetDescriptor,
    DescriptorSetLayout, DescriptorSetLayoutDescriptor, DescriptorType, DescriptorWrite,
};
pub use framebuffer::{Framebuffer, FramebufferDescriptor};
pub use pipeline::{Pipeline, PipelineBindPoint, PipelineDescriptor};
pub use render_pass::{RenderPass, RenderPassDescriptor, RenderPassOperation};
pub use sampler::Sampler;
pub use shader::{Shader, ShaderDescriptor, ShaderStage, ShaderStageCode};
pub use state::{AccessFlags, ImageLayout, PipelineStages, QueueType, ResourceState};
pub use texture::Texture;

use vesper_core::pool::{Handle, ResourcePool};

use crate::config::PoolConfig;

pub type TextureHandle = Handle<Texture>;
pub type BufferHandle = Handle<Buffer>;
pub type PipelineHandle = Handle<Pipeline>;
pub type RenderPassHandle = Handle<RenderPass>;
pub type FramebufferHandle = Handle<Framebuffer>;
pub type SamplerHandle = Handle<Sampler>;
pub type DescriptorSetLayoutHandle = Handle<DescriptorSetLayout>;
pub type DescriptorSetHandle = Handle<DescriptorSet>;
pub type ShaderHandle = Handle<Shader>;

/// All resource pools of a device.
#[derive(Debug)]
pub struct ResourceRegistry {
    pub(crate) textures: ResourcePool<Texture>,
    pub(crate) buffers: ResourcePool<Buffer>,
    pub(crate) pipelines: ResourcePool<Pipeline>,
    pub(crate) render_passes: ResourcePool<RenderPass>,
    pub(crate) framebuffers: ResourcePool<Framebuffer>,
    pub(crate) samplers: ResourcePool<Sampler>,
    pub(crate) descriptor_set_layouts: ResourcePool<DescriptorSetLayout>,
    pub(crate) descriptor_sets: ResourcePool<DescriptorSet>,
    pub(crate) shaders: ResourcePool<Shader>,
}

impl ResourceRegistry {
    pub fn new(config: &PoolConfig) -> Self {
        Self {
            textures: ResourcePool::new(config.textures),
            buffers: ResourcePool::new(config.buffers),
            pipelines: ResourcePool::new(config.pipelines),
            render_passes: ResourcePool::new(config.render_passes),
            framebuffers: ResourcePool::new(config.framebuffers),
            samplers: ResourcePool::new(config.samplers),
            descriptor_set_layouts: ResourcePool::new(config.descriptor_set_layouts),
            descriptor_sets: ResourcePool::new(config.descriptor_sets),
            shaders: ResourcePool::new(config.shaders),
        }
    }

    pub fn texture(&self, handle: TextureHandle) -> Option<&Texture> {
        self.textures.get(handle)
    }

    pub(crate) fn texture_mut(&mut self, handle: TextureHandle) -> Option<&mut Texture> {
        self.textures.get_mut(handle)
    }

    pub fn buffer(&self, handle: BufferHandle) -> Option<&Buffer> {
        self.buffers.get(handle)
    }

    pub fn pipeline(&self, handle: PipelineHandle) -> Option<&Pipeline> {
        self.pipelines.get(handle)
    }

    pub fn render_pass(&self, handle: RenderPassHandle) -> Option<&RenderPass> {
        self.render_passes.get(handle)
    }

    pub fn framebuffer(&self, handle: FramebufferHandle) -> Option<&Framebuffer> {
        self.framebuffers.get(handle)
    }

    pub fn sampler(&self, handle: SamplerHandle) -> Option<&Sampler> {
        self.samplers.get(handle)
    }

    pub fn descriptor_set_layout(
        &self,
        handle: DescriptorSetLayoutHandle,
    ) -> Option<&DescriptorSetLayout> {
        self.descriptor_set_layouts.get(handle)
    }

    pub fn descriptor_set(&self, handle: DescriptorSetHandle) -> Option<&DescriptorSet> {
        self.descriptor_sets.get(handle)
    }

    pub fn shader(&self, handle: ShaderHandle) -> Option<&Shader> {
        self.shaders.get(handle)
    }

    /// Resolves the alias chain of `handle` to the texture whose memory it
    /// occupies.
    ///
    /// A texture that is not aliased owns its memory and is returned as is.
    /// The walk stops at the first alias target that no longer exists.
    pub fn memory_owner(&self, handle: TextureHandle) -> TextureHandle {
        let mut owner = handle;
        while let Some(next) = self.textures.get(owner).and_then(|t| t.alias_of) {
            if !self.textures.contains(next) {
                break;
            }
            owner = next;
        }
        owner
    }

    /// Number of live textures.
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn render_pass_count(&self) -> usize {
        self.render_passes.len()
    }

    pub fn framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }

    pub fn descriptor_set_count(&self) -> usize {
        self.descriptor_sets.len()
    }
}
