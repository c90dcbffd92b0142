//! GPU backend abstraction layer.
//!
//! The device and command buffers talk to the graphics API through two
//! traits:
//!
//! - [`GpuBackend`] creates and destroys native objects and hands out
//!   command streams from per-thread, per-frame command pools.
//! - [`CommandStream`] is one native command buffer. It receives fully
//!   resolved commands: native object ids, layouts, access masks. It never
//!   sees pool handles.
//!
//! # Available Backends
//!
//! - `dummy` (default): records every command in memory, used by tests
//! - `vulkan-backend`: conversions from the API-neutral types to `ash`

#[cfg(feature = "dummy")]
pub mod dummy;

#[cfg(feature = "vulkan-backend")]
pub mod vulkan;

#[cfg(feature = "dummy")]
pub use dummy::{DummyBackend, RecordedCommand};

use crate::error::GraphicsError;
use crate::resources::{
    AccessFlags, DescriptorSetDescriptor, DescriptorSetLayoutDescriptor, ImageLayout,
    PipelineBindPoint, PipelineDescriptor, PipelineStages, RenderPassOperation, ShaderDescriptor,
};
use crate::types::{
    BufferDescriptor, ClearValue, IndexFormat, SamplerDescriptor, ScissorRect, TextureDescriptor,
    TextureFormat, Viewport,
};

macro_rules! native_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(pub u64);

        impl $name {
            pub const NULL: Self = Self(0);

            pub fn is_null(self) -> bool {
                self.0 == 0
            }
        }
    };
}

native_handle!(
    /// Backend image object.
    NativeImage
);
native_handle!(
    /// Backend buffer object.
    NativeBuffer
);
native_handle!(
    /// Backend pipeline object.
    NativePipeline
);
native_handle!(
    /// Backend sampler object.
    NativeSampler
);
native_handle!(
    /// Backend descriptor set layout object.
    NativeDescriptorSetLayout
);
native_handle!(
    /// Backend descriptor set object.
    NativeDescriptorSet
);
native_handle!(
    /// Backend shader module set.
    NativeShader
);
native_handle!(
    /// Backend command buffer object.
    NativeCommandBuffer
);

/// Primary buffers are submitted to a queue; secondary buffers are replayed
/// inside a primary buffer's render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CommandBufferLevel {
    #[default]
    Primary,
    Secondary,
}

/// Render target description a secondary buffer inherits from the pass it
/// executes in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InheritanceInfo {
    pub color_formats: Vec<TextureFormat>,
    pub depth_format: Option<TextureFormat>,
    pub sample_count: u32,
}

/// Parameters of [`CommandStream::begin`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BeginInfo {
    pub one_time_submit: bool,
    /// Present for secondary buffers that continue a render pass.
    pub inheritance: Option<InheritanceInfo>,
}

/// One attachment of a dynamic rendering scope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderingAttachment {
    pub image: NativeImage,
    pub layout: ImageLayout,
    pub load: RenderPassOperation,
    /// Attachments are always stored.
    pub store: bool,
    /// Only meaningful when `load` is [`RenderPassOperation::Clear`].
    pub clear: ClearValue,
}

/// Parameters of [`CommandStream::begin_rendering`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderingInfo {
    pub render_area: ScissorRect,
    pub color_attachments: Vec<RenderingAttachment>,
    pub depth_attachment: Option<RenderingAttachment>,
    /// Draws are recorded into secondary buffers executed inside the scope.
    pub secondary_contents: bool,
}

/// A fully resolved image memory barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageBarrier {
    pub image: NativeImage,
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
    pub src_stages: PipelineStages,
    pub dst_stages: PipelineStages,
    pub old_layout: ImageLayout,
    pub new_layout: ImageLayout,
    /// Depth aspect when set, color aspect otherwise.
    pub depth_aspect: bool,
    pub base_mip_level: u32,
    pub mip_level_count: u32,
}

/// A native command buffer.
///
/// Implementations only encode; state tracking and validation happen in
/// [`CommandBuffer`](crate::command::CommandBuffer).
pub trait CommandStream: Send {
    fn native(&self) -> NativeCommandBuffer;
    fn level(&self) -> CommandBufferLevel;

    fn begin(&mut self, info: &BeginInfo);
    fn end(&mut self);

    fn begin_rendering(&mut self, info: &RenderingInfo);
    fn end_rendering(&mut self);

    fn set_viewport(&mut self, viewport: &Viewport);
    fn set_scissor(&mut self, scissor: &ScissorRect);

    fn bind_pipeline(&mut self, bind_point: PipelineBindPoint, pipeline: NativePipeline);
    fn bind_descriptor_set(
        &mut self,
        bind_point: PipelineBindPoint,
        set_index: u32,
        set: NativeDescriptorSet,
    );
    fn bind_vertex_buffer(&mut self, buffer: NativeBuffer, binding: u32, offset: u64);
    fn bind_index_buffer(&mut self, buffer: NativeBuffer, offset: u64, format: IndexFormat);

    fn draw(&mut self, first_vertex: u32, vertex_count: u32, first_instance: u32, instance_count: u32);
    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    );
    fn draw_indirect(&mut self, buffer: NativeBuffer, offset: u64, draw_count: u32, stride: u32);
    fn draw_mesh_tasks(&mut self, group_x: u32, group_y: u32, group_z: u32);
    #[allow(clippy::too_many_arguments)]
    fn draw_mesh_tasks_indirect_count(
        &mut self,
        argument_buffer: NativeBuffer,
        argument_offset: u64,
        count_buffer: NativeBuffer,
        count_offset: u64,
        max_draw_count: u32,
        stride: u32,
    );
    fn dispatch(&mut self, group_x: u32, group_y: u32, group_z: u32);
    fn trace_rays(&mut self, pipeline: NativePipeline, width: u32, height: u32, depth: u32);

    fn pipeline_barrier(&mut self, barrier: &ImageBarrier);
    fn copy_buffer(
        &mut self,
        src: NativeBuffer,
        src_offset: u64,
        dst: NativeBuffer,
        dst_offset: u64,
        size: u64,
    );

    fn execute_secondary(&mut self, secondary: NativeCommandBuffer);

    fn begin_label(&mut self, name: &str, color: [f32; 4]);
    fn end_label(&mut self);

    /// Writes a GPU timestamp into `query`. Backends without query support
    /// ignore it.
    fn write_timestamp(&mut self, _query: u32) {}
    /// Resets the timestamp queries of this buffer.
    fn reset_queries(&mut self) {}
}

/// A graphics API implementation.
pub trait GpuBackend: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// Creates an image. With `alias`, the image is bound to the memory of
    /// that existing image instead of getting its own allocation.
    fn create_image(
        &self,
        descriptor: &TextureDescriptor,
        alias: Option<NativeImage>,
    ) -> Result<NativeImage, GraphicsError>;
    fn destroy_image(&self, image: NativeImage);

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<NativeBuffer, GraphicsError>;
    fn destroy_buffer(&self, buffer: NativeBuffer);

    fn create_pipeline(
        &self,
        descriptor: &PipelineDescriptor,
    ) -> Result<NativePipeline, GraphicsError>;
    fn destroy_pipeline(&self, pipeline: NativePipeline);

    fn create_sampler(&self, descriptor: &SamplerDescriptor)
    -> Result<NativeSampler, GraphicsError>;
    fn destroy_sampler(&self, sampler: NativeSampler);

    fn create_descriptor_set_layout(
        &self,
        descriptor: &DescriptorSetLayoutDescriptor,
    ) -> Result<NativeDescriptorSetLayout, GraphicsError>;
    fn destroy_descriptor_set_layout(&self, layout: NativeDescriptorSetLayout);

    /// Allocates a set of `layout` and writes its resources. The device has
    /// already checked every write against the layout.
    fn create_descriptor_set(
        &self,
        descriptor: &DescriptorSetDescriptor,
        layout: NativeDescriptorSetLayout,
    ) -> Result<NativeDescriptorSet, GraphicsError>;
    fn destroy_descriptor_set(&self, set: NativeDescriptorSet);

    fn create_shader(&self, descriptor: &ShaderDescriptor) -> Result<NativeShader, GraphicsError>;
    fn destroy_shader(&self, shader: NativeShader);

    /// Allocates a command buffer from command pool `pool`.
    fn allocate_command_stream(
        &self,
        pool: u32,
        level: CommandBufferLevel,
    ) -> Result<Box<dyn CommandStream>, GraphicsError>;
    /// Resets every command buffer allocated from `pool`.
    fn reset_command_pool(&self, pool: u32);
}
