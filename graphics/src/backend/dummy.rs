//! Dummy GPU backend for testing and development.
//!
//! This backend doesn't talk to a GPU. It hands out unique native ids,
//! tracks which images share memory, and stores every recorded command so
//! tests can assert on exactly what a command buffer or render graph emitted.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::error::GraphicsError;
use crate::resources::{
    DescriptorSetDescriptor, DescriptorSetLayoutDescriptor, PipelineBindPoint, PipelineDescriptor,
    ShaderDescriptor,
};
use crate::types::{
    BufferDescriptor, Extent2d, IndexFormat, SamplerDescriptor, ScissorRect, TextureDescriptor,
    TextureFormat, Viewport,
};

use super::{
    BeginInfo, CommandBufferLevel, CommandStream, GpuBackend, ImageBarrier, NativeBuffer,
    NativeCommandBuffer, NativeDescriptorSet, NativeDescriptorSetLayout, NativeImage,
    NativePipeline, NativeSampler, NativeShader, RenderingInfo,
};

/// A command captured by a [`DummyBackend`] command stream.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    Begin(BeginInfo),
    End,
    BeginRendering(RenderingInfo),
    EndRendering,
    SetViewport(Viewport),
    SetScissor(ScissorRect),
    BindPipeline {
        bind_point: PipelineBindPoint,
        pipeline: NativePipeline,
    },
    BindDescriptorSet {
        bind_point: PipelineBindPoint,
        set_index: u32,
        set: NativeDescriptorSet,
    },
    BindVertexBuffer {
        buffer: NativeBuffer,
        binding: u32,
        offset: u64,
    },
    BindIndexBuffer {
        buffer: NativeBuffer,
        offset: u64,
        format: IndexFormat,
    },
    Draw {
        first_vertex: u32,
        vertex_count: u32,
        first_instance: u32,
        instance_count: u32,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    },
    DrawIndirect {
        buffer: NativeBuffer,
        offset: u64,
        draw_count: u32,
        stride: u32,
    },
    DrawMeshTasks([u32; 3]),
    DrawMeshTasksIndirectCount {
        argument_buffer: NativeBuffer,
        count_buffer: NativeBuffer,
        max_draw_count: u32,
    },
    Dispatch([u32; 3]),
    TraceRays {
        pipeline: NativePipeline,
        extent: [u32; 3],
    },
    Barrier(ImageBarrier),
    CopyBuffer {
        src: NativeBuffer,
        dst: NativeBuffer,
        size: u64,
    },
    ExecuteSecondary(NativeCommandBuffer),
    BeginLabel(String),
    EndLabel,
    WriteTimestamp(u32),
    ResetQueries,
}

/// What the dummy backend knows about a live image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DummyImage {
    /// Id of the memory block backing the image; aliased images share it.
    pub memory: u64,
    pub size: Extent2d,
    pub format: TextureFormat,
}

type CommandLog = Arc<Mutex<Vec<RecordedCommand>>>;

struct StreamEntry {
    pool: u32,
    log: CommandLog,
}

/// Dummy GPU backend.
#[derive(Default)]
pub struct DummyBackend {
    next_id: AtomicU64,
    images: Mutex<HashMap<NativeImage, DummyImage>>,
    buffers: Mutex<HashMap<NativeBuffer, u64>>,
    descriptor_sets: Mutex<HashMap<NativeDescriptorSet, NativeDescriptorSetLayout>>,
    streams: Mutex<HashMap<NativeCommandBuffer, StreamEntry>>,
    pool_resets: Mutex<Vec<u32>>,
}

impl std::fmt::Debug for DummyBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DummyBackend")
            .field("images", &self.images.lock().len())
            .field("buffers", &self.buffers.lock().len())
            .field("streams", &self.streams.lock().len())
            .finish()
    }
}

impl DummyBackend {
    /// Create a new dummy backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Commands recorded into `cmd` since its pool was last reset.
    pub fn recorded(&self, cmd: NativeCommandBuffer) -> Vec<RecordedCommand> {
        self.streams
            .lock()
            .get(&cmd)
            .map(|entry| entry.log.lock().clone())
            .unwrap_or_default()
    }

    /// Number of images that have not been destroyed.
    pub fn live_image_count(&self) -> usize {
        self.images.lock().len()
    }

    pub fn image(&self, image: NativeImage) -> Option<DummyImage> {
        self.images.lock().get(&image).copied()
    }

    pub fn live_buffer_count(&self) -> usize {
        self.buffers.lock().len()
    }

    /// Layout a live descriptor set was allocated with.
    pub fn descriptor_set_layout(
        &self,
        set: NativeDescriptorSet,
    ) -> Option<NativeDescriptorSetLayout> {
        self.descriptor_sets.lock().get(&set).copied()
    }

    pub fn live_descriptor_set_count(&self) -> usize {
        self.descriptor_sets.lock().len()
    }

    /// Pools passed to [`GpuBackend::reset_command_pool`], in call order.
    pub fn pool_resets(&self) -> Vec<u32> {
        self.pool_resets.lock().clone()
    }
}

impl GpuBackend for DummyBackend {
    fn name(&self) -> &'static str {
        "Dummy"
    }

    fn create_image(
        &self,
        descriptor: &TextureDescriptor,
        alias: Option<NativeImage>,
    ) -> Result<NativeImage, GraphicsError> {
        let mut images = self.images.lock();
        let memory = match alias {
            Some(alias) => {
                images
                    .get(&alias)
                    .ok_or_else(|| {
                        GraphicsError::ResourceCreationFailed(format!(
                            "alias image {} does not exist",
                            alias.0
                        ))
                    })?
                    .memory
            }
            None => self.next_id(),
        };
        let image = NativeImage(self.next_id());
        log::trace!(
            "DummyBackend: creating image {} {:?} ({}x{}, memory {})",
            image.0,
            descriptor.label,
            descriptor.size.width,
            descriptor.size.height,
            memory
        );
        images.insert(
            image,
            DummyImage {
                memory,
                size: descriptor.size,
                format: descriptor.format,
            },
        );
        Ok(image)
    }

    fn destroy_image(&self, image: NativeImage) {
        log::trace!("DummyBackend: destroying image {}", image.0);
        self.images.lock().remove(&image);
    }

    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<NativeBuffer, GraphicsError> {
        let buffer = NativeBuffer(self.next_id());
        log::trace!(
            "DummyBackend: creating buffer {:?} (size: {})",
            descriptor.label,
            descriptor.size
        );
        self.buffers.lock().insert(buffer, descriptor.size);
        Ok(buffer)
    }

    fn destroy_buffer(&self, buffer: NativeBuffer) {
        self.buffers.lock().remove(&buffer);
    }

    fn create_pipeline(
        &self,
        descriptor: &PipelineDescriptor,
    ) -> Result<NativePipeline, GraphicsError> {
        log::trace!("DummyBackend: creating pipeline {}", descriptor.name);
        Ok(NativePipeline(self.next_id()))
    }

    fn destroy_pipeline(&self, _pipeline: NativePipeline) {}

    fn create_sampler(
        &self,
        descriptor: &SamplerDescriptor,
    ) -> Result<NativeSampler, GraphicsError> {
        log::trace!("DummyBackend: creating sampler {:?}", descriptor.label);
        Ok(NativeSampler(self.next_id()))
    }

    fn destroy_sampler(&self, _sampler: NativeSampler) {}

    fn create_descriptor_set_layout(
        &self,
        descriptor: &DescriptorSetLayoutDescriptor,
    ) -> Result<NativeDescriptorSetLayout, GraphicsError> {
        log::trace!(
            "DummyBackend: creating descriptor set layout {} ({} bindings)",
            descriptor.name,
            descriptor.bindings.len()
        );
        Ok(NativeDescriptorSetLayout(self.next_id()))
    }

    fn destroy_descriptor_set_layout(&self, _layout: NativeDescriptorSetLayout) {}

    fn create_descriptor_set(
        &self,
        descriptor: &DescriptorSetDescriptor,
        layout: NativeDescriptorSetLayout,
    ) -> Result<NativeDescriptorSet, GraphicsError> {
        log::trace!(
            "DummyBackend: creating descriptor set {} ({} writes)",
            descriptor.name,
            descriptor.writes.len()
        );
        let set = NativeDescriptorSet(self.next_id());
        self.descriptor_sets.lock().insert(set, layout);
        Ok(set)
    }

    fn destroy_descriptor_set(&self, set: NativeDescriptorSet) {
        self.descriptor_sets.lock().remove(&set);
    }

    fn create_shader(&self, descriptor: &ShaderDescriptor) -> Result<NativeShader, GraphicsError> {
        log::trace!(
            "DummyBackend: creating shader {} ({} stages)",
            descriptor.name,
            descriptor.stages.len()
        );
        Ok(NativeShader(self.next_id()))
    }

    fn destroy_shader(&self, _shader: NativeShader) {}

    fn allocate_command_stream(
        &self,
        pool: u32,
        level: CommandBufferLevel,
    ) -> Result<Box<dyn CommandStream>, GraphicsError> {
        let id = NativeCommandBuffer(self.next_id());
        let log = CommandLog::default();
        self.streams.lock().insert(
            id,
            StreamEntry {
                pool,
                log: Arc::clone(&log),
            },
        );
        Ok(Box::new(DummyCommandStream { id, level, log }))
    }

    fn reset_command_pool(&self, pool: u32) {
        log::trace!("DummyBackend: resetting command pool {pool}");
        self.pool_resets.lock().push(pool);
        for entry in self.streams.lock().values() {
            if entry.pool == pool {
                entry.log.lock().clear();
            }
        }
    }
}

/// Command stream of the [`DummyBackend`].
struct DummyCommandStream {
    id: NativeCommandBuffer,
    level: CommandBufferLevel,
    log: CommandLog,
}

impl DummyCommandStream {
    fn record(&mut self, command: RecordedCommand) {
        log::trace!("DummyBackend: cmd {} {:?}", self.id.0, command);
        self.log.lock().push(command);
    }
}

impl CommandStream for DummyCommandStream {
    fn native(&self) -> NativeCommandBuffer {
        self.id
    }

    fn level(&self) -> CommandBufferLevel {
        self.level
    }

    fn begin(&mut self, info: &BeginInfo) {
        self.record(RecordedCommand::Begin(info.clone()));
    }

    fn end(&mut self) {
        self.record(RecordedCommand::End);
    }

    fn begin_rendering(&mut self, info: &RenderingInfo) {
        self.record(RecordedCommand::BeginRendering(info.clone()));
    }

    fn end_rendering(&mut self) {
        self.record(RecordedCommand::EndRendering);
    }

    fn set_viewport(&mut self, viewport: &Viewport) {
        self.record(RecordedCommand::SetViewport(*viewport));
    }

    fn set_scissor(&mut self, scissor: &ScissorRect) {
        self.record(RecordedCommand::SetScissor(*scissor));
    }

    fn bind_pipeline(&mut self, bind_point: PipelineBindPoint, pipeline: NativePipeline) {
        self.record(RecordedCommand::BindPipeline {
            bind_point,
            pipeline,
        });
    }

    fn bind_descriptor_set(
        &mut self,
        bind_point: PipelineBindPoint,
        set_index: u32,
        set: NativeDescriptorSet,
    ) {
        self.record(RecordedCommand::BindDescriptorSet {
            bind_point,
            set_index,
            set,
        });
    }

    fn bind_vertex_buffer(&mut self, buffer: NativeBuffer, binding: u32, offset: u64) {
        self.record(RecordedCommand::BindVertexBuffer {
            buffer,
            binding,
            offset,
        });
    }

    fn bind_index_buffer(&mut self, buffer: NativeBuffer, offset: u64, format: IndexFormat) {
        self.record(RecordedCommand::BindIndexBuffer {
            buffer,
            offset,
            format,
        });
    }

    fn draw(&mut self, first_vertex: u32, vertex_count: u32, first_instance: u32, instance_count: u32) {
        self.record(RecordedCommand::Draw {
            first_vertex,
            vertex_count,
            first_instance,
            instance_count,
        });
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        self.record(RecordedCommand::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        });
    }

    fn draw_indirect(&mut self, buffer: NativeBuffer, offset: u64, draw_count: u32, stride: u32) {
        self.record(RecordedCommand::DrawIndirect {
            buffer,
            offset,
            draw_count,
            stride,
        });
    }

    fn draw_mesh_tasks(&mut self, group_x: u32, group_y: u32, group_z: u32) {
        self.record(RecordedCommand::DrawMeshTasks([group_x, group_y, group_z]));
    }

    fn draw_mesh_tasks_indirect_count(
        &mut self,
        argument_buffer: NativeBuffer,
        _argument_offset: u64,
        count_buffer: NativeBuffer,
        _count_offset: u64,
        max_draw_count: u32,
        _stride: u32,
    ) {
        self.record(RecordedCommand::DrawMeshTasksIndirectCount {
            argument_buffer,
            count_buffer,
            max_draw_count,
        });
    }

    fn dispatch(&mut self, group_x: u32, group_y: u32, group_z: u32) {
        self.record(RecordedCommand::Dispatch([group_x, group_y, group_z]));
    }

    fn trace_rays(&mut self, pipeline: NativePipeline, width: u32, height: u32, depth: u32) {
        self.record(RecordedCommand::TraceRays {
            pipeline,
            extent: [width, height, depth],
        });
    }

    fn pipeline_barrier(&mut self, barrier: &ImageBarrier) {
        self.record(RecordedCommand::Barrier(*barrier));
    }

    fn copy_buffer(
        &mut self,
        src: NativeBuffer,
        _src_offset: u64,
        dst: NativeBuffer,
        _dst_offset: u64,
        size: u64,
    ) {
        self.record(RecordedCommand::CopyBuffer { src, dst, size });
    }

    fn execute_secondary(&mut self, secondary: NativeCommandBuffer) {
        self.record(RecordedCommand::ExecuteSecondary(secondary));
    }

    fn begin_label(&mut self, name: &str, _color: [f32; 4]) {
        self.record(RecordedCommand::BeginLabel(name.to_string()));
    }

    fn end_label(&mut self) {
        self.record(RecordedCommand::EndLabel);
    }

    fn write_timestamp(&mut self, query: u32) {
        self.record(RecordedCommand::WriteTimestamp(query));
    }

    fn reset_queries(&mut self) {
        self.record(RecordedCommand::ResetQueries);
    }
}
