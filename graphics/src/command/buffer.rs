//! Recording wrapper around a backend command stream.

use std::sync::Arc;

use crate::backend::{
    BeginInfo, CommandBufferLevel, CommandStream, ImageBarrier, InheritanceInfo,
    NativeCommandBuffer, NativeImage, RenderingAttachment, RenderingInfo,
};
use crate::device::GpuDevice;
use crate::resources::{
    BufferHandle, DescriptorSetHandle, FramebufferHandle, ImageLayout, PipelineBindPoint,
    PipelineHandle, QueueType, RenderPassHandle, RenderPassOperation, ResourceState,
    TextureHandle,
};
use crate::types::{ClearValue, Extent2d, IndexFormat, ScissorRect, Viewport};

#[cfg(feature = "profiling")]
use crate::profiling::GpuZone;

/// Clear color slots; one per possible color attachment.
pub const MAX_CLEAR_COLORS: usize = 8;

const MARKER_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Recording state of a [`CommandBuffer`].
///
/// An active render pass is tracked separately, see
/// [`CommandBuffer::is_render_pass_active`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecordingState {
    #[default]
    Reset,
    Recording,
    Ended,
}

/// A command buffer.
///
/// Wraps one native command stream and validates what goes into it: handles
/// are resolved against the device registry, render pass binding is tracked
/// so a pass is never begun twice, and every image barrier updates the
/// texture's tracked [`ResourceState`].
///
/// Lifecycle calls are forgiving. `begin_*` on a recording buffer and `end`
/// on a buffer that is not recording do nothing, so higher layers may call
/// them unconditionally.
pub struct CommandBuffer {
    device: Arc<GpuDevice>,
    stream: Box<dyn CommandStream>,
    state: RecordingState,
    current_render_pass: Option<RenderPassHandle>,
    current_framebuffer: Option<FramebufferHandle>,
    framebuffer_extent: Extent2d,
    current_pipeline: Option<PipelineHandle>,
    /// A rendering scope was begun on this stream and must be ended.
    /// Secondaries know their pass without ever opening the scope.
    rendering_active: bool,
    clear_colors: [[f32; 4]; MAX_CLEAR_COLORS],
    clear_depth: f32,
    clear_stencil: u32,
    marker_depth: u32,
    #[cfg(feature = "profiling")]
    next_query: u32,
    #[cfg(feature = "profiling")]
    gpu_zones: Vec<GpuZone>,
    /// Indices into `gpu_zones` of the markers still open.
    #[cfg(feature = "profiling")]
    open_zones: Vec<usize>,
}

static_assertions::assert_impl_all!(CommandBuffer: Send);

impl CommandBuffer {
    pub fn new(device: Arc<GpuDevice>, stream: Box<dyn CommandStream>) -> Self {
        Self {
            device,
            stream,
            state: RecordingState::Reset,
            current_render_pass: None,
            current_framebuffer: None,
            framebuffer_extent: Extent2d::default(),
            current_pipeline: None,
            rendering_active: false,
            clear_colors: [[0.0; 4]; MAX_CLEAR_COLORS],
            clear_depth: 1.0,
            clear_stencil: 0,
            marker_depth: 0,
            #[cfg(feature = "profiling")]
            next_query: 0,
            #[cfg(feature = "profiling")]
            gpu_zones: Vec::new(),
            #[cfg(feature = "profiling")]
            open_zones: Vec::new(),
        }
    }

    pub fn device(&self) -> &Arc<GpuDevice> {
        &self.device
    }

    pub fn native(&self) -> NativeCommandBuffer {
        self.stream.native()
    }

    pub fn level(&self) -> CommandBufferLevel {
        self.stream.level()
    }

    pub fn state(&self) -> RecordingState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecordingState::Recording
    }

    /// Whether a render pass and framebuffer are bound.
    pub fn is_render_pass_active(&self) -> bool {
        self.current_render_pass.is_some() && self.current_framebuffer.is_some()
    }

    pub fn current_render_pass(&self) -> Option<RenderPassHandle> {
        self.current_render_pass
    }

    pub fn current_framebuffer(&self) -> Option<FramebufferHandle> {
        self.current_framebuffer
    }

    pub fn current_pipeline(&self) -> Option<PipelineHandle> {
        self.current_pipeline
    }

    /// Number of markers pushed and not yet popped.
    pub fn marker_depth(&self) -> u32 {
        self.marker_depth
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Return to the initial state.
    ///
    /// The native stream is reset with its pool, not here.
    pub fn reset(&mut self) {
        self.state = RecordingState::Reset;
        self.current_render_pass = None;
        self.current_framebuffer = None;
        self.current_pipeline = None;
        self.rendering_active = false;
        self.marker_depth = 0;
    }

    /// Begin recording a primary buffer for one-time submission.
    pub fn begin_primary(&mut self) {
        if !self.can_begin() {
            return;
        }
        debug_assert_eq!(self.level(), CommandBufferLevel::Primary);
        self.stream.begin(&BeginInfo {
            one_time_submit: true,
            inheritance: None,
        });
        self.state = RecordingState::Recording;
    }

    /// Begin recording a secondary buffer that continues `render_pass` on
    /// `framebuffer`.
    ///
    /// The pass becomes current, but no rendering scope is opened; the
    /// primary buffer owns it.
    pub fn begin_secondary(&mut self, render_pass: RenderPassHandle, framebuffer: FramebufferHandle) {
        if !self.can_begin() {
            return;
        }
        debug_assert_eq!(self.level(), CommandBufferLevel::Secondary);

        let (inheritance, extent) = {
            let resources = self.device.resources();
            let (Some(pass), Some(fb)) = (
                resources.render_pass(render_pass),
                resources.framebuffer(framebuffer),
            ) else {
                log::error!(
                    "CommandBuffer: begin_secondary with invalid render pass {render_pass:?} or framebuffer {framebuffer:?}"
                );
                return;
            };
            let inheritance = InheritanceInfo {
                color_formats: pass.descriptor().color_formats.clone(),
                depth_format: pass.descriptor().depth_format,
                sample_count: 1,
            };
            (inheritance, Extent2d::new(fb.width(), fb.height()))
        };

        self.stream.begin(&BeginInfo {
            one_time_submit: true,
            inheritance: Some(inheritance),
        });
        self.state = RecordingState::Recording;
        self.current_render_pass = Some(render_pass);
        self.current_framebuffer = Some(framebuffer);
        self.framebuffer_extent = extent;
    }

    fn can_begin(&self) -> bool {
        match self.state {
            RecordingState::Reset => true,
            RecordingState::Recording => false,
            RecordingState::Ended => {
                log::error!(
                    "CommandBuffer: begin on ended command buffer {:?} without reset",
                    self.native()
                );
                false
            }
        }
    }

    /// Finish recording, closing an open rendering scope first.
    pub fn end(&mut self) {
        if !self.is_recording() {
            return;
        }
        assert_eq!(
            self.marker_depth, 0,
            "command buffer ended with {} unbalanced markers",
            self.marker_depth
        );
        if self.rendering_active {
            self.stream.end_rendering();
            self.rendering_active = false;
        }
        self.stream.end();
        self.state = RecordingState::Ended;
        self.current_render_pass = None;
        self.current_framebuffer = None;
    }

    // ------------------------------------------------------------------
    // Render passes
    // ------------------------------------------------------------------

    /// Clear color used for color attachment `index` of passes that clear.
    pub fn set_clear_color(&mut self, index: usize, color: [f32; 4]) {
        match self.clear_colors.get_mut(index) {
            Some(slot) => *slot = color,
            None => log::error!("CommandBuffer: clear color index {index} out of range"),
        }
    }

    pub fn set_clear_depth_and_stencil(&mut self, depth: f32, stencil: u32) {
        self.clear_depth = depth;
        self.clear_stencil = stencil;
    }

    /// Bind a render pass on a framebuffer, ending the current one.
    ///
    /// Attachments whose pass operation is [`RenderPassOperation::Clear`] are
    /// cleared with the stored clear values. With `use_secondary`, draws are
    /// expected from secondary buffers via [`execute_secondary`](Self::execute_secondary).
    ///
    /// # Panics
    ///
    /// Panics if the buffer is not recording.
    pub fn bind_render_pass(
        &mut self,
        render_pass: RenderPassHandle,
        framebuffer: FramebufferHandle,
        use_secondary: bool,
    ) {
        assert!(
            self.is_recording(),
            "bind_render_pass on a command buffer that is not recording"
        );

        {
            let resources = self.device.resources();
            if resources.render_pass(render_pass).is_none() {
                log::error!("CommandBuffer: bind of invalid render pass {render_pass:?}");
                return;
            }
            if resources.framebuffer(framebuffer).is_none() {
                log::error!("CommandBuffer: bind of invalid framebuffer {framebuffer:?}");
                return;
            }
        }

        if self.current_render_pass == Some(render_pass) {
            log::warn!("Binding same render pass {render_pass:?}");
            return;
        }

        self.end_render_pass();

        let device = Arc::clone(&self.device);
        let resources = device.resources();
        let (Some(pass), Some(fb)) = (
            resources.render_pass(render_pass),
            resources.framebuffer(framebuffer),
        ) else {
            return;
        };
        let descriptor = pass.descriptor();
        let image_of = |texture: TextureHandle| {
            resources
                .texture(texture)
                .map(|t| t.image())
                .unwrap_or(NativeImage::NULL)
        };

        let color_attachments = fb
            .color_attachments()
            .iter()
            .enumerate()
            .map(|(i, &texture)| {
                let load = descriptor
                    .color_operations
                    .get(i)
                    .copied()
                    .unwrap_or_default();
                let clear = match (load, self.clear_colors.get(i)) {
                    (RenderPassOperation::Clear, Some(&color)) => ClearValue::color(color),
                    _ => ClearValue::None,
                };
                RenderingAttachment {
                    image: image_of(texture),
                    layout: ImageLayout::ColorAttachment,
                    load,
                    store: true,
                    clear,
                }
            })
            .collect();

        let depth_attachment = fb.depth_stencil_attachment().map(|texture| {
            let load = descriptor.depth_operation;
            let clear = if load == RenderPassOperation::Clear {
                ClearValue::depth_stencil(self.clear_depth, self.clear_stencil)
            } else {
                ClearValue::None
            };
            RenderingAttachment {
                image: image_of(texture),
                layout: ImageLayout::DepthStencilAttachment,
                load,
                store: true,
                clear,
            }
        });

        let info = RenderingInfo {
            render_area: ScissorRect::from_dimensions(fb.width(), fb.height()),
            color_attachments,
            depth_attachment,
            secondary_contents: use_secondary,
        };
        let extent = Extent2d::new(fb.width(), fb.height());
        drop(resources);

        self.stream.begin_rendering(&info);
        self.rendering_active = true;
        self.current_render_pass = Some(render_pass);
        self.current_framebuffer = Some(framebuffer);
        self.framebuffer_extent = extent;
    }

    /// End the bound render pass, if any.
    pub fn end_render_pass(&mut self) {
        if !self.is_recording() || !self.is_render_pass_active() {
            return;
        }
        if self.rendering_active {
            self.stream.end_rendering();
            self.rendering_active = false;
        }
        self.current_render_pass = None;
        self.current_framebuffer = None;
    }

    /// Extent of the bound framebuffer, or of the swapchain without one.
    pub fn target_extent(&self) -> Extent2d {
        if self.current_framebuffer.is_some() {
            self.framebuffer_extent
        } else {
            self.device.swapchain_extent()
        }
    }

    /// Set the viewport, flipping its Y axis. `None` covers the whole target.
    pub fn set_viewport(&mut self, viewport: Option<&Viewport>) {
        let viewport = match viewport {
            Some(viewport) => viewport.flipped(),
            None => {
                let extent = self.target_extent();
                Viewport::from_dimensions(extent.width, extent.height).flipped()
            }
        };
        self.stream.set_viewport(&viewport);
    }

    /// Set the scissor rectangle. `None` covers the whole target.
    pub fn set_scissor(&mut self, scissor: Option<&ScissorRect>) {
        let scissor = match scissor {
            Some(&scissor) => scissor,
            None => {
                let extent = self.target_extent();
                ScissorRect::from_dimensions(extent.width, extent.height)
            }
        };
        self.stream.set_scissor(&scissor);
    }

    // ------------------------------------------------------------------
    // Binding and drawing
    // ------------------------------------------------------------------

    pub fn bind_pipeline(&mut self, pipeline: PipelineHandle) {
        let resolved = self
            .device
            .resources()
            .pipeline(pipeline)
            .map(|p| (p.bind_point(), p.native()));
        let Some((bind_point, native)) = resolved else {
            log::error!("CommandBuffer: bind of invalid pipeline {pipeline:?}");
            return;
        };
        self.stream.bind_pipeline(bind_point, native);
        self.current_pipeline = Some(pipeline);
    }

    /// Binds `set` at its layout's set index, for the bind point of the
    /// current pipeline (graphics when none is bound).
    pub fn bind_descriptor_set(&mut self, set: DescriptorSetHandle) {
        let resolved = {
            let resources = self.device.resources();
            let bind_point = self
                .current_pipeline
                .and_then(|p| resources.pipeline(p))
                .map_or(PipelineBindPoint::Graphics, |p| p.bind_point());
            resources.descriptor_set(set).and_then(|record| {
                resources
                    .descriptor_set_layout(record.layout())
                    .map(|layout| (bind_point, u32::from(layout.set_index()), record.native()))
            })
        };
        match resolved {
            Some((bind_point, set_index, native)) => {
                self.stream.bind_descriptor_set(bind_point, set_index, native);
            }
            None => log::error!("CommandBuffer: bind of invalid descriptor set {set:?}"),
        }
    }

    pub fn bind_vertex_buffer(&mut self, buffer: BufferHandle, binding: u32, offset: u64) {
        let native = self.device.resources().buffer(buffer).map(|b| b.native());
        match native {
            Some(native) => self.stream.bind_vertex_buffer(native, binding, offset),
            None => log::error!("CommandBuffer: bind of invalid vertex buffer {buffer:?}"),
        }
    }

    pub fn bind_index_buffer(&mut self, buffer: BufferHandle, offset: u64, format: IndexFormat) {
        let native = self.device.resources().buffer(buffer).map(|b| b.native());
        match native {
            Some(native) => self.stream.bind_index_buffer(native, offset, format),
            None => log::error!("CommandBuffer: bind of invalid index buffer {buffer:?}"),
        }
    }

    pub fn draw(&mut self, first_vertex: u32, vertex_count: u32, first_instance: u32, instance_count: u32) {
        self.stream
            .draw(first_vertex, vertex_count, first_instance, instance_count);
    }

    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        self.stream.draw_indexed(
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        );
    }

    pub fn draw_indirect(&mut self, buffer: BufferHandle, offset: u64, draw_count: u32, stride: u32) {
        let native = self.device.resources().buffer(buffer).map(|b| b.native());
        match native {
            Some(native) => self.stream.draw_indirect(native, offset, draw_count, stride),
            None => log::error!("CommandBuffer: draw_indirect with invalid buffer {buffer:?}"),
        }
    }

    pub fn draw_mesh_task(&mut self, group_x: u32, group_y: u32, group_z: u32) {
        self.stream.draw_mesh_tasks(group_x, group_y, group_z);
    }

    #[allow(clippy::too_many_arguments)]
    pub fn draw_mesh_task_indirect_count(
        &mut self,
        argument_buffer: BufferHandle,
        argument_offset: u64,
        count_buffer: BufferHandle,
        count_offset: u64,
        max_draw_count: u32,
        stride: u32,
    ) {
        let natives = {
            let resources = self.device.resources();
            resources
                .buffer(argument_buffer)
                .zip(resources.buffer(count_buffer))
                .map(|(args, count)| (args.native(), count.native()))
        };
        let Some((args, count)) = natives else {
            log::error!(
                "CommandBuffer: draw_mesh_task_indirect_count with invalid buffers {argument_buffer:?}, {count_buffer:?}"
            );
            return;
        };
        self.stream.draw_mesh_tasks_indirect_count(
            args,
            argument_offset,
            count,
            count_offset,
            max_draw_count,
            stride,
        );
    }

    pub fn dispatch(&mut self, group_x: u32, group_y: u32, group_z: u32) {
        self.stream.dispatch(group_x, group_y, group_z);
    }

    pub fn trace_rays(&mut self, pipeline: PipelineHandle, width: u32, height: u32, depth: u32) {
        let native = self.device.resources().pipeline(pipeline).map(|p| p.native());
        match native {
            Some(native) => self.stream.trace_rays(native, width, height, depth),
            None => log::error!("CommandBuffer: trace_rays with invalid pipeline {pipeline:?}"),
        }
    }

    pub fn copy_buffer(
        &mut self,
        src: BufferHandle,
        src_offset: u64,
        dst: BufferHandle,
        dst_offset: u64,
        size: u64,
    ) {
        let natives = {
            let resources = self.device.resources();
            resources
                .buffer(src)
                .zip(resources.buffer(dst))
                .map(|(s, d)| (s.native(), d.native()))
        };
        match natives {
            Some((src, dst)) => self.stream.copy_buffer(src, src_offset, dst, dst_offset, size),
            None => log::error!("CommandBuffer: copy between invalid buffers {src:?} -> {dst:?}"),
        }
    }

    /// Replay a finished secondary buffer inside the current pass.
    pub fn execute_secondary(&mut self, secondary: &CommandBuffer) {
        debug_assert_eq!(secondary.level(), CommandBufferLevel::Secondary);
        debug_assert_ne!(
            secondary.state(),
            RecordingState::Recording,
            "secondary command buffer still recording"
        );
        self.stream.execute_secondary(secondary.native());
    }

    // ------------------------------------------------------------------
    // Synchronization
    // ------------------------------------------------------------------

    /// Transition `texture` to `new_state`.
    ///
    /// A barrier is emitted even when the texture is already in
    /// `new_state`; repeated transitions of a storage image still need the
    /// write-after-write dependency.
    ///
    /// # Panics
    ///
    /// Panics if the texture has no native image.
    pub fn add_image_barrier(
        &mut self,
        texture: TextureHandle,
        new_state: ResourceState,
        base_mip_level: u32,
        mip_level_count: u32,
        is_depth: bool,
    ) {
        let barrier = {
            let mut resources = self.device.resources_mut();
            let Some(record) = resources.texture_mut(texture) else {
                log::error!("CommandBuffer: barrier on invalid texture {texture:?}");
                return;
            };
            assert!(
                !record.image.is_null(),
                "barrier on texture {:?} without a native image",
                record.label()
            );

            let old_state = record.state;
            let src_access = old_state.access_flags();
            let dst_access = new_state.access_flags();
            record.state = new_state;
            ImageBarrier {
                image: record.image,
                src_access,
                dst_access,
                src_stages: src_access.pipeline_stages(QueueType::Graphics),
                dst_stages: dst_access.pipeline_stages(QueueType::Graphics),
                old_layout: old_state.image_layout(),
                new_layout: new_state.image_layout(),
                depth_aspect: is_depth,
                base_mip_level,
                mip_level_count,
            }
        };
        self.stream.pipeline_barrier(&barrier);
    }

    // ------------------------------------------------------------------
    // Debug markers
    // ------------------------------------------------------------------

    pub fn push_marker(&mut self, name: &str) {
        self.stream.begin_label(name, MARKER_COLOR);
        self.marker_depth += 1;
        #[cfg(feature = "profiling")]
        {
            self.open_zones.push(self.gpu_zones.len());
            self.gpu_zones.push(GpuZone {
                name: name.to_string(),
                begin_query: self.next_query,
                end_query: None,
            });
            self.write_timestamp();
        }
    }

    /// # Panics
    ///
    /// Panics without a matching [`push_marker`](Self::push_marker).
    pub fn pop_marker(&mut self) {
        assert!(self.marker_depth > 0, "pop_marker without matching push_marker");
        #[cfg(feature = "profiling")]
        {
            if let Some(zone) = self.open_zones.pop().and_then(|i| self.gpu_zones.get_mut(i)) {
                zone.end_query = Some(self.next_query);
            }
            self.write_timestamp();
        }
        self.stream.end_label();
        self.marker_depth -= 1;
    }

    #[cfg(feature = "profiling")]
    fn write_timestamp(&mut self) {
        self.stream.write_timestamp(self.next_query);
        self.next_query += 1;
    }

    /// Reset the GPU timestamp queries of this buffer.
    #[cfg(feature = "profiling")]
    pub(crate) fn reset_queries(&mut self) {
        self.stream.reset_queries();
        self.next_query = 0;
        self.gpu_zones.clear();
        self.open_zones.clear();
    }

    /// Timestamp query pairs written by the markers since the last reset,
    /// for [`GpuProfileContext::submit`](crate::profiling::GpuProfileContext::submit).
    #[cfg(feature = "profiling")]
    pub fn gpu_zones(&self) -> &[GpuZone] {
        &self.gpu_zones
    }
}

impl std::fmt::Debug for CommandBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandBuffer")
            .field("native", &self.native())
            .field("level", &self.level())
            .field("state", &self.state)
            .field("render_pass", &self.current_render_pass)
            .field("marker_depth", &self.marker_depth)
            .finish()
    }
}
