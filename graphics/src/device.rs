//! Graphics device.
//!
//! The [`GpuDevice`] owns the backend, the [`ResourceRegistry`] with every
//! resource pool, and the renderer and swapchain sizes. All resource
//! creation and destruction goes through it so that pool slots and native
//! objects stay in sync.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::backend::GpuBackend;
use crate::config::GraphicsConfig;
use crate::error::GraphicsError;
use crate::resources::{
    Buffer, BufferHandle, DescriptorResource, DescriptorSet, DescriptorSetDescriptor,
    DescriptorSetHandle, DescriptorSetLayout, DescriptorSetLayoutDescriptor,
    DescriptorSetLayoutHandle, DescriptorType, DescriptorWrite, Framebuffer,
    FramebufferDescriptor, FramebufferHandle, Pipeline, PipelineDescriptor, PipelineHandle,
    RenderPass, RenderPassDescriptor, RenderPassHandle, ResourceRegistry, ResourceState, Sampler,
    SamplerHandle, Shader, ShaderDescriptor, ShaderHandle, Texture, TextureHandle,
};
use crate::types::{BufferDescriptor, Extent2d, SamplerDescriptor, TextureDescriptor};

/// Limits of a graphics device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceCapabilities {
    pub max_texture_dimension: u32,
    pub max_buffer_size: u64,
    /// Maximum color attachments per render pass.
    pub max_color_attachments: u32,
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self {
            max_texture_dimension: 16384,
            max_buffer_size: 1 << 30, // 1 GB
            max_color_attachments: 8,
        }
    }
}

/// A graphics device for creating GPU resources.
///
/// # Thread Safety
///
/// `GpuDevice` is `Send + Sync`. The registry sits behind a read/write lock:
/// command recording on worker threads only takes read locks, while resource
/// creation and barrier state updates take the write lock briefly.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use vesper_graphics::{DummyBackend, GpuDevice, GraphicsConfig};
/// use vesper_graphics::types::{TextureDescriptor, TextureFormat, TextureUsage};
///
/// let device = GpuDevice::new(Arc::new(DummyBackend::new()), GraphicsConfig::default());
/// let texture = device
///     .create_texture(&TextureDescriptor::new_2d(
///         1920,
///         1080,
///         TextureFormat::Rgba8Unorm,
///         TextureUsage::RENDER_ATTACHMENT,
///     ))
///     .unwrap();
/// assert_eq!(device.resources().texture(texture).unwrap().width(), 1920);
///
/// device.destroy_texture(texture);
/// assert!(device.resources().texture(texture).is_none());
/// ```
pub struct GpuDevice {
    backend: Arc<dyn GpuBackend>,
    config: GraphicsConfig,
    capabilities: DeviceCapabilities,
    resources: RwLock<ResourceRegistry>,
    renderer_size: RwLock<Extent2d>,
    swapchain_extent: RwLock<Extent2d>,
}

static_assertions::assert_impl_all!(GpuDevice: Send, Sync);

impl GpuDevice {
    pub fn new(backend: Arc<dyn GpuBackend>, config: GraphicsConfig) -> Arc<Self> {
        log::info!("GpuDevice: created on {} backend", backend.name());
        Arc::new(Self {
            backend,
            resources: RwLock::new(ResourceRegistry::new(&config.pools)),
            config,
            capabilities: DeviceCapabilities::default(),
            renderer_size: RwLock::new(Extent2d::default()),
            swapchain_extent: RwLock::new(Extent2d::default()),
        })
    }

    pub fn backend(&self) -> &Arc<dyn GpuBackend> {
        &self.backend
    }

    pub fn config(&self) -> &GraphicsConfig {
        &self.config
    }

    pub fn capabilities(&self) -> &DeviceCapabilities {
        &self.capabilities
    }

    /// Read access to every resource record.
    pub fn resources(&self) -> RwLockReadGuard<'_, ResourceRegistry> {
        self.resources.read()
    }

    pub(crate) fn resources_mut(&self) -> RwLockWriteGuard<'_, ResourceRegistry> {
        self.resources.write()
    }

    /// Size the render graph scales its attachments against.
    pub fn renderer_size(&self) -> Extent2d {
        *self.renderer_size.read()
    }

    pub fn set_renderer_size(&self, width: u32, height: u32) {
        *self.renderer_size.write() = Extent2d::new(width, height);
    }

    /// Swapchain size; the default viewport when no render pass is bound.
    pub fn swapchain_extent(&self) -> Extent2d {
        *self.swapchain_extent.read()
    }

    pub fn set_swapchain_extent(&self, width: u32, height: u32) {
        *self.swapchain_extent.write() = Extent2d::new(width, height);
    }

    // ------------------------------------------------------------------
    // Textures
    // ------------------------------------------------------------------

    fn validate_texture(&self, descriptor: &TextureDescriptor) -> Result<(), GraphicsError> {
        let max = self.capabilities.max_texture_dimension;
        if descriptor.size.width == 0 || descriptor.size.height == 0 {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture {:?} has zero size",
                descriptor.label
            )));
        }
        if descriptor.size.width > max || descriptor.size.height > max {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture dimension {}x{} exceeds maximum {max}",
                descriptor.size.width, descriptor.size.height
            )));
        }
        Ok(())
    }

    /// Create a texture with its own memory.
    pub fn create_texture(
        &self,
        descriptor: &TextureDescriptor,
    ) -> Result<TextureHandle, GraphicsError> {
        self.validate_texture(descriptor)?;
        let mut resources = self.resources.write();
        self.create_texture_locked(&mut resources, descriptor, None)
    }

    /// Create a texture placed in the memory of `alias_of`.
    ///
    /// The new texture records the memory owner of `alias_of`, so alias
    /// chains never grow longer than one step.
    pub fn create_texture_aliased(
        &self,
        descriptor: &TextureDescriptor,
        alias_of: TextureHandle,
    ) -> Result<TextureHandle, GraphicsError> {
        self.validate_texture(descriptor)?;
        let mut resources = self.resources.write();
        if !resources.textures.contains(alias_of) {
            return Err(GraphicsError::InvalidHandle("texture"));
        }
        let owner = resources.memory_owner(alias_of);
        self.create_texture_locked(&mut resources, descriptor, Some(owner))
    }

    fn create_texture_locked(
        &self,
        resources: &mut ResourceRegistry,
        descriptor: &TextureDescriptor,
        alias_of: Option<TextureHandle>,
    ) -> Result<TextureHandle, GraphicsError> {
        let alias_image = alias_of
            .and_then(|owner| resources.textures.get(owner))
            .map(|owner| owner.image);
        let image = self.backend.create_image(descriptor, alias_image)?;
        let texture = Texture {
            descriptor: descriptor.clone(),
            state: ResourceState::UNDEFINED,
            image,
            alias_of,
        };
        match resources.textures.obtain(texture) {
            Some(handle) => {
                log::trace!(
                    "GpuDevice: created texture {:?} {:?} ({}x{}, alias of {:?})",
                    descriptor.label,
                    handle,
                    descriptor.size.width,
                    descriptor.size.height,
                    alias_of
                );
                Ok(handle)
            }
            None => {
                self.backend.destroy_image(image);
                Err(GraphicsError::PoolExhausted("texture"))
            }
        }
    }

    /// Destroy a texture. Stale handles are ignored.
    pub fn destroy_texture(&self, handle: TextureHandle) {
        let released = self.resources.write().textures.release(handle);
        match released {
            Some(texture) => {
                log::trace!("GpuDevice: destroyed texture {:?}", texture.descriptor.label);
                self.backend.destroy_image(texture.image);
            }
            None => log::warn!("GpuDevice: destroy of invalid texture {handle:?}"),
        }
    }

    /// Recreate a texture at a new size, keeping its handle.
    ///
    /// The texture gets fresh memory, so any alias is dropped, and its state
    /// goes back to undefined. Same-size requests do nothing.
    pub fn resize_texture(
        &self,
        handle: TextureHandle,
        width: u32,
        height: u32,
    ) -> Result<(), GraphicsError> {
        let mut resources = self.resources.write();
        self.resize_texture_locked(&mut resources, handle, width, height)
    }

    fn resize_texture_locked(
        &self,
        resources: &mut ResourceRegistry,
        handle: TextureHandle,
        width: u32,
        height: u32,
    ) -> Result<(), GraphicsError> {
        let texture = resources
            .textures
            .get_mut(handle)
            .ok_or(GraphicsError::InvalidHandle("texture"))?;
        if texture.descriptor.size == Extent2d::new(width, height) {
            return Ok(());
        }

        let mut descriptor = texture.descriptor.clone();
        descriptor.size = Extent2d::new(width, height);
        self.validate_texture(&descriptor)?;
        let image = self.backend.create_image(&descriptor, None)?;
        self.backend.destroy_image(texture.image);

        log::trace!(
            "GpuDevice: resized texture {:?} to {}x{}",
            descriptor.label,
            width,
            height
        );
        texture.descriptor = descriptor;
        texture.image = image;
        texture.alias_of = None;
        texture.state = ResourceState::UNDEFINED;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Buffers, pipelines, samplers
    // ------------------------------------------------------------------

    /// Create a GPU buffer.
    pub fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferHandle, GraphicsError> {
        if descriptor.size == 0 {
            return Err(GraphicsError::InvalidParameter(
                "buffer size cannot be zero".to_string(),
            ));
        }
        if descriptor.size > self.capabilities.max_buffer_size {
            return Err(GraphicsError::InvalidParameter(format!(
                "buffer size {} exceeds maximum {}",
                descriptor.size, self.capabilities.max_buffer_size
            )));
        }

        let buffer = self.backend.create_buffer(descriptor)?;
        let record = Buffer {
            descriptor: descriptor.clone(),
            buffer,
        };
        let handle = self.resources.write().buffers.obtain(record);
        handle.ok_or_else(|| {
            self.backend.destroy_buffer(buffer);
            GraphicsError::PoolExhausted("buffer")
        })
    }

    pub fn destroy_buffer(&self, handle: BufferHandle) {
        if let Some(buffer) = self.resources.write().buffers.release(handle) {
            self.backend.destroy_buffer(buffer.buffer);
        }
    }

    pub fn create_pipeline(
        &self,
        descriptor: &PipelineDescriptor,
    ) -> Result<PipelineHandle, GraphicsError> {
        let pipeline = self.backend.create_pipeline(descriptor)?;
        let record = Pipeline {
            descriptor: descriptor.clone(),
            pipeline,
        };
        let handle = self.resources.write().pipelines.obtain(record);
        handle.ok_or_else(|| {
            self.backend.destroy_pipeline(pipeline);
            GraphicsError::PoolExhausted("pipeline")
        })
    }

    pub fn destroy_pipeline(&self, handle: PipelineHandle) {
        if let Some(pipeline) = self.resources.write().pipelines.release(handle) {
            self.backend.destroy_pipeline(pipeline.pipeline);
        }
    }

    pub fn create_sampler(
        &self,
        descriptor: &SamplerDescriptor,
    ) -> Result<SamplerHandle, GraphicsError> {
        let sampler = self.backend.create_sampler(descriptor)?;
        let record = Sampler {
            descriptor: descriptor.clone(),
            sampler,
        };
        let handle = self.resources.write().samplers.obtain(record);
        handle.ok_or_else(|| {
            self.backend.destroy_sampler(sampler);
            GraphicsError::PoolExhausted("sampler")
        })
    }

    pub fn destroy_sampler(&self, handle: SamplerHandle) {
        if let Some(sampler) = self.resources.write().samplers.release(handle) {
            self.backend.destroy_sampler(sampler.sampler);
        }
    }

    // ------------------------------------------------------------------
    // Descriptor sets and shaders
    // ------------------------------------------------------------------

    pub fn create_descriptor_set_layout(
        &self,
        descriptor: &DescriptorSetLayoutDescriptor,
    ) -> Result<DescriptorSetLayoutHandle, GraphicsError> {
        descriptor.validate()?;
        let layout = self.backend.create_descriptor_set_layout(descriptor)?;
        let record = DescriptorSetLayout {
            descriptor: descriptor.clone(),
            layout,
        };
        let handle = self.resources.write().descriptor_set_layouts.obtain(record);
        handle.ok_or_else(|| {
            self.backend.destroy_descriptor_set_layout(layout);
            GraphicsError::PoolExhausted("descriptor set layout")
        })
    }

    /// Sets created from the layout stay alive.
    pub fn destroy_descriptor_set_layout(&self, handle: DescriptorSetLayoutHandle) {
        if let Some(layout) = self.resources.write().descriptor_set_layouts.release(handle) {
            self.backend.destroy_descriptor_set_layout(layout.layout);
        }
    }

    /// Create a descriptor set of `descriptor.layout`.
    ///
    /// Every write must name a binding of the layout with a live resource
    /// of the matching kind. Combined image sampler bindings also need a
    /// live sampler.
    pub fn create_descriptor_set(
        &self,
        descriptor: &DescriptorSetDescriptor,
    ) -> Result<DescriptorSetHandle, GraphicsError> {
        let mut resources = self.resources.write();
        let layout = resources
            .descriptor_set_layouts
            .get(descriptor.layout)
            .ok_or(GraphicsError::InvalidHandle("descriptor set layout"))?;
        for write in &descriptor.writes {
            validate_descriptor_write(&resources, layout.descriptor(), &descriptor.name, write)?;
        }
        let native_layout = layout.layout;

        let set = self.backend.create_descriptor_set(descriptor, native_layout)?;
        let record = DescriptorSet {
            descriptor: descriptor.clone(),
            set,
        };
        resources.descriptor_sets.obtain(record).ok_or_else(|| {
            self.backend.destroy_descriptor_set(set);
            GraphicsError::PoolExhausted("descriptor set")
        })
    }

    pub fn destroy_descriptor_set(&self, handle: DescriptorSetHandle) {
        if let Some(set) = self.resources.write().descriptor_sets.release(handle) {
            self.backend.destroy_descriptor_set(set.set);
        }
    }

    pub fn create_shader(&self, descriptor: &ShaderDescriptor) -> Result<ShaderHandle, GraphicsError> {
        descriptor.validate()?;
        let shader = self.backend.create_shader(descriptor)?;
        let record = Shader {
            descriptor: descriptor.clone(),
            shader,
        };
        let handle = self.resources.write().shaders.obtain(record);
        handle.ok_or_else(|| {
            self.backend.destroy_shader(shader);
            GraphicsError::PoolExhausted("shader")
        })
    }

    pub fn destroy_shader(&self, handle: ShaderHandle) {
        if let Some(shader) = self.resources.write().shaders.release(handle) {
            self.backend.destroy_shader(shader.shader);
        }
    }

    // ------------------------------------------------------------------
    // Render passes and framebuffers
    // ------------------------------------------------------------------

    pub fn create_render_pass(
        &self,
        descriptor: &RenderPassDescriptor,
    ) -> Result<RenderPassHandle, GraphicsError> {
        if descriptor.color_formats.len() != descriptor.color_operations.len() {
            return Err(GraphicsError::InvalidParameter(format!(
                "render pass {} has {} color formats but {} operations",
                descriptor.name,
                descriptor.color_formats.len(),
                descriptor.color_operations.len()
            )));
        }
        if descriptor.color_formats.len() > self.capabilities.max_color_attachments as usize {
            return Err(GraphicsError::InvalidParameter(format!(
                "render pass {} has more than {} color attachments",
                descriptor.name, self.capabilities.max_color_attachments
            )));
        }
        let record = RenderPass {
            descriptor: descriptor.clone(),
        };
        let handle = self
            .resources
            .write()
            .render_passes
            .obtain(record)
            .ok_or(GraphicsError::PoolExhausted("render pass"))?;
        log::trace!("GpuDevice: created render pass {}", descriptor.name);
        Ok(handle)
    }

    pub fn destroy_render_pass(&self, handle: RenderPassHandle) {
        self.resources.write().render_passes.release(handle);
    }

    fn validate_framebuffer(
        resources: &ResourceRegistry,
        descriptor: &FramebufferDescriptor,
    ) -> Result<(), GraphicsError> {
        if descriptor.render_pass.is_valid() && !resources.render_passes.contains(descriptor.render_pass)
        {
            return Err(GraphicsError::InvalidHandle("render pass"));
        }
        let all_attachments = descriptor
            .color_attachments
            .iter()
            .chain(descriptor.depth_stencil_attachment.iter());
        for &attachment in all_attachments {
            if !resources.textures.contains(attachment) {
                return Err(GraphicsError::InvalidHandle("texture"));
            }
        }
        Ok(())
    }

    /// Create a framebuffer.
    ///
    /// `render_pass` may be [`Handle::INVALID`](vesper_core::pool::Handle::INVALID)
    /// for attachment sets that are only written by compute work; such a
    /// framebuffer is never bound but still resizes its attachments.
    pub fn create_framebuffer(
        &self,
        descriptor: &FramebufferDescriptor,
    ) -> Result<FramebufferHandle, GraphicsError> {
        let mut resources = self.resources.write();
        Self::validate_framebuffer(&resources, descriptor)?;
        let record = Framebuffer {
            descriptor: descriptor.clone(),
        };
        let handle = resources
            .framebuffers
            .obtain(record)
            .ok_or(GraphicsError::PoolExhausted("framebuffer"))?;
        log::trace!(
            "GpuDevice: created framebuffer {} ({}x{})",
            descriptor.name,
            descriptor.width,
            descriptor.height
        );
        Ok(handle)
    }

    /// Replace the description of an existing framebuffer, keeping its
    /// handle. Used when the attachments were reallocated.
    pub fn update_framebuffer(
        &self,
        handle: FramebufferHandle,
        descriptor: &FramebufferDescriptor,
    ) -> Result<(), GraphicsError> {
        let mut resources = self.resources.write();
        Self::validate_framebuffer(&resources, descriptor)?;
        let framebuffer = resources
            .framebuffers
            .get_mut(handle)
            .ok_or(GraphicsError::InvalidHandle("framebuffer"))?;
        framebuffer.descriptor = descriptor.clone();
        Ok(())
    }

    /// Destroy a framebuffer, and its attachments unless it was created
    /// with `manual_resources_free`.
    pub fn destroy_framebuffer(&self, handle: FramebufferHandle) {
        let Some(framebuffer) = self.resources.write().framebuffers.release(handle) else {
            return;
        };
        if !framebuffer.descriptor.manual_resources_free {
            for attachment in framebuffer.attachments() {
                self.destroy_texture(attachment);
            }
        }
    }

    /// Resize a framebuffer to `width x height` times its scale.
    ///
    /// Only framebuffers flagged `resize` are touched. Every attachment is
    /// recreated at the new size under its existing handle.
    pub fn resize_framebuffer(
        &self,
        handle: FramebufferHandle,
        width: u32,
        height: u32,
    ) -> Result<(), GraphicsError> {
        let mut resources = self.resources.write();
        let framebuffer = resources
            .framebuffers
            .get(handle)
            .ok_or(GraphicsError::InvalidHandle("framebuffer"))?;
        if !framebuffer.descriptor.resize {
            return Ok(());
        }

        let size = Extent2d::new(width, height)
            .scaled(framebuffer.descriptor.scale_x, framebuffer.descriptor.scale_y);
        let attachments: Vec<TextureHandle> = framebuffer.attachments().collect();
        for attachment in attachments {
            self.resize_texture_locked(&mut resources, attachment, size.width, size.height)?;
        }

        if let Some(framebuffer) = resources.framebuffers.get_mut(handle) {
            framebuffer.descriptor.width = size.width;
            framebuffer.descriptor.height = size.height;
        }
        Ok(())
    }
}

impl Drop for GpuDevice {
    fn drop(&mut self) {
        let resources = self.resources.get_mut();
        let leaked = resources.textures.len() + resources.buffers.len();
        if leaked > 0 {
            log::warn!("GpuDevice: {leaked} textures/buffers still alive at shutdown, destroying");
        }
        for texture in resources.textures.release_all() {
            self.backend.destroy_image(texture.image);
        }
        for buffer in resources.buffers.release_all() {
            self.backend.destroy_buffer(buffer.buffer);
        }
        for pipeline in resources.pipelines.release_all() {
            self.backend.destroy_pipeline(pipeline.pipeline);
        }
        for sampler in resources.samplers.release_all() {
            self.backend.destroy_sampler(sampler.sampler);
        }
        for set in resources.descriptor_sets.release_all() {
            self.backend.destroy_descriptor_set(set.set);
        }
        for layout in resources.descriptor_set_layouts.release_all() {
            self.backend.destroy_descriptor_set_layout(layout.layout);
        }
        for shader in resources.shaders.release_all() {
            self.backend.destroy_shader(shader.shader);
        }
    }
}

fn validate_descriptor_write(
    resources: &ResourceRegistry,
    layout: &DescriptorSetLayoutDescriptor,
    set: &str,
    write: &DescriptorWrite,
) -> Result<(), GraphicsError> {
    let Some(binding) = layout.binding(write.binding) else {
        return Err(GraphicsError::InvalidParameter(format!(
            "descriptor set {set}: layout {} has no binding {}",
            layout.name, write.binding
        )));
    };
    let expected = binding.descriptor_type;
    let matches = match write.resource {
        DescriptorResource::Texture(texture) => {
            if !resources.textures.contains(texture) {
                return Err(GraphicsError::InvalidHandle("texture"));
            }
            expected.is_image()
        }
        DescriptorResource::Buffer(buffer) => {
            if !resources.buffers.contains(buffer) {
                return Err(GraphicsError::InvalidHandle("buffer"));
            }
            expected.is_buffer()
        }
        DescriptorResource::Sampler(sampler) => {
            if !resources.samplers.contains(sampler) {
                return Err(GraphicsError::InvalidHandle("sampler"));
            }
            expected == DescriptorType::Sampler
        }
    };
    if !matches {
        return Err(GraphicsError::InvalidParameter(format!(
            "descriptor set {set}: binding {} expects {expected:?}",
            write.binding
        )));
    }
    if expected == DescriptorType::CombinedImageSampler {
        match write.sampler {
            Some(sampler) if resources.samplers.contains(sampler) => {}
            Some(_) => return Err(GraphicsError::InvalidHandle("sampler")),
            None => {
                return Err(GraphicsError::InvalidParameter(format!(
                    "descriptor set {set}: binding {} needs a sampler",
                    write.binding
                )));
            }
        }
    }
    Ok(())
}

impl std::fmt::Debug for GpuDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuDevice")
            .field("backend", &self.backend.name())
            .field("renderer_size", &self.renderer_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DummyBackend;
    use crate::config::PoolConfig;
    use crate::resources::{RenderPassOperation, ShaderStage};
    use crate::types::{BufferUsage, TextureFormat, TextureUsage};

    fn device() -> (Arc<GpuDevice>, Arc<DummyBackend>) {
        let backend = Arc::new(DummyBackend::new());
        let device = GpuDevice::new(backend.clone(), GraphicsConfig::default());
        (device, backend)
    }

    fn color_desc(width: u32, height: u32) -> TextureDescriptor {
        TextureDescriptor::new_2d(
            width,
            height,
            TextureFormat::Rgba8Unorm,
            TextureUsage::RENDER_ATTACHMENT,
        )
    }

    #[test]
    fn test_texture_lifecycle() {
        let (device, backend) = device();
        let texture = device.create_texture(&color_desc(64, 32)).unwrap();
        assert_eq!(backend.live_image_count(), 1);
        assert_eq!(
            device.resources().texture(texture).unwrap().state(),
            ResourceState::UNDEFINED
        );

        device.destroy_texture(texture);
        assert_eq!(backend.live_image_count(), 0);
        assert!(device.resources().texture(texture).is_none());
    }

    #[test]
    fn test_stale_texture_handle_does_not_alias_new_texture() {
        let (device, _) = device();
        let old = device.create_texture(&color_desc(8, 8)).unwrap();
        device.destroy_texture(old);
        let new = device.create_texture(&color_desc(16, 16)).unwrap();
        assert_eq!(old.index(), new.index());
        assert!(device.resources().texture(old).is_none());
        assert_eq!(device.resources().texture(new).unwrap().width(), 16);
    }

    #[test]
    fn test_zero_sized_texture_rejected() {
        let (device, _) = device();
        let err = device.create_texture(&color_desc(0, 8)).unwrap_err();
        assert!(matches!(err, GraphicsError::InvalidParameter(_)));
    }

    #[test]
    fn test_texture_pool_exhaustion() {
        let backend = Arc::new(DummyBackend::new());
        let config = GraphicsConfig {
            pools: PoolConfig {
                textures: 1,
                ..PoolConfig::default()
            },
            ..GraphicsConfig::default()
        };
        let device = GpuDevice::new(backend.clone(), config);
        device.create_texture(&color_desc(8, 8)).unwrap();
        let err = device.create_texture(&color_desc(8, 8)).unwrap_err();
        assert_eq!(err, GraphicsError::PoolExhausted("texture"));
        assert_eq!(backend.live_image_count(), 1);
    }

    #[test]
    fn test_aliased_texture_resolves_to_owner() {
        let (device, backend) = device();
        let owner = device.create_texture(&color_desc(32, 32)).unwrap();
        let first = device
            .create_texture_aliased(&color_desc(32, 32), owner)
            .unwrap();
        let second = device
            .create_texture_aliased(&color_desc(32, 32), first)
            .unwrap();

        let resources = device.resources();
        assert_eq!(resources.memory_owner(second), owner);
        assert_eq!(resources.texture(second).unwrap().alias_of(), Some(owner));
        let memory = |h| {
            backend
                .image(resources.texture(h).unwrap().image())
                .unwrap()
                .memory
        };
        assert_eq!(memory(owner), memory(second));
    }

    #[test]
    fn test_resize_texture_keeps_handle() {
        let (device, backend) = device();
        let owner = device.create_texture(&color_desc(32, 32)).unwrap();
        let alias = device
            .create_texture_aliased(&color_desc(32, 32), owner)
            .unwrap();
        let old_image = device.resources().texture(alias).unwrap().image();

        device.resize_texture(alias, 64, 48).unwrap();
        let resources = device.resources();
        let texture = resources.texture(alias).unwrap();
        assert_eq!(texture.size(), Extent2d::new(64, 48));
        assert_eq!(texture.alias_of(), None);
        assert_ne!(texture.image(), old_image);
        assert!(backend.image(old_image).is_none());
        assert_eq!(backend.live_image_count(), 2);
    }

    #[test]
    fn test_resize_framebuffer_applies_scale() {
        let (device, _) = device();
        let color = device.create_texture(&color_desc(100, 50)).unwrap();
        let pass = device
            .create_render_pass(
                &RenderPassDescriptor::new("half")
                    .with_color(TextureFormat::Rgba8Unorm, RenderPassOperation::Clear),
            )
            .unwrap();
        let framebuffer = device
            .create_framebuffer(&FramebufferDescriptor {
                name: "half".into(),
                render_pass: pass,
                color_attachments: vec![color],
                width: 100,
                height: 50,
                scale_x: 0.5,
                scale_y: 0.5,
                manual_resources_free: true,
                ..FramebufferDescriptor::default()
            })
            .unwrap();

        device.resize_framebuffer(framebuffer, 400, 300).unwrap();
        let resources = device.resources();
        assert_eq!(resources.texture(color).unwrap().size(), Extent2d::new(200, 150));
        assert_eq!(resources.framebuffer(framebuffer).unwrap().width(), 200);
        assert_eq!(resources.framebuffer(framebuffer).unwrap().height(), 150);
    }

    #[test]
    fn test_destroy_framebuffer_respects_manual_free() {
        let (device, backend) = device();
        let pass = device
            .create_render_pass(
                &RenderPassDescriptor::new("p")
                    .with_color(TextureFormat::Rgba8Unorm, RenderPassOperation::Load),
            )
            .unwrap();
        let owned = device.create_texture(&color_desc(8, 8)).unwrap();
        let fb = device
            .create_framebuffer(&FramebufferDescriptor {
                render_pass: pass,
                color_attachments: vec![owned],
                width: 8,
                height: 8,
                manual_resources_free: false,
                ..FramebufferDescriptor::default()
            })
            .unwrap();
        device.destroy_framebuffer(fb);
        assert_eq!(backend.live_image_count(), 0);
    }

    #[test]
    fn test_render_pass_validation() {
        let (device, _) = device();
        let mut desc = RenderPassDescriptor::new("bad");
        desc.color_formats.push(TextureFormat::Rgba8Unorm);
        assert!(device.create_render_pass(&desc).is_err());
    }

    #[test]
    fn test_drop_destroys_remaining_images() {
        let backend = Arc::new(DummyBackend::new());
        {
            let device = GpuDevice::new(backend.clone(), GraphicsConfig::default());
            device.create_texture(&color_desc(4, 4)).unwrap();
        }
        assert_eq!(backend.live_image_count(), 0);
    }

    fn material_layout() -> DescriptorSetLayoutDescriptor {
        DescriptorSetLayoutDescriptor::new("material", 1)
            .with_binding(0, DescriptorType::UniformBuffer, "params")
            .with_binding(1, DescriptorType::CombinedImageSampler, "albedo")
    }

    fn params_buffer(device: &GpuDevice) -> BufferHandle {
        device
            .create_buffer(&BufferDescriptor::new(256, BufferUsage::UNIFORM))
            .unwrap()
    }

    #[test]
    fn test_descriptor_set_lifecycle() {
        let (device, backend) = device();
        let layout = device.create_descriptor_set_layout(&material_layout()).unwrap();
        let texture = device.create_texture(&color_desc(16, 16)).unwrap();
        let sampler = device.create_sampler(&SamplerDescriptor::linear_clamp()).unwrap();
        let buffer = params_buffer(&device);

        let set = device
            .create_descriptor_set(
                &DescriptorSetDescriptor::new("brick", layout)
                    .with_buffer(0, buffer)
                    .with_texture_sampler(1, texture, sampler),
            )
            .unwrap();
        {
            let resources = device.resources();
            let record = resources.descriptor_set(set).unwrap();
            assert_eq!(record.layout(), layout);
            assert_eq!(
                backend.descriptor_set_layout(record.native()),
                Some(resources.descriptor_set_layout(layout).unwrap().native())
            );
            assert_eq!(resources.descriptor_set_layout(layout).unwrap().set_index(), 1);
        }

        device.destroy_descriptor_set(set);
        assert!(device.resources().descriptor_set(set).is_none());
        assert_eq!(backend.live_descriptor_set_count(), 0);

        device.destroy_descriptor_set_layout(layout);
        assert!(device.resources().descriptor_set_layout(layout).is_none());
    }

    #[test]
    fn test_stale_descriptor_and_shader_handles() {
        let (device, _) = device();
        let old_layout = device.create_descriptor_set_layout(&material_layout()).unwrap();
        device.destroy_descriptor_set_layout(old_layout);
        let new_layout = device.create_descriptor_set_layout(&material_layout()).unwrap();
        assert_eq!(old_layout.index(), new_layout.index());
        assert!(device.resources().descriptor_set_layout(old_layout).is_none());
        assert!(device.resources().descriptor_set_layout(new_layout).is_some());

        // A set cannot be created from a destroyed layout.
        let err = device
            .create_descriptor_set(&DescriptorSetDescriptor::new("stale", old_layout))
            .unwrap_err();
        assert_eq!(err, GraphicsError::InvalidHandle("descriptor set layout"));

        let shader = ShaderDescriptor::new("blur").with_stage(ShaderStage::Compute, vec![1, 2, 3]);
        let old_shader = device.create_shader(&shader).unwrap();
        assert!(device.resources().shader(old_shader).unwrap().is_compute());
        device.destroy_shader(old_shader);
        let new_shader = device.create_shader(&shader).unwrap();
        assert_eq!(old_shader.index(), new_shader.index());
        assert!(device.resources().shader(old_shader).is_none());
        assert_eq!(device.resources().shader(new_shader).unwrap().name(), "blur");
    }

    #[test]
    fn test_descriptor_and_shader_pool_exhaustion() {
        let config = GraphicsConfig {
            pools: PoolConfig {
                descriptor_set_layouts: 1,
                descriptor_sets: 1,
                shaders: 1,
                ..PoolConfig::default()
            },
            ..GraphicsConfig::default()
        };
        let backend = Arc::new(DummyBackend::new());
        let device = GpuDevice::new(backend.clone(), config);

        let layout = device.create_descriptor_set_layout(&material_layout()).unwrap();
        assert_eq!(
            device.create_descriptor_set_layout(&material_layout()).unwrap_err(),
            GraphicsError::PoolExhausted("descriptor set layout")
        );

        let buffer = params_buffer(&device);
        let set = DescriptorSetDescriptor::new("params", layout).with_buffer(0, buffer);
        device.create_descriptor_set(&set).unwrap();
        assert_eq!(
            device.create_descriptor_set(&set).unwrap_err(),
            GraphicsError::PoolExhausted("descriptor set")
        );
        assert_eq!(backend.live_descriptor_set_count(), 1);

        let shader = ShaderDescriptor::new("opaque")
            .with_stage(ShaderStage::Vertex, vec![1])
            .with_stage(ShaderStage::Fragment, vec![2]);
        device.create_shader(&shader).unwrap();
        assert_eq!(
            device.create_shader(&shader).unwrap_err(),
            GraphicsError::PoolExhausted("shader")
        );
    }

    #[test]
    fn test_descriptor_writes_are_checked_against_layout() {
        let (device, backend) = device();
        let layout = device.create_descriptor_set_layout(&material_layout()).unwrap();
        let texture = device.create_texture(&color_desc(16, 16)).unwrap();
        let buffer = params_buffer(&device);
        let sampler = device.create_sampler(&SamplerDescriptor::linear_clamp()).unwrap();

        let unknown_binding = DescriptorSetDescriptor::new("a", layout).with_buffer(5, buffer);
        let wrong_kind = DescriptorSetDescriptor::new("b", layout).with_texture(0, texture);
        let missing_sampler = DescriptorSetDescriptor::new("c", layout).with_texture(1, texture);
        for descriptor in [unknown_binding, wrong_kind, missing_sampler] {
            assert!(matches!(
                device.create_descriptor_set(&descriptor),
                Err(GraphicsError::InvalidParameter(_))
            ));
        }

        device.destroy_texture(texture);
        let dead_texture =
            DescriptorSetDescriptor::new("d", layout).with_texture_sampler(1, texture, sampler);
        assert_eq!(
            device.create_descriptor_set(&dead_texture).unwrap_err(),
            GraphicsError::InvalidHandle("texture")
        );
        assert_eq!(backend.live_descriptor_set_count(), 0);
        assert_eq!(device.resources().descriptor_set_count(), 0);
    }

    #[test]
    fn test_drop_destroys_descriptor_sets() {
        let backend = Arc::new(DummyBackend::new());
        {
            let device = GpuDevice::new(backend.clone(), GraphicsConfig::default());
            let layout = device.create_descriptor_set_layout(&material_layout()).unwrap();
            let buffer = params_buffer(&device);
            device
                .create_descriptor_set(
                    &DescriptorSetDescriptor::new("params", layout).with_buffer(0, buffer),
                )
                .unwrap();
            assert_eq!(backend.live_descriptor_set_count(), 1);
        }
        assert_eq!(backend.live_descriptor_set_count(), 0);
    }
}
