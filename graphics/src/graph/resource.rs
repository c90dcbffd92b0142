//! Resources declared by render graph nodes.

use vesper_core::pool::Handle;

use super::NodeHandle;
use crate::resources::{BufferHandle, RenderPassOperation, TextureHandle};
use crate::types::{Extent2d, TextureFormat};

/// Handle to a resource in the graph's resource pool.
pub type ResourceHandle = Handle<RenderGraphResource>;

/// What a graph resource is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceType {
    /// A texture sampled by consumers.
    #[default]
    Texture,
    /// A texture rendered into; allocated by the graph.
    Attachment,
    /// Pure ordering dependency with no backing memory.
    Marker,
    /// Names an output of another node without registering it.
    Reference,
    /// A buffer owned outside the graph.
    Buffer,
}

impl ResourceType {
    /// Parses the `type` string of a graph description.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "texture" => Some(Self::Texture),
            "attachment" => Some(Self::Attachment),
            "marker" => Some(Self::Marker),
            "reference" => Some(Self::Reference),
            "buffer" => Some(Self::Buffer),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Texture => "texture",
            Self::Attachment => "attachment",
            Self::Marker => "marker",
            Self::Reference => "reference",
            Self::Buffer => "buffer",
        }
    }

    /// Whether the resource is backed by a texture.
    pub fn is_texture(self) -> bool {
        matches!(self, Self::Texture | Self::Attachment)
    }
}

/// Physical description of a resource, shared by an output and every input
/// resolved to it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceInfo {
    /// Owned outside the graph; never allocated nor freed by it.
    pub external: bool,
    pub format: TextureFormat,
    /// Size relative to the renderer size.
    pub scale: [f32; 2],
    pub depth: u32,
    pub load_op: RenderPassOperation,
    /// RGBA clear color, or `[depth, stencil, _, _]` for depth formats.
    pub clear_values: [f32; 4],
    pub texture: Option<TextureHandle>,
    pub buffer_size: u64,
    pub buffer: Option<BufferHandle>,
}

impl Default for ResourceInfo {
    fn default() -> Self {
        Self {
            external: false,
            format: TextureFormat::Undefined,
            scale: [1.0, 1.0],
            depth: 1,
            load_op: RenderPassOperation::DontCare,
            clear_values: [0.0; 4],
            texture: None,
            buffer_size: 0,
            buffer: None,
        }
    }
}

impl ResourceInfo {
    /// Extent of the resource for a given renderer size.
    pub fn extent(&self, renderer_size: Extent2d) -> Extent2d {
        renderer_size.scaled(self.scale[0], self.scale[1])
    }

    pub fn is_depth(&self) -> bool {
        self.format.has_depth()
    }
}

/// A node input or output.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderGraphResource {
    pub name: String,
    pub resource_type: ResourceType,
    /// Node writing the resource. `None` for unresolved inputs.
    pub producer: Option<NodeHandle>,
    /// The output this resource refers to; an output refers to itself.
    pub output_handle: Option<ResourceHandle>,
    pub info: ResourceInfo,
    /// Enabled consumers still to run; only meaningful during compile.
    pub ref_count: u32,
}

/// Declares a node input.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceInputCreation {
    pub name: String,
    pub resource_type: ResourceType,
    pub external: bool,
}

impl ResourceInputCreation {
    pub fn new(resource_type: ResourceType, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resource_type,
            external: false,
        }
    }

    pub fn texture(name: impl Into<String>) -> Self {
        Self::new(ResourceType::Texture, name)
    }

    pub fn attachment(name: impl Into<String>) -> Self {
        Self::new(ResourceType::Attachment, name)
    }

    pub fn marker(name: impl Into<String>) -> Self {
        Self::new(ResourceType::Marker, name)
    }

    /// Marks the input as produced outside the graph.
    pub fn external(mut self) -> Self {
        self.external = true;
        self
    }
}

/// Declares a node output.
///
/// ```
/// use vesper_graphics::graph::ResourceOutputCreation;
/// use vesper_graphics::resources::RenderPassOperation;
/// use vesper_graphics::types::TextureFormat;
///
/// let depth = ResourceOutputCreation::attachment(
///     "depth",
///     TextureFormat::Depth32Float,
///     RenderPassOperation::Clear,
/// )
/// .with_clear_depth(1.0, 0);
/// assert_eq!(depth.info.clear_values[0], 1.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceOutputCreation {
    pub name: String,
    pub resource_type: ResourceType,
    pub info: ResourceInfo,
}

impl ResourceOutputCreation {
    pub fn new(resource_type: ResourceType, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resource_type,
            info: ResourceInfo::default(),
        }
    }

    /// A renderer-sized attachment.
    pub fn attachment(
        name: impl Into<String>,
        format: TextureFormat,
        load_op: RenderPassOperation,
    ) -> Self {
        let mut creation = Self::new(ResourceType::Attachment, name);
        creation.info.format = format;
        creation.info.load_op = load_op;
        if format.has_depth() {
            creation.info.clear_values = [1.0, 0.0, 0.0, 0.0];
        }
        creation
    }

    pub fn texture(name: impl Into<String>) -> Self {
        Self::new(ResourceType::Texture, name)
    }

    pub fn marker(name: impl Into<String>) -> Self {
        Self::new(ResourceType::Marker, name)
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Self::new(ResourceType::Reference, name)
    }

    pub fn buffer(name: impl Into<String>, size: u64) -> Self {
        let mut creation = Self::new(ResourceType::Buffer, name);
        creation.info.buffer_size = size;
        creation
    }

    pub fn with_scale(mut self, scale_x: f32, scale_y: f32) -> Self {
        self.info.scale = [scale_x, scale_y];
        self
    }

    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.info.clear_values = color;
        self
    }

    pub fn with_clear_depth(mut self, depth: f32, stencil: u32) -> Self {
        self.info.clear_values = [depth, stencil as f32, 0.0, 0.0];
        self
    }

    /// Marks the output as owned outside the graph.
    pub fn external(mut self) -> Self {
        self.info.external = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_type_names() {
        for ty in [
            ResourceType::Texture,
            ResourceType::Attachment,
            ResourceType::Marker,
            ResourceType::Reference,
            ResourceType::Buffer,
        ] {
            assert_eq!(ResourceType::from_name(ty.name()), Some(ty));
        }
        assert_eq!(ResourceType::from_name("image"), None);
        assert!(ResourceType::Attachment.is_texture());
        assert!(!ResourceType::Marker.is_texture());
    }

    #[test]
    fn test_attachment_defaults() {
        let color = ResourceOutputCreation::attachment(
            "color",
            TextureFormat::Rgba8Unorm,
            RenderPassOperation::Clear,
        );
        assert_eq!(color.info.scale, [1.0, 1.0]);
        assert_eq!(color.info.depth, 1);
        assert_eq!(color.info.clear_values, [0.0; 4]);
        assert!(!color.info.is_depth());

        let depth = ResourceOutputCreation::attachment(
            "depth",
            TextureFormat::Depth24PlusStencil8,
            RenderPassOperation::Clear,
        );
        assert!(depth.info.is_depth());
        assert_eq!(depth.info.clear_values[0], 1.0);
    }

    #[test]
    fn test_extent_scaling() {
        let info = ResourceOutputCreation::texture("half")
            .with_scale(0.5, 0.25)
            .info;
        assert_eq!(
            info.extent(Extent2d::new(1280, 720)),
            Extent2d::new(640, 180)
        );
    }
}
