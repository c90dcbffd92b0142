//! Texture types and descriptors.

use super::Extent2d;
use bitflags::bitflags;

/// Texture format enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum TextureFormat {
    /// Format not known; attachments never use it.
    Undefined,

    // 8-bit formats
    R8Unorm,
    Rg8Unorm,

    // 16-bit formats
    R16Float,

    // 32-bit formats
    R32Float,
    R32Uint,
    Rg16Float,
    #[default]
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,

    // 64-bit formats
    Rgba16Float,
    Rg32Float,

    // 128-bit formats
    Rgba32Float,

    // Depth/stencil formats
    Depth16Unorm,
    Depth24PlusStencil8,
    Depth32Float,
    Depth32FloatStencil8,
}

/// Accepted spellings: engine snake-case name, then Vulkan enumerant name.
const FORMAT_NAMES: &[(TextureFormat, &str, &str)] = &[
    (TextureFormat::R8Unorm, "r8_unorm", "VK_FORMAT_R8_UNORM"),
    (TextureFormat::Rg8Unorm, "rg8_unorm", "VK_FORMAT_R8G8_UNORM"),
    (TextureFormat::R16Float, "r16_float", "VK_FORMAT_R16_SFLOAT"),
    (TextureFormat::R32Float, "r32_float", "VK_FORMAT_R32_SFLOAT"),
    (TextureFormat::R32Uint, "r32_uint", "VK_FORMAT_R32_UINT"),
    (TextureFormat::Rg16Float, "rg16_float", "VK_FORMAT_R16G16_SFLOAT"),
    (TextureFormat::Rgba8Unorm, "rgba8_unorm", "VK_FORMAT_R8G8B8A8_UNORM"),
    (TextureFormat::Rgba8UnormSrgb, "rgba8_unorm_srgb", "VK_FORMAT_R8G8B8A8_SRGB"),
    (TextureFormat::Bgra8Unorm, "bgra8_unorm", "VK_FORMAT_B8G8R8A8_UNORM"),
    (TextureFormat::Bgra8UnormSrgb, "bgra8_unorm_srgb", "VK_FORMAT_B8G8R8A8_SRGB"),
    (TextureFormat::Rgba16Float, "rgba16_float", "VK_FORMAT_R16G16B16A16_SFLOAT"),
    (TextureFormat::Rg32Float, "rg32_float", "VK_FORMAT_R32G32_SFLOAT"),
    (TextureFormat::Rgba32Float, "rgba32_float", "VK_FORMAT_R32G32B32A32_SFLOAT"),
    (TextureFormat::Depth16Unorm, "d16_unorm", "VK_FORMAT_D16_UNORM"),
    (TextureFormat::Depth24PlusStencil8, "d24_unorm_s8_uint", "VK_FORMAT_D24_UNORM_S8_UINT"),
    (TextureFormat::Depth32Float, "d32_float", "VK_FORMAT_D32_SFLOAT"),
    (TextureFormat::Depth32FloatStencil8, "d32_float_s8_uint", "VK_FORMAT_D32_SFLOAT_S8_UINT"),
];

impl TextureFormat {
    /// Parses a format name as written in graph descriptions.
    ///
    /// Both engine names (`"rgba16_float"`) and Vulkan enumerant names
    /// (`"VK_FORMAT_R16G16B16A16_SFLOAT"`) are accepted.
    pub fn from_name(name: &str) -> Option<Self> {
        FORMAT_NAMES
            .iter()
            .find(|(_, short, vk)| name.eq_ignore_ascii_case(short) || name == *vk)
            .map(|(format, _, _)| *format)
    }

    /// Engine name of the format.
    pub fn name(&self) -> &'static str {
        FORMAT_NAMES
            .iter()
            .find(|(format, _, _)| format == self)
            .map_or("undefined", |(_, short, _)| short)
    }

    /// Returns true if this format has a depth component.
    pub fn has_depth(&self) -> bool {
        matches!(
            self,
            Self::Depth16Unorm
                | Self::Depth24PlusStencil8
                | Self::Depth32Float
                | Self::Depth32FloatStencil8
        )
    }

    /// Returns true if this format has a stencil component.
    pub fn has_stencil(&self) -> bool {
        matches!(self, Self::Depth24PlusStencil8 | Self::Depth32FloatStencil8)
    }

    /// Returns the size in bytes per pixel.
    pub fn block_size(&self) -> u32 {
        match self {
            Self::Undefined => 0,
            Self::R8Unorm => 1,
            Self::R16Float | Self::Rg8Unorm | Self::Depth16Unorm => 2,
            Self::R32Float
            | Self::R32Uint
            | Self::Rg16Float
            | Self::Rgba8Unorm
            | Self::Rgba8UnormSrgb
            | Self::Bgra8Unorm
            | Self::Bgra8UnormSrgb
            | Self::Depth24PlusStencil8
            | Self::Depth32Float => 4,
            Self::Rgba16Float | Self::Rg32Float | Self::Depth32FloatStencil8 => 8,
            Self::Rgba32Float => 16,
        }
    }
}

bitflags! {
    /// Usage flags for textures.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        const COPY_SRC = 1 << 0;
        const COPY_DST = 1 << 1;
        /// Texture can be sampled in a shader.
        const TEXTURE_BINDING = 1 << 2;
        /// Texture can be written from compute shaders.
        const STORAGE_BINDING = 1 << 3;
        /// Texture can be used as a color or depth attachment.
        const RENDER_ATTACHMENT = 1 << 4;
    }
}

impl Default for TextureUsage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Descriptor for creating a 2D texture.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    /// Debug label for the texture.
    pub label: Option<String>,
    pub size: Extent2d,
    pub mip_level_count: u32,
    pub sample_count: u32,
    pub format: TextureFormat,
    pub usage: TextureUsage,
}

impl TextureDescriptor {
    /// Create a new 2D texture descriptor.
    pub fn new_2d(width: u32, height: u32, format: TextureFormat, usage: TextureUsage) -> Self {
        Self {
            label: None,
            size: Extent2d::new(width, height),
            mip_level_count: 1,
            sample_count: 1,
            format,
            usage,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the mip level count.
    pub fn with_mip_levels(mut self, count: u32) -> Self {
        self.mip_level_count = count;
        self
    }
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            size: Extent2d::default(),
            mip_level_count: 1,
            sample_count: 1,
            format: TextureFormat::default(),
            usage: TextureUsage::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_vulkan_name() {
        assert_eq!(
            TextureFormat::from_name("VK_FORMAT_B8G8R8A8_UNORM"),
            Some(TextureFormat::Bgra8Unorm)
        );
        assert_eq!(
            TextureFormat::from_name("VK_FORMAT_R16G16B16A16_SFLOAT"),
            Some(TextureFormat::Rgba16Float)
        );
        assert_eq!(
            TextureFormat::from_name("VK_FORMAT_D32_SFLOAT"),
            Some(TextureFormat::Depth32Float)
        );
    }

    #[test]
    fn test_format_from_engine_name() {
        assert_eq!(
            TextureFormat::from_name("rgba8_unorm"),
            Some(TextureFormat::Rgba8Unorm)
        );
        assert_eq!(
            TextureFormat::from_name("D24_UNORM_S8_UINT"),
            Some(TextureFormat::Depth24PlusStencil8)
        );
        assert_eq!(TextureFormat::from_name("rgb9e5"), None);
        assert_eq!(TextureFormat::Rgba16Float.name(), "rgba16_float");
    }

    #[test]
    fn test_depth_queries() {
        assert!(TextureFormat::Depth32Float.has_depth());
        assert!(!TextureFormat::Depth32Float.has_stencil());
        assert!(TextureFormat::Depth24PlusStencil8.has_stencil());
        assert!(!TextureFormat::Rgba8Unorm.has_depth());
        assert_eq!(TextureFormat::Rgba16Float.block_size(), 8);
    }
}
