//! Renderer configuration loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file at all, through
//! [`GraphicsConfig::load_or_default`]) yields a working configuration.
//!
//! ```toml
//! swapchain_images = 3
//!
//! [pools]
//! textures = 512
//!
//! [commands]
//! pools_per_frame = 4
//! ```

use std::fmt;
use std::path::Path;

use serde::Deserialize;

/// Upper bound on frames in flight.
pub const MAX_SWAPCHAIN_IMAGES: u32 = 3;

/// Top-level renderer configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GraphicsConfig {
    /// Frames in flight; each has its own set of command pools.
    pub swapchain_images: u32,
    pub pools: PoolConfig,
    pub commands: CommandBufferConfig,
    pub graph: GraphConfig,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            swapchain_images: MAX_SWAPCHAIN_IMAGES,
            pools: PoolConfig::default(),
            commands: CommandBufferConfig::default(),
            graph: GraphConfig::default(),
        }
    }
}

/// Capacities of the device resource pools.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub textures: u32,
    pub buffers: u32,
    pub pipelines: u32,
    pub render_passes: u32,
    pub framebuffers: u32,
    pub samplers: u32,
    pub descriptor_set_layouts: u32,
    pub descriptor_sets: u32,
    pub shaders: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            textures: 512,
            buffers: 4096,
            pipelines: 128,
            render_passes: 256,
            framebuffers: 256,
            samplers: 32,
            descriptor_set_layouts: 128,
            descriptor_sets: 1024,
            shaders: 128,
        }
    }
}

/// Command buffer manager sizing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CommandBufferConfig {
    /// Command pools per frame; one per recording thread.
    pub pools_per_frame: u32,
    /// Primary buffers pre-allocated in every pool.
    pub primary_per_pool: u32,
    /// Secondary buffers pre-allocated in every pool.
    pub secondary_per_pool: u32,
}

impl Default for CommandBufferConfig {
    fn default() -> Self {
        Self {
            pools_per_frame: 1,
            primary_per_pool: 3,
            secondary_per_pool: 5,
        }
    }
}

/// Render graph limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub max_nodes: u32,
    pub max_resources: u32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_nodes: 1024,
            max_resources: 1024,
        }
    }
}

/// Errors raised while loading a configuration file.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
        }
    }
}

impl GraphicsConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        Ok(config.clamped())
    }

    /// Reads and parses a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_toml_str(&content)
    }

    /// Like [`load`](Self::load), falling back to defaults on any error.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => {
                log::info!("Loaded graphics config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("No graphics config ({e}), using defaults");
                Self::default()
            }
        }
    }

    fn clamped(mut self) -> Self {
        if self.swapchain_images == 0 || self.swapchain_images > MAX_SWAPCHAIN_IMAGES {
            log::warn!(
                "swapchain_images = {} out of range, clamping to 1..={}",
                self.swapchain_images,
                MAX_SWAPCHAIN_IMAGES
            );
            self.swapchain_images = self.swapchain_images.clamp(1, MAX_SWAPCHAIN_IMAGES);
        }
        self.commands.pools_per_frame = self.commands.pools_per_frame.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GraphicsConfig::default();
        assert_eq!(config.swapchain_images, 3);
        assert_eq!(config.commands.primary_per_pool, 3);
        assert_eq!(config.commands.secondary_per_pool, 5);
        assert_eq!(config.graph.max_nodes, 1024);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = GraphicsConfig::from_toml_str(
            r#"
            [commands]
            pools_per_frame = 4

            [pools]
            textures = 64
            "#,
        )
        .unwrap();
        assert_eq!(config.commands.pools_per_frame, 4);
        assert_eq!(config.commands.primary_per_pool, 3);
        assert_eq!(config.pools.textures, 64);
        assert_eq!(config.pools.buffers, 4096);
        assert_eq!(config.pools.shaders, 128);
        assert_eq!(config.pools.descriptor_set_layouts, 128);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let config = GraphicsConfig::from_toml_str(
            "swapchain_images = 8\n[commands]\npools_per_frame = 0\n",
        )
        .unwrap();
        assert_eq!(config.swapchain_images, MAX_SWAPCHAIN_IMAGES);
        assert_eq!(config.commands.pools_per_frame, 1);
    }

    #[test]
    fn test_invalid_toml() {
        let err = GraphicsConfig::from_toml_str("swapchain_images = \"three\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().starts_with("failed to parse config"));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let config = GraphicsConfig::load_or_default(Path::new("/nonexistent/vesper.toml"));
        assert_eq!(config, GraphicsConfig::default());
    }
}
