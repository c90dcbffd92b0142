//! Render graph nodes.

use std::fmt;

use vesper_core::pool::Handle;

use super::{PassContainer, ResourceHandle, ResourceInputCreation, ResourceOutputCreation};
use crate::resources::{FramebufferHandle, RenderPassHandle};

/// Handle to a node in the graph's node pool.
pub type NodeHandle = Handle<RenderGraphNode>;

/// Kind of work a node records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NodeType {
    #[default]
    Graphics,
    Compute,
    RayTracing,
}

impl NodeType {
    /// Parses the `type` string of a graph description. Anything that is
    /// not compute or ray tracing is a graphics node.
    pub fn from_name(name: &str) -> Self {
        match name {
            "compute" => Self::Compute,
            "ray_tracing" => Self::RayTracing,
            _ => Self::Graphics,
        }
    }
}

/// A pass of the render graph.
pub struct RenderGraphNode {
    pub name: String,
    pub node_type: NodeType,
    pub enabled: bool,
    pub inputs: Vec<ResourceHandle>,
    pub outputs: Vec<ResourceHandle>,
    /// Enabled nodes consuming one of this node's outputs. Rebuilt by
    /// every compile.
    pub edges: Vec<NodeHandle>,
    pub render_pass: Option<RenderPassHandle>,
    pub framebuffer: Option<FramebufferHandle>,
    pub(crate) pass: Option<Box<dyn PassContainer>>,
}

impl RenderGraphNode {
    /// Whether rendering code was registered for this node.
    pub fn has_pass(&self) -> bool {
        self.pass.is_some()
    }
}

impl fmt::Debug for RenderGraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderGraphNode")
            .field("name", &self.name)
            .field("node_type", &self.node_type)
            .field("enabled", &self.enabled)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("edges", &self.edges)
            .field("render_pass", &self.render_pass)
            .field("framebuffer", &self.framebuffer)
            .field("has_pass", &self.pass.is_some())
            .finish()
    }
}

/// Declares a node.
///
/// ```
/// use vesper_graphics::graph::{NodeCreation, ResourceInputCreation, ResourceOutputCreation};
/// use vesper_graphics::resources::RenderPassOperation;
/// use vesper_graphics::types::TextureFormat;
///
/// let node = NodeCreation::graphics("lighting")
///     .with_input(ResourceInputCreation::texture("gbuffer_albedo"))
///     .with_output(ResourceOutputCreation::attachment(
///         "lit",
///         TextureFormat::Rgba16Float,
///         RenderPassOperation::DontCare,
///     ));
/// assert!(node.enabled);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NodeCreation {
    pub name: String,
    pub node_type: NodeType,
    pub enabled: bool,
    pub inputs: Vec<ResourceInputCreation>,
    pub outputs: Vec<ResourceOutputCreation>,
}

impl NodeCreation {
    pub fn new(name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            name: name.into(),
            node_type,
            enabled: true,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn graphics(name: impl Into<String>) -> Self {
        Self::new(name, NodeType::Graphics)
    }

    pub fn compute(name: impl Into<String>) -> Self {
        Self::new(name, NodeType::Compute)
    }

    pub fn ray_tracing(name: impl Into<String>) -> Self {
        Self::new(name, NodeType::RayTracing)
    }

    pub fn with_input(mut self, input: ResourceInputCreation) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn with_output(mut self, output: ResourceOutputCreation) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}
