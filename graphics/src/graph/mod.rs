//! Render graph infrastructure.
//!
//! A render graph describes a frame as nodes (render, compute and ray
//! tracing passes) that read and write named resources. Compiling the
//! graph:
//!
//! - orders the nodes so producers run before their consumers
//! - allocates the attachment textures, letting outputs whose lifetimes do
//!   not overlap share memory
//! - creates each node's render pass and framebuffer
//!
//! Rendering then walks the nodes in order, inserting the texture barriers
//! each node needs around its [`PassContainer`] callbacks.
//!
//! # Architecture
//!
//! | Piece | Type | Purpose |
//! |-------|------|---------|
//! | Builder | [`RenderGraphBuilder`] | Node/resource pools and name lookup |
//! | Description | [`GraphDescription`] | JSON graph files |
//! | Compiler | [`crate::compiler`] | Edges, sort, aliasing, passes |
//! | Executor | [`crate::executor`] | Barriers and callbacks per frame |
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use vesper_graphics::graph::{
//!     NodeCreation, RenderGraph, ResourceInputCreation, ResourceOutputCreation,
//! };
//! use vesper_graphics::resources::RenderPassOperation;
//! use vesper_graphics::types::TextureFormat;
//! use vesper_graphics::{DummyBackend, GpuDevice, GraphicsConfig};
//!
//! let device = GpuDevice::new(Arc::new(DummyBackend::new()), GraphicsConfig::default());
//! device.set_renderer_size(1280, 720);
//!
//! let mut graph = RenderGraph::new(device);
//! graph.add_node(
//!     &NodeCreation::graphics("compose").with_input(ResourceInputCreation::texture("color")),
//! )?;
//! graph.add_node(&NodeCreation::graphics("gbuffer").with_output(
//!     ResourceOutputCreation::attachment("color", TextureFormat::Rgba8Unorm, RenderPassOperation::Clear),
//! ))?;
//!
//! graph.compile()?;
//! assert_eq!(graph.node_names(), ["gbuffer", "compose"]);
//! # Ok::<(), vesper_graphics::graph::GraphError>(())
//! ```

mod builder;
mod description;
mod error;
mod node;
mod pass;
mod resource;

use std::path::Path;
use std::sync::Arc;

pub use builder::RenderGraphBuilder;
pub use description::GraphDescription;
pub use error::GraphError;
pub use node::{NodeCreation, NodeHandle, NodeType, RenderGraphNode};
pub use pass::{EmptyPass, PassContainer};
pub use resource::{
    RenderGraphResource, ResourceHandle, ResourceInfo, ResourceInputCreation,
    ResourceOutputCreation, ResourceType,
};

use crate::command::CommandBuffer;
use crate::compiler::{self, CompileReport};
use crate::device::GpuDevice;
use crate::executor;
use crate::resources::TextureHandle;

/// A frame graph bound to a device.
///
/// The graph owns the textures, render passes and framebuffers it creates
/// and destroys them on [`shutdown`](Self::shutdown) or drop.
pub struct RenderGraph {
    name: String,
    device: Arc<GpuDevice>,
    builder: RenderGraphBuilder,
    /// Enabled nodes in execution order, then disabled nodes.
    nodes: Vec<NodeHandle>,
    owned_textures: Vec<TextureHandle>,
    report: CompileReport,
}

impl RenderGraph {
    pub fn new(device: Arc<GpuDevice>) -> Self {
        let builder = RenderGraphBuilder::new(&device.config().graph);
        Self {
            name: String::from("render_graph"),
            device,
            builder,
            nodes: Vec::new(),
            owned_textures: Vec::new(),
            report: CompileReport::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device(&self) -> &Arc<GpuDevice> {
        &self.device
    }

    pub fn builder(&self) -> &RenderGraphBuilder {
        &self.builder
    }

    pub fn builder_mut(&mut self) -> &mut RenderGraphBuilder {
        &mut self.builder
    }

    /// Adds the nodes of a JSON description.
    ///
    /// The description is validated completely before any node is created.
    pub fn parse_description(&mut self, json: &str) -> Result<(), GraphError> {
        let description = GraphDescription::parse(json)?;
        if let Some(name) = description.name {
            self.name = name;
        }
        for node in &description.nodes {
            self.builder.create_node(node)?;
        }
        log::info!(
            "Render graph {}: parsed {} nodes",
            self.name,
            description.nodes.len()
        );
        Ok(())
    }

    /// Reads a JSON description file and adds its nodes.
    pub fn load_description(&mut self, path: impl AsRef<Path>) -> Result<(), GraphError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|err| GraphError::Io(format!("{}: {err}", path.display())))?;
        self.parse_description(&json)
    }

    pub fn add_node(&mut self, creation: &NodeCreation) -> Result<NodeHandle, GraphError> {
        self.builder.create_node(creation)
    }

    /// Resolves inputs, orders the nodes and (re)allocates the graph's
    /// textures, render passes and framebuffers.
    ///
    /// # Errors
    ///
    /// [`GraphError::CyclicDependency`] leaves the previous execution order
    /// and GPU objects in place. Allocation failures surface as
    /// [`GraphError::Graphics`] after the graph has released everything it
    /// created, as [`shutdown`](Self::shutdown) does; rendering is then a
    /// no-op until a compile succeeds.
    pub fn compile(&mut self) -> Result<&CompileReport, GraphError> {
        let compiled = compiler::compile(
            &self.device,
            &mut self.builder,
            &mut self.nodes,
            &mut self.owned_textures,
        );
        match compiled {
            Ok(report) => {
                self.report = report;
                Ok(&self.report)
            }
            Err(err) => {
                if !matches!(err, GraphError::CyclicDependency { .. }) {
                    self.report = CompileReport::default();
                }
                Err(err)
            }
        }
    }

    /// Records all enabled nodes into `cmd`.
    pub fn render(&mut self, cmd: &mut CommandBuffer) {
        executor::render(&mut self.builder, &self.nodes, cmd);
    }

    /// Updates the renderer size and resizes every enabled node's
    /// framebuffer to it.
    ///
    /// Resized attachments get memory of their own; aliasing comes back with
    /// the next [`compile`](Self::compile).
    pub fn on_resize(&mut self, width: u32, height: u32) {
        self.device.set_renderer_size(width, height);
        executor::on_resize(&self.device, &mut self.builder, &self.nodes, width, height);
    }

    pub fn on_techniques_reloaded(&mut self) {
        executor::on_techniques_reloaded(&mut self.builder);
    }

    /// Enables or disables node `name`; takes effect at the next compile.
    /// Returns false if there is no such node.
    pub fn set_node_enabled(&mut self, name: &str, enabled: bool) -> bool {
        let node = self
            .builder
            .node_handle(name)
            .and_then(|handle| self.builder.access_node_mut(handle));
        match node {
            Some(node) => {
                node.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Handles in execution order; disabled nodes trail the enabled ones.
    pub fn execution_order(&self) -> &[NodeHandle] {
        &self.nodes
    }

    /// Names of the enabled nodes in execution order.
    pub fn node_names(&self) -> Vec<&str> {
        self.nodes
            .iter()
            .filter_map(|&handle| self.builder.access_node(handle))
            .filter(|node| node.enabled)
            .map(|node| node.name.as_str())
            .collect()
    }

    /// Result of the last successful compile.
    pub fn report(&self) -> &CompileReport {
        &self.report
    }

    /// Textures currently allocated by the graph.
    pub fn owned_textures(&self) -> &[TextureHandle] {
        &self.owned_textures
    }

    pub fn register_render_pass(&mut self, name: &str, pass: Box<dyn PassContainer>) {
        self.builder.register_render_pass(name, pass);
    }

    pub fn unregister_render_pass(&mut self, name: &str) -> Option<Box<dyn PassContainer>> {
        self.builder.unregister_render_pass(name)
    }

    pub fn unregister_all_render_passes(&mut self) {
        self.builder.unregister_all_render_passes();
    }

    /// Destroys everything the graph created on the device. The nodes stay;
    /// compiling again recreates the GPU objects.
    pub fn shutdown(&mut self) {
        compiler::release(
            &self.device,
            &mut self.builder,
            &mut self.nodes,
            &mut self.owned_textures,
        );
        self.report = CompileReport::default();
    }
}

impl Drop for RenderGraph {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for RenderGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderGraph")
            .field("name", &self.name)
            .field("nodes", &self.nodes.len())
            .field("owned_textures", &self.owned_textures.len())
            .finish()
    }
}
