//! Node and resource storage of a render graph.

use std::collections::HashMap;

use vesper_core::pool::ResourcePool;

use super::{
    GraphError, NodeCreation, NodeHandle, PassContainer, RenderGraphNode, RenderGraphResource,
    ResourceHandle, ResourceInfo, ResourceInputCreation, ResourceOutputCreation, ResourceType,
};
use crate::config::GraphConfig;

/// Owns the nodes and resources of a graph and resolves names to handles.
///
/// Names are only looked up while building and compiling; everything that
/// runs per frame goes through handles.
pub struct RenderGraphBuilder {
    pub(crate) nodes: ResourcePool<RenderGraphNode>,
    pub(crate) resources: ResourcePool<RenderGraphResource>,
    node_map: HashMap<String, NodeHandle>,
    /// Output name to output resource.
    resource_map: HashMap<String, ResourceHandle>,
}

impl RenderGraphBuilder {
    pub fn new(config: &GraphConfig) -> Self {
        Self {
            nodes: ResourcePool::new(config.max_nodes),
            resources: ResourcePool::new(config.max_resources),
            node_map: HashMap::new(),
            resource_map: HashMap::new(),
        }
    }

    /// Adds a node with its inputs and outputs.
    ///
    /// # Errors
    ///
    /// - [`GraphError::DuplicateNode`] if the name is taken
    /// - [`GraphError::NodeCapacity`] / [`GraphError::ResourceCapacity`] if
    ///   a pool cannot hold the node or its resources; nothing is created
    pub fn create_node(&mut self, creation: &NodeCreation) -> Result<NodeHandle, GraphError> {
        if self.node_map.contains_key(&creation.name) {
            return Err(GraphError::DuplicateNode(creation.name.clone()));
        }
        if self.nodes.len() >= self.nodes.capacity() {
            return Err(GraphError::NodeCapacity(self.nodes.capacity() as u32));
        }
        let needed = creation.inputs.len() + creation.outputs.len();
        if self.resources.len() + needed > self.resources.capacity() {
            return Err(GraphError::ResourceCapacity(self.resources.capacity() as u32));
        }

        let node = self
            .nodes
            .obtain(RenderGraphNode {
                name: creation.name.clone(),
                node_type: creation.node_type,
                enabled: creation.enabled,
                inputs: Vec::with_capacity(creation.inputs.len()),
                outputs: Vec::with_capacity(creation.outputs.len()),
                edges: Vec::new(),
                render_pass: None,
                framebuffer: None,
                pass: None,
            })
            .ok_or(GraphError::NodeCapacity(self.nodes.capacity() as u32))?;

        let mut outputs = Vec::with_capacity(creation.outputs.len());
        for output in &creation.outputs {
            outputs.push(self.create_node_output(output, node)?);
        }
        let mut inputs = Vec::with_capacity(creation.inputs.len());
        for input in &creation.inputs {
            inputs.push(self.create_node_input(input)?);
        }

        if let Some(record) = self.nodes.get_mut(node) {
            record.outputs = outputs;
            record.inputs = inputs;
        }
        self.node_map.insert(creation.name.clone(), node);
        log::debug!(
            "RenderGraphBuilder: created node {} ({} inputs, {} outputs)",
            creation.name,
            creation.inputs.len(),
            creation.outputs.len()
        );
        Ok(node)
    }

    fn create_node_output(
        &mut self,
        creation: &ResourceOutputCreation,
        producer: NodeHandle,
    ) -> Result<ResourceHandle, GraphError> {
        let capacity = self.resources.capacity() as u32;
        let handle = self
            .resources
            .obtain(RenderGraphResource {
                name: creation.name.clone(),
                resource_type: creation.resource_type,
                producer: Some(producer),
                output_handle: None,
                info: creation.info.clone(),
                ref_count: 0,
            })
            .ok_or(GraphError::ResourceCapacity(capacity))?;
        if let Some(resource) = self.resources.get_mut(handle) {
            resource.output_handle = Some(handle);
        }

        if creation.resource_type != ResourceType::Reference {
            if let Some(previous) = self.resource_map.insert(creation.name.clone(), handle) {
                log::warn!(
                    "RenderGraphBuilder: output {} declared twice, replacing {previous:?}",
                    creation.name
                );
            }
        }
        Ok(handle)
    }

    fn create_node_input(
        &mut self,
        creation: &ResourceInputCreation,
    ) -> Result<ResourceHandle, GraphError> {
        let capacity = self.resources.capacity() as u32;
        self.resources
            .obtain(RenderGraphResource {
                name: creation.name.clone(),
                resource_type: creation.resource_type,
                producer: None,
                output_handle: None,
                info: ResourceInfo {
                    external: creation.external,
                    ..ResourceInfo::default()
                },
                ref_count: 0,
            })
            .ok_or(GraphError::ResourceCapacity(capacity))
    }

    /// Attaches rendering code to the node called `name`.
    ///
    /// # Panics
    ///
    /// Panics if the node does not exist or already has rendering code.
    pub fn register_render_pass(&mut self, name: &str, pass: Box<dyn PassContainer>) {
        let handle = self.node_handle(name);
        let node = handle.and_then(|handle| self.nodes.get_mut(handle));
        let Some(node) = node else {
            panic!("register_render_pass: no node named {name}");
        };
        assert!(
            node.pass.is_none(),
            "register_render_pass: node {name} already has a pass registered"
        );
        node.pass = Some(pass);
    }

    /// Detaches and returns the rendering code of node `name`.
    pub fn unregister_render_pass(&mut self, name: &str) -> Option<Box<dyn PassContainer>> {
        let handle = self.node_handle(name)?;
        self.nodes.get_mut(handle)?.pass.take()
    }

    pub fn unregister_all_render_passes(&mut self) {
        for (_, node) in self.nodes.iter_mut() {
            node.pass = None;
        }
    }

    pub fn node_handle(&self, name: &str) -> Option<NodeHandle> {
        self.node_map.get(name).copied()
    }

    /// Handle of the output called `name`.
    pub fn resource_handle(&self, name: &str) -> Option<ResourceHandle> {
        self.resource_map.get(name).copied()
    }

    pub fn access_node(&self, handle: NodeHandle) -> Option<&RenderGraphNode> {
        self.nodes.get(handle)
    }

    pub fn access_node_mut(&mut self, handle: NodeHandle) -> Option<&mut RenderGraphNode> {
        self.nodes.get_mut(handle)
    }

    pub fn access_node_by_name(&self, name: &str) -> Option<&RenderGraphNode> {
        self.node_handle(name).and_then(|handle| self.nodes.get(handle))
    }

    pub fn access_resource(&self, handle: ResourceHandle) -> Option<&RenderGraphResource> {
        self.resources.get(handle)
    }

    pub fn access_resource_mut(
        &mut self,
        handle: ResourceHandle,
    ) -> Option<&mut RenderGraphResource> {
        self.resources.get_mut(handle)
    }

    /// The output called `name`.
    pub fn access_resource_by_name(&self, name: &str) -> Option<&RenderGraphResource> {
        self.resource_handle(name)
            .and_then(|handle| self.resources.get(handle))
    }

    /// Handles of all nodes in creation-slot order.
    pub fn node_handles(&self) -> Vec<NodeHandle> {
        self.nodes.iter().map(|(handle, _)| handle).collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }
}

impl std::fmt::Debug for RenderGraphBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderGraphBuilder")
            .field("nodes", &self.nodes.len())
            .field("resources", &self.resources.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EmptyPass;
    use crate::resources::RenderPassOperation;
    use crate::types::TextureFormat;

    fn builder() -> RenderGraphBuilder {
        RenderGraphBuilder::new(&GraphConfig::default())
    }

    fn gbuffer() -> NodeCreation {
        NodeCreation::graphics("gbuffer").with_output(ResourceOutputCreation::attachment(
            "color",
            TextureFormat::Rgba8Unorm,
            RenderPassOperation::Clear,
        ))
    }

    #[test]
    fn test_create_node_registers_outputs() {
        let mut builder = builder();
        let node = builder.create_node(&gbuffer()).unwrap();

        let output = builder.access_resource_by_name("color").unwrap();
        assert_eq!(output.producer, Some(node));
        assert_eq!(output.output_handle, builder.resource_handle("color"));
        assert_eq!(output.ref_count, 0);
        assert_eq!(builder.access_node_by_name("gbuffer").unwrap().outputs.len(), 1);
    }

    #[test]
    fn test_inputs_are_placeholders() {
        let mut builder = builder();
        let node = builder
            .create_node(
                &NodeCreation::graphics("compose")
                    .with_input(ResourceInputCreation::texture("color"))
                    .with_input(ResourceInputCreation::texture("history").external()),
            )
            .unwrap();
        let inputs = builder.access_node(node).unwrap().inputs.clone();
        let color = builder.access_resource(inputs[0]).unwrap();
        assert_eq!(color.producer, None);
        assert_eq!(color.output_handle, None);
        assert!(builder.access_resource(inputs[1]).unwrap().info.external);
        // Inputs never register names.
        assert!(builder.resource_handle("color").is_none());
    }

    #[test]
    fn test_reference_outputs_not_registered() {
        let mut builder = builder();
        builder
            .create_node(
                &NodeCreation::graphics("overlay")
                    .with_output(ResourceOutputCreation::reference("color")),
            )
            .unwrap();
        assert!(builder.access_resource_by_name("color").is_none());
        assert_eq!(builder.resource_count(), 1);
    }

    #[test]
    fn test_duplicate_node() {
        let mut builder = builder();
        builder.create_node(&gbuffer()).unwrap();
        assert_eq!(
            builder.create_node(&gbuffer()).unwrap_err(),
            GraphError::DuplicateNode("gbuffer".into())
        );
        assert_eq!(builder.node_count(), 1);
    }

    #[test]
    fn test_capacity_errors_create_nothing() {
        let mut builder = RenderGraphBuilder::new(&GraphConfig {
            max_nodes: 1,
            max_resources: 1,
        });
        let too_many = NodeCreation::graphics("a")
            .with_input(ResourceInputCreation::marker("x"))
            .with_output(ResourceOutputCreation::marker("y"));
        assert_eq!(
            builder.create_node(&too_many).unwrap_err(),
            GraphError::ResourceCapacity(1)
        );
        assert_eq!(builder.node_count(), 0);

        builder.create_node(&NodeCreation::graphics("b")).unwrap();
        assert_eq!(
            builder.create_node(&NodeCreation::graphics("c")).unwrap_err(),
            GraphError::NodeCapacity(1)
        );
    }

    #[test]
    fn test_register_and_unregister_pass() {
        let mut builder = builder();
        builder.create_node(&gbuffer()).unwrap();
        builder.register_render_pass("gbuffer", Box::new(EmptyPass));
        assert!(builder.access_node_by_name("gbuffer").unwrap().has_pass());

        assert!(builder.unregister_render_pass("gbuffer").is_some());
        assert!(builder.unregister_render_pass("gbuffer").is_none());

        builder.register_render_pass("gbuffer", Box::new(EmptyPass));
        builder.unregister_all_render_passes();
        assert!(!builder.access_node_by_name("gbuffer").unwrap().has_pass());
    }

    #[test]
    #[should_panic(expected = "already has a pass registered")]
    fn test_register_pass_twice_panics() {
        let mut builder = builder();
        builder.create_node(&gbuffer()).unwrap();
        builder.register_render_pass("gbuffer", Box::new(EmptyPass));
        builder.register_render_pass("gbuffer", Box::new(EmptyPass));
    }

    #[test]
    #[should_panic(expected = "no node named")]
    fn test_register_pass_unknown_node_panics() {
        builder().register_render_pass("missing", Box::new(EmptyPass));
    }
}
