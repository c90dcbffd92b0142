//! Render graph compilation.
//!
//! Compiling a graph runs four phases over its enabled nodes:
//!
//! 1. **Edges** - every input is resolved to the output of the same name and
//!    the consumer is recorded on the producer
//! 2. **Topological sort** - iterative depth-first search; a cycle is an
//!    error and leaves the previous order in place
//! 3. **Lifetimes and aliasing** - attachment outputs get a texture when
//!    their producer runs and return it to a free list after their last
//!    consumer, so later outputs of the same format and size share memory
//! 4. **Render passes and framebuffers** - created once per node, with the
//!    framebuffer attachments refreshed on every compile
//!
//! Disabled nodes take no part in any phase. They are appended after the
//! sorted nodes so that [`RenderGraph::set_node_enabled`] followed by a
//! recompile brings them back.
//!
//! [`RenderGraph::set_node_enabled`]: crate::graph::RenderGraph::set_node_enabled

use std::collections::HashSet;

use crate::device::GpuDevice;
use crate::graph::{
    GraphError, NodeHandle, NodeType, RenderGraphBuilder, ResourceHandle, ResourceInfo,
    ResourceType,
};
use crate::profiling::profile_scope;
use crate::resources::{
    FramebufferDescriptor, RenderPassDescriptor, RenderPassHandle, RenderPassOperation,
    TextureHandle,
};
use crate::types::{TextureDescriptor, TextureFormat, TextureUsage};

/// A texture lifetime event recorded by the aliasing phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceEvent {
    /// The output resource.
    pub resource: ResourceHandle,
    /// Allocating node, or the last consuming node for deallocations.
    pub node: NodeHandle,
    pub texture: TextureHandle,
    /// Allocation reused the memory of a freed texture.
    pub aliased: bool,
}

/// What the last successful compile allocated and freed, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileReport {
    pub allocations: Vec<ResourceEvent>,
    pub deallocations: Vec<ResourceEvent>,
}

impl CompileReport {
    /// Number of allocations that reused freed memory.
    pub fn aliased_count(&self) -> usize {
        self.allocations.iter().filter(|event| event.aliased).count()
    }
}

/// Compile the graph held by `builder`.
///
/// On success `order` is rewritten and `owned_textures` holds every texture
/// the graph allocated; textures of the previous compile are destroyed.
///
/// A cycle leaves everything untouched. A failure while allocating releases
/// all GPU objects of the graph and empties `order`.
pub(crate) fn compile(
    device: &GpuDevice,
    builder: &mut RenderGraphBuilder,
    order: &mut Vec<NodeHandle>,
    owned_textures: &mut Vec<TextureHandle>,
) -> Result<CompileReport, GraphError> {
    profile_scope!("render_graph_compile");

    {
        profile_scope!("compute_edges");
        compute_edges(builder);
    }
    let sorted = {
        profile_scope!("topological_sort");
        topological_sort(builder)?
    };
    let report = match allocate(device, builder, &sorted, owned_textures) {
        Ok(report) => report,
        Err(err) => {
            // The textures of the previous compile are already gone, so no
            // framebuffer may keep pointing at them.
            log::error!("Render graph: compile failed, releasing graph resources: {err}");
            release(device, builder, order, owned_textures);
            return Err(err);
        }
    };

    order.clear();
    order.extend_from_slice(&sorted);
    order.extend(
        builder
            .nodes
            .iter()
            .filter(|(_, node)| !node.enabled)
            .map(|(handle, _)| handle),
    );
    Ok(report)
}

fn allocate(
    device: &GpuDevice,
    builder: &mut RenderGraphBuilder,
    sorted: &[NodeHandle],
    owned_textures: &mut Vec<TextureHandle>,
) -> Result<CompileReport, GraphError> {
    let report = {
        profile_scope!("compute_aliasing");
        compute_aliasing(device, builder, sorted, owned_textures)?
    };
    {
        profile_scope!("create_render_passes");
        create_render_passes(device, builder, sorted)?;
    }
    Ok(report)
}

/// Destroy every framebuffer, render pass and texture the graph created
/// and clear the execution order. Nodes and resources stay declared.
pub(crate) fn release(
    device: &GpuDevice,
    builder: &mut RenderGraphBuilder,
    order: &mut Vec<NodeHandle>,
    owned_textures: &mut Vec<TextureHandle>,
) {
    for handle in builder.node_handles() {
        let Some(node) = builder.nodes.get_mut(handle) else {
            continue;
        };
        if let Some(framebuffer) = node.framebuffer.take() {
            device.destroy_framebuffer(framebuffer);
        }
        if let Some(render_pass) = node.render_pass.take() {
            device.destroy_render_pass(render_pass);
        }
    }
    for texture in owned_textures.drain(..) {
        device.destroy_texture(texture);
    }
    for (_, resource) in builder.resources.iter_mut() {
        if !resource.info.external {
            resource.info.texture = None;
        }
    }
    order.clear();
}

fn enabled_nodes(builder: &RenderGraphBuilder) -> Vec<NodeHandle> {
    builder
        .nodes
        .iter()
        .filter(|(_, node)| node.enabled)
        .map(|(handle, _)| handle)
        .collect()
}

fn compute_edges(builder: &mut RenderGraphBuilder) {
    for (_, node) in builder.nodes.iter_mut() {
        node.edges.clear();
    }

    for consumer in enabled_nodes(builder) {
        let inputs = match builder.nodes.get(consumer) {
            Some(node) => node.inputs.clone(),
            None => continue,
        };
        for input in inputs {
            let Some(resource) = builder.resources.get(input) else {
                continue;
            };
            let external = resource.info.external;
            let resolved = builder
                .resource_handle(&resource.name)
                .and_then(|output| builder.resources.get(output))
                .map(|output| (output.producer, output.output_handle, output.info.clone()));

            let producer_enabled = match &resolved {
                Some((Some(producer), _, _)) => {
                    builder.nodes.get(*producer).is_some_and(|node| node.enabled)
                }
                _ => false,
            };

            let Some((Some(producer), output_handle, info)) = resolved.filter(|_| producer_enabled)
            else {
                if !external {
                    let consumer_name = builder
                        .nodes
                        .get(consumer)
                        .map_or("?", |node| node.name.as_str());
                    log::error!(
                        "Render graph: input {} of node {consumer_name} has no enabled producer",
                        resource.name
                    );
                }
                if let Some(resource) = builder.resources.get_mut(input) {
                    resource.producer = None;
                    resource.output_handle = None;
                    resource.info = ResourceInfo {
                        external,
                        ..ResourceInfo::default()
                    };
                }
                continue;
            };

            if let Some(resource) = builder.resources.get_mut(input) {
                resource.producer = Some(producer);
                resource.output_handle = output_handle;
                resource.info = info;
            }
            if let Some(node) = builder.nodes.get_mut(producer) {
                if !node.edges.contains(&consumer) {
                    node.edges.push(consumer);
                }
            }
        }
    }
}

const UNVISITED: u8 = 0;
const VISITING: u8 = 1;
const VISITED: u8 = 2;

/// Producers before consumers. Fails on the first edge back into a node
/// that is still being visited.
fn topological_sort(builder: &RenderGraphBuilder) -> Result<Vec<NodeHandle>, GraphError> {
    let roots = enabled_nodes(builder);
    let mut visited = vec![UNVISITED; builder.nodes.capacity()];
    let mut sorted = Vec::with_capacity(roots.len());
    let mut stack = Vec::new();

    for root in roots {
        if visited[root.index() as usize] != UNVISITED {
            continue;
        }
        stack.push(root);

        while let Some(&handle) = stack.last() {
            let index = handle.index() as usize;
            match visited[index] {
                VISITED => {
                    stack.pop();
                    continue;
                }
                VISITING => {
                    visited[index] = VISITED;
                    sorted.push(handle);
                    stack.pop();
                    continue;
                }
                _ => {}
            }

            visited[index] = VISITING;
            let Some(node) = builder.nodes.get(handle) else {
                continue;
            };
            for &child in &node.edges {
                match visited[child.index() as usize] {
                    UNVISITED => stack.push(child),
                    VISITING => {
                        let name = builder
                            .nodes
                            .get(child)
                            .map_or_else(String::new, |node| node.name.clone());
                        return Err(GraphError::CyclicDependency { node: name });
                    }
                    _ => {}
                }
            }
        }
    }

    sorted.reverse();
    Ok(sorted)
}

fn compute_aliasing(
    device: &GpuDevice,
    builder: &mut RenderGraphBuilder,
    sorted: &[NodeHandle],
    owned_textures: &mut Vec<TextureHandle>,
) -> Result<CompileReport, GraphError> {
    for texture in owned_textures.drain(..) {
        device.destroy_texture(texture);
    }
    for (_, resource) in builder.resources.iter_mut() {
        resource.ref_count = 0;
        if !resource.info.external {
            resource.info.texture = None;
        }
    }

    for &handle in sorted {
        let inputs = builder
            .nodes
            .get(handle)
            .map(|node| node.inputs.clone())
            .unwrap_or_default();
        for input in inputs {
            let output = builder.resources.get(input).and_then(|r| r.output_handle);
            if let Some(output) = output.and_then(|h| builder.resources.get_mut(h)) {
                output.ref_count += 1;
            }
        }
    }

    let renderer_size = device.renderer_size();
    let mut report = CompileReport::default();
    let mut allocated = HashSet::new();
    let mut deallocated = HashSet::new();
    let mut free_list: Vec<TextureHandle> = Vec::new();

    for &handle in sorted {
        let Some(node) = builder.nodes.get(handle) else {
            continue;
        };
        let node_type = node.node_type;
        let outputs = node.outputs.clone();
        let inputs = node.inputs.clone();

        for output in outputs {
            let Some(resource) = builder.resources.get_mut(output) else {
                continue;
            };
            if resource.resource_type != ResourceType::Attachment
                || resource.info.external
                || resource.info.texture.is_some()
            {
                continue;
            }
            assert!(
                allocated.insert(output),
                "render graph output {} allocated twice",
                resource.name
            );

            let size = resource.info.extent(renderer_size);
            let format = resource.info.format;
            let mut usage = TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING;
            if node_type != NodeType::Graphics && !format.has_depth() {
                usage |= TextureUsage::STORAGE_BINDING;
            }
            let descriptor = TextureDescriptor::new_2d(size.width, size.height, format, usage)
                .with_label(resource.name.clone());

            let compatible = {
                let textures = device.resources();
                free_list.iter().position(|&free| {
                    textures
                        .texture(free)
                        .is_some_and(|t| t.format() == format && t.size() == size)
                })
            };
            let (texture, aliased) = match compatible {
                Some(position) => {
                    let alias = free_list.remove(position);
                    (device.create_texture_aliased(&descriptor, alias)?, true)
                }
                None => (device.create_texture(&descriptor)?, false),
            };
            owned_textures.push(texture);
            resource.info.texture = Some(texture);

            log::debug!(
                "Render graph: allocated {} ({}x{} {}){}",
                resource.name,
                size.width,
                size.height,
                format.name(),
                if aliased { ", aliased" } else { "" }
            );
            report.allocations.push(ResourceEvent {
                resource: output,
                node: handle,
                texture,
                aliased,
            });
        }

        for input in inputs {
            let output = builder.resources.get(input).and_then(|r| r.output_handle);
            let Some(output) = output else {
                continue;
            };
            let Some(resource) = builder.resources.get_mut(output) else {
                continue;
            };
            resource.ref_count = resource.ref_count.saturating_sub(1);
            if resource.ref_count > 0
                || !resource.resource_type.is_texture()
                || resource.info.external
            {
                continue;
            }
            let Some(texture) = resource.info.texture else {
                continue;
            };
            assert!(
                deallocated.insert(output),
                "render graph output {} freed twice",
                resource.name
            );
            free_list.push(texture);
            report.deallocations.push(ResourceEvent {
                resource: output,
                node: handle,
                texture,
                aliased: false,
            });
        }
    }

    // Inputs carry the textures allocated above.
    for &handle in sorted {
        let inputs = builder
            .nodes
            .get(handle)
            .map(|node| node.inputs.clone())
            .unwrap_or_default();
        for input in inputs {
            let output = builder.resources.get(input).and_then(|r| r.output_handle);
            let info = output
                .and_then(|h| builder.resources.get(h))
                .map(|output| output.info.clone());
            if let (Some(info), Some(resource)) = (info, builder.resources.get_mut(input)) {
                resource.info = info;
            }
        }
    }

    log::info!(
        "Render graph: {} nodes, {} textures allocated ({} aliased), {} freed early",
        sorted.len(),
        report.allocations.len(),
        report.aliased_count(),
        report.deallocations.len()
    );
    Ok(report)
}

struct NodeAttachment {
    texture: Option<TextureHandle>,
    info: ResourceInfo,
    is_output: bool,
}

fn node_attachments(builder: &RenderGraphBuilder, handle: NodeHandle) -> Vec<NodeAttachment> {
    let Some(node) = builder.nodes.get(handle) else {
        return Vec::new();
    };
    let outputs = node.outputs.iter().map(|&h| (h, true));
    let inputs = node.inputs.iter().map(|&h| (h, false));
    outputs
        .chain(inputs)
        .filter_map(|(h, is_output)| builder.resources.get(h).map(|r| (r, is_output)))
        .filter(|(resource, _)| resource.resource_type == ResourceType::Attachment)
        .map(|(resource, is_output)| NodeAttachment {
            texture: resource.info.texture,
            info: resource.info.clone(),
            is_output,
        })
        .collect()
}

fn create_render_passes(
    device: &GpuDevice,
    builder: &mut RenderGraphBuilder,
    sorted: &[NodeHandle],
) -> Result<(), GraphError> {
    for &handle in sorted {
        let attachments = node_attachments(builder, handle);
        let Some(node) = builder.nodes.get(handle) else {
            continue;
        };
        let name = node.name.clone();

        if node.node_type != NodeType::Compute && node.render_pass.is_none() {
            let mut descriptor = RenderPassDescriptor::new(name.clone());
            for attachment in &attachments {
                let format = attachment.info.format;
                if format == TextureFormat::Undefined {
                    continue;
                }
                let operation = match (attachment.is_output, format.has_depth()) {
                    (true, true) => RenderPassOperation::Clear,
                    (true, false) => attachment.info.load_op,
                    (false, _) => RenderPassOperation::Load,
                };
                if format.has_depth() {
                    descriptor = descriptor.with_depth(format, operation);
                    descriptor.stencil_operation = RenderPassOperation::DontCare;
                } else {
                    descriptor = descriptor.with_color(format, operation);
                }
            }
            let render_pass = device.create_render_pass(&descriptor)?;
            if let Some(node) = builder.nodes.get_mut(handle) {
                node.render_pass = Some(render_pass);
            }
        }

        let render_pass = builder
            .nodes
            .get(handle)
            .and_then(|node| node.render_pass)
            .unwrap_or(RenderPassHandle::INVALID);
        let descriptor = framebuffer_descriptor(device, name, render_pass, &attachments);
        let existing = builder.nodes.get(handle).and_then(|node| node.framebuffer);
        match existing {
            Some(framebuffer) => device.update_framebuffer(framebuffer, &descriptor)?,
            None => {
                let framebuffer = device.create_framebuffer(&descriptor)?;
                if let Some(node) = builder.nodes.get_mut(handle) {
                    node.framebuffer = Some(framebuffer);
                }
            }
        }
    }
    Ok(())
}

fn framebuffer_descriptor(
    device: &GpuDevice,
    name: String,
    render_pass: RenderPassHandle,
    attachments: &[NodeAttachment],
) -> FramebufferDescriptor {
    let mut descriptor = FramebufferDescriptor {
        name,
        render_pass,
        manual_resources_free: true,
        resize: true,
        ..FramebufferDescriptor::default()
    };

    let textures = device.resources();
    let mut first = true;
    for attachment in attachments {
        let Some(texture) = attachment.texture else {
            continue;
        };
        let Some(size) = textures.texture(texture).map(|t| t.size()) else {
            continue;
        };
        if first {
            descriptor.width = size.width;
            descriptor.height = size.height;
            descriptor.scale_x = attachment.info.scale[0];
            descriptor.scale_y = attachment.info.scale[1];
            first = false;
        } else {
            assert!(
                descriptor.width == size.width && descriptor.height == size.height,
                "framebuffer {} mixes attachment sizes {}x{} and {}x{}",
                descriptor.name,
                descriptor.width,
                descriptor.height,
                size.width,
                size.height
            );
        }

        if attachment.info.format.has_depth() {
            descriptor.depth_stencil_attachment = Some(texture);
        } else {
            descriptor.color_attachments.push(texture);
        }
    }
    descriptor
}
