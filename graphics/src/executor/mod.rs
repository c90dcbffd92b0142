//! Per-frame execution of a compiled render graph.
//!
//! For every enabled node in execution order the executor opens a debug
//! marker, moves the node's textures into the state the node needs, and
//! drives the node's [`PassContainer`] callbacks:
//!
//! | Node | Barriers | Callbacks |
//! |------|----------|-----------|
//! | Graphics | texture inputs to shader resource, attachments to render target / depth write | `pre_render`, render pass, `render`, end pass, `post_render` |
//! | Compute | texture inputs to shader resource, attachment outputs to unordered access | `pre_render`, `render`, `post_render` |
//! | Ray tracing | none | `pre_render`, `render`, `post_render` |
//!
//! Only handles are touched here; names were resolved by the compiler.

use vesper_core::pool::ResourcePool;

use crate::command::CommandBuffer;
use crate::device::GpuDevice;
use crate::graph::{
    EmptyPass, NodeHandle, NodeType, PassContainer, RenderGraphBuilder, RenderGraphNode,
    RenderGraphResource, ResourceType,
};
use crate::resources::{ResourceState, TextureHandle};
use crate::types::{Extent2d, ScissorRect, Viewport};

/// Record every enabled node of `order` into `cmd`.
pub(crate) fn render(builder: &mut RenderGraphBuilder, order: &[NodeHandle], cmd: &mut CommandBuffer) {
    let resources = &builder.resources;
    for &handle in order {
        let Some(node) = builder.nodes.get_mut(handle) else {
            continue;
        };
        if !node.enabled {
            continue;
        }

        cmd.push_marker(&node.name);
        match node.node_type {
            NodeType::Graphics => render_graphics(node, resources, cmd),
            NodeType::Compute => render_compute(node, resources, cmd),
            NodeType::RayTracing => with_container(node, |pass| {
                pass.pre_render(cmd);
                pass.render(cmd);
                pass.post_render(cmd);
            }),
        }
        cmd.pop_marker();
    }
}

/// Runs `f` on the node's container, or on [`EmptyPass`] when none is
/// registered.
fn with_container<R>(node: &mut RenderGraphNode, f: impl FnOnce(&mut dyn PassContainer) -> R) -> R {
    match node.pass.as_deref_mut() {
        Some(pass) => f(pass),
        None => f(&mut EmptyPass),
    }
}

/// Texture behind an input: the output it resolved to, unless that output
/// is external or was never allocated.
fn resolved_texture(
    resources: &ResourcePool<RenderGraphResource>,
    resource: &RenderGraphResource,
) -> Option<(TextureHandle, bool)> {
    let output = resource.output_handle.and_then(|h| resources.get(h))?;
    if output.info.external {
        return None;
    }
    output
        .info
        .texture
        .map(|texture| (texture, output.info.is_depth()))
}

fn texture_extent(device: &GpuDevice, texture: TextureHandle) -> Option<Extent2d> {
    device.resources().texture(texture).map(|t| t.size())
}

fn attachment_state(is_depth: bool) -> ResourceState {
    if is_depth {
        ResourceState::DEPTH_WRITE
    } else {
        ResourceState::RENDER_TARGET
    }
}

fn render_graphics(
    node: &mut RenderGraphNode,
    resources: &ResourcePool<RenderGraphResource>,
    cmd: &mut CommandBuffer,
) {
    let device = std::sync::Arc::clone(cmd.device());
    let mut extent = Extent2d::default();

    for resource in node.inputs.iter().filter_map(|&h| resources.get(h)) {
        let Some((texture, is_depth)) = resolved_texture(resources, resource) else {
            continue;
        };
        match resource.resource_type {
            ResourceType::Texture => {
                cmd.add_image_barrier(texture, ResourceState::PIXEL_SHADER_RESOURCE, 0, 1, is_depth);
            }
            ResourceType::Attachment => {
                cmd.add_image_barrier(texture, attachment_state(is_depth), 0, 1, is_depth);
                if let Some(size) = texture_extent(&device, texture) {
                    extent = size;
                }
            }
            _ => {}
        }
    }

    let mut color_slot = 0;
    for output in node.outputs.iter().filter_map(|&h| resources.get(h)) {
        if output.resource_type != ResourceType::Attachment {
            continue;
        }
        let Some(texture) = output.info.texture else {
            continue;
        };
        let clear = output.info.clear_values;
        let is_depth = output.info.is_depth();
        if is_depth {
            cmd.set_clear_depth_and_stencil(clear[0], clear[1] as u32);
        } else {
            cmd.set_clear_color(color_slot, clear);
            color_slot += 1;
        }
        cmd.add_image_barrier(texture, attachment_state(is_depth), 0, 1, is_depth);
        if let Some(size) = texture_extent(&device, texture) {
            extent = size;
        }
    }

    cmd.set_scissor(Some(&ScissorRect::from_dimensions(extent.width, extent.height)));
    cmd.set_viewport(Some(&Viewport::from_dimensions(extent.width, extent.height)));

    let (render_pass, framebuffer) = (node.render_pass, node.framebuffer);
    with_container(node, |pass| {
        pass.pre_render(cmd);
        if let (Some(render_pass), Some(framebuffer)) = (render_pass, framebuffer) {
            cmd.bind_render_pass(render_pass, framebuffer, false);
        }
        pass.render(cmd);
        cmd.end_render_pass();
        pass.post_render(cmd);
    });
}

fn render_compute(
    node: &mut RenderGraphNode,
    resources: &ResourcePool<RenderGraphResource>,
    cmd: &mut CommandBuffer,
) {
    for resource in node.inputs.iter().filter_map(|&h| resources.get(h)) {
        if resource.resource_type != ResourceType::Texture {
            continue;
        }
        if let Some((texture, is_depth)) = resolved_texture(resources, resource) {
            cmd.add_image_barrier(texture, ResourceState::PIXEL_SHADER_RESOURCE, 0, 1, is_depth);
        }
    }
    for output in node.outputs.iter().filter_map(|&h| resources.get(h)) {
        if output.resource_type != ResourceType::Attachment {
            continue;
        }
        if let Some(texture) = output.info.texture {
            cmd.add_image_barrier(
                texture,
                ResourceState::UNORDERED_ACCESS,
                0,
                1,
                output.info.is_depth(),
            );
        }
    }

    with_container(node, |pass| {
        pass.pre_render(cmd);
        pass.render(cmd);
        pass.post_render(cmd);
    });
}

/// Resize every enabled node's framebuffer, then tell its container.
pub(crate) fn on_resize(
    device: &GpuDevice,
    builder: &mut RenderGraphBuilder,
    order: &[NodeHandle],
    width: u32,
    height: u32,
) {
    for &handle in order {
        let Some(node) = builder.nodes.get_mut(handle) else {
            continue;
        };
        if !node.enabled {
            continue;
        }
        if let Some(framebuffer) = node.framebuffer {
            if let Err(err) = device.resize_framebuffer(framebuffer, width, height) {
                log::error!("Render graph: resizing framebuffer of {} failed: {err}", node.name);
            }
        }
        if let Some(pass) = node.pass.as_deref_mut() {
            pass.on_resize(device, width, height);
        }
    }
}

/// Notify every node, enabled or not.
pub(crate) fn on_techniques_reloaded(builder: &mut RenderGraphBuilder) {
    for (_, node) in builder.nodes.iter_mut() {
        if let Some(pass) = node.pass.as_deref_mut() {
            pass.on_techniques_reloaded();
        }
    }
}
