//! Render graph integration tests.
//!
//! Graphs are compiled and rendered against the dummy backend; the
//! recorded command streams and the device registry are then inspected.

mod common;

use std::collections::HashMap;
use std::sync::Arc;

use common::{CallLog, RecordingPass, TestContext, color, depth, labels};
use rstest::rstest;
use vesper_graphics::backend::RecordedCommand;
use vesper_graphics::graph::{
    GraphError, NodeCreation, NodeHandle, RenderGraph, ResourceInputCreation,
    ResourceOutputCreation,
};
use vesper_graphics::resources::{ImageLayout, RenderPassOperation, ResourceState};
use vesper_graphics::types::{ClearValue, Extent2d, TextureFormat};
use vesper_graphics::{CommandBufferManager, GraphicsConfig, GraphicsError};

// ============================================================================
// Helpers
// ============================================================================

fn texture_input(name: &str) -> ResourceInputCreation {
    ResourceInputCreation::texture(name)
}

fn positions(graph: &RenderGraph) -> HashMap<NodeHandle, usize> {
    graph
        .execution_order()
        .iter()
        .enumerate()
        .map(|(position, &handle)| (handle, position))
        .collect()
}

/// Small LCG so generated graphs are reproducible without extra crates.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound
    }
}

/// A random DAG of `count` nodes, each writing attachment `r{i}` and
/// reading one or two earlier attachments. Nodes are declared in shuffled
/// order so the sort has work to do.
fn random_graph(ctx: &TestContext, seed: u64, count: usize) -> RenderGraph {
    let mut rng = Lcg(seed);
    let mut creations: Vec<NodeCreation> = (0..count)
        .map(|i| {
            let scale = if rng.next(2) == 0 { 1.0 } else { 0.5 };
            let mut node = NodeCreation::graphics(format!("n{i}"))
                .with_output(color(&format!("r{i}")).with_scale(scale, scale));
            if i > 0 {
                for _ in 0..=rng.next(2) {
                    node = node.with_input(texture_input(&format!("r{}", rng.next(i))));
                }
            }
            node
        })
        .collect();
    for i in (1..creations.len()).rev() {
        creations.swap(i, rng.next(i + 1));
    }

    let mut graph = ctx.graph();
    for creation in &creations {
        graph.add_node(creation).unwrap();
    }
    graph
}

fn render_frame(ctx: &TestContext, graph: &mut RenderGraph) -> Vec<RecordedCommand> {
    let mut manager = CommandBufferManager::new(Arc::clone(&ctx.device)).unwrap();
    manager.reset(0);
    let cmd = manager.get_primary_cmd(0, 0, true);
    graph.render(cmd);
    cmd.end();
    ctx.recorded(cmd)
}

/// Commands recorded between the opening of label `from` and label `to`.
fn between(commands: &[RecordedCommand], from: &str, to: &str) -> Vec<RecordedCommand> {
    let start = commands
        .iter()
        .position(|c| matches!(c, RecordedCommand::BeginLabel(l) if l == from))
        .expect("start label recorded");
    let end = commands[start..]
        .iter()
        .position(|c| matches!(c, RecordedCommand::BeginLabel(l) if l == to))
        .expect("end label recorded");
    commands[start + 1..start + end].to_vec()
}

fn barrier_layouts(commands: &[RecordedCommand]) -> Vec<ImageLayout> {
    commands
        .iter()
        .filter_map(|c| match c {
            RecordedCommand::Barrier(barrier) => Some(barrier.new_layout),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_gbuffer_then_compose() {
    let ctx = TestContext::new(1280, 720);
    let mut graph = ctx.graph();
    // Consumer declared first; the compiler has to reorder.
    graph
        .add_node(&NodeCreation::graphics("compose").with_input(texture_input("color")))
        .unwrap();
    graph
        .add_node(&NodeCreation::graphics("gbuffer").with_output(color("color")))
        .unwrap();

    let report = graph.compile().unwrap().clone();
    assert_eq!(graph.node_names(), ["gbuffer", "compose"]);

    assert_eq!(report.allocations.len(), 1);
    let allocated = report.allocations[0].texture;
    let size = ctx.device.resources().texture(allocated).unwrap().size();
    assert_eq!(size, Extent2d::new(1280, 720));

    let builder = graph.builder();
    let compose = builder.access_node_by_name("compose").unwrap();
    let input = builder.access_resource(compose.inputs[0]).unwrap();
    assert_eq!(input.info.texture, Some(allocated));
    assert_eq!(input.producer, builder.node_handle("gbuffer"));
}

#[test]
fn test_freed_output_aliased_by_later_node() {
    let ctx = TestContext::new(800, 600);
    let mut graph = ctx.graph();
    graph
        .add_node(&NodeCreation::graphics("a").with_output(color("a_out")))
        .unwrap();
    graph
        .add_node(
            &NodeCreation::graphics("b")
                .with_input(texture_input("a_out"))
                .with_output(color("b_out")),
        )
        .unwrap();
    graph
        .add_node(
            &NodeCreation::graphics("c")
                .with_input(texture_input("b_out"))
                .with_output(color("c_out")),
        )
        .unwrap();
    graph
        .add_node(
            &NodeCreation::graphics("d")
                .with_input(texture_input("c_out"))
                .with_output(color("d_out")),
        )
        .unwrap();

    let report = graph.compile().unwrap().clone();
    assert_eq!(graph.node_names(), ["a", "b", "c", "d"]);

    let builder = graph.builder();
    let b_out = builder.resource_handle("b_out").unwrap();
    let d_out = builder.resource_handle("d_out").unwrap();

    // b_out goes back to the free list once c consumed it.
    let freed = report
        .deallocations
        .iter()
        .find(|event| event.resource == b_out)
        .expect("b_out freed");
    assert_eq!(freed.node, builder.node_handle("c").unwrap());

    let d_alloc = report
        .allocations
        .iter()
        .find(|event| event.resource == d_out)
        .unwrap();
    assert!(d_alloc.aliased);
    assert_eq!(ctx.memory_of(d_alloc.texture), ctx.memory_of(freed.texture));
    let resources = ctx.device.resources();
    assert_eq!(
        resources.memory_owner(d_alloc.texture),
        resources.memory_owner(freed.texture)
    );
}

#[test]
fn test_disabled_node_skipped_and_restored() {
    let ctx = TestContext::new(640, 480);
    let log = CallLog::default();
    let mut graph = ctx.graph();
    graph
        .add_node(&NodeCreation::graphics("gbuffer").with_output(color("albedo")))
        .unwrap();
    graph
        .add_node(
            &NodeCreation::graphics("bloom")
                .with_input(texture_input("albedo"))
                .with_output(color("bloom"))
                .with_enabled(false),
        )
        .unwrap();
    graph
        .add_node(&NodeCreation::graphics("compose").with_input(texture_input("albedo")))
        .unwrap();
    graph.register_render_pass("bloom", RecordingPass::boxed("bloom", &log));

    graph.compile().unwrap();
    assert_eq!(graph.node_names(), ["gbuffer", "compose"]);
    assert_eq!(graph.report().allocations.len(), 1);
    let bloom = graph.builder().access_node_by_name("bloom").unwrap();
    assert!(bloom.render_pass.is_none() && bloom.framebuffer.is_none());
    assert!(graph.builder().access_node_by_name("gbuffer").unwrap().edges.len() == 1);

    let commands = render_frame(&ctx, &mut graph);
    assert!(!labels(&commands).iter().any(|l| l.starts_with("bloom")));
    assert!(log.lock().is_empty());

    assert!(graph.set_node_enabled("bloom", true));
    graph.compile().unwrap();
    assert_eq!(graph.node_names().len(), 3);
    let order = graph.node_names();
    let bloom_pos = order.iter().position(|&n| n == "bloom").unwrap();
    assert!(bloom_pos > 0);
    assert_eq!(graph.report().allocations.len(), 2);
    assert_eq!(ctx.device.resources().texture_count(), 2);
    assert_eq!(graph.owned_textures().len(), 2);

    let commands = render_frame(&ctx, &mut graph);
    assert!(labels(&commands).contains(&"bloom".to_string()));
    assert_eq!(
        *log.lock(),
        ["bloom.pre_render", "bloom.render", "bloom.post_render"]
    );

    // Toggling back releases the bloom texture again.
    graph.set_node_enabled("bloom", false);
    graph.compile().unwrap();
    assert_eq!(ctx.device.resources().texture_count(), 1);
    assert_eq!(graph.owned_textures().len(), 1);
}

// ============================================================================
// Properties
// ============================================================================

#[rstest]
#[case(1, 6)]
#[case(7, 12)]
#[case(42, 20)]
#[case(1234, 32)]
fn test_producers_run_before_consumers(#[case] seed: u64, #[case] count: usize) {
    let ctx = TestContext::new(256, 256);
    let mut graph = random_graph(&ctx, seed, count);
    graph.compile().unwrap();

    let position = positions(&graph);
    let builder = graph.builder();
    for &handle in graph.execution_order() {
        let node = builder.access_node(handle).unwrap();
        for &input in &node.inputs {
            let producer = builder.access_resource(input).unwrap().producer.unwrap();
            assert!(
                position[&producer] < position[&handle],
                "{} must run before {}",
                builder.access_node(producer).unwrap().name,
                node.name
            );
        }
    }
}

#[rstest]
#[case(3, 8)]
#[case(99, 16)]
#[case(2024, 24)]
fn test_live_resources_never_share_memory(#[case] seed: u64, #[case] count: usize) {
    let ctx = TestContext::new(128, 128);
    let mut graph = random_graph(&ctx, seed, count);
    let report = graph.compile().unwrap().clone();
    let position = positions(&graph);

    let lifetimes: Vec<_> = report
        .allocations
        .iter()
        .map(|alloc| {
            let end = report
                .deallocations
                .iter()
                .find(|free| free.resource == alloc.resource)
                .map_or(usize::MAX, |free| position[&free.node]);
            (position[&alloc.node], end, alloc.texture)
        })
        .collect();

    for (i, &(start_a, end_a, texture_a)) in lifetimes.iter().enumerate() {
        for &(start_b, end_b, texture_b) in &lifetimes[i + 1..] {
            let overlap = start_a <= end_b && start_b <= end_a;
            if overlap {
                assert_ne!(ctx.memory_of(texture_a), ctx.memory_of(texture_b));
                let resources = ctx.device.resources();
                assert_ne!(
                    resources.memory_owner(texture_a),
                    resources.memory_owner(texture_b)
                );
            }
        }
    }
}

#[rstest]
#[case(5, 10)]
#[case(77, 18)]
fn test_inputs_resolve_to_outputs(#[case] seed: u64, #[case] count: usize) {
    let ctx = TestContext::new(64, 64);
    let mut graph = random_graph(&ctx, seed, count);
    graph.compile().unwrap();

    let builder = graph.builder();
    for &handle in graph.execution_order() {
        for &input in &builder.access_node(handle).unwrap().inputs {
            let input = builder.access_resource(input).unwrap();
            let output = builder.access_resource_by_name(&input.name).unwrap();
            assert_eq!(input.info, output.info);
            assert_eq!(input.producer, output.producer);
            assert_eq!(input.output_handle, builder.resource_handle(&input.name));
        }
    }
}

#[test]
fn test_recompile_does_not_leak() {
    let ctx = TestContext::new(320, 200);
    let mut graph = random_graph(&ctx, 11, 10);
    for _ in 0..3 {
        graph.compile().unwrap();
        assert_eq!(
            ctx.device.resources().texture_count(),
            graph.owned_textures().len()
        );
        assert_eq!(ctx.backend.live_image_count(), graph.owned_textures().len());
    }
    assert_eq!(ctx.device.resources().framebuffer_count(), 10);
    assert_eq!(ctx.device.resources().render_pass_count(), 10);
}

#[test]
fn test_failed_recompile_releases_graph_resources() {
    let mut config = GraphicsConfig::default();
    config.pools.textures = 2;
    let ctx = TestContext::with_config(64, 64, config);
    let log = CallLog::default();
    let mut graph = ctx.graph();
    graph
        .add_node(&NodeCreation::graphics("a").with_output(color("a_color")))
        .unwrap();
    graph
        .add_node(
            &NodeCreation::graphics("b")
                .with_input(texture_input("a_color"))
                .with_output(color("b_color")),
        )
        .unwrap();
    graph.register_render_pass("a", RecordingPass::boxed("a", &log));
    graph.compile().unwrap();
    assert_eq!(graph.owned_textures().len(), 2);

    // A third attachment does not fit the texture pool.
    graph
        .add_node(&NodeCreation::graphics("c").with_output(color("c_color")))
        .unwrap();
    assert_eq!(
        graph.compile().unwrap_err(),
        GraphError::Graphics(GraphicsError::PoolExhausted("texture"))
    );

    assert!(graph.execution_order().is_empty());
    assert!(graph.owned_textures().is_empty());
    assert!(graph.report().allocations.is_empty());
    for name in ["a", "b", "c"] {
        let node = graph.builder().access_node_by_name(name).unwrap();
        assert_eq!(node.framebuffer, None);
        assert_eq!(node.render_pass, None);
    }
    {
        let resources = ctx.device.resources();
        assert_eq!(resources.texture_count(), 0);
        assert_eq!(resources.framebuffer_count(), 0);
        assert_eq!(resources.render_pass_count(), 0);
    }
    assert_eq!(ctx.backend.live_image_count(), 0);

    // Nothing is recorded against the released objects.
    let commands = render_frame(&ctx, &mut graph);
    assert!(labels(&commands).is_empty());
    assert!(log.lock().is_empty());

    // Once the graph fits again it compiles and renders as before.
    assert!(graph.set_node_enabled("c", false));
    graph.compile().unwrap();
    assert_eq!(graph.node_names(), ["a", "b"]);
    assert_eq!(ctx.device.resources().texture_count(), 2);
    let commands = render_frame(&ctx, &mut graph);
    assert_eq!(labels(&commands)[0], "a");
    assert_eq!(*log.lock(), ["a.pre_render", "a.render", "a.post_render"]);
}

#[test]
fn test_cycle_is_reported() {
    let ctx = TestContext::new(64, 64);
    let mut graph = ctx.graph();
    graph
        .add_node(
            &NodeCreation::graphics("shadow")
                .with_input(texture_input("lit"))
                .with_output(depth("shadow_map")),
        )
        .unwrap();
    graph
        .add_node(
            &NodeCreation::graphics("lighting")
                .with_input(texture_input("shadow_map"))
                .with_output(color("lit")),
        )
        .unwrap();

    let err = graph.compile().unwrap_err();
    assert!(matches!(err, GraphError::CyclicDependency { .. }));
    assert!(graph.execution_order().is_empty());
    assert_eq!(ctx.device.resources().texture_count(), 0);
}

// ============================================================================
// Description files
// ============================================================================

const DEFERRED: &str = r#"{
    "name": "deferred",
    "passes": [
        {
            "name": "gbuffer",
            "outputs": [
                { "type": "attachment", "name": "albedo", "format": "VK_FORMAT_R8G8B8A8_UNORM",
                  "op": "VK_ATTACHMENT_LOAD_OP_CLEAR", "scale": [1.0, 1.0], "clear_color": [0, 0, 0, 1] },
                { "type": "attachment", "name": "depth", "format": "VK_FORMAT_D32_SFLOAT",
                  "op": "VK_ATTACHMENT_LOAD_OP_CLEAR", "scale": [1.0, 1.0] }
            ]
        },
        {
            "name": "ssao",
            "type": "compute",
            "enabled": 0,
            "inputs": [ { "type": "texture", "name": "depth" } ],
            "outputs": [ { "type": "attachment", "name": "ao", "format": "r8_unorm",
                           "op": "dont_care", "scale": [0.5, 0.5] } ]
        },
        {
            "name": "lighting",
            "inputs": [
                { "type": "texture", "name": "albedo" },
                { "type": "attachment", "name": "depth" }
            ],
            "outputs": [ { "type": "attachment", "name": "lit", "format": "rgba16_float",
                           "op": "clear", "scale": [1.0, 1.0], "clear_color": [0.5, 0.5, 0.5, 1.0] } ]
        }
    ]
}"#;

#[test]
fn test_load_description_file() {
    let ctx = TestContext::new(1920, 1080);
    let path = std::env::temp_dir().join(format!("vesper_graph_{}.json", std::process::id()));
    std::fs::write(&path, DEFERRED).unwrap();

    let mut graph = ctx.graph();
    graph.load_description(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(graph.name(), "deferred");
    graph.compile().unwrap();
    assert_eq!(graph.node_names(), ["gbuffer", "lighting"]);

    let builder = graph.builder();
    let lit = builder.access_resource_by_name("lit").unwrap();
    assert_eq!(lit.info.format, TextureFormat::Rgba16Float);
    assert_eq!(lit.info.clear_values, [0.5, 0.5, 0.5, 1.0]);
    let ao = builder.access_resource_by_name("ao").unwrap();
    assert_eq!(ao.info.scale, [0.5, 0.5]);
    assert!(ao.info.texture.is_none());
}

#[rstest]
#[case::unknown_type(r#"{ "passes": [ { "name": "p", "outputs": [ { "type": "image", "name": "x" } ] } ] }"#)]
#[case::unknown_format(
    r#"{ "passes": [ { "name": "p", "outputs": [ { "type": "attachment", "name": "x", "format": "rgb9e5", "op": "clear", "scale": [1, 1] } ] } ] }"#
)]
#[case::missing_scale(
    r#"{ "passes": [ { "name": "p", "outputs": [ { "type": "attachment", "name": "x", "format": "rgba8_unorm", "op": "clear" } ] } ] }"#
)]
#[case::missing_passes(r#"{ "name": "empty" }"#)]
fn test_invalid_descriptions_create_nothing(#[case] json: &str) {
    let ctx = TestContext::new(64, 64);
    let mut graph = ctx.graph();
    assert!(graph.parse_description(json).is_err());
    assert_eq!(graph.builder().node_count(), 0);
}

#[test]
fn test_duplicate_pass_names_rejected() {
    let ctx = TestContext::new(64, 64);
    let mut graph = ctx.graph();
    let err = graph
        .parse_description(
            r#"{ "passes": [ { "name": "p", "outputs": [] }, { "name": "p", "outputs": [] } ] }"#,
        )
        .unwrap_err();
    assert_eq!(err, GraphError::DuplicateNode("p".into()));
}

// ============================================================================
// Execution
// ============================================================================

#[test]
fn test_graphics_node_barriers_and_callbacks() {
    let ctx = TestContext::new(400, 300);
    let log = CallLog::default();
    let mut graph = ctx.graph();
    graph.parse_description(DEFERRED).unwrap();
    graph.register_render_pass("gbuffer", RecordingPass::boxed("gbuffer", &log));
    graph.register_render_pass("lighting", RecordingPass::boxed("lighting", &log));
    graph.compile().unwrap();

    let commands = render_frame(&ctx, &mut graph);
    assert_eq!(
        labels(&commands),
        [
            "gbuffer",
            "gbuffer.pre_render",
            "gbuffer.render",
            "gbuffer.post_render",
            "lighting",
            "lighting.pre_render",
            "lighting.render",
            "lighting.post_render",
        ]
    );

    // Setup before pre_render: input barriers, output barriers, scissor, viewport.
    let setup = between(&commands, "lighting", "lighting.pre_render");
    assert_eq!(
        barrier_layouts(&setup),
        [
            ImageLayout::ShaderReadOnly,
            ImageLayout::DepthStencilAttachment,
            ImageLayout::ColorAttachment,
        ]
    );
    assert!(matches!(
        &setup[setup.len() - 2..],
        [RecordedCommand::SetScissor(s), RecordedCommand::SetViewport(v)]
            if s.width == 400 && s.height == 300 && v.width == 400.0
    ));

    // The render pass spans the render callback only.
    let pass = between(&commands, "lighting.pre_render", "lighting.post_render");
    let begin = pass
        .iter()
        .find_map(|c| match c {
            RecordedCommand::BeginRendering(info) => Some(info.clone()),
            _ => None,
        })
        .expect("lighting begins rendering");
    assert_eq!(
        begin.color_attachments[0].clear,
        ClearValue::color([0.5, 0.5, 0.5, 1.0])
    );
    assert_eq!(
        begin.depth_attachment.unwrap().load,
        RenderPassOperation::Load
    );
    assert!(matches!(pass.last(), Some(RecordedCommand::EndRendering)));

    let gbuffer_pass = between(&commands, "gbuffer.pre_render", "gbuffer.post_render");
    let gbuffer_begin = gbuffer_pass
        .iter()
        .find_map(|c| match c {
            RecordedCommand::BeginRendering(info) => Some(info.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(
        gbuffer_begin.depth_attachment.unwrap().clear,
        ClearValue::depth_stencil(1.0, 0)
    );

    // The texture states follow the last barrier.
    let builder = graph.builder();
    let albedo = builder.access_resource_by_name("albedo").unwrap().info.texture.unwrap();
    assert_eq!(
        ctx.device.resources().texture(albedo).unwrap().state(),
        ResourceState::PIXEL_SHADER_RESOURCE
    );
}

#[test]
fn test_compute_and_ray_tracing_nodes() {
    let ctx = TestContext::new(256, 256);
    let log = CallLog::default();
    let mut graph = ctx.graph();
    graph
        .add_node(&NodeCreation::graphics("gbuffer").with_output(color("albedo")))
        .unwrap();
    graph
        .add_node(
            &NodeCreation::compute("blur")
                .with_input(texture_input("albedo"))
                .with_output(color("blurred")),
        )
        .unwrap();
    graph
        .add_node(
            &NodeCreation::ray_tracing("shadows")
                .with_input(texture_input("blurred"))
                .with_output(ResourceOutputCreation::marker("shadows_done")),
        )
        .unwrap();
    for name in ["blur", "shadows"] {
        graph.register_render_pass(name, RecordingPass::boxed(name, &log));
    }
    graph.compile().unwrap();

    let commands = render_frame(&ctx, &mut graph);

    let blur_setup = between(&commands, "blur", "blur.pre_render");
    assert_eq!(
        barrier_layouts(&blur_setup),
        [ImageLayout::ShaderReadOnly, ImageLayout::General]
    );
    let blur = between(&commands, "blur", "shadows");
    assert!(!blur
        .iter()
        .any(|c| matches!(c, RecordedCommand::BeginRendering(_))));

    let shadows = between(&commands, "shadows", "shadows.pre_render");
    assert!(barrier_layouts(&shadows).is_empty());
    assert_eq!(
        *log.lock(),
        [
            "blur.pre_render",
            "blur.render",
            "blur.post_render",
            "shadows.pre_render",
            "shadows.render",
            "shadows.post_render",
        ]
    );
}

#[test]
fn test_markers_balanced_after_render() {
    let ctx = TestContext::new(128, 128);
    let mut graph = random_graph(&ctx, 8, 6);
    graph.compile().unwrap();
    let commands = render_frame(&ctx, &mut graph);

    let opened = labels(&commands).len();
    let closed = commands
        .iter()
        .filter(|c| matches!(c, RecordedCommand::EndLabel))
        .count();
    assert_eq!(opened, 6);
    assert_eq!(opened, closed);
    assert!(matches!(commands.last(), Some(RecordedCommand::End)));
}

#[test]
fn test_resize_reallocates_at_scale() {
    let ctx = TestContext::new(1280, 720);
    let log = CallLog::default();
    let mut graph = ctx.graph();
    graph
        .add_node(
            &NodeCreation::graphics("half")
                .with_output(color("half_color").with_scale(0.5, 0.5))
                .with_output(depth("half_depth").with_scale(0.5, 0.5)),
        )
        .unwrap();
    graph.register_render_pass("half", RecordingPass::boxed("half", &log));
    graph.compile().unwrap();

    let builder = graph.builder();
    let texture = builder.access_resource_by_name("half_color").unwrap().info.texture.unwrap();
    let framebuffer = builder.access_node_by_name("half").unwrap().framebuffer.unwrap();
    assert_eq!(
        ctx.device.resources().texture(texture).unwrap().size(),
        Extent2d::new(640, 360)
    );

    graph.on_resize(1920, 1080);

    let resources = ctx.device.resources();
    assert_eq!(
        resources.texture(texture).unwrap().size(),
        Extent2d::new(960, 540)
    );
    let framebuffer = resources.framebuffer(framebuffer).unwrap();
    assert_eq!((framebuffer.width(), framebuffer.height()), (960, 540));
    assert_eq!(
        resources
            .texture(framebuffer.depth_stencil_attachment().unwrap())
            .unwrap()
            .size(),
        Extent2d::new(960, 540)
    );
    drop(resources);

    assert_eq!(ctx.device.renderer_size(), Extent2d::new(1920, 1080));
    assert_eq!(*log.lock(), ["half.on_resize(1920x1080)"]);
}

#[test]
fn test_techniques_reloaded_reaches_disabled_nodes() {
    let ctx = TestContext::new(64, 64);
    let log = CallLog::default();
    let mut graph = ctx.graph();
    graph.add_node(&NodeCreation::graphics("on")).unwrap();
    graph
        .add_node(&NodeCreation::graphics("off").with_enabled(false))
        .unwrap();
    graph.register_render_pass("on", RecordingPass::boxed("on", &log));
    graph.register_render_pass("off", RecordingPass::boxed("off", &log));

    graph.on_techniques_reloaded();
    let mut calls = log.lock().clone();
    calls.sort();
    assert_eq!(
        calls,
        ["off.on_techniques_reloaded", "on.on_techniques_reloaded"]
    );
}
