//! Shared fixtures for the graphics integration tests.
//!
//! Every test runs on the dummy backend, which records commands instead of
//! submitting them so tests can inspect what was recorded.

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use vesper_graphics::backend::{DummyBackend, RecordedCommand};
use vesper_graphics::command::CommandBuffer;
use vesper_graphics::graph::{PassContainer, RenderGraph, ResourceOutputCreation};
use vesper_graphics::resources::{RenderPassOperation, TextureHandle};
use vesper_graphics::types::TextureFormat;
use vesper_graphics::{GpuDevice, GraphicsConfig};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A dummy backend and a device on top of it.
pub struct TestContext {
    pub backend: Arc<DummyBackend>,
    pub device: Arc<GpuDevice>,
}

impl TestContext {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_config(width, height, GraphicsConfig::default())
    }

    pub fn with_config(width: u32, height: u32, config: GraphicsConfig) -> Self {
        init_logging();
        let backend = Arc::new(DummyBackend::new());
        let device = GpuDevice::new(backend.clone(), config);
        device.set_renderer_size(width, height);
        device.set_swapchain_extent(width, height);
        Self { backend, device }
    }

    pub fn graph(&self) -> RenderGraph {
        RenderGraph::new(Arc::clone(&self.device))
    }

    /// Backend memory block behind `texture`.
    pub fn memory_of(&self, texture: TextureHandle) -> u64 {
        let resources = self.device.resources();
        let owner = resources.memory_owner(texture);
        let image = resources
            .texture(owner)
            .map(|t| t.image())
            .expect("texture is live");
        self.backend.image(image).expect("image is live").memory
    }

    pub fn recorded(&self, cmd: &CommandBuffer) -> Vec<RecordedCommand> {
        self.backend.recorded(cmd.native())
    }
}

pub fn color(name: &str) -> ResourceOutputCreation {
    ResourceOutputCreation::attachment(name, TextureFormat::Rgba8Unorm, RenderPassOperation::Clear)
}

pub fn depth(name: &str) -> ResourceOutputCreation {
    ResourceOutputCreation::attachment(name, TextureFormat::Depth32Float, RenderPassOperation::Clear)
}

/// Log of pass container callbacks, shared between a test and its passes.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Pass container that logs its callbacks and leaves a debug label in the
/// command stream for each recording callback.
pub struct RecordingPass {
    pub name: String,
    pub log: CallLog,
}

impl RecordingPass {
    pub fn boxed(name: &str, log: &CallLog) -> Box<dyn PassContainer> {
        Box::new(Self {
            name: name.to_string(),
            log: Arc::clone(log),
        })
    }

    fn mark(&self, cmd: &mut CommandBuffer, callback: &str) {
        let label = format!("{}.{callback}", self.name);
        cmd.push_marker(&label);
        cmd.pop_marker();
        self.log.lock().push(label);
    }
}

impl PassContainer for RecordingPass {
    fn pre_render(&mut self, cmd: &mut CommandBuffer) {
        self.mark(cmd, "pre_render");
    }

    fn render(&mut self, cmd: &mut CommandBuffer) {
        self.mark(cmd, "render");
    }

    fn post_render(&mut self, cmd: &mut CommandBuffer) {
        self.mark(cmd, "post_render");
    }

    fn on_resize(&mut self, _device: &GpuDevice, width: u32, height: u32) {
        self.log
            .lock()
            .push(format!("{}.on_resize({width}x{height})", self.name));
    }

    fn on_techniques_reloaded(&mut self) {
        self.log
            .lock()
            .push(format!("{}.on_techniques_reloaded", self.name));
    }
}

/// Labels opened in `commands`, in order.
pub fn labels(commands: &[RecordedCommand]) -> Vec<String> {
    commands
        .iter()
        .filter_map(|c| match c {
            RecordedCommand::BeginLabel(name) => Some(name.clone()),
            _ => None,
        })
        .collect()
}
