//! Pipeline records.
//!
//! Pipelines are produced by the technique loader from already compiled
//! shaders; this module only stores what command recording needs.

use crate::backend::NativePipeline;

/// Where a pipeline is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PipelineBindPoint {
    #[default]
    Graphics,
    Compute,
    RayTracing,
}

/// Descriptor for creating a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PipelineDescriptor {
    pub name: String,
    pub bind_point: PipelineBindPoint,
}

impl PipelineDescriptor {
    pub fn new(name: impl Into<String>, bind_point: PipelineBindPoint) -> Self {
        Self {
            name: name.into(),
            bind_point,
        }
    }
}

/// A pipeline living in the device's pipeline pool.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub(crate) descriptor: PipelineDescriptor,
    pub(crate) pipeline: NativePipeline,
}

impl Pipeline {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn bind_point(&self) -> PipelineBindPoint {
        self.descriptor.bind_point
    }

    pub fn native(&self) -> NativePipeline {
        self.pipeline
    }
}
