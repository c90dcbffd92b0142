//! Shader state records.
//!
//! A shader state groups the compiled stages of one program. Shaders arrive
//! as SPIR-V words; compiling them is not the device's job.

use crate::backend::NativeShader;
use crate::error::GraphicsError;

/// A programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
    Task,
    Mesh,
    RayGeneration,
    Miss,
    ClosestHit,
}

/// Code for one stage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderStageCode {
    pub stage: ShaderStage,
    pub spirv: Vec<u32>,
    pub entry_point: String,
}

/// Descriptor for creating a shader state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ShaderDescriptor {
    pub name: String,
    pub stages: Vec<ShaderStageCode>,
}

impl ShaderDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Vec::new(),
        }
    }

    /// Adds a stage with the `main` entry point.
    pub fn with_stage(mut self, stage: ShaderStage, spirv: Vec<u32>) -> Self {
        self.stages.push(ShaderStageCode {
            stage,
            spirv,
            entry_point: String::from("main"),
        });
        self
    }

    pub fn is_compute(&self) -> bool {
        self.stages.iter().any(|s| s.stage == ShaderStage::Compute)
    }

    /// A state needs at least one stage, each stage at most once, and a
    /// compute stage stands alone.
    pub(crate) fn validate(&self) -> Result<(), GraphicsError> {
        let invalid = |msg: String| -> Result<(), GraphicsError> {
            Err(GraphicsError::InvalidParameter(msg))
        };
        if self.stages.is_empty() {
            return invalid(format!("shader {} has no stages", self.name));
        }
        for (i, code) in self.stages.iter().enumerate() {
            if code.spirv.is_empty() {
                let stage = code.stage;
                return invalid(format!("shader {}: {stage:?} stage has no code", self.name));
            }
            if self.stages[..i].iter().any(|s| s.stage == code.stage) {
                let stage = code.stage;
                return invalid(format!("shader {}: {stage:?} stage given twice", self.name));
            }
        }
        if self.is_compute() && self.stages.len() > 1 {
            return invalid(format!(
                "shader {} mixes a compute stage with other stages",
                self.name
            ));
        }
        Ok(())
    }
}

/// A shader state living in the device's shader pool.
#[derive(Debug, Clone)]
pub struct Shader {
    pub(crate) descriptor: ShaderDescriptor,
    pub(crate) shader: NativeShader,
}

impl Shader {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn stages(&self) -> impl Iterator<Item = ShaderStage> + '_ {
        self.descriptor.stages.iter().map(|s| s.stage)
    }

    pub fn is_compute(&self) -> bool {
        self.descriptor.is_compute()
    }

    pub fn native(&self) -> NativeShader {
        self.shader
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORDS: [u32; 2] = [0x0723_0203, 0x0001_0000];

    #[test]
    fn test_graphics_stages_accepted() {
        let shader = ShaderDescriptor::new("opaque")
            .with_stage(ShaderStage::Vertex, WORDS.to_vec())
            .with_stage(ShaderStage::Fragment, WORDS.to_vec());
        assert!(shader.validate().is_ok());
        assert!(!shader.is_compute());
    }

    #[test]
    fn test_invalid_stage_sets() {
        let empty = ShaderDescriptor::new("empty");
        let no_code = ShaderDescriptor::new("no_code").with_stage(ShaderStage::Vertex, Vec::new());
        let twice = ShaderDescriptor::new("twice")
            .with_stage(ShaderStage::Fragment, WORDS.to_vec())
            .with_stage(ShaderStage::Fragment, WORDS.to_vec());
        let mixed = ShaderDescriptor::new("mixed")
            .with_stage(ShaderStage::Compute, WORDS.to_vec())
            .with_stage(ShaderStage::Vertex, WORDS.to_vec());
        for shader in [empty, no_code, twice, mixed] {
            assert!(
                matches!(shader.validate(), Err(GraphicsError::InvalidParameter(_))),
                "{} should be rejected",
                shader.name
            );
        }
    }
}
