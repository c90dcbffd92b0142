//! Sampler record.

use crate::backend::NativeSampler;
use crate::types::SamplerDescriptor;

/// A sampler living in the device's sampler pool.
#[derive(Debug, Clone)]
pub struct Sampler {
    pub(crate) descriptor: SamplerDescriptor,
    pub(crate) sampler: NativeSampler,
}

impl Sampler {
    pub fn descriptor(&self) -> &SamplerDescriptor {
        &self.descriptor
    }

    pub fn native(&self) -> NativeSampler {
        self.sampler
    }
}
