//! Vulkan backend support.
//!
//! Maps the API-neutral resource, barrier and rendering types onto `ash`
//! structures. A Vulkan [`GpuBackend`](super::GpuBackend) builds its
//! command encoding on these conversions.

pub mod conversion;
