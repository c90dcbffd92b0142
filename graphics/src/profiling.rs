//! Profiling support via Tracy.
//!
//! CPU spans come from [`vesper_core::profiling`]; this module re-exports
//! them so graphics code only needs one import. Enable with the `profiling`
//! feature:
//!
//! ```toml
//! [dependencies]
//! vesper-graphics = { version = "0.1", features = ["profiling"] }
//! ```
//!
//! With the feature on, the render graph compiler opens a span per phase
//! and every command buffer marker writes a GPU timestamp query pair (see
//! [`CommandBuffer::push_marker`]). The pairs are kept as [`GpuZone`]s;
//! once the backend has read the query results back,
//! [`GpuProfileContext::submit`] turns them into spans on Tracy's GPU
//! timeline. Without the feature all of this compiles away.
//!
//! [`CommandBuffer::push_marker`]: crate::command::CommandBuffer::push_marker

pub use vesper_core::profiling::*;

#[cfg(feature = "profiling")]
pub use tracy_client::{GpuContext, GpuContextType};

/// A marker scope measured by a pair of GPU timestamp queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuZone {
    pub name: String,
    pub begin_query: u32,
    /// `None` while the marker is still open.
    pub end_query: Option<u32>,
}

/// A [`GpuZone`] with its timestamps read back, in GPU ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedGpuZone {
    pub name: String,
    pub start: i64,
    pub end: i64,
}

impl ResolvedGpuZone {
    pub fn duration_ms(&self, timestamp_period_ns: f32) -> f64 {
        (self.end - self.start) as f64 * f64::from(timestamp_period_ns) / 1_000_000.0
    }
}

/// Pairs `zones` with the query results of their command buffer.
///
/// Open zones, zones whose queries were not read back and zones whose end
/// precedes their start are skipped.
pub fn resolve_gpu_zones(zones: &[GpuZone], timestamps: &[i64]) -> Vec<ResolvedGpuZone> {
    zones
        .iter()
        .filter_map(|zone| {
            let start = *timestamps.get(zone.begin_query as usize)?;
            let end = *timestamps.get(zone.end_query? as usize)?;
            (end >= start).then(|| ResolvedGpuZone {
                name: zone.name.clone(),
                start,
                end,
            })
        })
        .collect()
}

/// Tracy GPU timeline for one queue.
#[cfg(feature = "profiling")]
pub struct GpuProfileContext {
    context: GpuContext,
}

#[cfg(feature = "profiling")]
impl GpuProfileContext {
    /// Returns `None` when no Tracy client is running.
    ///
    /// `gpu_timestamp` is a timestamp read from the queue now and
    /// `timestamp_period_ns` the device's timestamp period.
    pub fn new_vulkan(name: &str, gpu_timestamp: i64, timestamp_period_ns: f32) -> Option<Self> {
        let client = tracy_client::Client::running()?;
        let context = client
            .new_gpu_context(
                Some(name),
                GpuContextType::Vulkan,
                gpu_timestamp,
                timestamp_period_ns,
            )
            .ok()?;
        Some(Self { context })
    }

    /// Sends the zones of one command buffer to Tracy. Returns how many
    /// were submitted.
    pub fn submit(&self, zones: &[GpuZone], timestamps: &[i64]) -> usize {
        let mut submitted = 0;
        for zone in resolve_gpu_zones(zones, timestamps) {
            match self.context.span_alloc(&zone.name, "", file!(), line!()) {
                Ok(mut span) => {
                    span.end_zone();
                    span.upload_timestamp_start(zone.start);
                    span.upload_timestamp_end(zone.end);
                    submitted += 1;
                }
                Err(err) => {
                    log::warn!("GPU profiling: dropping zone {}: {err:?}", zone.name);
                    break;
                }
            }
        }
        submitted
    }

    pub fn inner(&self) -> &GpuContext {
        &self.context
    }
}

/// Stand-in when profiling is disabled.
#[cfg(not(feature = "profiling"))]
pub struct GpuProfileContext;

#[cfg(not(feature = "profiling"))]
impl GpuProfileContext {
    pub fn new_vulkan(
        _name: &str,
        _gpu_timestamp: i64,
        _timestamp_period_ns: f32,
    ) -> Option<Self> {
        None
    }

    pub fn submit(&self, _zones: &[GpuZone], _timestamps: &[i64]) -> usize {
        0
    }
}
