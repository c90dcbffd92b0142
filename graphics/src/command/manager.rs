//! Per-frame, per-thread command buffer allocation.

use std::sync::Arc;

use crate::backend::CommandBufferLevel;
use crate::config::CommandBufferConfig;
use crate::device::GpuDevice;
use crate::error::GraphicsError;

use super::CommandBuffer;

/// Command buffers claimed for one parallel recording.
///
/// `secondaries` holds one buffer per worker, each from a different worker
/// pool, followed by one buffer from the caller's own pool for the
/// remainder.
#[derive(Debug)]
pub struct ParallelCommandBuffers<'a> {
    pub primary: &'a mut CommandBuffer,
    pub secondaries: Vec<&'a mut CommandBuffer>,
}

/// Hands out pre-allocated command buffers.
///
/// There is one command pool per `(frame, thread)` pair, so threads never
/// share a pool and a frame's pools can be reset while other frames are
/// still in flight. Each pool owns a fixed number of primary and secondary
/// buffers. Running out of buffers is a programming error and panics.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use vesper_graphics::{CommandBufferManager, DummyBackend, GpuDevice, GraphicsConfig};
///
/// let device = GpuDevice::new(Arc::new(DummyBackend::new()), GraphicsConfig::default());
/// let mut manager = CommandBufferManager::new(device).unwrap();
///
/// manager.reset(0);
/// let cmd = manager.get_primary_cmd(0, 0, true);
/// assert!(cmd.is_recording());
/// cmd.end();
/// ```
#[derive(Debug)]
pub struct CommandBufferManager {
    config: CommandBufferConfig,
    frames: u32,
    primaries: Vec<CommandBuffer>,
    secondaries: Vec<CommandBuffer>,
    used_primaries: Vec<u32>,
    used_secondaries: Vec<u32>,
    device: Arc<GpuDevice>,
}

impl CommandBufferManager {
    /// Allocate every pool's buffers up front, sized by the device config.
    pub fn new(device: Arc<GpuDevice>) -> Result<Self, GraphicsError> {
        let config = device.config().commands.clone();
        let frames = device.config().swapchain_images;
        let total_pools = frames * config.pools_per_frame;
        let backend = Arc::clone(device.backend());

        let mut primaries = Vec::with_capacity((total_pools * config.primary_per_pool) as usize);
        let mut secondaries =
            Vec::with_capacity((total_pools * config.secondary_per_pool) as usize);
        for pool in 0..total_pools {
            for _ in 0..config.primary_per_pool {
                let stream = backend.allocate_command_stream(pool, CommandBufferLevel::Primary)?;
                primaries.push(CommandBuffer::new(Arc::clone(&device), stream));
            }
            for _ in 0..config.secondary_per_pool {
                let stream =
                    backend.allocate_command_stream(pool, CommandBufferLevel::Secondary)?;
                secondaries.push(CommandBuffer::new(Arc::clone(&device), stream));
            }
        }

        log::info!(
            "CommandBufferManager: {} pools, {} primary and {} secondary buffers",
            total_pools,
            primaries.len(),
            secondaries.len()
        );

        Ok(Self {
            used_primaries: vec![0; total_pools as usize],
            used_secondaries: vec![0; total_pools as usize],
            config,
            frames,
            primaries,
            secondaries,
            device,
        })
    }

    pub fn pools_per_frame(&self) -> u32 {
        self.config.pools_per_frame
    }

    pub fn primary_per_pool(&self) -> u32 {
        self.config.primary_per_pool
    }

    pub fn secondary_per_pool(&self) -> u32 {
        self.config.secondary_per_pool
    }

    fn pool_index(&self, frame: u32, thread: u32) -> usize {
        assert!(frame < self.frames, "frame {frame} out of range");
        assert!(
            thread < self.config.pools_per_frame,
            "thread {thread} has no command pool"
        );
        (frame * self.config.pools_per_frame + thread) as usize
    }

    /// Primary buffers claimed from the `(frame, thread)` pool since its
    /// last reset.
    pub fn used_primary_count(&self, frame: u32, thread: u32) -> u32 {
        self.used_primaries[self.pool_index(frame, thread)]
    }

    pub fn used_secondary_count(&self, frame: u32, thread: u32) -> u32 {
        self.used_secondaries[self.pool_index(frame, thread)]
    }

    /// Reset every pool of `frame` and make all its buffers available again.
    ///
    /// Call once per frame, after the GPU finished with the frame's previous
    /// submission and before any `get_*` for it.
    pub fn reset(&mut self, frame: u32) {
        for thread in 0..self.config.pools_per_frame {
            let pool = self.pool_index(frame, thread);
            self.device.backend().reset_command_pool(pool as u32);

            let first = pool * self.config.secondary_per_pool as usize;
            let used = self.used_secondaries[pool] as usize;
            for cmd in &mut self.secondaries[first..first + used] {
                cmd.reset();
            }
            self.used_secondaries[pool] = 0;
            self.used_primaries[pool] = 0;
        }
    }

    /// The next primary buffer of the `(frame, thread)` pool.
    ///
    /// With `begin`, the buffer is reset, begun and claimed, so the next
    /// call returns a different buffer. Without it the buffer is returned
    /// as is and stays unclaimed.
    ///
    /// # Panics
    ///
    /// Panics when the pool has no primary buffer left.
    pub fn get_primary_cmd(&mut self, frame: u32, thread: u32, begin: bool) -> &mut CommandBuffer {
        let pool = self.pool_index(frame, thread);
        let index = self.claim_primary(pool, begin);
        &mut self.primaries[index]
    }

    fn claim_primary(&mut self, pool: usize, begin: bool) -> usize {
        let used = self.used_primaries[pool];
        assert!(
            used < self.config.primary_per_pool,
            "primary command buffers exhausted in pool {pool} ({} per pool)",
            self.config.primary_per_pool
        );
        let index = pool * self.config.primary_per_pool as usize + used as usize;
        if begin {
            let cmd = &mut self.primaries[index];
            cmd.reset();
            cmd.begin_primary();
            #[cfg(feature = "profiling")]
            cmd.reset_queries();
            self.used_primaries[pool] = used + 1;
        }
        index
    }

    /// Claim the next secondary buffer of the `(frame, thread)` pool.
    ///
    /// # Panics
    ///
    /// Panics when the pool has no secondary buffer left.
    pub fn get_secondary_cmd(&mut self, frame: u32, thread: u32) -> &mut CommandBuffer {
        let pool = self.pool_index(frame, thread);
        let index = self.claim_secondary(pool);
        &mut self.secondaries[index]
    }

    fn claim_secondary(&mut self, pool: usize) -> usize {
        let used = self.used_secondaries[pool];
        assert!(
            used < self.config.secondary_per_pool,
            "secondary command buffers exhausted in pool {pool} ({} per pool)",
            self.config.secondary_per_pool
        );
        self.used_secondaries[pool] = used + 1;
        pool * self.config.secondary_per_pool as usize + used as usize
    }

    /// Claim a begun primary buffer from the caller's pool plus secondaries
    /// for `workers` parallel recorders.
    ///
    /// Worker `i` records into a buffer of pool `thread + 1 + i` (wrapping
    /// around the frame's pools), so no two recorders share a pool. The last
    /// secondary comes from the caller's pool.
    ///
    /// # Panics
    ///
    /// Panics unless `workers < pools_per_frame`, or when a pool runs out of
    /// buffers.
    pub fn get_parallel_cmds(
        &mut self,
        frame: u32,
        thread: u32,
        workers: u32,
    ) -> ParallelCommandBuffers<'_> {
        let pools_per_frame = self.config.pools_per_frame;
        assert!(
            workers < pools_per_frame,
            "{workers} workers need more than the {pools_per_frame} command pools per frame"
        );

        let own_pool = self.pool_index(frame, thread);
        let primary = self.claim_primary(own_pool, true);

        let mut wanted = Vec::with_capacity(workers as usize + 1);
        for worker in 0..workers {
            let worker_thread = (thread + 1 + worker) % pools_per_frame;
            let pool = self.pool_index(frame, worker_thread);
            wanted.push(self.claim_secondary(pool));
        }
        wanted.push(self.claim_secondary(own_pool));

        let mut slots: Vec<Option<&mut CommandBuffer>> = wanted.iter().map(|_| None).collect();
        for (index, cmd) in self.secondaries.iter_mut().enumerate() {
            if let Some(slot) = wanted.iter().position(|&w| w == index) {
                slots[slot] = Some(cmd);
            }
        }

        ParallelCommandBuffers {
            primary: &mut self.primaries[primary],
            secondaries: slots.into_iter().flatten().collect(),
        }
    }
}
