//! Fork/join recording of secondary command buffers.

use vesper_core::parallel::ThreadPool;

use super::CommandBuffer;

/// Record `items` into secondary buffers on worker threads and replay them
/// into `primary`.
///
/// `primary` must have a render pass bound with secondary contents. The
/// items are split into one equal chunk per worker secondary (every
/// secondary except the last); the calling thread records what is left
/// into the last secondary while the workers run. Each secondary gets the
/// full-target viewport and scissor before `record` is called for it.
///
/// After all workers joined, the secondaries are executed in slice order,
/// so the primary's contents do not depend on thread scheduling.
///
/// # Panics
///
/// Panics when `secondaries` is empty or `primary` has no render pass bound.
pub fn record_parallel<T, F>(
    pool: &ThreadPool,
    primary: &mut CommandBuffer,
    secondaries: &mut [&mut CommandBuffer],
    items: &[T],
    record: F,
) where
    T: Sync,
    F: Fn(&mut CommandBuffer, &[T]) + Sync,
{
    let (Some(render_pass), Some(framebuffer)) =
        (primary.current_render_pass(), primary.current_framebuffer())
    else {
        panic!("record_parallel requires a bound render pass");
    };
    let Some((remainder_cmd, worker_cmds)) = secondaries.split_last_mut() else {
        panic!("record_parallel needs at least one secondary command buffer");
    };

    let workers = worker_cmds.len();
    let per_worker = items.len().checked_div(workers).unwrap_or(0);
    let (parallel_items, remainder) = items.split_at(per_worker * workers);

    let record = &record;
    let record_secondary = move |cmd: &mut CommandBuffer, chunk: &[T]| {
        cmd.begin_secondary(render_pass, framebuffer);
        cmd.set_viewport(None);
        cmd.set_scissor(None);
        record(cmd, chunk);
        cmd.end();
    };

    pool.scope(|s| {
        for (worker, cmd) in worker_cmds.iter_mut().enumerate() {
            let chunk = &parallel_items[worker * per_worker..(worker + 1) * per_worker];
            s.spawn(move || record_secondary(cmd, chunk));
        }
        record_secondary(remainder_cmd, remainder);
    });

    for cmd in worker_cmds.iter() {
        primary.execute_secondary(cmd);
    }
    primary.execute_secondary(remainder_cmd);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backend::{DummyBackend, RecordedCommand};
    use crate::command::CommandBufferManager;
    use crate::config::GraphicsConfig;
    use crate::device::GpuDevice;
    use crate::resources::{FramebufferDescriptor, RenderPassDescriptor, RenderPassOperation};
    use crate::types::{TextureDescriptor, TextureFormat, TextureUsage};

    fn draws(commands: &[RecordedCommand]) -> Vec<u32> {
        commands
            .iter()
            .filter_map(|c| match c {
                RecordedCommand::Draw { first_instance, .. } => Some(*first_instance),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_secondaries_replayed_in_order() {
        let backend = Arc::new(DummyBackend::new());
        let mut config = GraphicsConfig::default();
        config.commands.pools_per_frame = 3;
        let device = GpuDevice::new(backend.clone(), config);

        let color = device
            .create_texture(&TextureDescriptor::new_2d(
                32,
                32,
                TextureFormat::Rgba8Unorm,
                TextureUsage::RENDER_ATTACHMENT,
            ))
            .unwrap();
        let pass = device
            .create_render_pass(
                &RenderPassDescriptor::new("opaque")
                    .with_color(TextureFormat::Rgba8Unorm, RenderPassOperation::Clear),
            )
            .unwrap();
        let framebuffer = device
            .create_framebuffer(&FramebufferDescriptor {
                name: "opaque".into(),
                render_pass: pass,
                color_attachments: vec![color],
                width: 32,
                height: 32,
                ..FramebufferDescriptor::default()
            })
            .unwrap();

        let mut manager = CommandBufferManager::new(device).unwrap();
        manager.reset(0);
        let cmds = manager.get_parallel_cmds(0, 0, 2);
        let primary = cmds.primary;
        let mut secondaries = cmds.secondaries;
        primary.bind_render_pass(pass, framebuffer, true);

        let items: Vec<u32> = (0..7).collect();
        record_parallel(
            &ThreadPool::new(2),
            primary,
            &mut secondaries,
            &items,
            |cmd, chunk| {
                for &item in chunk {
                    cmd.draw(0, 3, item, 1);
                }
            },
        );
        primary.end();

        let natives: Vec<_> = secondaries.iter().map(|s| s.native()).collect();
        assert_eq!(draws(&backend.recorded(natives[0])), vec![0, 1, 2]);
        assert_eq!(draws(&backend.recorded(natives[1])), vec![3, 4, 5]);
        assert_eq!(draws(&backend.recorded(natives[2])), vec![6]);

        let executed: Vec<_> = backend
            .recorded(primary.native())
            .into_iter()
            .filter_map(|c| match c {
                RecordedCommand::ExecuteSecondary(native) => Some(native),
                _ => None,
            })
            .collect();
        assert_eq!(executed, natives);
        assert!(secondaries.iter().all(|s| !s.is_recording()));
    }
}
