//! Scoped worker pool for independent per-item work.
//!
//! Jobs flow through a bounded crossbeam channel to named worker threads;
//! results come back tagged with their input index and are reassembled in
//! input order, so the output never depends on scheduling.

use std::thread;

use crossbeam_channel::bounded;

use crate::error::{MergeError, MergeResult};

/// Applies `f` to every item, on up to `workers` threads.
///
/// With one worker (or at most one item) everything runs on the calling
/// thread.
///
/// # Errors
///
/// Returns `MergeError::WorkerPool` if a worker cannot be spawned or a
/// result goes missing.
pub fn map_parallel<T, R, F>(items: Vec<T>, workers: usize, queue_capacity: usize, f: F) -> MergeResult<Vec<R>>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync,
{
    let n = items.len();
    if workers <= 1 || n <= 1 {
        return Ok(items.into_iter().map(f).collect());
    }

    let workers = workers.min(n);
    let (job_tx, job_rx) = bounded::<(usize, T)>(queue_capacity.max(1));
    let (result_tx, result_rx) = bounded::<(usize, R)>(n);
    let f = &f;

    thread::scope(move |scope| -> MergeResult<()> {
        for idx in 0..workers {
            let rx = job_rx.clone();
            let tx = result_tx.clone();
            thread::Builder::new()
                .name(format!("netmerge-worker-{idx}"))
                .spawn_scoped(scope, move || {
                    for (i, item) in rx {
                        if tx.send((i, f(item))).is_err() {
                            break;
                        }
                    }
                })
                .map_err(|e| MergeError::WorkerPool {
                    message: format!("failed to spawn worker {idx}: {e}"),
                })?;
        }
        drop(job_rx);
        drop(result_tx);

        for job in items.into_iter().enumerate() {
            job_tx.send(job).map_err(|_| MergeError::WorkerPool {
                message: "all workers exited before the queue drained".to_string(),
            })?;
        }
        Ok(())
    })?;

    let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(n).collect();
    for (i, result) in result_rx.try_iter() {
        if let Some(slot) = slots.get_mut(i) {
            *slot = Some(result);
        }
    }
    slots
        .into_iter()
        .enumerate()
        .map(|(i, slot)| {
            slot.ok_or_else(|| MergeError::WorkerPool {
                message: format!("missing result for job {i}"),
            })
        })
        .collect()
}
