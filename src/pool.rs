//! Bounded worker pool with a single aggregating consumer.
//!
//! Workers drain a shared work queue and send each result over a channel.
//! Exactly one aggregator thread owns the accumulated state and is the only
//! writer to it, so no locking is needed. The aggregator knows how many
//! results to expect and stops after receiving that many; there is no "done"
//! sentinel.

use crossbeam::channel;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::thread;
use tracing::debug;

/// Upper bound on pool size, to keep open file descriptors sane on very large hosts.
pub const MAX_WORKERS: usize = 256;

/// Results buffered between the workers and the aggregator.
const RESULT_BACKLOG: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("failed to build worker pool: {0}")]
    Build(#[from] rayon::ThreadPoolBuildError),

    #[error("work queue closed before all {0} items were queued")]
    QueueClosed(usize),

    #[error("result channel closed after {received} of {expected} results")]
    Disconnected { received: usize, expected: usize },

    #[error("aggregator thread panicked")]
    AggregatorPanicked,
}

/// Clamps a requested worker count into `1..=MAX_WORKERS`.
pub fn clamp_workers(requested: usize) -> usize {
    requested.clamp(1, MAX_WORKERS)
}

/// `max(1, cpus - 1)`, capped at [`MAX_WORKERS`].
pub fn default_worker_count() -> usize {
    let cpus = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    clamp_workers(cpus.saturating_sub(1))
}

/// Fixed-size pool used for both the index build and process sampling.
pub struct WorkerPool {
    pool: ThreadPool,
    workers: usize,
}

impl WorkerPool {
    /// Builds a pool with `workers` threads (clamped to `1..=MAX_WORKERS`).
    pub fn new(workers: usize) -> Result<Self, PoolError> {
        let workers = clamp_workers(workers);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("memstats-worker-{i}"))
            .build()?;
        debug!("Worker pool initialized with {} threads", workers);
        Ok(Self { pool, workers })
    }

    /// Builds a pool sized by [`default_worker_count`].
    pub fn with_default_size() -> Result<Self, PoolError> {
        Self::new(default_worker_count())
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Runs `work` over every item and folds each result into `init` with `merge`.
    ///
    /// `merge` runs on a dedicated aggregator thread, one result at a time, in
    /// completion order. The call returns only after the aggregator has consumed
    /// one result per item.
    pub fn fan_in<I, R, S, W, M>(
        &self,
        items: Vec<I>,
        work: W,
        init: S,
        mut merge: M,
    ) -> Result<S, PoolError>
    where
        I: Send,
        R: Send,
        S: Send,
        W: Fn(I) -> R + Sync,
        M: FnMut(&mut S, R) + Send,
    {
        let expected = items.len();

        let (work_tx, work_rx) = channel::unbounded::<I>();
        for item in items {
            work_tx
                .send(item)
                .map_err(|_| PoolError::QueueClosed(expected))?;
        }
        drop(work_tx);

        let (out_tx, out_rx) = channel::bounded::<R>(RESULT_BACKLOG);

        thread::scope(|scope| {
            let aggregator = scope.spawn(move || {
                let mut state = init;
                for received in 0..expected {
                    match out_rx.recv() {
                        Ok(result) => merge(&mut state, result),
                        Err(_) => return Err(PoolError::Disconnected { received, expected }),
                    }
                }
                Ok(state)
            });

            let work = &work;
            self.pool.scope(|s| {
                for _ in 0..self.workers {
                    let work_rx = work_rx.clone();
                    let out_tx = out_tx.clone();
                    s.spawn(move |_| {
                        for item in work_rx.iter() {
                            if out_tx.send(work(item)).is_err() {
                                // Aggregator is gone; nothing left to deliver to.
                                break;
                            }
                        }
                    });
                }
            });
            drop(out_tx);

            aggregator
                .join()
                .map_err(|_| PoolError::AggregatorPanicked)?
        })
    }
}
