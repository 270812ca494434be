//! The per-worker execution environment.

use std::path::Path;

use covenant_trace::RecyclingFileSink;

/// Identifier of the worker executing the current test. Inside the pool
/// this is the rayon thread index, which is non-negative by construction;
/// outside any pool (direct calls, tests) worker 0 is used.
pub fn current_worker_id() -> usize {
    rayon::current_thread_index().unwrap_or(0)
}

/// Created on worker spawn for one test, disposed at test end. Owns the
/// worker's journal sink; nothing here is shared across workers.
#[derive(Debug)]
pub struct WorkerContext {
    pub worker_id: usize,
    pub sink: RecyclingFileSink,
}

impl WorkerContext {
    pub fn open(root: &Path) -> Self {
        let worker_id = current_worker_id();
        Self {
            worker_id,
            sink: RecyclingFileSink::open(root, worker_id),
        }
    }

    /// Disposes the context, closing the sink and disarming its flush hook.
    pub fn dispose(mut self) {
        self.sink.close();
    }
}
