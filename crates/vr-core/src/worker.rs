//! Worker pool
//!
//! The one place turn workers are spawned. Every worker runs as its own
//! runtime task inside a named tracing span; the pool owns the tasks, so
//! dropping it (or calling [`WorkerPool::abort_all`]) cancels whatever is
//! still running.

use std::future::Future;

use tokio::task::{Id, JoinSet};
use tracing::{debug, info_span, warn, Instrument};

/// How one worker ended
#[derive(Debug)]
pub struct WorkerExit<T> {
    pub name: &'static str,
    /// `None` if the worker panicked or was cancelled
    pub output: Option<T>,
}

/// Set of concurrently running workers producing `T`
pub struct WorkerPool<T> {
    label: String,
    tasks: JoinSet<T>,
    names: Vec<(Id, &'static str)>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Create an empty pool; `label` tags every worker span
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            tasks: JoinSet::new(),
            names: Vec::new(),
        }
    }

    /// Start a worker
    pub fn spawn<F>(&mut self, name: &'static str, future: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let span = info_span!("worker", pool = %self.label, name);
        let handle = self.tasks.spawn(future.instrument(span));
        self.names.push((handle.id(), name));
        debug!("Worker started: {}/{}", self.label, name);
    }

    /// Number of workers not yet joined
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for the next worker to finish
    pub async fn join_next(&mut self) -> Option<WorkerExit<T>> {
        let joined = self.tasks.join_next_with_id().await?;

        Some(match joined {
            Ok((id, output)) => WorkerExit {
                name: self.name_of(id),
                output: Some(output),
            },
            Err(e) => {
                let name = self.name_of(e.id());
                if e.is_panic() {
                    warn!("Worker panicked: {}/{}", self.label, name);
                } else {
                    debug!("Worker cancelled: {}/{}", self.label, name);
                }
                WorkerExit { name, output: None }
            }
        })
    }

    /// Wait until every worker has reached a terminal state
    pub async fn join_all(&mut self) -> Vec<WorkerExit<T>> {
        let mut exits = Vec::with_capacity(self.tasks.len());
        while let Some(exit) = self.join_next().await {
            exits.push(exit);
        }
        exits
    }

    /// Cancel every worker still running
    pub fn abort_all(&mut self) {
        if !self.tasks.is_empty() {
            debug!("Aborting {} worker(s) in {}", self.tasks.len(), self.label);
        }
        self.tasks.abort_all();
    }

    fn name_of(&self, id: Id) -> &'static str {
        self.names
            .iter()
            .find(|(task_id, _)| *task_id == id)
            .map(|(_, name)| *name)
            .unwrap_or("unknown")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_join_all_collects_named_outputs() {
        let mut pool = WorkerPool::new("turn-1");
        pool.spawn("generation", async { 1 });
        pool.spawn("synthesis", async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            2
        });
        pool.spawn("relay", async { 3 });
        assert_eq!(pool.len(), 3);

        let mut exits = pool.join_all().await;
        exits.sort_by_key(|e| e.name);

        let summary: Vec<_> = exits.iter().map(|e| (e.name, e.output)).collect();
        assert_eq!(
            summary,
            vec![("generation", Some(1)), ("relay", Some(3)), ("synthesis", Some(2))]
        );
        assert!(pool.is_empty());
    }

    #[tokio::test]
    async fn test_panicking_worker_does_not_stop_others() {
        let mut pool = WorkerPool::new("turn-2");
        pool.spawn("broken", async { panic!("boom") });
        pool.spawn("healthy", async { 7 });

        let exits = pool.join_all().await;
        let broken = exits.iter().find(|e| e.name == "broken").unwrap();
        let healthy = exits.iter().find(|e| e.name == "healthy").unwrap();
        assert!(broken.output.is_none());
        assert_eq!(healthy.output, Some(7));
    }

    #[tokio::test]
    async fn test_abort_all_cancels_hung_worker() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();

        let mut pool: WorkerPool<()> = WorkerPool::new("turn-3");
        pool.spawn("hung", async move {
            std::future::pending::<()>().await;
            flag.store(true, Ordering::SeqCst);
        });

        pool.abort_all();
        let exits = pool.join_all().await;
        assert_eq!(exits.len(), 1);
        assert!(exits[0].output.is_none());
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_drop_cancels_workers() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        {
            let mut pool: WorkerPool<()> = WorkerPool::new("turn-4");
            pool.spawn("holder", async move {
                let _tx = tx;
                std::future::pending::<()>().await;
            });
        }
        assert!(rx.await.is_err());
    }
}
