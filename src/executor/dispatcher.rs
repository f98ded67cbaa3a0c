//! Background dispatch for benchmark tasks
//!
//! A bounded queue feeds a fixed pool of workers. Bounding the queue
//! keeps a burst of submissions from spawning unbounded concurrent
//! benchmark runs; `submit` applies backpressure instead. Each worker
//! moves the actual round loop onto the blocking pool so benchmark
//! crypto calls never stall the Tokio reactor.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use super::TaskExecutor;
use crate::error::{Error, Result};

/// Workers draining the queue unless configured otherwise
const DEFAULT_WORKERS: usize = 2;
/// Queue slots available before `submit` applies backpressure
const DEFAULT_QUEUE_DEPTH: usize = 32;

/// Worker pool executing queued benchmark tasks.
#[derive(Debug)]
pub struct Dispatcher {
    sender: mpsc::Sender<u64>,
    workers: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    /// Spawn a dispatcher with the default pool size and queue depth.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn spawn(executor: Arc<TaskExecutor>) -> Self {
        Self::with_capacity(executor, DEFAULT_WORKERS, DEFAULT_QUEUE_DEPTH)
    }

    /// Spawn a dispatcher with an explicit pool size and queue depth.
    ///
    /// Zero values are bumped to one; a dispatcher with no workers would
    /// accept submissions that nothing ever runs.
    #[must_use]
    pub fn with_capacity(executor: Arc<TaskExecutor>, workers: usize, queue_depth: usize) -> Self {
        let (sender, receiver) = mpsc::channel(queue_depth.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let worker_count = workers.max(1);

        let handles = (0..worker_count)
            .map(|worker| {
                let receiver = Arc::clone(&receiver);
                let executor = Arc::clone(&executor);
                tokio::spawn(async move {
                    loop {
                        let next = { receiver.lock().await.recv().await };
                        let Some(task_id) = next else {
                            debug!(worker, "dispatch queue closed, worker exiting");
                            break;
                        };
                        debug!(worker, task_id, "worker picked up task");
                        let executor = Arc::clone(&executor);
                        match tokio::task::spawn_blocking(move || executor.run(task_id)).await {
                            Ok(Ok(task)) => {
                                debug!(worker, task_id, status = %task.status(), "task finished");
                            }
                            Ok(Err(error)) => {
                                error!(worker, task_id, %error, "task execution error");
                            }
                            Err(join_error) => {
                                error!(worker, task_id, %join_error, "benchmark run panicked");
                            }
                        }
                    }
                })
            })
            .collect();

        info!(workers = worker_count, queue_depth, "dispatcher started");
        Self {
            sender,
            workers: handles,
        }
    }

    /// Queue a task for background execution, waiting when the queue is
    /// full.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueClosed`] after shutdown.
    pub async fn submit(&self, task_id: u64) -> Result<()> {
        self.sender
            .send(task_id)
            .await
            .map_err(|_| Error::QueueClosed)
    }

    /// Queue a task without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Conflict`] when the queue is at capacity and
    /// [`Error::QueueClosed`] after shutdown.
    pub fn try_submit(&self, task_id: u64) -> Result<()> {
        self.sender.try_send(task_id).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                Error::Conflict("dispatch queue is full".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => Error::QueueClosed,
        })
    }

    /// Number of workers in the pool.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Close the queue and wait for the workers to drain it.
    pub async fn shutdown(self) {
        drop(self.sender);
        for handle in self.workers {
            if let Err(error) = handle.await {
                error!(%error, "dispatch worker failed during shutdown");
            }
        }
        info!("dispatcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CryptoBackend;
    use crate::config::EngineConfig;
    use crate::model::{TaskBuilder, TaskStatus};
    use crate::store::BenchStore;
    use std::time::Duration;

    fn fixture(delay: Duration) -> (Arc<BenchStore>, Arc<TaskExecutor>) {
        let store = Arc::new(BenchStore::new());
        store.seed_default_catalog();
        let config = EngineConfig::builder().simulated_delay(delay).build();
        let backend = Arc::new(CryptoBackend::from_config(&config));
        let executor = Arc::new(TaskExecutor::new(Arc::clone(&store), backend));
        (store, executor)
    }

    fn queue_task(store: &BenchStore, rounds: u32) -> u64 {
        let algorithm = store.get_algorithm_by_name("Kyber512").unwrap();
        store
            .insert_task(TaskBuilder::new(algorithm.id(), "background", rounds).build())
            .unwrap()
            .id()
    }

    async fn wait_terminal(store: &BenchStore, task_id: u64) -> TaskStatus {
        for _ in 0..200 {
            let status = store.get_task(task_id).unwrap().status();
            if status.is_terminal() {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        store.get_task(task_id).unwrap().status()
    }

    #[tokio::test]
    async fn test_dispatcher_runs_submitted_tasks() {
        let (store, executor) = fixture(Duration::ZERO);
        let dispatcher = Dispatcher::spawn(executor);
        assert_eq!(dispatcher.worker_count(), 2);

        let first = queue_task(&store, 3);
        let second = queue_task(&store, 3);
        dispatcher.submit(first).await.unwrap();
        dispatcher.submit(second).await.unwrap();

        assert_eq!(wait_terminal(&store, first).await, TaskStatus::Completed);
        assert_eq!(wait_terminal(&store, second).await, TaskStatus::Completed);
        assert!(store.sample_count(first) > 0);

        dispatcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_queue_applies_backpressure() {
        // One slow worker, one queue slot: the third submission must be
        // rejected while the first task occupies the worker
        let (store, executor) = fixture(Duration::from_millis(20));
        let dispatcher = Dispatcher::with_capacity(executor.clone(), 1, 1);

        let busy = queue_task(&store, 1_000);
        let queued = queue_task(&store, 1);
        let rejected = queue_task(&store, 1);

        dispatcher.submit(busy).await.unwrap();
        // Completes only once the worker has taken `busy` off the queue
        dispatcher.submit(queued).await.unwrap();

        let err = dispatcher.try_submit(rejected).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        // Unblock the worker once it has claimed `busy`
        for _ in 0..200 {
            if store.get_task(busy).unwrap().status() == TaskStatus::Running {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        executor.stop(busy).unwrap();
        assert_eq!(wait_terminal(&store, busy).await, TaskStatus::Failed);

        // The queued task still runs once the worker frees up
        assert_eq!(wait_terminal(&store, queued).await, TaskStatus::Completed);
        dispatcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_fails() {
        let (store, executor) = fixture(Duration::ZERO);
        let dispatcher = Dispatcher::with_capacity(executor, 1, 4);
        let task_id = queue_task(&store, 1);

        dispatcher.submit(task_id).await.unwrap();
        wait_terminal(&store, task_id).await;

        let sender = dispatcher.sender.clone();
        dispatcher.shutdown().await;
        assert!(sender.is_closed());
    }
}
