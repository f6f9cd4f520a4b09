//! Worker Pool Implementation

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::thread;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info};

type BoxedTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Task execution errors
#[derive(Debug, Error)]
pub enum TaskError {
    /// The runner shut down before the task could be queued
    #[error("Task queue closed")]
    QueueClosed,
    /// The task was dropped before producing a result
    #[error("Task cancelled")]
    Cancelled,
}

/// Handle to a submitted task's eventual result
pub struct TaskHandle<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> TaskHandle<T> {
    /// Wait for the task to finish.
    pub async fn join(self) -> Result<T, TaskError> {
        self.rx.await.map_err(|_| TaskError::Cancelled)
    }
}

/// Bounded worker pool for submitted jobs.
///
/// Workers pull from a shared queue, so at most `workers` tasks run at
/// once. Dropping the runner closes the queue and lets workers drain.
#[derive(Clone)]
pub struct TaskRunner {
    tx: mpsc::Sender<BoxedTask>,
}

impl TaskRunner {
    /// Create a pool sized to available parallelism.
    pub fn new() -> Self {
        let workers = thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
        Self::with_workers(workers)
    }

    /// Create a pool with an explicit worker count.
    pub fn with_workers(workers: usize) -> Self {
        let workers = workers.max(1);
        let (tx, rx) = mpsc::channel::<BoxedTask>(workers * 4);
        let rx = Arc::new(Mutex::new(rx));

        for id in 0..workers {
            let rx = Arc::clone(&rx);
            tokio::spawn(async move {
                loop {
                    let task = { rx.lock().await.recv().await };
                    match task {
                        Some(task) => task.await,
                        None => break,
                    }
                }
                debug!("Worker {} stopped", id);
            });
        }

        info!("Task runner started with {} workers", workers);
        Self { tx }
    }

    /// Submit a job; the handle resolves with its output.
    pub async fn submit<T, F>(&self, task: F) -> Result<TaskHandle<T>, TaskError>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let boxed: BoxedTask = Box::pin(async move {
            let _ = done_tx.send(task.await);
        });
        self.tx.send(boxed).await.map_err(|_| TaskError::QueueClosed)?;
        Ok(TaskHandle { rx: done_rx })
    }

    /// Create a dedicated single-worker lane that executes submitted jobs
    /// strictly in acceptance order.
    pub fn serial_lane() -> SerialLane {
        SerialLane::new()
    }
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-worker FIFO queue.
///
/// All jobs accepted onto the lane run one at a time, in order, which
/// gives a deterministic total order for store mutations.
#[derive(Clone)]
pub struct SerialLane {
    tx: mpsc::Sender<BoxedTask>,
}

impl SerialLane {
    pub fn new() -> Self {
        let (tx, mut rx) = mpsc::channel::<BoxedTask>(64);
        tokio::spawn(async move {
            while let Some(task) = rx.recv().await {
                task.await;
            }
            debug!("Serial lane stopped");
        });
        Self { tx }
    }

    /// Submit a job to the lane; resolves after the job has run.
    pub async fn submit<T, F>(&self, task: F) -> Result<TaskHandle<T>, TaskError>
    where
        T: Send + 'static,
        F: Future<Output = T> + Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let boxed: BoxedTask = Box::pin(async move {
            let _ = done_tx.send(task.await);
        });
        self.tx.send(boxed).await.map_err(|_| TaskError::QueueClosed)?;
        Ok(TaskHandle { rx: done_rx })
    }
}

impl Default for SerialLane {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_submit_returns_result() {
        let runner = TaskRunner::with_workers(2);
        let handle = runner.submit(async { 21 * 2 }).await.unwrap();
        assert_eq!(handle.join().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_pool_runs_many_tasks() {
        let runner = TaskRunner::with_workers(3);
        let counter = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let counter = Arc::clone(&counter);
            let handle = runner
                .submit(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .await
                .unwrap();
            handles.push(handle);
        }
        for handle in handles {
            handle.join().await.unwrap();
        }
        assert_eq!(counter.load(Ordering::SeqCst), 20);
    }

    #[tokio::test]
    async fn test_serial_lane_preserves_order() {
        let lane = SerialLane::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..10u32 {
            let order = Arc::clone(&order);
            let handle = lane
                .submit(async move {
                    // Earlier jobs sleep longer; FIFO still holds because
                    // the lane runs one job at a time.
                    tokio::time::sleep(Duration::from_millis(10 - i as u64)).await;
                    order.lock().await.push(i);
                })
                .await
                .unwrap();
            handles.push(handle);
        }
        for handle in handles {
            handle.join().await.unwrap();
        }
        assert_eq!(*order.lock().await, (0..10).collect::<Vec<_>>());
    }
}
