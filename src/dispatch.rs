//! Delivery of asynchronous results back to the caller's context.

use crate::types::DetectionResult;
use tokio::sync::mpsc;

/// Receives the result of a background detection
pub trait DetectionCallback: Send + Sync {
    fn on_result(&self, result: DetectionResult);
}

impl<F> DetectionCallback for F
where
    F: Fn(DetectionResult) + Send + Sync,
{
    fn on_result(&self, result: DetectionResult) {
        self(result)
    }
}

/// Receives the answer of a background connectivity check
pub trait ConnectivityCallback: Send + Sync {
    fn on_result(&self, connected: bool);
}

impl<F> ConnectivityCallback for F
where
    F: Fn(bool) + Send + Sync,
{
    fn on_result(&self, connected: bool) {
        self(connected)
    }
}

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs delivery jobs on some execution context
pub trait Dispatcher: Send + Sync + 'static {
    fn dispatch(&self, job: Job);
}

/// Runs the job right away on the worker that produced the result
#[derive(Debug, Default, Clone, Copy)]
pub struct WorkerDispatcher;

impl Dispatcher for WorkerDispatcher {
    fn dispatch(&self, job: Job) {
        job()
    }
}

/// Sending half of a [`DeliveryQueue`]
#[derive(Debug, Clone)]
pub struct DeliveryHandle {
    tx: mpsc::UnboundedSender<Job>,
}

impl Dispatcher for DeliveryHandle {
    fn dispatch(&self, job: Job) {
        if self.tx.send(job).is_err() {
            tracing::warn!("Delivery queue closed, dropping result");
        }
    }
}

/// Queue of delivery jobs drained by the thread that owns it, the way a UI
/// event loop runs posted callbacks.
pub struct DeliveryQueue {
    rx: mpsc::UnboundedReceiver<Job>,
}

impl DeliveryQueue {
    pub fn channel() -> (DeliveryHandle, DeliveryQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        (DeliveryHandle { tx }, DeliveryQueue { rx })
    }

    /// Run every job already queued; returns how many ran
    pub fn run_pending(&mut self) -> usize {
        let mut count = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            count += 1;
        }
        count
    }

    /// Wait for the next job and run it. False once every handle is gone.
    pub async fn run_next(&mut self) -> bool {
        match self.rx.recv().await {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_worker_dispatcher_runs_inline() {
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = ran.clone();
        WorkerDispatcher.dispatch(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_queue_runs_jobs_only_when_drained() {
        let (handle, mut queue) = DeliveryQueue::channel();
        let ran = Arc::new(AtomicUsize::new(0));
        for _ in 0..2 {
            let counter = ran.clone();
            handle.dispatch(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }));
        }
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(queue.run_pending(), 2);
        assert_eq!(ran.load(Ordering::SeqCst), 2);
        assert_eq!(queue.run_pending(), 0);
    }

    #[tokio::test]
    async fn test_run_next_ends_when_handles_drop() {
        let (handle, mut queue) = DeliveryQueue::channel();
        drop(handle);
        assert!(!queue.run_next().await);
    }

    #[test]
    fn test_closures_are_callbacks() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let callback = move |result: DetectionResult| {
            assert!(!result.found);
            counter.fetch_add(1, Ordering::SeqCst);
        };
        DetectionCallback::on_result(&callback, DetectionResult::not_found());
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
