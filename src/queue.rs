use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::types::Job;

/// Create an unbounded FIFO job queue.
///
/// The queue closes once every [`JobSender`] is dropped; receivers keep
/// draining jobs queued before the close and then observe `None`.
pub fn job_queue() -> (JobSender, JobReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let depth = Arc::new(AtomicUsize::new(0));
    (
        JobSender {
            tx,
            depth: depth.clone(),
        },
        JobReceiver {
            rx: Arc::new(Mutex::new(rx)),
            depth,
        },
    )
}

/// Producer half. Cloneable; pushing never blocks.
#[derive(Clone, Debug)]
pub struct JobSender {
    tx: mpsc::UnboundedSender<Job>,
    depth: Arc<AtomicUsize>,
}

impl JobSender {
    /// Enqueue a job. Returns `false` if every receiver is gone.
    pub fn push(&self, job: Job) -> bool {
        self.depth.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(job).is_err() {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            return false;
        }
        true
    }

    /// Number of jobs queued but not yet dequeued.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    /// Drop this producer handle. The queue closes when the last one goes.
    pub fn close(self) {}
}

/// Consumer half, shared by every worker in the pool.
#[derive(Clone, Debug)]
pub struct JobReceiver {
    rx: Arc<Mutex<mpsc::UnboundedReceiver<Job>>>,
    depth: Arc<AtomicUsize>,
}

impl JobReceiver {
    /// Wait for the next job. `None` means the queue is closed and drained.
    pub async fn pop(&self) -> Option<Job> {
        let job = self.rx.lock().await.recv().await?;
        self.depth.fetch_sub(1, Ordering::SeqCst);
        Some(job)
    }

    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}
