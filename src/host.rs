use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::protocol::{read_frame, FrameWriter, Inbound};
use crate::queue::{job_queue, JobSender};
use crate::sink::{run_sink, ResultLog};
use crate::types::StatusReply;
use crate::worker::{run_worker, Pipeline};

/// Counters reported after shutdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostSummary {
    pub jobs_received: u64,
    pub results_delivered: usize,
}

/// Run the host until the inbound channel closes or `cancel` fires.
///
/// - Starts `workers` workers and the result sink before reading any frame.
/// - Reads frames, queueing jobs and answering status queries inline.
/// - On end of input (clean EOF, malformed frame, or cancellation) closes the
///   job queue, waits for every worker to drain it, then waits for the sink to
///   deliver every queued result.
pub async fn run_host<R, W>(
    pipeline: Arc<Pipeline>,
    workers: usize,
    log: ResultLog,
    mut input: R,
    output: W,
    cancel: CancellationToken,
) -> HostSummary
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let out = FrameWriter::new(output);
    let (jobs_tx, jobs_rx) = job_queue();
    let (results_tx, results_rx) = mpsc::unbounded_channel();

    let sink = tokio::spawn(run_sink(results_rx, log, out.clone()));

    let tracker = TaskTracker::new();
    for worker in 0..workers.max(1) {
        tracker.spawn(run_worker(
            worker,
            pipeline.clone(),
            jobs_rx.clone(),
            results_tx.clone(),
        ));
    }
    tracker.close();
    // Workers own the only remaining result senders and receivers.
    drop(results_tx);
    drop(jobs_rx);
    info!(workers = workers.max(1), "host started");

    let jobs_received = read_loop(&mut input, &jobs_tx, &out, &cancel).await;

    info!(queued = jobs_tx.depth(), "input closed, draining");
    jobs_tx.close();
    tracker.wait().await;

    let results_delivered = match sink.await {
        Ok(n) => n,
        Err(e) => {
            warn!(error = %e, "result sink task failed");
            0
        }
    };
    if let Err(e) = out.shutdown().await {
        debug!(error = %e, "failed to shut down output");
    }

    info!(results_delivered, "host stopped");
    HostSummary {
        jobs_received,
        results_delivered,
    }
}

/// Returns the number of jobs queued before the channel closed.
async fn read_loop<R, W>(
    input: &mut R,
    jobs: &JobSender,
    out: &FrameWriter<W>,
    cancel: &CancellationToken,
) -> u64
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send,
{
    let mut received = 0u64;
    loop {
        let frame = tokio::select! {
            frame = read_frame(input) => frame,
            _ = cancel.cancelled() => {
                info!("cancellation requested, closing input");
                break;
            }
        };
        let value = match frame {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!("input reached end of stream");
                break;
            }
            Err(e) => {
                warn!(error = %e, "unreadable frame, closing input");
                break;
            }
        };

        match Inbound::from_value(value) {
            Inbound::Scan { job, status } => {
                debug!(id = %job.id, url = %job.url, "job queued");
                if jobs.push(job) {
                    received += 1;
                }
                if status {
                    reply_status(jobs, out).await;
                }
            }
            Inbound::Status => reply_status(jobs, out).await,
            Inbound::Unrecognized(value) => debug!(%value, "ignoring unrecognized message"),
        }
    }
    received
}

async fn reply_status<W>(jobs: &JobSender, out: &FrameWriter<W>)
where
    W: AsyncWrite + Unpin + Send,
{
    let reply = StatusReply {
        status: jobs.depth(),
    };
    if let Err(e) = out.send(&reply).await {
        warn!(error = %e, "failed to send status reply");
    }
}
