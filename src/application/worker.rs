use super::service::PayoutService;
use crate::domain::ports::{JobScheduler, ProcessingJob};
use crate::error::{PayoutError, Result};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info};

/// Scheduler half of the processing queue, handed to [`PayoutService`].
#[derive(Clone)]
pub struct TokioScheduler {
    sender: mpsc::UnboundedSender<ProcessingJob>,
}

/// Receiving half of the processing queue, consumed by [`ProcessingWorker`].
pub struct JobQueue {
    receiver: mpsc::UnboundedReceiver<ProcessingJob>,
}

/// Creates a connected scheduler/queue pair.
pub fn processing_queue() -> (TokioScheduler, JobQueue) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (TokioScheduler { sender }, JobQueue { receiver })
}

impl JobScheduler for TokioScheduler {
    fn schedule(&self, job: ProcessingJob) -> Result<()> {
        self.sender.send(job).map_err(|_| PayoutError::QueueClosed)
    }
}

/// Supervises auto-processing jobs.
///
/// Each job runs on its own task: it sleeps for the job's delay and then
/// calls [`PayoutService::auto_process`]. Failures are logged and never
/// retried.
pub struct ProcessingWorker;

impl ProcessingWorker {
    pub fn spawn(service: Arc<PayoutService>, queue: JobQueue) -> WorkerHandle {
        let (shutdown, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run(service, queue.receiver, shutdown_rx));
        WorkerHandle { shutdown, task }
    }
}

/// Handle to a running [`ProcessingWorker`].
pub struct WorkerHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Stops accepting jobs and waits until every queued or running job has
    /// finished, delays included.
    pub async fn drain(self) -> Result<()> {
        // The worker may already be gone if the queue closed on its own.
        let _ = self.shutdown.send(());
        self.task.await?;
        Ok(())
    }
}

async fn run(
    service: Arc<PayoutService>,
    mut receiver: mpsc::UnboundedReceiver<ProcessingJob>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut jobs = JoinSet::new();
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            job = receiver.recv() => match job {
                Some(job) => {
                    jobs.spawn(process(service.clone(), job));
                }
                None => break,
            },
            Some(joined) = jobs.join_next(), if !jobs.is_empty() => report(joined),
        }
    }

    receiver.close();
    while let Some(job) = receiver.recv().await {
        jobs.spawn(process(service.clone(), job));
    }
    while let Some(joined) = jobs.join_next().await {
        report(joined);
    }
    debug!("processing worker stopped");
}

async fn process(service: Arc<PayoutService>, job: ProcessingJob) {
    info!(payout_id = %job.payout_id, delay_ms = job.delay.as_millis() as u64, "starting simulated processing");
    tokio::time::sleep(job.delay).await;
    match service.auto_process(job.payout_id).await {
        Ok(Some(view)) => info!(
            payout_id = %job.payout_id,
            status = %view.status,
            "payout auto-processed"
        ),
        Ok(None) => {}
        Err(e) => error!(payout_id = %job.payout_id, error = %e, "failed to auto-process payout"),
    }
}

fn report(joined: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        error!(error = %e, "processing job panicked");
    }
}
