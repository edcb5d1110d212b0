//! Job queue with cooperative cancellation.
//!
//! Jobs are dispatched to a fixed pool of worker threads over a channel.
//! Every job has a record in a shared table guarded by a mutex; a condvar
//! wakes anyone waiting for a job to finish. Capacity counts live `Queued`
//! records, so a job cancelled while queued frees its slot at once.
//! Finished records are kept up to a retention limit, oldest dropped first.
//!
//! ```text
//! Queued ──► Running ──► Succeeded | Failed | Cancelled
//!    │
//!    └─────► Cancelled            (worker skips it)
//! ```

use crate::error::{Result, ServerError};
use crossbeam_channel::{Receiver, Sender};
use harp_core::{
    CancellationToken, EndpointContract, Error, ErrorReport, JobContext, JobId, JobState,
    ProcessRequest,
};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Snapshot of one job as reported to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub job: JobId,
    pub state: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

/// Finished records kept by default before the oldest are dropped.
pub const DEFAULT_RETAINED_JOBS: usize = 1024;

struct JobRecord {
    state: JobState,
    request: Option<ProcessRequest>,
    token: CancellationToken,
    output: Option<PathBuf>,
    error: Option<ErrorReport>,
    /// Finish order, set when the job reaches a terminal state
    finished: Option<u64>,
}

impl JobRecord {
    fn finish(&mut self, state: JobState, seq: &AtomicU64) {
        self.state = state;
        self.request = None;
        self.finished = Some(seq.fetch_add(1, Ordering::Relaxed));
    }

    fn status(&self, job: JobId) -> JobStatus {
        JobStatus {
            job,
            state: self.state,
            output: self.output.clone(),
            error: self.error.clone(),
        }
    }
}

struct Shared {
    contract: EndpointContract,
    jobs: Mutex<HashMap<JobId, JobRecord>>,
    changed: Condvar,
    finish_seq: AtomicU64,
}

/// Runs process invocations for one endpoint contract.
pub struct JobQueue {
    shared: Arc<Shared>,
    sender: Option<Sender<JobId>>,
    capacity: usize,
    retained: usize,
    workers: Vec<JoinHandle<()>>,
}

impl JobQueue {
    /// Start `workers` threads accepting up to `capacity` pending jobs.
    pub fn start(contract: EndpointContract, workers: usize, capacity: usize) -> Result<Self> {
        if workers == 0 || capacity == 0 {
            return Err(ServerError::Config(
                "job queue needs at least one worker and one slot".into(),
            ));
        }

        let (sender, receiver) = crossbeam_channel::unbounded::<JobId>();
        let shared = Arc::new(Shared {
            contract,
            jobs: Mutex::new(HashMap::new()),
            changed: Condvar::new(),
            finish_seq: AtomicU64::new(0),
        });

        let mut handles = Vec::with_capacity(workers);
        for index in 0..workers {
            let shared = shared.clone();
            let receiver = receiver.clone();
            let handle = std::thread::Builder::new()
                .name(format!("harp-worker-{index}"))
                .spawn(move || worker_loop(&shared, receiver))?;
            handles.push(handle);
        }

        tracing::info!(
            "Job queue started for '{}' ({} workers, capacity {})",
            shared.contract.card().name,
            workers,
            capacity
        );

        Ok(Self {
            shared,
            sender: Some(sender),
            capacity,
            retained: DEFAULT_RETAINED_JOBS,
            workers: handles,
        })
    }

    /// Keep at most `limit` finished records; older ones are dropped on enqueue.
    pub fn retain_finished(mut self, limit: usize) -> Self {
        self.retained = limit;
        self
    }

    pub fn contract(&self) -> &EndpointContract {
        &self.shared.contract
    }

    /// Queue a process invocation. Values are checked before the job is accepted.
    pub fn enqueue(&self, request: ProcessRequest) -> Result<JobId> {
        let sender = self.sender.as_ref().ok_or(ServerError::ShuttingDown)?;
        self.shared.contract.check_values(&request.values)?;

        let mut jobs = self.shared.jobs.lock();
        let pruned = prune_oldest(&mut jobs, self.retained);
        if pruned > 0 {
            tracing::debug!("Dropped {} finished job records", pruned);
        }

        let queued = jobs
            .values()
            .filter(|r| r.state == JobState::Queued)
            .count();
        if queued >= self.capacity {
            tracing::warn!("Rejected job: queue full");
            return Err(ServerError::QueueFull {
                capacity: self.capacity,
            });
        }

        let id = JobId::new();
        jobs.insert(
            id,
            JobRecord {
                state: JobState::Queued,
                request: Some(request),
                token: CancellationToken::new(),
                output: None,
                error: None,
                finished: None,
            },
        );

        if sender.send(id).is_err() {
            jobs.remove(&id);
            return Err(ServerError::ShuttingDown);
        }
        tracing::debug!("{} queued", id);
        Ok(id)
    }

    /// Request cancellation.
    ///
    /// A queued job is cancelled immediately and never runs. A running job
    /// has its token tripped; it ends `Cancelled` once the function returns.
    /// Returns `false` for jobs that already finished.
    pub fn cancel(&self, id: JobId) -> Result<bool> {
        let mut jobs = self.shared.jobs.lock();
        let record = jobs.get_mut(&id).ok_or(ServerError::UnknownJob(id))?;
        record.token.cancel();

        let accepted = match record.state {
            JobState::Queued => {
                record.finish(JobState::Cancelled, &self.shared.finish_seq);
                self.shared.changed.notify_all();
                tracing::info!("{} cancelled while queued", id);
                true
            }
            JobState::Running => {
                tracing::info!("{} cancellation requested while running", id);
                true
            }
            _ => false,
        };
        Ok(accepted)
    }

    pub fn status(&self, id: JobId) -> Result<JobStatus> {
        let jobs = self.shared.jobs.lock();
        jobs.get(&id)
            .map(|r| r.status(id))
            .ok_or(ServerError::UnknownJob(id))
    }

    /// Block until the job reaches a terminal state or `timeout` elapses.
    ///
    /// On timeout the current (non-terminal) status is returned. A timeout
    /// too large to represent waits without a deadline.
    pub fn wait(&self, id: JobId, timeout: Duration) -> Result<JobStatus> {
        let deadline = Instant::now().checked_add(timeout);
        let mut jobs = self.shared.jobs.lock();
        loop {
            let status = jobs
                .get(&id)
                .map(|r| r.status(id))
                .ok_or(ServerError::UnknownJob(id))?;
            if status.state.is_terminal() {
                return Ok(status);
            }
            match deadline {
                Some(deadline) => {
                    if self.shared.changed.wait_until(&mut jobs, deadline).timed_out() {
                        return jobs
                            .get(&id)
                            .map(|r| r.status(id))
                            .ok_or(ServerError::UnknownJob(id));
                    }
                }
                None => self.shared.changed.wait(&mut jobs),
            }
        }
    }

    /// Drop records of finished jobs. Returns how many were removed.
    pub fn prune_finished(&self) -> usize {
        let mut jobs = self.shared.jobs.lock();
        let before = jobs.len();
        jobs.retain(|_, r| !r.state.is_terminal());
        before - jobs.len()
    }

    /// Cancel every job that has not started yet. Returns how many were cancelled.
    pub fn cancel_pending(&self) -> usize {
        let mut jobs = self.shared.jobs.lock();
        let mut cancelled = 0;
        for record in jobs.values_mut() {
            if record.state == JobState::Queued {
                record.token.cancel();
                record.finish(JobState::Cancelled, &self.shared.finish_seq);
                cancelled += 1;
            }
        }
        self.shared.changed.notify_all();
        cancelled
    }

    /// Stop accepting jobs and cancel everything still queued.
    ///
    /// Returns the worker handles. Running jobs are allowed to finish; the
    /// workers exit once they do. Pass the handles to [`join_workers`].
    pub fn close(&mut self) -> Vec<JoinHandle<()>> {
        let Some(sender) = self.sender.take() else {
            return Vec::new();
        };

        let cancelled = self.cancel_pending();
        if cancelled > 0 {
            tracing::info!("Cancelled {} pending jobs on shutdown", cancelled);
        }

        drop(sender);
        std::mem::take(&mut self.workers)
    }

    /// [`close`](Self::close), then wait for the workers to exit.
    pub fn shutdown(&mut self) {
        let workers = self.close();
        if !workers.is_empty() {
            join_workers(workers);
        }
    }
}

/// Block until every worker thread has exited.
pub fn join_workers(workers: Vec<JoinHandle<()>>) {
    for handle in workers {
        let _ = handle.join();
    }
    tracing::info!("Job queue stopped");
}

// Drops the oldest finished records beyond `keep`. Returns how many went.
fn prune_oldest(jobs: &mut HashMap<JobId, JobRecord>, keep: usize) -> usize {
    let mut finished: Vec<(u64, JobId)> = jobs
        .iter()
        .filter_map(|(id, r)| r.finished.map(|seq| (seq, *id)))
        .collect();
    if finished.len() <= keep {
        return 0;
    }

    finished.sort_unstable();
    let excess = finished.len() - keep;
    for (_, id) in &finished[..excess] {
        jobs.remove(id);
    }
    excess
}

impl Drop for JobQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(shared: &Shared, receiver: Receiver<JobId>) {
    for id in receiver.iter() {
        let (request, token) = {
            let mut jobs = shared.jobs.lock();
            let Some(record) = jobs.get_mut(&id) else {
                continue;
            };
            if record.state != JobState::Queued {
                continue;
            }
            let Some(request) = record.request.take() else {
                continue;
            };
            record.state = JobState::Running;
            shared.changed.notify_all();
            (request, record.token.clone())
        };

        let ctx = JobContext::new(id).with_token(token);
        let result = shared.contract.process(&ctx, request);

        let mut jobs = shared.jobs.lock();
        if let Some(record) = jobs.get_mut(&id) {
            // A cancel that lands after the function returned still wins.
            let result = match result {
                Ok(_) if record.token.is_cancelled() => Err(Error::Cancelled(id.as_u64())),
                other => other,
            };
            match result {
                Ok(path) => {
                    record.output = Some(path);
                    record.finish(JobState::Succeeded, &shared.finish_seq);
                }
                Err(Error::Cancelled(_)) => {
                    record.finish(JobState::Cancelled, &shared.finish_seq);
                }
                Err(e) => {
                    record.error = Some(e.report());
                    record.finish(JobState::Failed, &shared.finish_seq);
                }
            }
        }
        shared.changed.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harp_core::{build, ControlDescriptor, ModelCard};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const WAIT: Duration = Duration::from_secs(5);

    fn card() -> ModelCard {
        ModelCard::new("Test", "queue test endpoint", "tests")
    }

    fn audio_only() -> (Vec<ControlDescriptor>, ControlDescriptor) {
        (
            vec![ControlDescriptor::audio_input("Input")],
            ControlDescriptor::audio_output("Output"),
        )
    }

    /// Contract whose function blocks until the gate releases it.
    /// Reports each start on `started` and counts invocations.
    fn gated(calls: Arc<AtomicUsize>) -> (EndpointContract, Sender<()>, Receiver<()>) {
        let (gate_tx, gate_rx) = crossbeam_channel::unbounded::<()>();
        let (started_tx, started_rx) = crossbeam_channel::unbounded::<()>();
        let (inputs, output) = audio_only();
        let contract = build(
            inputs,
            output,
            move |audio: PathBuf| {
                calls.fetch_add(1, Ordering::SeqCst);
                let _ = started_tx.send(());
                let _ = gate_rx.recv();
                audio
            },
            card(),
        )
        .unwrap();
        (contract, gate_tx, started_rx)
    }

    #[test]
    fn test_job_succeeds() {
        let (inputs, output) = audio_only();
        let contract = build(inputs, output, |audio: PathBuf| audio.with_extension("out.wav"), card())
            .unwrap();
        let queue = JobQueue::start(contract, 2, 4).unwrap();

        let id = queue.enqueue(ProcessRequest::new("/tmp/a.wav")).unwrap();
        let status = queue.wait(id, WAIT).unwrap();
        assert_eq!(status.state, JobState::Succeeded);
        assert_eq!(status.output, Some(PathBuf::from("/tmp/a.out.wav")));
        assert!(status.error.is_none());
    }

    #[test]
    fn test_queued_cancel_never_invokes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (contract, gate, started) = gated(calls.clone());
        let queue = JobQueue::start(contract, 1, 4).unwrap();

        let first = queue.enqueue(ProcessRequest::new("/tmp/first.wav")).unwrap();
        started.recv_timeout(WAIT).unwrap();
        let second = queue.enqueue(ProcessRequest::new("/tmp/second.wav")).unwrap();

        assert!(queue.cancel(second).unwrap());
        assert_eq!(queue.status(second).unwrap().state, JobState::Cancelled);

        gate.send(()).unwrap();
        assert_eq!(queue.wait(first, WAIT).unwrap().state, JobState::Succeeded);
        assert_eq!(queue.wait(second, WAIT).unwrap().state, JobState::Cancelled);

        // Let the worker drain the skipped id before checking the count.
        let third = queue.enqueue(ProcessRequest::new("/tmp/third.wav")).unwrap();
        started.recv_timeout(WAIT).unwrap();
        gate.send(()).unwrap();
        assert_eq!(queue.wait(third, WAIT).unwrap().state, JobState::Succeeded);

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_running_cancel_discards_result() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (contract, gate, started) = gated(calls);
        let queue = JobQueue::start(contract, 1, 4).unwrap();

        let id = queue.enqueue(ProcessRequest::new("/tmp/a.wav")).unwrap();
        started.recv_timeout(WAIT).unwrap();
        assert_eq!(queue.status(id).unwrap().state, JobState::Running);

        assert!(queue.cancel(id).unwrap());
        gate.send(()).unwrap();

        let status = queue.wait(id, WAIT).unwrap();
        assert_eq!(status.state, JobState::Cancelled);
        assert!(status.output.is_none());
    }

    #[test]
    fn test_cooperative_function_observes_cancel() {
        let (started_tx, started_rx) = crossbeam_channel::unbounded::<()>();
        let (inputs, output) = audio_only();
        let contract = build(
            inputs,
            output,
            move |ctx: JobContext, audio: PathBuf| -> harp_core::Result<PathBuf> {
                let _ = started_tx.send(());
                let give_up = Instant::now() + WAIT;
                while !ctx.is_cancelled() {
                    if Instant::now() > give_up {
                        return Ok(audio);
                    }
                    std::thread::sleep(Duration::from_millis(1));
                }
                Err(Error::Cancelled(ctx.job_id().as_u64()))
            },
            card(),
        )
        .unwrap();
        let queue = JobQueue::start(contract, 1, 4).unwrap();

        let id = queue.enqueue(ProcessRequest::new("/tmp/a.wav")).unwrap();
        started_rx.recv_timeout(WAIT).unwrap();
        queue.cancel(id).unwrap();

        let status = queue.wait(id, WAIT).unwrap();
        assert_eq!(status.state, JobState::Cancelled);
    }

    #[test]
    fn test_failure_is_isolated() {
        let (inputs, output) = audio_only();
        let contract = build(
            inputs,
            output,
            |audio: PathBuf| -> std::result::Result<PathBuf, String> {
                if audio.ends_with("bad.wav") {
                    Err("model exploded".into())
                } else {
                    Ok(audio)
                }
            },
            card(),
        )
        .unwrap();
        let queue = JobQueue::start(contract, 1, 4).unwrap();

        let bad = queue.enqueue(ProcessRequest::new("/tmp/bad.wav")).unwrap();
        let status = queue.wait(bad, WAIT).unwrap();
        assert_eq!(status.state, JobState::Failed);
        let report = status.error.unwrap();
        assert_eq!(report.kind, "processing_error");
        assert!(report.message.contains("model exploded"));

        let good = queue.enqueue(ProcessRequest::new("/tmp/good.wav")).unwrap();
        assert_eq!(queue.wait(good, WAIT).unwrap().state, JobState::Succeeded);
    }

    #[test]
    fn test_cancel_finished_and_unknown() {
        let (inputs, output) = audio_only();
        let contract = build(inputs, output, |audio: PathBuf| audio, card()).unwrap();
        let queue = JobQueue::start(contract, 1, 4).unwrap();

        let id = queue.enqueue(ProcessRequest::new("/tmp/a.wav")).unwrap();
        queue.wait(id, WAIT).unwrap();
        assert!(!queue.cancel(id).unwrap());
        assert_eq!(queue.status(id).unwrap().state, JobState::Succeeded);

        let missing = JobId::from_raw(u64::MAX);
        assert!(matches!(queue.cancel(missing), Err(ServerError::UnknownJob(_))));
        assert!(matches!(queue.status(missing), Err(ServerError::UnknownJob(_))));
    }

    #[test]
    fn test_enqueue_checks_values() {
        let contract = build(
            vec![
                ControlDescriptor::audio_input("Input"),
                ControlDescriptor::slider("Gain", -12.0, 12.0, 1.0, 0.0),
            ],
            ControlDescriptor::audio_output("Output"),
            |audio: PathBuf, _gain: f64| audio,
            card(),
        )
        .unwrap();
        let queue = JobQueue::start(contract, 1, 4).unwrap();

        let err = queue.enqueue(ProcessRequest::new("/tmp/a.wav")).unwrap_err();
        assert_eq!(err.kind(), "invalid_arguments");

        let err = queue
            .enqueue(ProcessRequest::new("/tmp/a.wav").value("loud"))
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_arguments");
    }

    #[test]
    fn test_queue_full() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (contract, gate, started) = gated(calls);
        let queue = JobQueue::start(contract, 1, 1).unwrap();

        let running = queue.enqueue(ProcessRequest::new("/tmp/1.wav")).unwrap();
        started.recv_timeout(WAIT).unwrap();
        let pending = queue.enqueue(ProcessRequest::new("/tmp/2.wav")).unwrap();

        let err = queue.enqueue(ProcessRequest::new("/tmp/3.wav")).unwrap_err();
        assert!(matches!(err, ServerError::QueueFull { capacity: 1 }));

        gate.send(()).unwrap();
        gate.send(()).unwrap();
        assert_eq!(queue.wait(running, WAIT).unwrap().state, JobState::Succeeded);
        assert_eq!(queue.wait(pending, WAIT).unwrap().state, JobState::Succeeded);
    }

    #[test]
    fn test_cancelled_jobs_free_their_slots() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (contract, gate, started) = gated(calls.clone());
        let queue = JobQueue::start(contract, 1, 2).unwrap();

        let running = queue.enqueue(ProcessRequest::new("/tmp/long.wav")).unwrap();
        started.recv_timeout(WAIT).unwrap();
        let a = queue.enqueue(ProcessRequest::new("/tmp/a.wav")).unwrap();
        let b = queue.enqueue(ProcessRequest::new("/tmp/b.wav")).unwrap();
        assert!(matches!(
            queue.enqueue(ProcessRequest::new("/tmp/c.wav")),
            Err(ServerError::QueueFull { capacity: 2 })
        ));

        assert!(queue.cancel(a).unwrap());
        assert!(queue.cancel(b).unwrap());
        let c = queue.enqueue(ProcessRequest::new("/tmp/c.wav")).unwrap();
        let d = queue.enqueue(ProcessRequest::new("/tmp/d.wav")).unwrap();

        for _ in 0..3 {
            gate.send(()).unwrap();
        }
        assert_eq!(queue.wait(running, WAIT).unwrap().state, JobState::Succeeded);
        assert_eq!(queue.wait(c, WAIT).unwrap().state, JobState::Succeeded);
        assert_eq!(queue.wait(d, WAIT).unwrap().state, JobState::Succeeded);
        assert_eq!(queue.status(a).unwrap().state, JobState::Cancelled);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_finished_records_are_bounded() {
        let (inputs, output) = audio_only();
        let contract = build(inputs, output, |audio: PathBuf| audio, card()).unwrap();
        let queue = JobQueue::start(contract, 1, 4).unwrap().retain_finished(2);

        let mut ids = Vec::new();
        for i in 0..4 {
            let id = queue
                .enqueue(ProcessRequest::new(format!("/tmp/{i}.wav")))
                .unwrap();
            assert_eq!(queue.wait(id, WAIT).unwrap().state, JobState::Succeeded);
            ids.push(id);
        }

        // The next enqueue drops everything but the two newest finished jobs.
        let latest = queue.enqueue(ProcessRequest::new("/tmp/latest.wav")).unwrap();
        assert!(matches!(queue.status(ids[0]), Err(ServerError::UnknownJob(_))));
        assert!(matches!(queue.status(ids[1]), Err(ServerError::UnknownJob(_))));
        assert!(queue.status(ids[2]).is_ok());
        assert!(queue.status(ids[3]).is_ok());
        assert_eq!(queue.wait(latest, WAIT).unwrap().state, JobState::Succeeded);
    }

    #[test]
    fn test_wait_without_deadline() {
        let (inputs, output) = audio_only();
        let contract = build(inputs, output, |audio: PathBuf| audio, card()).unwrap();
        let queue = JobQueue::start(contract, 1, 4).unwrap();

        let id = queue.enqueue(ProcessRequest::new("/tmp/a.wav")).unwrap();
        let status = queue.wait(id, Duration::MAX).unwrap();
        assert_eq!(status.state, JobState::Succeeded);
    }

    #[test]
    fn test_close_hands_back_workers() {
        let (inputs, output) = audio_only();
        let contract = build(inputs, output, |audio: PathBuf| audio, card()).unwrap();
        let mut queue = JobQueue::start(contract, 3, 4).unwrap();

        let workers = queue.close();
        assert_eq!(workers.len(), 3);
        join_workers(workers);
        assert!(queue.close().is_empty());
        assert!(matches!(
            queue.enqueue(ProcessRequest::new("/tmp/a.wav")),
            Err(ServerError::ShuttingDown)
        ));
    }

    #[test]
    fn test_shutdown_cancels_pending() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (contract, gate, started) = gated(calls.clone());
        let mut queue = JobQueue::start(contract, 1, 4).unwrap();

        let running = queue.enqueue(ProcessRequest::new("/tmp/1.wav")).unwrap();
        started.recv_timeout(WAIT).unwrap();
        let pending = queue.enqueue(ProcessRequest::new("/tmp/2.wav")).unwrap();

        assert_eq!(queue.cancel_pending(), 1);
        gate.send(()).unwrap();
        queue.shutdown();

        assert_eq!(queue.status(pending).unwrap().state, JobState::Cancelled);
        assert!(queue.status(running).unwrap().state.is_terminal());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            queue.enqueue(ProcessRequest::new("/tmp/3.wav")),
            Err(ServerError::ShuttingDown)
        ));
    }

    #[test]
    fn test_prune_finished() {
        let (inputs, output) = audio_only();
        let contract = build(inputs, output, |audio: PathBuf| audio, card()).unwrap();
        let queue = JobQueue::start(contract, 1, 4).unwrap();

        let id = queue.enqueue(ProcessRequest::new("/tmp/a.wav")).unwrap();
        queue.wait(id, WAIT).unwrap();
        assert_eq!(queue.prune_finished(), 1);
        assert!(queue.status(id).is_err());
    }

    #[test]
    fn test_status_serializes_without_empty_fields() {
        let status = JobStatus {
            job: JobId::from_raw(3),
            state: JobState::Queued,
            output: None,
            error: None,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json, serde_json::json!({"job": 3, "state": "queued"}));
    }
}
