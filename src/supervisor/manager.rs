/*!
 * The job supervisor.
 *
 * Holds the single "current job" slot. Submitting swaps the new job into the
 * slot, cancels whatever was there and marks it Cancelled, all under one
 * lock, so two racing submissions can never both believe they own the
 * engine. Each job runs on its own tokio task; a worker only turns Running
 * once its predecessor's worker has finished its cleanup, so at most one
 * pipeline is ever past that point.
 */

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::FutureExt;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::errors::{ConversionError, ResultError, SubmitError};
use crate::file_utils::FileManager;

use super::gate::{AccessGate, CallerIdentity, notify_usage};
use super::job::{CompletedJob, ConversionOptions, Job, JobHandle, JobId, JobOutcome, JobStage, JobState};
use super::pipeline::{Pipeline, PipelineOutput};
use super::results::{ResultStore, ResultToken, RetrievedResult};

/// Terminal jobs kept for status queries
const JOB_HISTORY_LIMIT: usize = 256;

/// One submission
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub audio: Bytes,
    pub filename: String,
    pub options: ConversionOptions,
    pub caller: CallerIdentity,
}

impl SubmitRequest {
    pub fn new(audio: impl Into<Bytes>, filename: impl Into<String>, options: ConversionOptions) -> Self {
        Self {
            audio: audio.into(),
            filename: filename.into(),
            options,
            caller: CallerIdentity::local(),
        }
    }

    pub fn with_caller(mut self, caller: CallerIdentity) -> Self {
        self.caller = caller;
        self
    }
}

struct CurrentJob {
    id: JobId,
    token: CancellationToken,
    finished: watch::Receiver<bool>,
}

struct Inner {
    pipeline: Pipeline,
    gate: Arc<dyn AccessGate>,
    results: ResultStore,
    // Lock order: `current` before `jobs`
    current: Mutex<Option<CurrentJob>>,
    jobs: Mutex<HashMap<JobId, Job>>,
}

/// Signals the successor once the worker is gone, however it exits
struct FinishedGuard(watch::Sender<bool>);

impl Drop for FinishedGuard {
    fn drop(&mut self) {
        self.0.send_replace(true);
    }
}

/// Single-flight conversion job supervisor
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<Inner>,
}

impl Supervisor {
    pub fn new(pipeline: Pipeline, gate: Arc<dyn AccessGate>, result_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                pipeline,
                gate,
                results: ResultStore::new(result_ttl),
                current: Mutex::new(None),
                jobs: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Register a job, cancelling any job in flight, and start it
    ///
    /// Returns as soon as the job is registered; the pipeline runs on its own
    /// task. Rejected submissions never register a job or cancel another.
    pub async fn submit(&self, request: SubmitRequest) -> Result<JobHandle, SubmitError> {
        request.options.validate()?;
        if !FileManager::is_supported_audio(&request.filename) {
            return Err(SubmitError::InvalidInput(format!(
                "unsupported file type: {}",
                request.filename
            )));
        }
        if request.audio.is_empty() {
            return Err(SubmitError::InvalidInput("empty upload".to_string()));
        }

        match self.inner.gate.authorize(&request.caller).await {
            Ok(true) => {}
            Ok(false) => {
                return Err(SubmitError::AccessDenied(format!(
                    "{} may not start a job",
                    request.caller
                )));
            }
            Err(e) => {
                warn!("Access gate failed for {}: {}", request.caller, e);
                return Err(SubmitError::AccessDenied(e.to_string()));
            }
        }

        let id = JobId::new();
        let token = CancellationToken::new();
        let (finished_tx, finished_rx) = watch::channel(false);
        let (outcome_tx, outcome_rx) = watch::channel(None);

        let predecessor = {
            let mut current = self.inner.current.lock();
            let mut jobs = self.inner.jobs.lock();

            let prior = current.replace(CurrentJob {
                id,
                token: token.clone(),
                finished: finished_rx,
            });
            if let Some(prior) = &prior {
                prior.token.cancel();
                if let Some(job) = jobs.get_mut(&prior.id) {
                    if job.transition(JobState::Cancelled { superseded_by: id }) {
                        info!("Job {} cancelled, superseded by {}", prior.id.short(), id.short());
                    }
                }
            }

            prune_history(&mut jobs);
            jobs.insert(id, Job::new(id, request.filename.clone(), request.options.clone()));
            prior.map(|p| p.finished)
        };

        info!("Job {} registered for {}", id.short(), request.filename);
        let handle = JobHandle::new(id, request.filename.clone(), outcome_rx);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let _finished = FinishedGuard(finished_tx);
            let outcome = Arc::clone(&inner).run_job(id, request, token, predecessor).await;
            inner.release_slot(id);
            info!("{}", outcome);
            outcome_tx.send_replace(Some(outcome));
        });

        Ok(handle)
    }

    /// Wait for the job behind `handle` to finish
    pub async fn await_job(&self, handle: &JobHandle) -> JobOutcome {
        handle.wait().await
    }

    /// One-time fetch of a completed job's `.srt`
    pub async fn retrieve(&self, token: &ResultToken) -> Result<RetrievedResult, ResultError> {
        self.inner.results.retrieve(token).await
    }

    /// Snapshot of a job record
    pub fn status(&self, id: &JobId) -> Option<Job> {
        self.inner.jobs.lock().get(id).cloned()
    }

    /// Id of the most recently submitted job, while it is in flight
    pub fn current_job(&self) -> Option<JobId> {
        self.inner.current.lock().as_ref().map(|c| c.id)
    }

    /// Number of jobs currently in the Running state
    pub fn running_jobs(&self) -> usize {
        self.inner
            .jobs
            .lock()
            .values()
            .filter(|job| job.state == JobState::Running)
            .count()
    }

    pub fn results(&self) -> &ResultStore {
        &self.inner.results
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("current_job", &self.current_job())
            .field("pipeline", &self.inner.pipeline)
            .field("results", &self.inner.results)
            .finish()
    }
}

impl Inner {
    async fn run_job(
        self: Arc<Self>,
        id: JobId,
        request: SubmitRequest,
        token: CancellationToken,
        predecessor: Option<watch::Receiver<bool>>,
    ) -> JobOutcome {
        if let Some(mut finished) = predecessor {
            self.set_stage(id, JobStage::WaitingForPrevious);
            // A dropped sender means the predecessor is gone as well
            let _ = finished.wait_for(|done| *done).await;
            debug!("Job {}: predecessor finished", id.short());
        }

        let started = !token.is_cancelled() && {
            let mut jobs = self.jobs.lock();
            jobs.get_mut(&id)
                .map(|job| job.transition(JobState::Running))
                .unwrap_or(false)
        };
        if !started {
            debug!("Job {} cancelled before it started", id.short());
            return self.terminal_outcome(id, &request.filename);
        }
        info!("Job {} running", id.short());

        let stage_inner = Arc::clone(&self);
        let on_stage = move |stage: JobStage| stage_inner.set_stage(id, stage);

        let run = self.pipeline.run(
            id,
            request.audio.clone(),
            &request.filename,
            &request.options,
            &token,
            &on_stage,
        );
        let result = match AssertUnwindSafe(run).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Job {} panicked: {}", id.short(), message);
                Err(ConversionError::Internal(format!("pipeline panicked: {}", message)))
            }
        };

        self.finish(id, &request, result)
    }

    /// Record the pipeline result, unless a supersession got there first
    fn finish(
        &self,
        id: JobId,
        request: &SubmitRequest,
        result: Result<PipelineOutput, ConversionError>,
    ) -> JobOutcome {
        // File deletions stay outside the jobs lock
        self.results.purge_expired();
        let mut jobs = self.jobs.lock();
        let Some(job) = jobs.get_mut(&id) else {
            return JobOutcome::Failed {
                job_id: id,
                source_filename: request.filename.clone(),
                error: ConversionError::Internal("job record missing".to_string()),
            };
        };

        match result {
            Ok(output) => {
                if !job.transition(JobState::Completed) {
                    // Superseded after the last checkpoint; the output is dropped
                    return outcome_from_record(job);
                }
                let output_filename = FileManager::output_filename(&request.filename);
                let token = self.results.insert(output.artifact, output_filename.clone());
                job.result = Some(token);
                notify_usage(Arc::clone(&self.gate), request.caller.clone(), id.short());

                JobOutcome::Completed(CompletedJob {
                    job_id: id,
                    source_filename: request.filename.clone(),
                    output_filename,
                    subtitles: output.subtitles,
                    cue_count: output.cue_count,
                    token,
                })
            }
            Err(ConversionError::Cancelled(stage)) => {
                debug!("Job {} stopped at checkpoint: {}", id.short(), stage);
                outcome_from_record(job)
            }
            Err(error) => {
                warn!("Job {} failed ({}): {}", id.short(), error.kind(), error);
                job.transition(JobState::Failed(error));
                outcome_from_record(job)
            }
        }
    }

    fn terminal_outcome(&self, id: JobId, filename: &str) -> JobOutcome {
        match self.jobs.lock().get(&id) {
            Some(job) => outcome_from_record(job),
            None => JobOutcome::Failed {
                job_id: id,
                source_filename: filename.to_string(),
                error: ConversionError::Internal("job record missing".to_string()),
            },
        }
    }

    fn set_stage(&self, id: JobId, stage: JobStage) {
        if let Some(job) = self.jobs.lock().get_mut(&id) {
            if !job.state.is_terminal() {
                job.stage = Some(stage);
            }
        }
    }

    /// Empty the slot if it still holds `id`
    fn release_slot(&self, id: JobId) {
        let mut current = self.current.lock();
        if current.as_ref().map(|c| c.id) == Some(id) {
            *current = None;
        }
    }
}

/// Outcome for a job whose record is already terminal
fn outcome_from_record(job: &Job) -> JobOutcome {
    match &job.state {
        JobState::Cancelled { superseded_by } => JobOutcome::Cancelled {
            job_id: job.id,
            source_filename: job.source_filename.clone(),
            superseded_by: *superseded_by,
        },
        JobState::Failed(error) => JobOutcome::Failed {
            job_id: job.id,
            source_filename: job.source_filename.clone(),
            error: error.clone(),
        },
        other => JobOutcome::Failed {
            job_id: job.id,
            source_filename: job.source_filename.clone(),
            error: ConversionError::Internal(format!("unexpected job state {}", other.label())),
        },
    }
}

fn prune_history(jobs: &mut HashMap<JobId, Job>) {
    if jobs.len() < JOB_HISTORY_LIMIT {
        return;
    }
    let mut finished: Vec<(JobId, chrono::DateTime<chrono::Local>)> = jobs
        .values()
        .filter(|job| job.state.is_terminal())
        .map(|job| (job.id, job.created_at))
        .collect();
    finished.sort_by_key(|(_, created)| *created);
    let excess = jobs.len() + 1 - JOB_HISTORY_LIMIT;
    for (id, _) in finished.into_iter().take(excess) {
        jobs.remove(&id);
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
