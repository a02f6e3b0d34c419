/*!
 * Job records, options and outcomes.
 *
 * A `Job` is the supervisor's bookkeeping for one submission. Its state only
 * ever moves forward: once a job is Completed, Cancelled or Failed it stays
 * that way, whatever a late worker tries to record.
 */

use std::fmt;

use chrono::{DateTime, Local};
use tokio::sync::watch;
use uuid::Uuid;

use crate::errors::{ConversionError, SubmitError};
use crate::language_utils::LanguageHint;
use crate::segmentation::SegmentationPolicy;

use super::results::ResultToken;

/// Opaque job identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First 8 characters, for log lines
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Options a caller chooses per job
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOptions {
    /// Words per cue for the word-count policy; ignored when natural
    pub words_per_cue: usize,
    /// Carried for downstream consumers, never used in cue arithmetic
    pub frame_rate: f64,
    /// Keep the engine's utterance boundaries instead of counting words
    pub natural_segmentation: bool,
    /// Spoken language hint
    pub input_language: LanguageHint,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            words_per_cue: 8,
            frame_rate: 25.0,
            natural_segmentation: false,
            input_language: LanguageHint::Auto,
        }
    }
}

impl ConversionOptions {
    /// Check the options before any job is registered
    pub fn validate(&self) -> Result<(), SubmitError> {
        if !self.natural_segmentation && self.words_per_cue < 1 {
            return Err(SubmitError::InvalidInput(
                "words per cue must be at least 1".to_string(),
            ));
        }
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            return Err(SubmitError::InvalidInput(format!(
                "frame rate must be positive, got {}",
                self.frame_rate
            )));
        }
        if !self.input_language.is_supported() {
            return Err(SubmitError::InvalidInput(format!(
                "unsupported language hint: {}",
                self.input_language
            )));
        }
        Ok(())
    }

    pub fn policy(&self) -> SegmentationPolicy {
        SegmentationPolicy::from_options(self.words_per_cue, self.natural_segmentation)
    }
}

/// Pipeline stage a running job is in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    WaitingForPrevious,
    StoringUpload,
    Normalizing,
    Transcribing,
    Segmenting,
    Serializing,
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::WaitingForPrevious => "Waiting for previous job",
            Self::StoringUpload => "Storing upload",
            Self::Normalizing => "Normalizing audio",
            Self::Transcribing => "Transcribing",
            Self::Segmenting => "Segmenting",
            Self::Serializing => "Writing subtitles",
        };
        write!(f, "{}", label)
    }
}

/// Lifecycle state of a job
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Registered,
    Running,
    Completed,
    Cancelled { superseded_by: JobId },
    Failed(ConversionError),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled { .. } | Self::Failed(_))
    }

    /// Whether moving from `self` to `next` keeps the lifecycle monotonic
    pub fn can_transition_to(&self, next: &JobState) -> bool {
        match self {
            Self::Registered => !matches!(next, Self::Registered | Self::Completed),
            Self::Running => next.is_terminal(),
            _ => false,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Registered => "Registered",
            Self::Running => "Running",
            Self::Completed => "Completed",
            Self::Cancelled { .. } => "Cancelled",
            Self::Failed(_) => "Failed",
        }
    }
}

/// Supervisor record of one submission
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub source_filename: String,
    pub options: ConversionOptions,
    pub state: JobState,
    /// Current stage while not terminal
    pub stage: Option<JobStage>,
    /// Download token, set once Completed
    pub result: Option<ResultToken>,
    pub created_at: DateTime<Local>,
}

impl Job {
    pub fn new(id: JobId, source_filename: String, options: ConversionOptions) -> Self {
        Self {
            id,
            source_filename,
            options,
            state: JobState::Registered,
            stage: None,
            result: None,
            created_at: Local::now(),
        }
    }

    /// Apply `next` if the lifecycle allows it; returns whether it was applied
    pub fn transition(&mut self, next: JobState) -> bool {
        if !self.state.can_transition_to(&next) {
            return false;
        }
        if next.is_terminal() {
            self.stage = None;
        }
        self.state = next;
        true
    }

    pub fn superseded_by(&self) -> Option<JobId> {
        match self.state {
            JobState::Cancelled { superseded_by } => Some(superseded_by),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ConversionError> {
        match &self.state {
            JobState::Failed(error) => Some(error),
            _ => None,
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.id.short(), self.source_filename, self.state.label())?;
        if let Some(stage) = self.stage {
            write!(f, " - {}", stage)?;
        }
        if let Some(next) = self.superseded_by() {
            write!(f, " superseded by {}", next.short())?;
        }
        Ok(())
    }
}

/// Result of a Completed job
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedJob {
    pub job_id: JobId,
    pub source_filename: String,
    /// `<stem>.srt`
    pub output_filename: String,
    pub subtitles: String,
    pub cue_count: usize,
    /// One-time download token for the stored artifact
    pub token: ResultToken,
}

/// Terminal result delivered to the submitting caller
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed(CompletedJob),
    Cancelled {
        job_id: JobId,
        source_filename: String,
        superseded_by: JobId,
    },
    Failed {
        job_id: JobId,
        source_filename: String,
        error: ConversionError,
    },
}

impl JobOutcome {
    pub fn job_id(&self) -> JobId {
        match self {
            Self::Completed(done) => done.job_id,
            Self::Cancelled { job_id, .. } | Self::Failed { job_id, .. } => *job_id,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Whether resubmitting the same job may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Failed { error, .. } => error.is_retryable(),
            _ => false,
        }
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed(done) => write!(
                f,
                "Job {} completed: {} cues written for {}",
                done.job_id.short(),
                done.cue_count,
                done.source_filename
            ),
            Self::Cancelled {
                job_id,
                source_filename,
                superseded_by,
            } => write!(
                f,
                "Job {} for {} was cancelled by a newer submission ({})",
                job_id.short(),
                source_filename,
                superseded_by.short()
            ),
            Self::Failed {
                job_id,
                source_filename,
                error,
            } => write!(f, "Job {} for {} failed: {}", job_id.short(), source_filename, error),
        }
    }
}

/// Caller's handle on a submitted job
#[derive(Debug, Clone)]
pub struct JobHandle {
    id: JobId,
    source_filename: String,
    outcome: watch::Receiver<Option<JobOutcome>>,
}

impl JobHandle {
    pub(crate) fn new(id: JobId, source_filename: String, outcome: watch::Receiver<Option<JobOutcome>>) -> Self {
        Self {
            id,
            source_filename,
            outcome,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn source_filename(&self) -> &str {
        &self.source_filename
    }

    /// The outcome if the job already finished
    pub fn try_outcome(&self) -> Option<JobOutcome> {
        self.outcome.borrow().clone()
    }

    /// Wait until this job reaches a terminal state
    pub async fn wait(&self) -> JobOutcome {
        let mut receiver = self.outcome.clone();
        let outcome = match receiver.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        };
        // The worker always publishes before dropping the sender
        outcome.unwrap_or_else(|| JobOutcome::Failed {
            job_id: self.id,
            source_filename: self.source_filename.clone(),
            error: ConversionError::Internal("job worker exited without an outcome".to_string()),
        })
    }
}
