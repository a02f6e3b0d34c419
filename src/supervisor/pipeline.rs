/*!
 * Stage driver for one conversion job.
 *
 * upload -> normalize -> transcribe -> segment (+ repair) -> serialize.
 *
 * Every scratch artifact is owned by a local binding, so whichever way the
 * run ends (success, failure, cancellation at a checkpoint, panic) the
 * artifacts created so far are dropped and deleted exactly once. Only the
 * final `.srt` escapes, inside `PipelineOutput`.
 */

use std::sync::Arc;

use bytes::Bytes;
use log::{debug, info};
use tokio_util::sync::CancellationToken;

use crate::audio::AudioNormalizer;
use crate::errors::ConversionError;
use crate::file_utils::FileManager;
use crate::process::checkpoint;
use crate::scratch::{ArtifactKind, ScratchArtifact, ScratchSpace};
use crate::segmentation::segment;
use crate::subtitle_processor::serialize_cues;
use crate::transcription::TranscriptionAdapter;

use super::job::{ConversionOptions, JobId, JobStage};

/// Successful pipeline run
#[derive(Debug)]
pub struct PipelineOutput {
    /// The serialized subtitles, written to a scratch `.srt`
    pub artifact: ScratchArtifact,
    pub subtitles: String,
    pub cue_count: usize,
}

/// Everything a job needs besides its own input
#[derive(Clone)]
pub struct Pipeline {
    normalizer: Arc<dyn AudioNormalizer>,
    adapter: TranscriptionAdapter,
    scratch: ScratchSpace,
}

impl Pipeline {
    pub fn new(normalizer: Arc<dyn AudioNormalizer>, adapter: TranscriptionAdapter, scratch: ScratchSpace) -> Self {
        Self {
            normalizer,
            adapter,
            scratch,
        }
    }

    pub fn scratch(&self) -> &ScratchSpace {
        &self.scratch
    }

    /// Run every stage for one job
    pub async fn run(
        &self,
        job_id: JobId,
        audio: Bytes,
        filename: &str,
        options: &ConversionOptions,
        token: &CancellationToken,
        on_stage: &(dyn Fn(JobStage) + Send + Sync),
    ) -> Result<PipelineOutput, ConversionError> {
        let job = job_id.short();
        let extension = FileManager::audio_extension(filename)
            .ok_or_else(|| ConversionError::InvalidInput(format!("unsupported file type: {}", filename)))?;

        on_stage(JobStage::StoringUpload);
        checkpoint(token, "before storing upload")?;
        let raw = self
            .scratch
            .write(ArtifactKind::RawAudio, &format!(".{}", extension), &audio)
            .await?;
        drop(audio);
        debug!("Job {}: stored {} upload at {:?}", job, filename, raw.path());

        on_stage(JobStage::Normalizing);
        let wav = self.scratch.create(ArtifactKind::NormalizedAudio)?;
        self.normalizer.normalize(raw.path(), wav.path(), token).await?;
        checkpoint(token, "after normalization")?;
        raw.cleanup();

        on_stage(JobStage::Transcribing);
        let transcript = self
            .adapter
            .transcribe(wav.path(), &options.input_language, &self.scratch, token)
            .await?;
        wav.cleanup();
        if transcript.is_empty() {
            return Err(ConversionError::NoSpeechDetected);
        }

        on_stage(JobStage::Segmenting);
        let cues = segment(&transcript, options.policy());
        if cues.is_empty() {
            return Err(ConversionError::NoSpeechDetected);
        }

        on_stage(JobStage::Serializing);
        checkpoint(token, "before serialization")?;
        let subtitles = serialize_cues(&cues);
        let artifact = self
            .scratch
            .write(ArtifactKind::SubtitleOutput, ".srt", subtitles.as_bytes())
            .await?;
        checkpoint(token, "after serialization")?;

        info!("Job {}: {} cues generated for {}", job, cues.len(), filename);
        Ok(PipelineOutput {
            artifact,
            subtitles,
            cue_count: cues.len(),
        })
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("adapter", &self.adapter)
            .field("scratch", &self.scratch)
            .finish()
    }
}
