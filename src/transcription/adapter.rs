use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
use tokio_util::sync::CancellationToken;

use crate::errors::ConversionError;
use crate::language_utils::LanguageHint;
use crate::process::checkpoint;
use crate::scratch::ScratchSpace;

use super::SpeechEngine;
use super::model::Transcript;

/// Picks an engine for each job and normalizes its output
///
/// The primary engine runs first. If it is unavailable or fails, the
/// fallback runs once. Cancellation is checked before and after the engine
/// call, and never triggers the fallback.
#[derive(Clone)]
pub struct TranscriptionAdapter {
    primary: Arc<dyn SpeechEngine>,
    fallback: Option<Arc<dyn SpeechEngine>>,
}

impl TranscriptionAdapter {
    pub fn new(primary: Arc<dyn SpeechEngine>, fallback: Option<Arc<dyn SpeechEngine>>) -> Self {
        Self { primary, fallback }
    }

    pub async fn transcribe(
        &self,
        wav: &Path,
        language: &LanguageHint,
        scratch: &ScratchSpace,
        token: &CancellationToken,
    ) -> Result<Transcript, ConversionError> {
        checkpoint(token, "before transcription")?;

        let segments = match self.primary.transcribe(wav, language, scratch, token).await {
            Ok(segments) => segments,
            Err(primary_error) => self.run_fallback(primary_error, wav, language, scratch, token).await?,
        };

        checkpoint(token, "after transcription")?;

        let transcript = Transcript::from_segments(segments);
        info!(
            "Transcribed {} words in {} utterances",
            transcript.words.len(),
            transcript.utterances.len()
        );
        Ok(transcript)
    }

    async fn run_fallback(
        &self,
        primary_error: ConversionError,
        wav: &Path,
        language: &LanguageHint,
        scratch: &ScratchSpace,
        token: &CancellationToken,
    ) -> Result<Vec<super::RawSegment>, ConversionError> {
        let fallback = match (&self.fallback, &primary_error) {
            (
                Some(fallback),
                ConversionError::ExternalToolUnavailable { .. } | ConversionError::ExternalToolFailed { .. },
            ) => fallback,
            _ => return Err(primary_error),
        };

        warn!(
            "{} failed ({}), falling back to {}",
            self.primary.name(),
            primary_error,
            fallback.name()
        );
        checkpoint(token, "before fallback transcription")?;

        match fallback.transcribe(wav, language, scratch, token).await {
            Ok(segments) => Ok(segments),
            // An absent fallback tells the caller nothing new
            Err(ConversionError::ExternalToolUnavailable { .. }) => Err(primary_error),
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for TranscriptionAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptionAdapter")
            .field("primary", &self.primary.name())
            .field("fallback", &self.fallback.as_ref().map(|e| e.name().to_string()))
            .finish()
    }
}
