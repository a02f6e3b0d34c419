/*!
 * Transcription adapter and speech engines.
 *
 * - `model`: word, utterance and raw segment types plus normalization
 * - `cli`: the primary engine, an external whisper command line run
 * - `native`: the in-process fallback engine and its shared model handle
 * - `adapter`: primary/fallback selection and cancellation checkpoints
 */

use std::path::Path;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::errors::ConversionError;
use crate::language_utils::LanguageHint;
use crate::scratch::ScratchSpace;

pub mod adapter;
pub mod cli;
pub mod model;
pub mod native;

pub use self::adapter::TranscriptionAdapter;
pub use self::cli::WhisperCliEngine;
pub use self::model::{RawSegment, RawWord, TimedWord, Transcript, Utterance};
pub use self::native::{ModelHandle, ModelLoader, NativeEngine, SpeechModel};

/// A way of turning a normalized waveform into raw segments
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Short engine name for logs
    fn name(&self) -> &str;

    /// Transcribe `wav`; scratch files the engine needs go under `scratch`
    async fn transcribe(
        &self,
        wav: &Path,
        language: &LanguageHint,
        scratch: &ScratchSpace,
        token: &CancellationToken,
    ) -> Result<Vec<RawSegment>, ConversionError>;
}
