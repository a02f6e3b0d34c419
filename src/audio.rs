/*!
 * Audio normalization collaborator.
 *
 * Transcription needs a mono, 16 kHz, 16-bit PCM waveform. The normalizer
 * turns an arbitrary container into that format; the production
 * implementation shells out to ffmpeg.
 */

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use tokio_util::sync::CancellationToken;

use crate::errors::ConversionError;
use crate::process::run_cancellable;

/// Converts an input container into the engine's waveform format
#[async_trait]
pub trait AudioNormalizer: Send + Sync {
    /// Write the normalized waveform for `input` to `output`
    ///
    /// `output` already exists (as an empty scratch file) and must be
    /// overwritten.
    async fn normalize(
        &self,
        input: &Path,
        output: &Path,
        token: &CancellationToken,
    ) -> Result<(), ConversionError>;
}

/// ffmpeg-backed normalizer
#[derive(Debug, Clone)]
pub struct FfmpegNormalizer {
    binary: String,
    timeout: Option<Duration>,
}

impl FfmpegNormalizer {
    pub fn new(binary: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    pub(crate) fn build_args(input: &Path, output: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-nostdin".to_string(),
            "-i".to_string(),
            input.display().to_string(),
            "-acodec".to_string(),
            "pcm_s16le".to_string(),
            "-ar".to_string(),
            "16000".to_string(),
            "-ac".to_string(),
            "1".to_string(),
            output.display().to_string(),
        ]
    }
}

impl Default for FfmpegNormalizer {
    fn default() -> Self {
        Self::new("ffmpeg", None)
    }
}

#[async_trait]
impl AudioNormalizer for FfmpegNormalizer {
    async fn normalize(
        &self,
        input: &Path,
        output: &Path,
        token: &CancellationToken,
    ) -> Result<(), ConversionError> {
        debug!("Normalizing {:?} -> {:?}", input, output);
        run_cancellable(&self.binary, Self::build_args(input, output), token, self.timeout).await?;

        let written = tokio::fs::metadata(output).await.map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            return Err(ConversionError::tool_failed(
                &self.binary,
                "conversion produced an empty waveform",
            ));
        }
        Ok(())
    }
}
