//! In-process speech engine.
//!
//! The fallback path runs the model inside this process. Loading a model is
//! expensive, so the model lives in a process-wide `ModelHandle` that loads it
//! on first use, exactly once, even when several callers race on that first
//! use. Inference is blocking and runs on the blocking thread pool.
//!
//! # Feature Gate
//!
//! The whisper.cpp-backed model requires the `whisper` feature (and cmake).
//! Without it, `WhisperModelLoader` reports the engine as unavailable.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::errors::ConversionError;
use crate::language_utils::LanguageHint;
use crate::process::checkpoint;
use crate::scratch::ScratchSpace;

use super::SpeechEngine;
use super::model::RawSegment;

/// Tool name reported in errors from the in-process engine
pub const NATIVE_ENGINE_NAME: &str = "whisper-native";

/// A loaded speech model
pub trait SpeechModel: Send + Sync {
    fn name(&self) -> &str;

    /// Blocking transcription of a 16 kHz mono PCM wav file
    fn transcribe(&self, wav: &Path, language: Option<&str>) -> Result<Vec<RawSegment>, ConversionError>;
}

/// Knows how to load a `SpeechModel`; called at most once per handle
pub trait ModelLoader: Send + Sync {
    fn load(&self) -> Result<Arc<dyn SpeechModel>, ConversionError>;
}

/// Lazily loaded, never reloaded model shared by all jobs
pub struct ModelHandle {
    loader: Arc<dyn ModelLoader>,
    model: OnceCell<Arc<dyn SpeechModel>>,
}

impl ModelHandle {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            model: OnceCell::new(),
        }
    }

    /// The loaded model, loading it on first call
    ///
    /// Concurrent first calls wait on a single load. A failed load leaves
    /// the handle empty so a later job can try again.
    pub async fn get(&self) -> Result<Arc<dyn SpeechModel>, ConversionError> {
        let model = self
            .model
            .get_or_try_init(|| async {
                let loader = Arc::clone(&self.loader);
                info!("Loading in-process speech model");
                tokio::task::spawn_blocking(move || loader.load())
                    .await
                    .map_err(|e| ConversionError::Internal(format!("Model loading task failed: {}", e)))?
            })
            .await?;
        Ok(Arc::clone(model))
    }

    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// Fallback engine running a shared in-process model
#[derive(Debug, Clone)]
pub struct NativeEngine {
    handle: Arc<ModelHandle>,
}

impl NativeEngine {
    pub fn new(handle: Arc<ModelHandle>) -> Self {
        Self { handle }
    }
}

#[async_trait]
impl SpeechEngine for NativeEngine {
    fn name(&self) -> &str {
        NATIVE_ENGINE_NAME
    }

    async fn transcribe(
        &self,
        wav: &Path,
        language: &LanguageHint,
        _scratch: &ScratchSpace,
        token: &CancellationToken,
    ) -> Result<Vec<RawSegment>, ConversionError> {
        let model = self.handle.get().await?;
        checkpoint(token, "before in-process transcription")?;

        // Inference cannot be interrupted; it runs to completion and the
        // caller checks the token again once it returns.
        let wav = wav.to_path_buf();
        let language = language.as_code().map(str::to_string);
        debug!("Running in-process model {}", model.name());
        tokio::task::spawn_blocking(move || model.transcribe(&wav, language.as_deref()))
            .await
            .map_err(|e| ConversionError::Internal(format!("Transcription task failed: {}", e)))?
    }
}

/// Loads a whisper.cpp model from disk
#[derive(Debug, Clone)]
pub struct WhisperModelLoader {
    model_path: PathBuf,
}

impl WhisperModelLoader {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
        }
    }
}

#[cfg(not(feature = "whisper"))]
impl ModelLoader for WhisperModelLoader {
    fn load(&self) -> Result<Arc<dyn SpeechModel>, ConversionError> {
        debug!(
            "In-process engine requested for {:?}, but the whisper feature is disabled",
            self.model_path
        );
        Err(ConversionError::tool_unavailable(NATIVE_ENGINE_NAME))
    }
}

#[cfg(feature = "whisper")]
impl ModelLoader for WhisperModelLoader {
    fn load(&self) -> Result<Arc<dyn SpeechModel>, ConversionError> {
        whisper_backend::WhisperRsModel::load(&self.model_path).map(|m| Arc::new(m) as Arc<dyn SpeechModel>)
    }
}

#[cfg(feature = "whisper")]
mod whisper_backend {
    use std::path::Path;
    use std::sync::{Mutex, Once};

    use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, install_logging_hooks};

    use super::{NATIVE_ENGINE_NAME, SpeechModel};
    use crate::errors::ConversionError;
    use crate::transcription::model::RawSegment;

    static LOGGING_HOOKS_INSTALLED: Once = Once::new();

    fn failed(message: String) -> ConversionError {
        ConversionError::tool_failed(NATIVE_ENGINE_NAME, message)
    }

    pub(super) struct WhisperRsModel {
        context: Mutex<WhisperContext>,
        name: String,
    }

    impl WhisperRsModel {
        pub(super) fn load(model_path: &Path) -> Result<Self, ConversionError> {
            LOGGING_HOOKS_INSTALLED.call_once(install_logging_hooks);

            if !model_path.exists() {
                return Err(ConversionError::tool_unavailable(NATIVE_ENGINE_NAME));
            }
            let path = model_path
                .to_str()
                .ok_or_else(|| failed("Invalid UTF-8 in model path".to_string()))?;
            let context = WhisperContext::new_with_params(path, WhisperContextParameters::default())
                .map_err(|e| failed(format!("Failed to load model: {}", e)))?;
            let name = model_path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("unknown")
                .to_string();
            Ok(Self {
                context: Mutex::new(context),
                name,
            })
        }

        fn read_samples(wav: &Path) -> Result<Vec<f32>, ConversionError> {
            let reader = hound::WavReader::open(wav).map_err(|e| failed(format!("Failed to read wav: {}", e)))?;
            reader
                .into_samples::<i16>()
                .map(|s| s.map(|v| v as f32 / 32768.0))
                .collect::<Result<Vec<f32>, _>>()
                .map_err(|e| failed(format!("Failed to decode wav: {}", e)))
        }
    }

    impl SpeechModel for WhisperRsModel {
        fn name(&self) -> &str {
            &self.name
        }

        fn transcribe(&self, wav: &Path, language: Option<&str>) -> Result<Vec<RawSegment>, ConversionError> {
            let samples = Self::read_samples(wav)?;
            let context = self
                .context
                .lock()
                .map_err(|e| ConversionError::Internal(format!("Model lock poisoned: {}", e)))?;
            let mut state = context
                .create_state()
                .map_err(|e| failed(format!("Failed to create state: {}", e)))?;

            let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
            params.set_language(language);
            params.set_print_special(false);
            params.set_print_progress(false);
            params.set_print_realtime(false);
            params.set_print_timestamps(false);

            state
                .full(params, &samples)
                .map_err(|e| failed(format!("Inference failed: {}", e)))?;

            // Segment timestamps are reported in centiseconds
            Ok(state
                .as_iter()
                .map(|segment| {
                    RawSegment::new(
                        segment.to_string(),
                        segment.start_timestamp() as f64 / 100.0,
                        segment.end_timestamp() as f64 / 100.0,
                    )
                })
                .collect())
        }
    }
}
