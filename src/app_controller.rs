use anyhow::{Context, Result, anyhow};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::audio::FfmpegNormalizer;
use crate::errors::AppError;
use crate::file_utils::{FileManager, FileType};
use crate::language_utils::get_language_name;
use crate::scratch::ScratchSpace;
use crate::supervisor::{AllowAll, JobHandle, JobOutcome, Pipeline, SubmitRequest, Supervisor};
use crate::transcription::native::WhisperModelLoader;
use crate::transcription::{ModelHandle, NativeEngine, SpeechEngine, TranscriptionAdapter, WhisperCliEngine};

// @module: Application controller for audio to subtitle conversion

/// Command line flag named in the skip warning
pub const FORCE_FLAG: &str = "--force";

/// What happened to one input file
#[derive(Debug, Clone, PartialEq)]
pub enum FileReport {
    Converted { output: PathBuf, cue_count: usize },
    Skipped { output: PathBuf },
}

/// Totals for a folder run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FolderSummary {
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Job supervisor shared by every conversion
    supervisor: Supervisor,
}

impl Controller {
    // @method: Create a controller with the production collaborators
    pub fn with_config(config: Config) -> Result<Self> {
        let scratch = match &config.scratch.directory {
            Some(dir) => ScratchSpace::new(dir)?,
            None => ScratchSpace::system()?,
        };
        let timeout = config.engine.timeout();

        let normalizer = Arc::new(FfmpegNormalizer::new(&config.normalizer.ffmpeg_binary, timeout));
        let primary: Arc<dyn SpeechEngine> = Arc::new(WhisperCliEngine::new(
            &config.engine.whisper_binary,
            &config.engine.model,
            timeout,
        ));
        let loader = Arc::new(WhisperModelLoader::new(&config.engine.native_model_path));
        let fallback: Arc<dyn SpeechEngine> = Arc::new(NativeEngine::new(Arc::new(ModelHandle::new(loader))));

        let pipeline = Pipeline::new(normalizer, TranscriptionAdapter::new(primary, Some(fallback)), scratch);
        let supervisor = Supervisor::new(pipeline, Arc::new(AllowAll), config.scratch.result_ttl());

        Ok(Self::with_supervisor(config, supervisor))
    }

    // @method: Create a controller around an existing supervisor
    pub fn with_supervisor(config: Config, supervisor: Supervisor) -> Self {
        Self { config, supervisor }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    /// Convert one audio file
    ///
    /// `output_path` defaults to `<stem>.srt` next to the input. An existing
    /// output is left alone unless `force_overwrite` is set.
    pub async fn run(&self, input_file: PathBuf, output_path: Option<PathBuf>, force_overwrite: bool) -> Result<FileReport> {
        let multi_progress = MultiProgress::new();
        self.run_with_progress(&input_file, output_path, &multi_progress, force_overwrite)
            .await
    }

    async fn run_with_progress(
        &self,
        input_file: &Path,
        output_path: Option<PathBuf>,
        multi_progress: &MultiProgress,
        force_overwrite: bool,
    ) -> Result<FileReport> {
        let start_time = Instant::now();

        if FileManager::detect_file_type(input_file)? != FileType::Audio {
            return Err(anyhow!("Not a supported audio file: {:?}", input_file));
        }

        let output_path = output_path.unwrap_or_else(|| FileManager::generate_output_path(input_file, None));
        if output_path.exists() && !force_overwrite {
            warn!(
                "Skipping {:?}, subtitles already exist (use {} to overwrite)",
                output_path, FORCE_FLAG
            );
            return Ok(FileReport::Skipped { output: output_path });
        }

        let filename = input_file
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_default();
        let audio = tokio::fs::read(input_file)
            .await
            .with_context(|| format!("Failed to read input file: {:?}", input_file))?;

        let options = self.config.conversion.to_options();
        info!(
            "Converting {} ({}, {})",
            filename,
            get_language_name(&options.input_language),
            if options.natural_segmentation {
                "natural segments".to_string()
            } else {
                format!("{} words per cue", options.words_per_cue)
            }
        );

        let handle = self
            .supervisor
            .submit(SubmitRequest::new(audio, filename.clone(), options))
            .await
            .map_err(AppError::from)?;

        let outcome = self.wait_with_spinner(&handle, multi_progress).await;
        match outcome {
            JobOutcome::Completed(done) => {
                let result = self.supervisor.retrieve(&done.token).await.map_err(AppError::from)?;
                FileManager::write_to_file(&output_path, &result.contents)?;
                info!(
                    "Success: {} ({} cues in {})",
                    output_path.display(),
                    done.cue_count,
                    Self::format_duration(start_time.elapsed())
                );
                Ok(FileReport::Converted {
                    output: output_path,
                    cue_count: done.cue_count,
                })
            }
            JobOutcome::Failed { error, .. } => {
                if error.is_retryable() {
                    debug!("{} may succeed if retried", filename);
                }
                Err(AppError::Conversion(error).into())
            }
            cancelled @ JobOutcome::Cancelled { .. } => Err(anyhow!("{}", cancelled)),
        }
    }

    // @displays: Spinner with the job's current stage until it finishes
    async fn wait_with_spinner(&self, handle: &JobHandle, multi_progress: &MultiProgress) -> JobOutcome {
        let spinner = multi_progress.add(ProgressBar::new_spinner());
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner.set_message(handle.source_filename().to_string());

        let wait = self.supervisor.await_job(handle);
        tokio::pin!(wait);
        let mut ticker = tokio::time::interval(Duration::from_millis(200));
        let outcome = loop {
            tokio::select! {
                outcome = &mut wait => break outcome,
                _ = ticker.tick() => {
                    if let Some(stage) = self.supervisor.status(&handle.id()).and_then(|job| job.stage) {
                        spinner.set_message(format!("{}: {}", handle.source_filename(), stage));
                    }
                }
            }
        };

        spinner.finish_and_clear();
        outcome
    }

    // Format duration in a human-readable format
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }

    /// Convert every supported audio file under a directory, one at a time
    ///
    /// Outputs go next to each input, or flat into `output_dir` when given.
    /// When two inputs map to the same `<stem>.srt`, the later one keeps its
    /// audio extension (`talk.mp3.srt`); a file whose both names are taken
    /// by earlier inputs of the run fails.
    pub async fn run_folder(&self, input_dir: PathBuf, output_dir: Option<PathBuf>, force_overwrite: bool) -> Result<FolderSummary> {
        let start_time = Instant::now();

        if !FileManager::dir_exists(&input_dir) {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let audio_files = FileManager::find_audio_files(&input_dir)?;
        if audio_files.is_empty() {
            return Err(anyhow!("No audio files found in directory: {:?}", input_dir));
        }

        let multi_progress = MultiProgress::new();
        let folder_pb = multi_progress.add(ProgressBar::new(audio_files.len() as u64));
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        folder_pb.set_style(template_result.progress_chars("█▓▒░"));

        let mut summary = FolderSummary::default();
        let mut claimed_outputs: HashSet<PathBuf> = HashSet::new();

        for audio_file in audio_files.iter() {
            let file_name = audio_file
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            folder_pb.set_message(file_name.clone());

            let Some(output_path) = Self::claim_output_path(&mut claimed_outputs, audio_file, output_dir.as_deref())
            else {
                error!("Error processing file {}: every output name is already used by this run", file_name);
                summary.failed += 1;
                folder_pb.inc(1);
                continue;
            };

            // Each file is awaited before the next is submitted, so no job
            // in a folder run supersedes another.
            match self
                .run_with_progress(audio_file, Some(output_path), &multi_progress, force_overwrite)
                .await
            {
                Ok(FileReport::Converted { .. }) => summary.converted += 1,
                Ok(FileReport::Skipped { .. }) => summary.skipped += 1,
                Err(e) => {
                    error!("Error processing file {}: {}", file_name, e);
                    summary.failed += 1;
                }
            }

            folder_pb.inc(1);
        }

        folder_pb.finish_with_message("Folder processing complete");

        info!(
            "Folder processing completed in {}: {} converted, {} skipped, {} errors",
            Self::format_duration(start_time.elapsed()),
            summary.converted,
            summary.skipped,
            summary.failed
        );

        Ok(summary)
    }

    // Pick an output path no earlier input of this run has claimed
    fn claim_output_path(claimed: &mut HashSet<PathBuf>, audio_file: &Path, output_dir: Option<&Path>) -> Option<PathBuf> {
        let stem_path = FileManager::generate_output_path(audio_file, output_dir);
        if claimed.insert(stem_path.clone()) {
            return Some(stem_path);
        }

        let full_name_path = FileManager::generate_full_name_output_path(audio_file, output_dir);
        if claimed.insert(full_name_path.clone()) {
            warn!(
                "{} is already the output of another file, writing {} instead",
                stem_path.display(),
                full_name_path.display()
            );
            return Some(full_name_path);
        }
        None
    }
}
