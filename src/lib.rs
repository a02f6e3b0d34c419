/*!
 * # subtitle-forge - audio to SRT subtitles
 *
 * A Rust library that turns audio recordings into timed SRT subtitle tracks
 * by running an external speech-to-text engine under a single-flight job
 * supervisor.
 *
 * ## Features
 *
 * - One conversion job in flight at a time; a new submission cancels and
 *   cleans up the previous job before it starts
 * - Cooperative cancellation that kills running external tools
 * - Word-count and natural-segment cue policies with contiguity repair
 * - Byte-stable SRT serialization
 * - whisper CLI transcription with an in-process fallback
 * - Scratch files that are deleted exactly once on every exit path
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `supervisor`: Job supervisor, result store and access gate
 * - `transcription`: Transcription adapter and speech engines
 * - `segmentation`: Cue segmentation policies
 * - `subtitle_processor`: Timestamp formatting and SRT serialization
 * - `audio`: Audio normalizer collaborator (ffmpeg)
 * - `process`: Cancellable external command runner
 * - `scratch`: Scratch artifact management
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: Language hint validation
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod audio;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod process;
pub mod scratch;
pub mod segmentation;
pub mod subtitle_processor;
pub mod supervisor;
pub mod transcription;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{AppError, ConversionError, ResultError, SubmitError};
pub use language_utils::{LanguageHint, get_language_name};
pub use segmentation::SegmentationPolicy;
pub use subtitle_processor::{SubtitleCue, SubtitleEntry, format_timestamp, serialize_cues};
pub use supervisor::{ConversionOptions, JobHandle, JobOutcome, SubmitRequest, Supervisor};
