/*!
 * Tests for the application controller's file and folder runs
 */

use anyhow::Result;
use std::fs;
use std::sync::Arc;

use subtitle_forge::app_config::Config;
use subtitle_forge::app_controller::{Controller, FileReport, FolderSummary};
use subtitle_forge::errors::ConversionError;
use subtitle_forge::supervisor::AllowAll;
use subtitle_forge::transcription::SpeechEngine;
use crate::common::{self, ScriptedEngine};

// sample_segments() at three words per cue
const EXPECTED_SRT: &str = "1\n00:00:00,000 --> 00:00:02,500\nhello world how\n\n2\n00:00:02,500 --> 00:00:03,500\nare you\n\n";

fn controller_with(engine: Arc<dyn SpeechEngine>, scratch: &std::path::Path) -> Result<Controller> {
    let mut config = Config::default();
    config.conversion.words_per_cue = 3;
    let supervisor = common::build_supervisor(engine, None, Arc::new(AllowAll), scratch)?;
    Ok(Controller::with_supervisor(config, supervisor))
}

fn speaking_controller(scratch: &std::path::Path) -> Result<Controller> {
    controller_with(Arc::new(ScriptedEngine::speaking("scripted", common::sample_segments())), scratch)
}

/// Test that a single file gets its subtitles written next to it
#[tokio::test]
async fn test_run_withAudioFile_shouldWriteSiblingSrt() -> Result<()> {
    let work_dir = common::create_temp_dir()?;
    let scratch_dir = common::create_temp_dir()?;
    let input = common::create_test_file(&work_dir.path().to_path_buf(), "lecture.m4a", "audio bytes")?;
    let controller = speaking_controller(scratch_dir.path())?;

    let report = controller.run(input, None, false).await?;

    let expected_output = work_dir.path().join("lecture.srt");
    assert_eq!(
        report,
        FileReport::Converted {
            output: expected_output.clone(),
            cue_count: 2,
        }
    );
    assert_eq!(fs::read_to_string(&expected_output)?, EXPECTED_SRT);
    assert_eq!(common::scratch_entries(scratch_dir.path()), 0);
    Ok(())
}

/// Test that existing subtitles are only replaced when forced
#[tokio::test]
async fn test_run_withExistingOutput_shouldSkipUnlessForced() -> Result<()> {
    let work_dir = common::create_temp_dir()?;
    let scratch_dir = common::create_temp_dir()?;
    let dir = work_dir.path().to_path_buf();
    let input = common::create_test_file(&dir, "talk.wav", "audio bytes")?;
    let output = common::create_test_file(&dir, "custom.srt", "old subtitles")?;
    let controller = speaking_controller(scratch_dir.path())?;

    let skipped = controller.run(input.clone(), Some(output.clone()), false).await?;
    assert_eq!(skipped, FileReport::Skipped { output: output.clone() });
    assert_eq!(fs::read_to_string(&output)?, "old subtitles");

    let forced = controller.run(input, Some(output.clone()), true).await?;
    assert!(matches!(forced, FileReport::Converted { cue_count: 2, .. }));
    assert_eq!(fs::read_to_string(&output)?, EXPECTED_SRT);
    Ok(())
}

/// Test that a non-audio input is refused before any job starts
#[tokio::test]
async fn test_run_withTextFile_shouldFail() -> Result<()> {
    let work_dir = common::create_temp_dir()?;
    let scratch_dir = common::create_temp_dir()?;
    let input = common::create_test_file(&work_dir.path().to_path_buf(), "notes.txt", "hello")?;
    let controller = speaking_controller(scratch_dir.path())?;

    assert!(controller.run(input, None, false).await.is_err());
    assert_eq!(controller.supervisor().current_job(), None);
    Ok(())
}

/// Test that a failed conversion writes no output file
#[tokio::test]
async fn test_run_withFailingEngine_shouldReturnErrorAndWriteNothing() -> Result<()> {
    let work_dir = common::create_temp_dir()?;
    let scratch_dir = common::create_temp_dir()?;
    let input = common::create_test_file(&work_dir.path().to_path_buf(), "broken.mp3", "audio bytes")?;
    let engine = Arc::new(ScriptedEngine::failing("cli", ConversionError::tool_failed("whisper", "exit status 2")));
    let controller = controller_with(engine, scratch_dir.path())?;

    let error = controller.run(input, None, false).await.unwrap_err();

    assert!(error.to_string().contains("exit status 2"));
    assert!(!work_dir.path().join("broken.srt").exists());
    Ok(())
}

/// Test a folder run into a separate output directory, then a repeat run
#[tokio::test]
async fn test_run_folder_withMixedFiles_shouldConvertAudioOnly() -> Result<()> {
    let work_dir = common::create_temp_dir()?;
    let out_dir = common::create_temp_dir()?;
    let scratch_dir = common::create_temp_dir()?;
    let dir = work_dir.path().to_path_buf();
    common::create_test_file(&dir, "a.mp3", "audio")?;
    common::create_test_file(&dir, "b.flac", "audio")?;
    common::create_test_file(&dir, "readme.txt", "text")?;
    let controller = speaking_controller(scratch_dir.path())?;

    let summary = controller
        .run_folder(dir.clone(), Some(out_dir.path().to_path_buf()), false)
        .await?;
    assert_eq!(
        summary,
        FolderSummary {
            converted: 2,
            skipped: 0,
            failed: 0,
        }
    );
    assert_eq!(fs::read_to_string(out_dir.path().join("a.srt"))?, EXPECTED_SRT);
    assert!(out_dir.path().join("b.srt").exists());
    assert!(!out_dir.path().join("readme.srt").exists());

    let again = controller
        .run_folder(dir, Some(out_dir.path().to_path_buf()), false)
        .await?;
    assert_eq!(again.skipped, 2);
    assert_eq!(again.converted, 0);
    Ok(())
}

/// Test that a folder without audio is reported as an error
#[tokio::test]
async fn test_run_folder_withNoAudio_shouldFail() -> Result<()> {
    let work_dir = common::create_temp_dir()?;
    let scratch_dir = common::create_temp_dir()?;
    common::create_test_file(&work_dir.path().to_path_buf(), "notes.txt", "x")?;
    let controller = speaking_controller(scratch_dir.path())?;

    assert!(controller.run_folder(work_dir.path().to_path_buf(), None, false).await.is_err());
    Ok(())
}

/// Test that two inputs sharing a stem both get their own subtitles
#[tokio::test]
async fn test_run_folder_withSameStemInputs_shouldWriteDistinctOutputs() -> Result<()> {
    let work_dir = common::create_temp_dir()?;
    let scratch_dir = common::create_temp_dir()?;
    let dir = work_dir.path().to_path_buf();
    common::create_test_file(&dir, "talk.m4a", "audio")?;
    common::create_test_file(&dir, "talk.mp3", "audio")?;
    let controller = speaking_controller(scratch_dir.path())?;

    let summary = controller.run_folder(dir.clone(), None, false).await?;
    assert_eq!(
        summary,
        FolderSummary {
            converted: 2,
            skipped: 0,
            failed: 0,
        }
    );
    assert_eq!(fs::read_to_string(dir.join("talk.srt"))?, EXPECTED_SRT);
    assert_eq!(fs::read_to_string(dir.join("talk.mp3.srt"))?, EXPECTED_SRT);

    // the names are stable across runs, so a repeat run skips both
    let again = controller.run_folder(dir, None, false).await?;
    assert_eq!(again.skipped, 2);
    assert_eq!(again.converted, 0);
    Ok(())
}
