/*!
 * Tests for file and directory utilities
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use subtitle_forge::file_utils::{FileManager, FileType};
use crate::common;

/// Test that file existence checks distinguish files from directories
#[test]
fn test_file_exists_withFileAndDir_shouldOnlyAcceptFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let file = common::create_test_file(&temp_dir.path().to_path_buf(), "a.txt", "x")?;

    assert!(FileManager::file_exists(&file));
    assert!(!FileManager::file_exists(temp_dir.path()));
    assert!(FileManager::dir_exists(temp_dir.path()));
    assert!(!FileManager::dir_exists(&file));
    Ok(())
}

/// Test extension detection, case-insensitively
#[test]
fn test_audio_extension_withMixedCase_shouldReturnLowercase() {
    assert_eq!(FileManager::audio_extension("talk.M4A"), Some("m4a".to_string()));
    assert_eq!(FileManager::audio_extension("clip.webm"), Some("webm".to_string()));
    assert_eq!(FileManager::audio_extension("notes.txt"), None);
    assert_eq!(FileManager::audio_extension("noextension"), None);
}

/// Test download names derived from upload names
#[test]
fn test_output_filename_withUploadNames_shouldSwapExtension() {
    assert_eq!(FileManager::output_filename("talk.m4a"), "talk.srt");
    assert_eq!(FileManager::output_filename("my.talk.mp3"), "my.talk.srt");
    assert_eq!(FileManager::output_filename(""), "subtitles.srt");
}

/// Test output paths next to the input and in an explicit directory
#[test]
fn test_generate_output_path_withValidInputs_shouldCreateCorrectPath() {
    let input = Path::new("/media/rec/interview.wav");

    assert_eq!(
        FileManager::generate_output_path(input, None),
        PathBuf::from("/media/rec/interview.srt")
    );
    assert_eq!(
        FileManager::generate_output_path(input, Some(Path::new("/out"))),
        PathBuf::from("/out/interview.srt")
    );
}

/// Test the collision-free output name that keeps the audio extension
#[test]
fn test_generate_full_name_output_path_withAudioFile_shouldKeepExtension() {
    let input = Path::new("/media/rec/talk.mp3");

    assert_eq!(
        FileManager::generate_full_name_output_path(input, None),
        PathBuf::from("/media/rec/talk.mp3.srt")
    );
    assert_eq!(
        FileManager::generate_full_name_output_path(input, Some(Path::new("/out"))),
        PathBuf::from("/out/talk.mp3.srt")
    );
}

/// Test recursive discovery of audio files
#[test]
fn test_find_audio_files_withNestedDirs_shouldReturnSortedAudioOnly() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path().to_path_buf();
    let nested = root.join("day2");
    fs::create_dir_all(&nested)?;

    common::create_test_file(&root, "b.mp3", "x")?;
    common::create_test_file(&root, "a.WAV", "x")?;
    common::create_test_file(&root, "a.srt", "x")?;
    common::create_test_file(&nested, "c.flac", "x")?;

    let found = FileManager::find_audio_files(&root)?;

    assert_eq!(found, vec![root.join("a.WAV"), root.join("b.mp3"), nested.join("c.flac")]);
    Ok(())
}

/// Test input classification
#[test]
fn test_detect_file_type_withVariousInputs_shouldClassify() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path().to_path_buf();

    let audio = common::create_test_file(&root, "a.ogg", "x")?;
    let subtitle = common::create_test_file(&root, "a.SRT", "x")?;
    let other = common::create_test_file(&root, "a.pdf", "x")?;

    assert_eq!(FileManager::detect_file_type(&audio)?, FileType::Audio);
    assert_eq!(FileManager::detect_file_type(&subtitle)?, FileType::Subtitle);
    assert_eq!(FileManager::detect_file_type(&other)?, FileType::Unknown);
    assert_eq!(FileManager::detect_file_type(&root)?, FileType::Directory);
    assert!(FileManager::detect_file_type(root.join("missing.mp3")).is_err());
    Ok(())
}

/// Test writing creates parent directories and reading returns the content
#[test]
fn test_write_to_file_withNestedPath_shouldCreateFileWithContent() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("x").join("y").join("out.srt");

    FileManager::write_to_file(&path, "content")?;

    assert_eq!(FileManager::read_to_string(&path)?, "content");
    assert_eq!(FileManager::read_bytes(&path)?, b"content".to_vec());
    Ok(())
}
