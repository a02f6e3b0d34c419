use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

/// Upload extensions the normalizer is known to handle (lowercase)
pub const SUPPORTED_AUDIO_EXTENSIONS: &[&str] = &[
    "m4a", "mp3", "wav", "mp4", "aac", "ogg", "flac", "webm", "mov", "mkv",
];

/// Extension of generated subtitle files
pub const SUBTITLE_EXTENSION: &str = "srt";

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().exists() && path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    /// Lowercase extension of `filename` if it is a supported audio type
    pub fn audio_extension(filename: &str) -> Option<String> {
        let ext = Path::new(filename).extension()?.to_string_lossy().to_lowercase();
        SUPPORTED_AUDIO_EXTENSIONS
            .contains(&ext.as_str())
            .then_some(ext)
    }

    pub fn is_supported_audio(filename: &str) -> bool {
        Self::audio_extension(filename).is_some()
    }

    // @generates: Subtitle filename for an upload (`talk.m4a` -> `talk.srt`)
    pub fn output_filename(source_filename: &str) -> String {
        let stem = Path::new(source_filename)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "subtitles".to_string());
        format!("{}.{}", stem, SUBTITLE_EXTENSION)
    }

    // @generates: Output path for a converted file
    // @params: input_file, output_dir (None = next to the input)
    pub fn generate_output_path<P: AsRef<Path>>(input_file: P, output_dir: Option<&Path>) -> PathBuf {
        let input_file = input_file.as_ref();
        let filename = input_file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let dir = output_dir
            .map(Path::to_path_buf)
            .or_else(|| input_file.parent().map(Path::to_path_buf))
            .unwrap_or_default();
        dir.join(Self::output_filename(&filename))
    }

    // @generates: Output path that keeps the audio extension (`talk.mp3` -> `talk.mp3.srt`)
    pub fn generate_full_name_output_path<P: AsRef<Path>>(input_file: P, output_dir: Option<&Path>) -> PathBuf {
        let input_file = input_file.as_ref();
        let filename = input_file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "subtitles".to_string());
        let dir = output_dir
            .map(Path::to_path_buf)
            .or_else(|| input_file.parent().map(Path::to_path_buf))
            .unwrap_or_default();
        dir.join(format!("{}.{}", filename, SUBTITLE_EXTENSION))
    }

    /// Find supported audio files under a directory, sorted by path
    pub fn find_audio_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();

        for entry in WalkDir::new(dir.as_ref()).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() {
                let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
                if Self::is_supported_audio(&name) {
                    result.push(path.to_path_buf());
                }
            }
        }

        result.sort();
        Ok(result)
    }

    /// Read a whole file into memory
    pub fn read_bytes<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
        fs::read(&path).with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path)
            .with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        // Ensure the parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Classify an input path for the converter
    pub fn detect_file_type<P: AsRef<Path>>(path: P) -> Result<FileType> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(anyhow!("File does not exist: {:?}", path));
        }
        if path.is_dir() {
            return Ok(FileType::Directory);
        }

        let name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        if Self::is_supported_audio(&name) {
            return Ok(FileType::Audio);
        }

        let is_srt = path
            .extension()
            .map(|e| e.to_string_lossy().eq_ignore_ascii_case(SUBTITLE_EXTENSION))
            .unwrap_or(false);
        if is_srt {
            return Ok(FileType::Subtitle);
        }

        Ok(FileType::Unknown)
    }
}

/// Enum representing different input types
#[derive(Debug, PartialEq, Eq)]
pub enum FileType {
    /// Audio or video container the normalizer accepts
    Audio,
    /// Already a subtitle file
    Subtitle,
    /// Folder to convert recursively
    Directory,
    /// Unknown file type
    Unknown,
}
