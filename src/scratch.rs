/*!
 * Scratch resource management for conversion jobs.
 *
 * Every transient file a job creates is a `ScratchArtifact`. The artifact
 * owns its path: it is deleted when `cleanup` is called or, failing that,
 * when it is dropped. Both paths go through `tempfile::TempPath`, so a file
 * is removed at most once no matter how the job ends.
 */

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, warn};
use tempfile::{Builder, TempDir, TempPath};

/// File name prefix shared by all scratch files
pub const SCRATCH_PREFIX: &str = "subforge-";

/// What a scratch file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// The upload, exactly as received
    RawAudio,
    /// Mono 16 kHz 16-bit PCM produced by the normalizer
    NormalizedAudio,
    /// Serialized SRT output awaiting download
    SubtitleOutput,
}

impl ArtifactKind {
    /// Default file suffix for the kind
    pub fn default_suffix(&self) -> &'static str {
        match self {
            Self::RawAudio => ".bin",
            Self::NormalizedAudio => ".wav",
            Self::SubtitleOutput => ".srt",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RawAudio => "raw audio",
            Self::NormalizedAudio => "normalized audio",
            Self::SubtitleOutput => "subtitle output",
        };
        write!(f, "{}", name)
    }
}

/// A transient file owned by exactly one pipeline stage at a time
pub struct ScratchArtifact {
    kind: ArtifactKind,
    path: TempPath,
}

impl ScratchArtifact {
    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file now, reporting (but not failing on) errors
    ///
    /// A file that is already gone counts as cleaned up.
    pub fn cleanup(self) {
        let kind = self.kind;
        let path = self.path.to_path_buf();
        match self.path.close() {
            Ok(()) => debug!("Removed {} scratch file {:?}", kind, path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Scratch file {:?} was already removed", path)
            }
            Err(e) => warn!("Failed to remove scratch file {:?}: {}", path, e),
        }
    }
}

impl fmt::Debug for ScratchArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScratchArtifact")
            .field("kind", &self.kind)
            .field("path", &self.path())
            .finish()
    }
}

/// A private directory handed to an external tool, removed on drop
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn cleanup(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!("Failed to remove scratch directory {:?}: {}", path, e);
        }
    }
}

/// Factory for scratch files under one root directory
#[derive(Debug, Clone)]
pub struct ScratchSpace {
    root: PathBuf,
}

impl ScratchSpace {
    /// Use `root` for scratch files, creating it if needed
    pub fn new<P: Into<PathBuf>>(root: P) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create scratch directory: {:?}", root))?;
        Ok(Self { root })
    }

    /// Scratch space in the system temp directory
    pub fn system() -> Result<Self> {
        Self::new(std::env::temp_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create an empty artifact with the kind's default suffix
    pub fn create(&self, kind: ArtifactKind) -> io::Result<ScratchArtifact> {
        self.create_with_suffix(kind, kind.default_suffix())
    }

    /// Create an empty artifact with an explicit suffix (e.g. the upload's extension)
    pub fn create_with_suffix(&self, kind: ArtifactKind, suffix: &str) -> io::Result<ScratchArtifact> {
        let file = Builder::new()
            .prefix(SCRATCH_PREFIX)
            .suffix(suffix)
            .tempfile_in(&self.root)?;
        let path = file.into_temp_path();
        debug!("Created {} scratch file {:?}", kind, &*path);
        Ok(ScratchArtifact { kind, path })
    }

    /// Create an artifact holding `contents`
    pub async fn write(&self, kind: ArtifactKind, suffix: &str, contents: &[u8]) -> io::Result<ScratchArtifact> {
        let artifact = self.create_with_suffix(kind, suffix)?;
        // On error the artifact is dropped here, which removes the file
        tokio::fs::write(artifact.path(), contents).await?;
        Ok(artifact)
    }

    /// Create a private scratch directory
    pub fn create_dir(&self) -> io::Result<ScratchDir> {
        let dir = Builder::new().prefix(SCRATCH_PREFIX).tempdir_in(&self.root)?;
        Ok(ScratchDir { dir })
    }
}
