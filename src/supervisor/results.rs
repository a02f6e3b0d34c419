/*!
 * One-time download store for completed subtitle files.
 *
 * A completed job hands its `.srt` scratch artifact to the store and gets a
 * token back. Fetching the token removes the entry under the lock before
 * touching the file, so concurrent or repeated fetches see the artifact at
 * most once and everyone else gets `NotFound`. Entries older than the TTL
 * are purged (and their files deleted) on the next store access.
 */

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use log::{debug, warn};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::errors::ResultError;
use crate::scratch::ScratchArtifact;

/// Opaque token identifying a stored result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResultToken(Uuid);

impl ResultToken {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ResultToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ResultToken {
    type Err = ResultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self).map_err(|_| ResultError::NotFound)
    }
}

/// A fetched result; the backing artifact has already been deleted
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedResult {
    pub filename: String,
    pub contents: String,
}

struct StoredResult {
    artifact: ScratchArtifact,
    filename: String,
    stored_at: Instant,
}

/// Token-keyed store of completed subtitle artifacts
pub struct ResultStore {
    entries: Mutex<HashMap<ResultToken, StoredResult>>,
    ttl: Duration,
}

impl ResultStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Take ownership of `artifact` and return its download token
    ///
    /// Never touches the filesystem, so callers may hold their own locks.
    /// Expired entries are left for `purge_expired`.
    pub fn insert(&self, artifact: ScratchArtifact, filename: impl Into<String>) -> ResultToken {
        let token = ResultToken::new();
        let stored = StoredResult {
            artifact,
            filename: filename.into(),
            stored_at: Instant::now(),
        };
        debug!("Stored result {} ({})", token, stored.filename);
        self.entries.lock().insert(token, stored);
        token
    }

    /// Fetch and delete the result behind `token`
    pub async fn retrieve(&self, token: &ResultToken) -> Result<RetrievedResult, ResultError> {
        self.purge_expired();
        let stored = self.entries.lock().remove(token).ok_or(ResultError::NotFound)?;

        let read = tokio::fs::read_to_string(stored.artifact.path()).await;
        stored.artifact.cleanup();
        let contents = read.map_err(|e| ResultError::Unreadable(e.to_string()))?;

        debug!("Result {} retrieved", token);
        Ok(RetrievedResult {
            filename: stored.filename,
            contents,
        })
    }

    /// Delete every entry older than the TTL; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let expired: Vec<StoredResult> = {
            let mut entries = self.entries.lock();
            let stale: Vec<ResultToken> = entries
                .iter()
                .filter(|(_, stored)| stored.stored_at.elapsed() >= self.ttl)
                .map(|(token, _)| *token)
                .collect();
            stale.iter().filter_map(|token| entries.remove(token)).collect()
        };

        let count = expired.len();
        for stored in expired {
            warn!("Result for {} expired before download", stored.filename);
            stored.artifact.cleanup();
        }
        count
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ResultStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultStore")
            .field("entries", &self.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}
