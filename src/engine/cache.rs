//! Stage cache: skip Compile/Setup when their artifacts are present *and* were
//! produced by a completed run with the same inputs.
//!
//! A stage writes its stamp (`.stamps/<stage>.json`) only after its last
//! command succeeds, so artifacts left behind by an interrupted run never
//! count as a cache hit.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{BenchError, BenchResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachedStage {
    Compile,
    Setup,
}

impl CachedStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            CachedStage::Compile => "compile",
            CachedStage::Setup => "setup",
        }
    }
}

impl fmt::Display for CachedStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageStamp {
    pub stage: String,
    pub fingerprint: String,
    pub artifacts: Vec<PathBuf>,
    pub completed_at: String,
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheCheck {
    Hit,
    Disabled,
    MissingArtifact(PathBuf),
    MissingStamp,
    Stale,
}

impl CacheCheck {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheCheck::Hit)
    }
}

/// SHA-256 over length-prefixed parts.
pub fn fingerprint(parts: &[&[u8]]) -> String {
    let mut buf = Vec::with_capacity(parts.iter().map(|p| p.len() + 8).sum());
    for part in parts {
        buf.extend_from_slice(&(part.len() as u64).to_le_bytes());
        buf.extend_from_slice(part);
    }
    crate::sha256_hex(&buf)
}

#[derive(Debug, Clone)]
pub struct StageCache {
    dir: PathBuf,
    enabled: bool,
}

impl StageCache {
    pub fn new(dir: impl Into<PathBuf>, enabled: bool) -> Self {
        StageCache {
            dir: dir.into(),
            enabled,
        }
    }

    pub fn stamp_path(&self, stage: CachedStage) -> PathBuf {
        self.dir.join(format!("{}.json", stage.as_str()))
    }

    pub fn read_stamp(&self, stage: CachedStage) -> Option<StageStamp> {
        let bytes = std::fs::read(self.stamp_path(stage)).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    pub fn check(&self, stage: CachedStage, artifacts: &[PathBuf], fingerprint: &str) -> CacheCheck {
        if !self.enabled {
            return CacheCheck::Disabled;
        }
        if let Some(missing) = artifacts.iter().find(|p| !p.exists()) {
            return CacheCheck::MissingArtifact(missing.clone());
        }
        match self.read_stamp(stage) {
            None => CacheCheck::MissingStamp,
            Some(stamp) if stamp.fingerprint == fingerprint => CacheCheck::Hit,
            Some(_) => CacheCheck::Stale,
        }
    }

    /// Whether `stage` may be skipped.
    pub fn can_skip(&self, stage: CachedStage, artifacts: &[PathBuf], fingerprint: &str) -> bool {
        let check = self.check(stage, artifacts, fingerprint);
        debug!(%stage, ?check, "cache check");
        check.is_hit()
    }

    /// Mark `stage` complete. Written via rename so a crash never leaves half a stamp.
    pub fn record(&self, stage: CachedStage, artifacts: &[PathBuf], fingerprint: &str) -> BenchResult<()> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| BenchError::io(format!("failed to create {}", self.dir.display()), e))?;
        let stamp = StageStamp {
            stage: stage.as_str().to_string(),
            fingerprint: fingerprint.to_string(),
            artifacts: artifacts.to_vec(),
            completed_at: crate::now_rfc3339(),
        };
        let json = serde_json::to_vec_pretty(&stamp)
            .map_err(|e| BenchError::Message(format!("failed to serialize stamp: {e}")))?;
        let path = self.stamp_path(stage);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| BenchError::io(format!("failed to write {}", tmp.display()), e))?;
        std::fs::rename(&tmp, &path)
            .map_err(|e| BenchError::io(format!("failed to write {}", path.display()), e))
    }

    pub fn invalidate(&self, stage: CachedStage) -> BenchResult<()> {
        remove_if_exists(&self.stamp_path(stage))
    }
}

fn remove_if_exists(path: &Path) -> BenchResult<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BenchError::io(format!("failed to remove {}", path.display()), e)),
    }
}
