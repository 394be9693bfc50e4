//! On-disk snapshot of the committed DAO state.

use anyhow::Context;
use dao_governance::DaoSnapshot;
use dao_ledger::MemoryLedger;
use std::io::Write;
use std::path::{Path, PathBuf};

pub type Snapshot = DaoSnapshot<MemoryLedger>;

/// A single snapshot file, replaced atomically on every save.
#[derive(Clone, Debug)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> anyhow::Result<Snapshot> {
        let bytes = std::fs::read(&self.path).with_context(|| {
            format!(
                "reading snapshot {} (run `dao-daemon init` first?)",
                self.path.display()
            )
        })?;
        let snapshot = Snapshot::decode(&bytes)
            .with_context(|| format!("decoding snapshot {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), taken_at = %snapshot.taken_at, "snapshot loaded");
        Ok(snapshot)
    }

    /// Write to a temporary file beside the target, then rename over it, so
    /// readers see either the old snapshot or the new one.
    pub fn save(&self, snapshot: &Snapshot) -> anyhow::Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating data dir {}", dir.display()))?;

        let bytes = snapshot.encode()?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("creating temp file in {}", dir.display()))?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path)
            .with_context(|| format!("replacing snapshot {}", self.path.display()))?;

        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "snapshot saved");
        Ok(())
    }
}
