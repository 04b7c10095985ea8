use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;

/// A transient file that is removed when the guard goes out of scope,
/// unless [`ScratchFile::persist`] moved it into its final place.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    armed: bool,
}

impl ScratchFile {
    /// Reserve a uniquely named path in `dir`. The file itself is created by
    /// whoever writes to [`ScratchFile::path`].
    pub fn in_dir(dir: &Path, prefix: &str, extension: &str) -> Self {
        let name = format!(".{}-{}.{}", prefix, Uuid::new_v4(), extension);
        let path = dir.join(name);
        debug!(path = %path.display(), "Reserved scratch file");
        Self { path, armed: true }
    }

    /// Reserve a uniquely named path in the system temp directory.
    pub fn in_temp_dir(prefix: &str, extension: &str) -> Self {
        Self::in_dir(&std::env::temp_dir(), prefix, extension)
    }

    /// Scratch file placed next to `target`, so a rename onto it stays on
    /// one filesystem.
    pub fn beside(target: &Path, extension: &str) -> Self {
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let stem = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        Self::in_dir(&dir, &stem, extension)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically move the scratch file onto `target` and disarm the guard.
    pub fn persist(mut self, target: &Path) -> Result<()> {
        fs::rename(&self.path, target)?;
        self.armed = false;
        debug!(from = %self.path.display(), to = %target.display(), "Persisted scratch file");
        Ok(())
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Released scratch file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to release scratch file"),
        }
    }
}
