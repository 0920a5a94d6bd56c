//! Serializes every history or config write of the process.
//!
//! A single [`FileAccess`] is created by the applet runtime and handed to each
//! subsystem that persists files, so two managers never rewrite files concurrently.

use std::{
    io,
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

#[derive(Debug, Clone, Default)]
pub struct FileAccess(Arc<Mutex<()>>);

impl FileAccess {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold the process-wide file lock. A poisoned lock is still usable, the guarded data is `()`.
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fully rewrite `path` with `content`, creating the parent directory if needed.
    pub fn write(&self, path: &Path, content: impl AsRef<[u8]>) -> io::Result<()> {
        let _guard = self.lock();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                log::debug!("Creating directory {}", parent.display());
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)
    }

    pub fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let _guard = self.lock();
        std::fs::read_to_string(path)
    }

    /// Whether both handles guard the same lock.
    pub fn same_as(&self, other: &FileAccess) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
