use std::path::{Path, PathBuf};

use dock_shared_util::FileAccess;

use super::{ConfError, KeyFile};

/// Changes values of the applet config file, keeping its comments and layout.
#[derive(Debug)]
pub struct ConfUpdater {
    path: PathBuf,
    files: FileAccess,
    file: KeyFile,
    dirty: bool,
}

impl ConfUpdater {
    pub fn open(path: impl AsRef<Path>, files: FileAccess) -> Result<Self, ConfError> {
        let path = path.as_ref().to_path_buf();
        let file = KeyFile::load(&path, &files)?;
        Ok(ConfUpdater { path, files, file, dirty: false })
    }

    pub fn set(&mut self, group: &str, key: &str, value: impl ToString) -> &mut Self {
        let value = value.to_string();
        if self.file.get(group, key) != Some(value.as_str()) {
            self.file.set(group, key, value);
            self.dirty = true;
        }
        self
    }

    /// Write the file back, if anything changed.
    pub fn save(&mut self) -> Result<(), ConfError> {
        if !self.dirty {
            return Ok(());
        }
        self.file.save(&self.path, &self.files)?;
        self.dirty = false;
        log::debug!("Saved config file {}", self.path.display());
        Ok(())
    }
}
