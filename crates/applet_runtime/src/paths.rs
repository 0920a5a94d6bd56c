use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use dock_shared_util::AppletName;

/// Stores references to all the paths the dock handed over to the applet at launch.
#[derive(Debug, Clone)]
pub struct AppletPaths {
    pub name: AppletName,
    pub config_file: PathBuf,
    pub bus_path: String,
    /// Root of the dock's data, e.g. `~/.config/cairo-dock`.
    pub root_data_dir: PathBuf,
    /// Where the applet's own files (icons, html pages) are installed.
    pub share_data_dir: PathBuf,
    pub parent_app_name: String,
}

impl AppletPaths {
    pub fn new(
        name: impl Into<AppletName>,
        config_file: impl Into<PathBuf>,
        bus_path: impl Into<String>,
        root_data_dir: impl Into<PathBuf>,
        share_data_dir: impl Into<PathBuf>,
        parent_app_name: impl Into<String>,
    ) -> Result<Self> {
        let config_file = config_file.into();
        if config_file.is_dir() {
            bail!("Please provide the path to the applet config file, not the directory containing it")
        }
        let bus_path = bus_path.into();
        if !bus_path.starts_with('/') {
            bail!("Bus path {} is not an object path", bus_path);
        }
        Ok(AppletPaths {
            name: name.into(),
            config_file,
            bus_path,
            root_data_dir: root_data_dir.into(),
            share_data_dir: share_data_dir.into(),
            parent_app_name: parent_app_name.into(),
        })
    }

    /// A file shipped with the applet.
    pub fn file_location(&self, name: impl AsRef<Path>) -> PathBuf {
        self.share_data_dir.join(name)
    }

    /// A file stored in the dock's data directory.
    pub fn file_data_dir(&self, name: impl AsRef<Path>) -> PathBuf {
        self.root_data_dir.join(name)
    }

    pub fn get_config_file(&self) -> &Path {
        self.config_file.as_path()
    }

    pub fn get_config_dir(&self) -> &Path {
        self.config_file.parent().unwrap_or_else(|| Path::new("."))
    }
}

impl std::fmt::Display for AppletPaths {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "applet: {}, config-file: {}, bus-path: {}, share-dir: {}",
            self.name,
            self.config_file.display(),
            self.bus_path,
            self.share_data_dir.display()
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_locations() {
        let paths = AppletPaths::new(
            "VideoDL",
            "/home/me/.config/cairo-dock/current_theme/plug-ins/VideoDL/VideoDL.conf",
            "/org/cairodock/CairoDock/VideoDL",
            "/home/me/.config/cairo-dock",
            "/usr/share/cairo-dock/plug-ins/VideoDL",
            "cairo-dock",
        )
        .unwrap();
        assert_eq!(paths.file_location("icon"), PathBuf::from("/usr/share/cairo-dock/plug-ins/VideoDL/icon"));
        assert_eq!(paths.file_data_dir("videodl.json"), PathBuf::from("/home/me/.config/cairo-dock/videodl.json"));
        assert_eq!(paths.get_config_dir(), Path::new("/home/me/.config/cairo-dock/current_theme/plug-ins/VideoDL"));
    }

    #[test]
    fn test_rejects_bad_bus_path() {
        assert!(AppletPaths::new("x", "/tmp/x.conf", "org/bad", "/tmp", "/tmp", "dock").is_err());
    }
}
