use std::path::PathBuf;

use anyhow::Result;
use applet_runtime::AppletPaths;
use clap::Parser;

/// Struct that gets generated from `RawOpt`.
#[derive(Debug, PartialEq)]
pub struct Opt {
    pub applet_name: String,
    pub config_file: PathBuf,
    pub bus_path: String,
    pub root_data_dir: PathBuf,
    pub share_data_dir: PathBuf,
    pub parent_app_name: String,
}

/// The arguments the dock starts an applet with.
#[derive(Parser, Debug, PartialEq)]
#[command(name = "dock-applet", version, about = "Run one of the dock applets")]
struct RawOpt {
    /// Name of the applet to run, e.g. `UpToShare`
    applet_name: String,

    /// Config file of the applet instance
    config_file: PathBuf,

    /// Object path of the applet icon on the session bus
    bus_path: String,

    /// Root of the dock data, e.g. `~/.config/cairo-dock`
    root_data_dir: PathBuf,

    /// Directory the applet files are installed in
    share_data_dir: PathBuf,

    /// Name of the program hosting the applet
    parent_app_name: String,
}

impl Opt {
    pub fn from_env() -> Self {
        RawOpt::parse().into()
    }

    pub fn paths(&self) -> Result<AppletPaths> {
        AppletPaths::new(
            self.applet_name.as_str(),
            &self.config_file,
            &self.bus_path,
            &self.root_data_dir,
            &self.share_data_dir,
            &self.parent_app_name,
        )
    }
}

impl From<RawOpt> for Opt {
    fn from(other: RawOpt) -> Self {
        let RawOpt { applet_name, config_file, bus_path, root_data_dir, share_data_dir, parent_app_name } = other;
        Opt { applet_name, config_file, bus_path, root_data_dir, share_data_dir, parent_app_name }
    }
}
