//! The applets this binary can run, by name.

use anyhow::{anyhow, Result};
use applet_runtime::{AppBase, Applet};
use dock_shared_util::AppletName;
use dockbus::DockConnection;
use itertools::Itertools;

pub mod notifications;
pub mod uptoshare;
pub mod videodl;

pub type NewApplet = fn(AppBase, &DockConnection) -> Result<Box<dyn Applet>>;

const APPLETS: &[(&str, NewApplet)] = &[
    ("Notifications", notifications::new),
    ("UpToShare", uptoshare::new),
    ("VideoDL", videodl::new),
];

/// The constructor of applet `name`, matched case-insensitively.
pub fn find(name: &AppletName) -> Result<NewApplet> {
    APPLETS.iter().find(|(known, _)| name.matches(known)).map(|(_, new)| *new).ok_or_else(|| {
        anyhow!("Unknown applet {}, expected one of: {}", name, APPLETS.iter().map(|(known, _)| known).join(", "))
    })
}
