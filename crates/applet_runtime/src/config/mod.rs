//! The applet config file: a key file with `[group]` headers, bound to typed structs.

use std::path::PathBuf;

use dockbus::ConversionError;

mod group;
mod keyfile;
mod updater;

pub use group::*;
pub use keyfile::*;
pub use updater::*;

#[derive(Debug, thiserror::Error)]
pub enum ConfError {
    #[error("Config file {0} does not exist")]
    MissingFile(PathBuf),
    #[error("Could not access config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Line {line}: expected `key = value`, a [group] header or a comment, got `{content}`")]
    ParseLine { line: usize, content: String },
    #[error("[{group}] {key}: missing")]
    MissingKey { group: String, key: String },
    #[error("[{group}] {key}: {source}")]
    Conversion {
        group: String,
        key: String,
        #[source]
        source: ConversionError,
    },
}
