use std::path::PathBuf;

use applet_runtime::history::HistoryError;

pub type Result<T> = std::result::Result<T, UploadError>;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("Could not read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("POST output empty")]
    EmptyResponse,

    #[error("backend not found:{0}")]
    UnknownBackend(String),

    #[error("text entry as FFA option missing (only existing files can be uploaded while every upload is sent as a file)")]
    TextAsFile,

    #[error(transparent)]
    History(#[from] HistoryError),
}
