use applet_runtime::history::HistoryError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Could not run {command}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} failed: {message}")]
    Backend { command: String, message: String },

    #[error("Malformed video info")]
    Json(#[from] serde_json::Error),

    #[error("no acceptable format")]
    NoFormat,

    #[error("unsupported url: {0}")]
    UnsupportedUrl(String),

    #[error("no video with url {0}")]
    NotFound(String),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Dock(#[from] dockbus::Error),
}
