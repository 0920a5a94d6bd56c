pub mod backend;
pub mod error;
pub mod format;
pub mod history;
pub mod manager;
pub mod video;
pub mod web;
pub mod ytdlp;

pub use backend::{Backend, Filer, Outcome, Progress};
pub use error::{Error, Result};
pub use format::{Format, FormatFilter, Quality, TypeDL};
pub use history::{ListKind, VideoHistory, HISTORY_FILE};
pub use manager::{Config, Manager, Popup, VideoAction, WebState, CATEGORIES, WEB_PATH};
pub use video::Video;
pub use ytdlp::{BackendId, YtDlp};
