//! Upload of files and text to hosting sites, with a history of the returned links.

pub mod error;
pub mod links;
pub mod parse;
pub mod poster;
pub mod services;
pub mod uploader;

pub use error::{Result, UploadError};
pub use links::{LinkHistory, LinkSet};
pub use poster::{Payload, PostConfig, Poster};
pub use services::{site, site_names, FileType, Host, Sender};
pub use uploader::{classify, Job, Uploader, FILE_HOSTING, HISTORY_FILE};
