use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::format::Format;

/// A known video, queued or done.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Video {
    pub name: String,
    #[serde(rename = "URL")]
    pub url: String,
    pub date_added: DateTime<Local>,
    #[serde(default)]
    pub date_done: Option<DateTime<Local>>,
    #[serde(default)]
    pub fail: bool,
    #[serde(default)]
    pub viewed: bool,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub format: Option<Format>,
}

impl Video {
    pub fn new(url: impl Into<String>, name: impl Into<String>) -> Self {
        Video {
            name: name.into(),
            url: url.into(),
            date_added: Local::now(),
            date_done: None,
            fail: false,
            viewed: false,
            category: String::new(),
            format: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.date_done.is_some()
    }

    /// Name of the downloaded file, without extension.
    pub fn file_stem(&self) -> String {
        self.name.replace('/', "-")
    }

    /// Where the video is saved in `dir`, with the extension of `extension` or of its format.
    pub fn file_path_with(&self, dir: &Path, extension: &str) -> PathBuf {
        dir.join(format!("{}.{}", self.file_stem(), extension))
    }

    pub fn file_path(&self, dir: &Path) -> PathBuf {
        let extension = self.format.as_ref().map(|f| f.extension.as_str()).unwrap_or_default();
        self.file_path_with(dir, extension)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_file_path() {
        let mut video = Video::new("https://host/v", "AC/DC live");
        video.format = Some(Format { extension: "webm".into(), ..Default::default() });
        assert_eq!(video.file_path(Path::new("/videos")), PathBuf::from("/videos/AC-DC live.webm"));
    }

    #[test]
    fn test_record_fields() {
        let video = Video::new("https://host/v", "Title");
        let json = serde_json::to_value(&video).unwrap();
        let mut keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["Category", "DateAdded", "DateDone", "Fail", "Format", "Name", "URL", "Viewed"]);
        assert!(!video.is_done());
    }
}
