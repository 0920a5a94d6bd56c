//! Media formats offered by a backend, and how one gets picked.

use bytesize::ByteSize;
use serde::{Deserialize, Serialize};

/// One stream (or merge of streams) a video can be downloaded as.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Format {
    /// Backend reference of the stream, `video+audio` for merges.
    #[serde(rename = "ID")]
    pub id: String,
    pub extension: String,
    pub resolution: String,
    /// In bytes, 0 when unknown.
    pub size: u64,
    pub video_encoding: String,
    pub audio_encoding: String,
    pub audio_bitrate: u32,

    /// Extension of a previous download of the same video, deleted once this one is done.
    #[serde(skip)]
    pub delete_after: Option<String>,
}

impl Format {
    pub fn has_audio(&self) -> bool {
        !self.audio_encoding.is_empty()
    }

    pub fn has_video(&self) -> bool {
        !self.video_encoding.is_empty()
    }

    /// The best audio and video streams muxed into one file, named after the video.
    pub fn merge(video: &Format, audio: &Format) -> Format {
        Format {
            id: format!("{}+{}", video.id, audio.id),
            extension: video.extension.clone(),
            resolution: video.resolution.clone(),
            size: if video.size > 0 && audio.size > 0 { video.size + audio.size } else { 0 },
            video_encoding: video.video_encoding.clone(),
            audio_encoding: audio.audio_encoding.clone(),
            audio_bitrate: audio.audio_bitrate,
            delete_after: None,
        }
    }

    pub fn is_merge(&self) -> bool {
        self.id.contains('+')
    }

    /// Line of the quality chooser.
    pub fn dialog_line(&self) -> String {
        let size = if self.size > 0 { ByteSize::b(self.size).to_string() } else { "?".to_string() };
        format!("{}\t{}\t{}\t{}\t{}", size, self.extension, self.resolution, self.audio_encoding, self.video_encoding)
    }
}

/// Default choice of the format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumIter, strum::FromRepr)]
pub enum Quality {
    #[default]
    #[strum(serialize = "Ask quality")]
    Ask,
    #[strum(serialize = "Best found")]
    BestFound,
    #[strum(serialize = "Best possible")]
    BestPossible,
}

impl Quality {
    pub fn tooltip(&self) -> &'static str {
        match self {
            Quality::Ask => "Use a popup to ask quality for every file",
            Quality::BestFound => "",
            Quality::BestPossible => "If available, this will merge the best audio and video streams into a single file.",
        }
    }
}

/// Which kind of streams are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumIter, strum::FromRepr)]
pub enum TypeDL {
    #[default]
    #[strum(serialize = "All files")]
    All,
    Audio,
    Video,
    #[strum(serialize = "Video with audio")]
    VideoWithAudio,
}

impl TypeDL {
    pub fn tooltip(&self) -> &'static str {
        match self {
            TypeDL::All => "No filter on file type.",
            TypeDL::Audio => "Display only audio files (without video)",
            TypeDL::Video => "Display only video files (with video, and maybe audio)",
            TypeDL::VideoWithAudio => "Display only files with audio and video",
        }
    }

    pub fn accepts(&self, format: &Format) -> bool {
        match self {
            TypeDL::All => true,
            TypeDL::Audio => format.has_audio() && !format.has_video(),
            TypeDL::Video => format.has_video(),
            TypeDL::VideoWithAudio => format.has_video() && format.has_audio(),
        }
    }
}

/// The type filter and the extension blacklist, applied to every format list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatFilter {
    pub type_dl: TypeDL,
    pub blacklist: Vec<String>,
}

impl FormatFilter {
    pub fn accepts(&self, format: &Format) -> bool {
        self.type_dl.accepts(format) && !self.blacklist.iter().any(|ext| *ext == format.extension)
    }

    /// Keep the accepted formats, in their order.
    pub fn apply(&self, formats: &[Format]) -> Vec<Format> {
        formats.iter().filter(|f| self.accepts(f)).cloned().collect()
    }
}

/// Merge of the first video-only and the first audio-only stream of a best-first list.
pub fn best_merge(formats: &[Format]) -> Option<Format> {
    let video = formats.iter().find(|f| f.has_video() && !f.has_audio())?;
    let audio = formats.iter().find(|f| f.has_audio() && !f.has_video())?;
    Some(Format::merge(video, audio))
}

/// The format to download without asking, from a filtered best-first list. `None` for
/// [`Quality::Ask`], or when nothing is left.
pub fn select(formats: &[Format], quality: Quality) -> Option<Format> {
    match quality {
        Quality::Ask => None,
        Quality::BestFound => formats.first().cloned(),
        Quality::BestPossible => best_merge(formats).or_else(|| formats.first().cloned()),
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) fn format(id: &str, ext: &str, video: &str, audio: &str) -> Format {
        Format {
            id: id.to_string(),
            extension: ext.to_string(),
            video_encoding: video.to_string(),
            audio_encoding: audio.to_string(),
            ..Default::default()
        }
    }

    /// Best first, as backends list them.
    pub(crate) fn formats() -> Vec<Format> {
        vec![
            format("137", "mp4", "avc1", ""),
            format("251", "webm", "", "opus"),
            format("22", "mp4", "avc1", "mp4a"),
            format("140", "m4a", "", "mp4a"),
            format("18", "3gp", "mp4v", "mp4a"),
        ]
    }

    fn ids(formats: &[Format]) -> Vec<&str> {
        formats.iter().map(|f| f.id.as_str()).collect()
    }

    #[test]
    fn test_filters() {
        let all = formats();
        let filter = |type_dl, blacklist: &[&str]| FormatFilter { type_dl, blacklist: blacklist.iter().map(|s| s.to_string()).collect() };
        assert_eq!(ids(&filter(TypeDL::All, &[]).apply(&all)), vec!["137", "251", "22", "140", "18"]);
        assert_eq!(ids(&filter(TypeDL::Audio, &[]).apply(&all)), vec!["251", "140"]);
        assert_eq!(ids(&filter(TypeDL::Video, &["3gp"]).apply(&all)), vec!["137", "22"]);
        assert_eq!(ids(&filter(TypeDL::VideoWithAudio, &["mp4"]).apply(&all)), vec!["18"]);
    }

    #[test]
    fn test_select() {
        let all = formats();
        assert_eq!(select(&all, Quality::Ask), None);
        assert_eq!(select(&all, Quality::BestFound).unwrap().id, "137");

        let merged = select(&all, Quality::BestPossible).unwrap();
        assert_eq!((merged.id.as_str(), merged.extension.as_str()), ("137+251", "mp4"));
        assert!(merged.has_audio() && merged.has_video() && merged.is_merge());

        let audio_only = FormatFilter { type_dl: TypeDL::Audio, ..Default::default() }.apply(&all);
        assert_eq!(select(&audio_only, Quality::BestPossible).unwrap().id, "251");
        assert_eq!(select(&[], Quality::BestFound), None);
    }

    #[test]
    fn test_names() {
        assert_eq!(Quality::BestPossible.to_string(), "Best possible");
        assert_eq!(TypeDL::VideoWithAudio.to_string(), "Video with audio");
        assert_eq!(Quality::from_repr(1), Some(Quality::BestFound));
        assert_eq!(TypeDL::from_repr(4), None);
        assert_eq!(format("22", "mp4", "avc1", "mp4a").dialog_line(), "?\tmp4\t\tmp4a\tavc1");
    }
}
