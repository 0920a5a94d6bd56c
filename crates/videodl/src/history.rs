//! The download queue and the done list, saved together as one json array.

use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
};

use applet_runtime::history::{read_history, write_history, HistoryLimit, Json};
use chrono::Local;
use dock_shared_util::FileAccess;

use crate::{
    error::{Error, Result},
    video::Video,
};

pub const HISTORY_FILE: &str = "videodl_history.txt";

/// One of the two lists of the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ListKind {
    Done,
    Queue,
}

/// Videos still to download, head first, and videos done, oldest first.
/// A video is in one list only, and is done exactly when it has a `date_done`.
#[derive(Debug)]
pub struct VideoHistory {
    path: Option<PathBuf>,
    files: FileAccess,
    limit: HistoryLimit,
    queue: VecDeque<Video>,
    done: Vec<Video>,
}

impl VideoHistory {
    pub fn new(files: FileAccess) -> Self {
        VideoHistory { path: None, files, limit: HistoryLimit::default(), queue: VecDeque::new(), done: Vec::new() }
    }

    /// Use a new file and load its videos. Any video without a done date goes back to the queue.
    pub fn set_path(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        let videos = read_history::<Json<Video>>(&path, &self.files)?;
        self.path = Some(path);
        let (done, queue): (Vec<_>, Vec<_>) = videos.into_iter().partition(Video::is_done);
        self.done = done;
        self.queue = queue.into();
        self.limit.trim(&mut self.done);
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Bound the done list.
    pub fn set_limit(&mut self, limit: impl Into<HistoryLimit>) {
        self.limit = limit.into();
        self.limit.trim(&mut self.done);
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else { return Ok(()) };
        let all: Vec<Video> = self.done.iter().chain(self.queue.iter()).cloned().collect();
        Ok(write_history::<Json<Video>>(path, &self.files, &all)?)
    }

    /// Queue a video. A done video with the same url leaves the done list. A url already queued
    /// is updated in place and keeps its position, and `false` is returned.
    pub fn add(&mut self, mut video: Video) -> Result<bool> {
        video.date_done = None;
        video.fail = false;
        let added = match self.queue.iter_mut().find(|v| v.url == video.url) {
            Some(queued) => {
                log::info!("{} is already queued", video.url);
                *queued = video;
                false
            }
            None => {
                self.done.retain(|v| v.url != video.url);
                self.queue.push_back(video);
                true
            }
        };
        self.save()?;
        Ok(added)
    }

    pub fn next(&self) -> Option<&Video> {
        self.queue.front()
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn queue(&self) -> impl Iterator<Item = &Video> {
        self.queue.iter()
    }

    pub fn done(&self) -> &[Video] {
        &self.done
    }

    pub fn list(&self, kind: ListKind) -> Vec<&Video> {
        match kind {
            ListKind::Done => self.done.iter().collect(),
            ListKind::Queue => self.queue.iter().collect(),
        }
    }

    /// Move the queued video `url` to the done list.
    pub fn finish(&mut self, url: &str, fail: bool) -> Result<Video> {
        let position = self.queue.iter().position(|v| v.url == url).ok_or_else(|| Error::NotFound(url.to_string()))?;
        let mut video = self.queue.remove(position).ok_or_else(|| Error::NotFound(url.to_string()))?;
        video.date_done = Some(Local::now());
        video.fail = fail;
        self.done.push(video.clone());
        self.limit.trim(&mut self.done);
        self.save()?;
        Ok(video)
    }

    pub fn remove(&mut self, url: &str, kind: ListKind) -> Result<Video> {
        let not_found = || Error::NotFound(url.to_string());
        let video = match kind {
            ListKind::Done => {
                let position = self.done.iter().position(|v| v.url == url).ok_or_else(not_found)?;
                self.done.remove(position)
            }
            ListKind::Queue => {
                let position = self.queue.iter().position(|v| v.url == url).ok_or_else(not_found)?;
                self.queue.remove(position).ok_or_else(not_found)?
            }
        };
        self.save()?;
        Ok(video)
    }

    /// The video with source `url`, done ones first.
    pub fn find(&self, url: &str) -> Option<&Video> {
        self.done.iter().chain(self.queue.iter()).find(|v| v.url == url)
    }

    /// Change a video and save.
    pub fn update<T>(&mut self, url: &str, f: impl FnOnce(&mut Video) -> T) -> Result<T> {
        let video = self.done.iter_mut().chain(self.queue.iter_mut()).find(|v| v.url == url).ok_or_else(|| Error::NotFound(url.to_string()))?;
        let result = f(video);
        self.save()?;
        Ok(result)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn urls<'a>(videos: impl IntoIterator<Item = &'a Video>) -> Vec<&'a str> {
        videos.into_iter().map(|v| v.url.as_str()).collect()
    }

    #[test]
    fn test_queue_and_done_stay_apart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(HISTORY_FILE);
        let mut history = VideoHistory::new(FileAccess::new());
        history.set_path(&path).unwrap();
        history.set_limit(2);

        for url in ["a", "b", "c", "d"] {
            assert!(history.add(Video::new(url, url.to_uppercase())).unwrap());
        }
        assert!(!history.add(Video::new("a", "again")).unwrap());
        assert_eq!(history.next().map(|v| v.name.as_str()), Some("again"));
        assert_eq!(history.queued(), 4);

        for url in ["a", "b", "c"] {
            assert!(history.finish(url, url == "b").unwrap().is_done());
        }
        assert_eq!(urls(history.done()), vec!["b", "c"]);
        assert_eq!(urls(history.queue()), vec!["d"]);
        assert!(history.done()[0].fail);

        assert!(history.add(Video::new("c", "C")).unwrap());
        assert_eq!(urls(history.done()), vec!["b"]);
        assert_eq!(urls(history.queue()), vec!["d", "c"]);
        assert!(history.queue().all(|v| !v.is_done()));

        let mut reloaded = VideoHistory::new(FileAccess::new());
        reloaded.set_path(&path).unwrap();
        assert_eq!(urls(reloaded.done()), vec!["b"]);
        assert_eq!(urls(reloaded.queue()), vec!["d", "c"]);
    }

    #[test]
    fn test_update_and_remove() {
        let mut history = VideoHistory::new(FileAccess::new());
        history.add(Video::new("a", "A")).unwrap();
        history.add(Video::new("b", "B")).unwrap();
        history.finish("b", false).unwrap();

        assert_eq!(history.update("b", |v| std::mem::replace(&mut v.viewed, true)).unwrap(), false);
        assert!(history.find("b").unwrap().viewed);
        assert!(matches!(history.update("zz", |_| ()), Err(Error::NotFound(_))));

        assert!(history.remove("b", ListKind::Queue).is_err());
        assert_eq!(history.remove("b", ListKind::Done).unwrap().name, "B");
        assert_eq!(history.remove("a", ListKind::Queue).unwrap().name, "A");
        assert_eq!(history.queued(), 0);
        assert_eq!("queue".parse::<ListKind>().unwrap(), ListKind::Queue);
    }
}
