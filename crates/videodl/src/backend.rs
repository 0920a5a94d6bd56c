//! The seam between the manager and the tools that know how to fetch videos.

use std::{
    path::Path,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    error::Result,
    format::{Format, Quality},
};

/// Opens videos by url.
#[async_trait]
pub trait Backend: Send + Sync {
    fn name(&self) -> &str;

    /// Qualities offered in the menu.
    fn qualities(&self) -> &[Quality];

    /// Whether the backend can handle `url` at all.
    fn supports(&self, url: &str) -> bool {
        url::Url::parse(url).map_or(false, |url| matches!(url.scheme(), "http" | "https"))
    }

    /// Read the title and formats of the video.
    async fn open(&self, url: &str) -> Result<Arc<dyn Filer>>;
}

/// How a transfer ended, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Canceled,
}

/// One opened video.
#[async_trait]
pub trait Filer: Send + Sync {
    fn title(&self) -> &str;

    /// Best first.
    fn formats(&self) -> &[Format];

    /// Download `format` as `file_stem.<ext>` in `dir`, until done or `cancel` fires.
    async fn download(&self, dir: &Path, file_stem: &str, format: &Format, progress: Progress, cancel: CancellationToken) -> Result<Outcome>;
}

/// Percentage of the running transfer, shared with whoever displays it.
#[derive(Debug, Clone, Default)]
pub struct Progress(Arc<AtomicU64>);

impl Progress {
    pub fn set(&self, percent: f64) {
        self.0.store(percent.clamp(0.0, 100.0).to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
pub(crate) mod test {
    //! A backend serving canned videos, for the manager tests.

    use super::*;
    use crate::error::Error;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    /// What a [`MockFiler`] does when asked to download.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) enum Behavior {
        Complete,
        /// Runs until canceled.
        Hang,
        Fail,
    }

    pub(crate) struct MockBackend {
        pub(crate) formats: Vec<Format>,
        pub(crate) behavior: Arc<Mutex<Behavior>>,
        /// (url, format id, progress at start) of every download.
        pub(crate) started: mpsc::UnboundedSender<(String, String, f64)>,
    }

    impl MockBackend {
        pub(crate) fn new(formats: Vec<Format>) -> (Self, mpsc::UnboundedReceiver<(String, String, f64)>) {
            let (started, rx) = mpsc::unbounded_channel();
            (MockBackend { formats, behavior: Arc::new(Mutex::new(Behavior::Complete)), started }, rx)
        }

        pub(crate) fn set_behavior(&self, behavior: Behavior) {
            *self.behavior.lock().unwrap() = behavior;
        }
    }

    struct MockFiler {
        url: String,
        formats: Vec<Format>,
        behavior: Behavior,
        started: mpsc::UnboundedSender<(String, String, f64)>,
    }

    #[async_trait]
    impl Backend for MockBackend {
        fn name(&self) -> &str {
            "mock"
        }

        fn qualities(&self) -> &[Quality] {
            &[Quality::Ask, Quality::BestFound]
        }

        async fn open(&self, url: &str) -> Result<Arc<dyn Filer>> {
            Ok(Arc::new(MockFiler {
                url: url.to_string(),
                formats: self.formats.clone(),
                behavior: *self.behavior.lock().unwrap(),
                started: self.started.clone(),
            }))
        }
    }

    #[async_trait]
    impl Filer for MockFiler {
        fn title(&self) -> &str {
            "Mock video"
        }

        fn formats(&self) -> &[Format] {
            &self.formats
        }

        async fn download(&self, dir: &Path, file_stem: &str, format: &Format, progress: Progress, cancel: CancellationToken) -> Result<Outcome> {
            self.started.send((self.url.clone(), format.id.clone(), progress.get())).unwrap();
            progress.set(40.0);
            match self.behavior {
                Behavior::Complete => {
                    std::fs::write(dir.join(format!("{}.{}", file_stem, format.extension)), "video").unwrap();
                    progress.set(100.0);
                    Ok(Outcome::Done)
                }
                Behavior::Hang => {
                    cancel.cancelled().await;
                    Ok(Outcome::Canceled)
                }
                Behavior::Fail => Err(Error::Backend { command: "mock".into(), message: "HTTP Error 403".into() }),
            }
        }
    }
}
