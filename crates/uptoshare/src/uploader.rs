//! The upload queue: classifies what it is given, sends it to the site bound for its type,
//! and records the links.

use std::{
    collections::{HashMap, VecDeque},
    path::{Component, Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use applet_runtime::{
    events::{handler, Handler},
    history::{History, HistoryLimit},
    util::StringExt,
};
use dock_shared_util::FileAccess;
use futures::Future;

use crate::{
    error::{Result, UploadError},
    links::{LinkHistory, LinkSet},
    poster::{Payload, PostConfig},
    services::{self, FileType, Sender},
};

pub const HISTORY_FILE: &str = "uptoshare_history.txt";

/// The site name binding a type to the site used for files.
pub const FILE_HOSTING: &str = "-> file hosting";

/// An upload, once classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    File { path: PathBuf, kind: FileType },
    Text(String),
}

impl Job {
    pub fn kind(&self) -> FileType {
        match self {
            Job::File { kind, .. } => *kind,
            Job::Text(_) => FileType::Text,
        }
    }

    /// What gets recorded as `file` in the link set.
    pub fn label(&self) -> String {
        match self {
            Job::File { path, .. } => path.display().to_string(),
            Job::Text(text) => text.clone(),
        }
    }
}

/// The type of a file, guessed from its name.
pub fn file_type(path: &Path) -> Option<FileType> {
    if path.extension().map_or(false, |ext| ext == "ogv") {
        return Some(FileType::Video);
    }
    let mime = mime_guess::from_path(path).first()?;
    match mime.type_().as_str() {
        "video" => Some(FileType::Video),
        "image" => Some(FileType::Image),
        "text" => Some(FileType::Text),
        _ => None,
    }
}

/// `path` made absolute, with `.` and `..` resolved without looking at the file system.
fn clean_path(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut clean = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                clean.pop();
            }
            other => clean.push(other),
        }
    }
    clean
}

/// Tell a file location from text. With `force_file`, everything must be an existing file
/// and is sent as a file.
pub fn classify(data: &str, force_file: bool) -> Result<Job> {
    let candidate = match data.strip_prefix("file://") {
        Some(uri) => PathBuf::from(percent_encoding::percent_decode_str(uri).decode_utf8_lossy().into_owned()),
        None => PathBuf::from(data),
    };
    let path = clean_path(&candidate);

    if data.is_empty() || !path.is_file() {
        return if force_file { Err(UploadError::TextAsFile) } else { Ok(Job::Text(data.to_string())) };
    }
    let kind = if force_file {
        FileType::File
    } else {
        file_type(&path).unwrap_or_else(|| {
            log::info!("File type of {} unknown, uploaded as file", path.display());
            FileType::File
        })
    };
    Ok(Job::File { path, kind })
}

struct Settings {
    sites: HashMap<FileType, Arc<dyn Sender>>,
    force_file_for_all: bool,
    post: PostConfig,
    pre_check: Option<Handler<()>>,
    post_check: Option<Handler<()>>,
    on_result: Option<Handler<LinkSet>>,
}

struct UploaderInner {
    client: reqwest::Client,
    queue: Mutex<VecDeque<String>>,
    active: AtomicBool,
    settings: Mutex<Settings>,
    history: Mutex<History<LinkHistory>>,
}

/// Handle to the upload queue. Clones share the same queue.
#[derive(Clone)]
pub struct Uploader(Arc<UploaderInner>);

impl std::fmt::Debug for Uploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let settings = self.settings();
        f.debug_struct("Uploader")
            .field("sites", &settings.sites.iter().map(|(kind, site)| (*kind, site.name().to_string())).collect::<HashMap<_, _>>())
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl Uploader {
    pub fn new(files: FileAccess) -> Self {
        Uploader(Arc::new(UploaderInner {
            client: reqwest::Client::new(),
            queue: Mutex::new(VecDeque::new()),
            active: AtomicBool::new(false),
            settings: Mutex::new(Settings {
                sites: HashMap::new(),
                force_file_for_all: false,
                post: PostConfig::default(),
                pre_check: None,
                post_check: None,
                on_result: None,
            }),
            history: Mutex::new(History::new(files)),
        }))
    }

    fn settings(&self) -> MutexGuard<'_, Settings> {
        locked(&self.0.settings)
    }

    /// Run before a batch of uploads, e.g. to show an activity emblem.
    pub fn set_pre_check<F, Fut>(&self, f: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.settings().pre_check = Some(handler(move |()| f()));
    }

    pub fn set_post_check<F, Fut>(&self, f: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.settings().post_check = Some(handler(move |()| f()));
    }

    /// Receives the link set of every upload, failed ones included.
    pub fn set_on_result<F, Fut>(&self, f: F)
    where
        F: Fn(LinkSet) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.settings().on_result = Some(handler(f));
    }

    pub fn set_force_file_for_all(&self, force: bool) {
        self.settings().force_file_for_all = force;
    }

    pub fn set_post_anonymous(&self, anonymous: bool) {
        self.settings().post.anonymous = anonymous;
    }

    /// Soft upload rate cap in KiB/s, 0 for none.
    pub fn set_limit_rate(&self, limit_rate: u32) {
        self.settings().post.limit_rate = limit_rate;
    }

    /// Bind a site to a type. `None` or an empty name keep the current site.
    pub fn set_site(&self, kind: FileType, name: &str) -> Result<()> {
        match name {
            "" | "None" => Ok(()),
            FILE_HOSTING => {
                let mut settings = self.settings();
                match settings.sites.get(&FileType::File).cloned() {
                    Some(site) => {
                        settings.sites.insert(kind, site);
                    }
                    None => log::info!("{} bound to {}, but no file site is set", kind, FILE_HOSTING),
                }
                Ok(())
            }
            name => {
                let site = services::site(kind, name).ok_or_else(|| UploadError::UnknownBackend(name.to_string()))?;
                self.set_sender(kind, Arc::new(site));
                Ok(())
            }
        }
    }

    /// Bind any [`Sender`] to a type.
    pub fn set_sender(&self, kind: FileType, sender: Arc<dyn Sender>) {
        self.settings().sites.insert(kind, sender);
    }

    pub fn site_name(&self, kind: FileType) -> Option<String> {
        self.settings().sites.get(&kind).map(|site| site.name().to_string())
    }

    /// Use a new history file, and load its links.
    pub fn set_history_file(&self, path: impl Into<PathBuf>) -> Result<()> {
        Ok(locked(&self.0.history).set_path(path.into())?)
    }

    pub fn set_history_size(&self, size: impl Into<HistoryLimit>) {
        locked(&self.0.history).set_limit(size);
    }

    pub fn list_history(&self) -> Vec<LinkSet> {
        locked(&self.0.history).items().to_vec()
    }

    pub fn is_active(&self) -> bool {
        self.0.active.load(Ordering::SeqCst)
    }

    /// Queue `data` for upload. The first caller finding the queue idle uploads everything
    /// queued until it is empty, later callers return at once.
    pub async fn upload(&self, data: impl Into<String>) {
        locked(&self.0.queue).push_back(data.into());
        while !locked(&self.0.queue).is_empty() {
            if self.0.active.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
                return;
            }
            self.pump().await;
            self.0.active.store(false, Ordering::SeqCst);
        }
    }

    async fn pump(&self) {
        let (pre_check, post_check) = {
            let settings = self.settings();
            (settings.pre_check.clone(), settings.post_check.clone())
        };
        if let Some(pre_check) = pre_check {
            pre_check(()).await;
        }
        loop {
            let Some(data) = locked(&self.0.queue).pop_front() else { break };
            let links = self.upload_one(&data).await;
            if !links.is_error() {
                let mut history = locked(&self.0.history);
                history.push(links.clone());
                applet_runtime::print_result_err!("saving the upload history", history.save());
            }
            let on_result = self.settings().on_result.clone();
            if let Some(on_result) = on_result {
                on_result(links).await;
            }
        }
        if let Some(post_check) = post_check {
            post_check(()).await;
        }
    }

    async fn upload_one(&self, data: &str) -> LinkSet {
        let (job, sender, config) = {
            let settings = self.settings();
            let job = match classify(data, settings.force_file_for_all) {
                Ok(job) => job,
                Err(err) => return LinkSet::error(err.to_string()),
            };
            (job.clone(), settings.sites.get(&job.kind()).cloned(), settings.post.clone())
        };
        let label = job.label();
        log::debug!("Uploading {:?}", job);

        let payload = match &job {
            Job::Text(text) if text.is_blank() => return LinkSet::error("upload: empty text"),
            Job::Text(text) => Payload::Text(text.clone()),
            Job::File { path, .. } => match Payload::file(path) {
                Ok(payload) => payload,
                Err(err) => return LinkSet::error(format!("open file {}: {}", label, err)),
            },
        };
        let Some(sender) = sender else {
            return LinkSet::error(format!("no {} site set, nothing to do with {}", job.kind(), label));
        };

        let mut links = sender.send(&self.0.client, &config, &payload).await;
        if links.is_empty() {
            return LinkSet::error(format!("upload: nothing returned for {}", label));
        }
        if !links.is_error() {
            links.insert("file", label);
            links.insert("type", job.kind().to_string());
            links.insert("date", chrono::Local::now().format("%Y%m%d %H:%M:%S").to_string());
        }
        links
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        poster::{test::serve, Poster},
        services::Host,
    };
    use async_trait::async_trait;
    use axum::{routing::post, Router};
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[test]
    fn test_classify() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("my shot.png");
        std::fs::write(&image, "png").unwrap();
        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, "some notes").unwrap();
        let clip = dir.path().join("clip.ogv");
        std::fs::write(&clip, "ogv").unwrap();
        let blob = dir.path().join("data.unknownext");
        std::fs::write(&blob, "?").unwrap();

        let uri = format!("file://{}", image.display()).replace(' ', "%20");
        assert_eq!(classify(&uri, false).unwrap(), Job::File { path: image.clone(), kind: FileType::Image });
        assert_eq!(classify(&notes.display().to_string(), false).unwrap().kind(), FileType::Text);
        assert_eq!(classify(&clip.display().to_string(), false).unwrap().kind(), FileType::Video);
        assert_eq!(classify(&blob.display().to_string(), false).unwrap().kind(), FileType::File);
        assert_eq!(classify("just some words", false).unwrap(), Job::Text("just some words".into()));
        let detour = dir.path().join("sub/../.").join("notes.txt");
        assert_eq!(classify(&detour.display().to_string(), false).unwrap(), Job::File { path: notes.clone(), kind: FileType::Text });

        assert_eq!(classify(&image.display().to_string(), true).unwrap().kind(), FileType::File);
        insta::assert_snapshot!(
            classify("just some words", true).unwrap_err(),
            @"text entry as FFA option missing (only existing files can be uploaded while every upload is sent as a file)"
        );
    }

    #[test]
    fn test_unreadable_history() {
        let dir = tempfile::tempdir().unwrap();
        let uploader = Uploader::new(FileAccess::new());
        assert!(matches!(uploader.set_history_file(dir.path()), Err(UploadError::History(_))));
        assert!(uploader.list_history().is_empty());
    }

    #[test]
    fn test_set_site() {
        let uploader = Uploader::new(FileAccess::new());
        uploader.set_site(FileType::File, "Transfer.sh").unwrap();
        uploader.set_site(FileType::Video, FILE_HOSTING).unwrap();
        uploader.set_site(FileType::Video, "None").unwrap();
        assert_eq!(uploader.site_name(FileType::Video).as_deref(), Some("Transfer.sh"));

        assert_eq!(uploader.set_site(FileType::Image, "Nope").unwrap_err().to_string(), "backend not found:Nope");
        assert_eq!(uploader.site_name(FileType::Image), None);
    }

    fn collect_results(uploader: &Uploader) -> mpsc::UnboundedReceiver<LinkSet> {
        let (tx, rx) = mpsc::unbounded_channel();
        uploader.set_on_result(move |links| {
            let tx = tx.clone();
            async move { tx.send(links).unwrap() }
        });
        rx
    }

    async fn image_site(answer: &'static str) -> Arc<Host> {
        let base = serve(Router::new().route("/upload", post(move || async move { answer }))).await;
        Arc::new(Host::new("Test", Poster::multipart(format!("{}/upload", base), "file", &[]), |_, answer| {
            LinkSet::found(crate::parse::find_link(answer, "http://example.org/", "\"").unwrap_or_default())
        }))
    }

    #[tokio::test]
    async fn test_upload_success_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("test.png");
        std::fs::write(&image, "png").unwrap();
        let history_file = dir.path().join(HISTORY_FILE);

        let uploader = Uploader::new(FileAccess::new());
        uploader.set_history_file(&history_file).unwrap();
        uploader.set_sender(FileType::Image, image_site(r#"<a href="http://example.org/abc.png">done</a>"#).await);
        let mut results = collect_results(&uploader);

        uploader.upload(image.display().to_string()).await;
        let links = results.recv().await.unwrap();
        assert_eq!(links.link(), Some("http://example.org/abc.png"));
        assert_eq!(links.get("file"), Some(image.display().to_string().as_str()));
        assert_eq!(links.get("type"), Some("image"));
        assert_eq!(links.get("date").map(str::len), Some("20240101 12:00:00".len()));

        assert_eq!(uploader.list_history(), vec![links]);
        let saved = std::fs::read_to_string(&history_file).unwrap();
        assert!(saved.starts_with("[http://example.org/abc.png]\n"));
    }

    #[tokio::test]
    async fn test_empty_answer_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("test.png");
        std::fs::write(&image, "png").unwrap();

        let uploader = Uploader::new(FileAccess::new());
        uploader.set_history_file(dir.path().join(HISTORY_FILE)).unwrap();
        uploader.set_sender(FileType::Image, image_site("").await);
        let mut results = collect_results(&uploader);

        uploader.upload(image.display().to_string()).await;
        let expected = LinkSet::error(format!("upload: nothing returned for {}", image.display()));
        assert_eq!(results.recv().await, Some(expected));
        assert!(uploader.list_history().is_empty());
        assert!(!dir.path().join(HISTORY_FILE).exists());
    }

    /// Answers with a link naming the text it got, after a while.
    struct SlowSite(Mutex<Vec<String>>);

    #[async_trait]
    impl Sender for SlowSite {
        fn name(&self) -> &str {
            "Slow"
        }

        async fn send(&self, _: &reqwest::Client, _: &PostConfig, payload: &Payload) -> LinkSet {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let Payload::Text(text) = payload else { panic!("expected text") };
            self.0.lock().unwrap().push(text.clone());
            LinkSet::found(format!("http://example.org/{}", text))
        }
    }

    #[tokio::test]
    async fn test_queue_keeps_order_and_single_worker() {
        let site = Arc::new(SlowSite(Mutex::new(Vec::new())));
        let uploader = Uploader::new(FileAccess::new());
        uploader.set_sender(FileType::Text, site.clone());
        let batches = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = batches.clone();
        uploader.set_pre_check(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async {}
        });
        let mut results = collect_results(&uploader);

        tokio::join!(uploader.upload("one"), uploader.upload("two"), uploader.upload("three"), uploader.upload(""));
        assert_eq!(*site.0.lock().unwrap(), vec!["one", "two", "three"]);
        assert_eq!(batches.load(Ordering::SeqCst), 1);
        assert!(!uploader.is_active());

        let mut order = Vec::new();
        while let Ok(links) = results.try_recv() {
            order.push(links.link().or(links.error_message()).unwrap().to_string());
        }
        assert_eq!(order, vec!["http://example.org/one", "http://example.org/two", "http://example.org/three", "upload: empty text"]);
        let history: Vec<_> = uploader.list_history().iter().map(|l| l.link().unwrap().to_string()).collect();
        assert_eq!(history, vec!["http://example.org/one", "http://example.org/two", "http://example.org/three"]);
    }

    #[tokio::test]
    async fn test_text_is_never_sent_as_file() {
        let uploader = Uploader::new(FileAccess::new());
        uploader.set_site(FileType::File, "Transfer.sh").unwrap();
        uploader.set_force_file_for_all(true);
        let mut results = collect_results(&uploader);
        uploader.upload("not a file").await;
        assert!(results.recv().await.unwrap().error_message().unwrap().starts_with("text entry as FFA option missing"));
    }
}
