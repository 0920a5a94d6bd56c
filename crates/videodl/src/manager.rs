//! The download manager: one worker downloading the head of the queue, the quality dialogs,
//! and the actions and menu exposed to the applet.

use std::{
    collections::HashMap,
    ffi::OsStr,
    path::PathBuf,
    process::Stdio,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use applet_runtime::{
    dialog::{on_valid_int, DialogCallback, DialogData, DialogWidget, ListInitial, ListWidget},
    events::{handler, Handler},
    history::HistoryLimit,
    util::replace_env_var_references,
    websrv::DEFAULT_PORT,
    Action, ActionMenu, Actions, Icon, Menuer, WebServer,
};
use async_trait::async_trait;
use dock_shared_util::FileAccess;
use futures::{future::BoxFuture, Future, FutureExt};
use smart_default::SmartDefault;
use strum::IntoEnumIterator;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    backend::{Backend, Filer, Outcome, Progress},
    error::{Error, Result},
    format::{self, Format, FormatFilter, Quality, TypeDL},
    history::VideoHistory,
    video::Video,
    ytdlp::{BackendId, YtDlp},
};

pub const WEB_PATH: &str = "/video";

/// Categories offered to sort the next downloads.
pub const CATEGORIES: [&str; 3] = ["", "Go Game", "Info"];

const GROUP_QUALITY: i32 = 442;
const GROUP_TYPE_DL: i32 = 443;
const ICON_MENU: &str = "video-x-generic";

/// Actions of the manager, numbered from the first id given to [`Manager::define_actions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumIter)]
pub enum VideoAction {
    OpenFolder,
    CancelDownload,
    EnableDownload,
    EnableWeb,
    EditList,
}

impl VideoAction {
    pub const COUNT: usize = 5;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::FromRepr)]
pub enum WebState {
    #[default]
    Disabled,
    Stopped,
    Started,
}

impl WebState {
    pub fn tooltip() -> &'static str {
        "The web service allows links forwarding directly from your browser\nand the web page to edit the download history."
    }
}

/// Shows dialogs for the manager.
#[async_trait]
pub trait Popup: Send + Sync {
    async fn popup(&self, data: DialogData, callback: DialogCallback) -> dockbus::Result<()>;
}

#[async_trait]
impl Popup for Icon {
    async fn popup(&self, data: DialogData, callback: DialogCallback) -> dockbus::Result<()> {
        self.popup_dialog(data, callback).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, SmartDefault)]
pub struct Config {
    pub dir: PathBuf,
    pub backend: BackendId,
    pub quality: Quality,
    pub type_dl: TypeDL,
    /// Extensions never offered.
    pub blacklist: Vec<String>,
    #[default("xdg-open".to_string())]
    pub cmd_open_dir: String,
    #[default("xdg-open".to_string())]
    pub cmd_open_video: String,
    #[default("xdg-open".to_string())]
    pub cmd_open_web: String,
    /// Host the web page is served on, loopback when empty.
    pub web_host: String,
    pub web_state: WebState,
    #[default(true)]
    pub enabled_dl: bool,
    /// `window.open` features used by the bookmarklet.
    pub js_window_option: String,
}

struct Settings {
    dir: PathBuf,
    quality: Quality,
    filter: FormatFilter,
    cmd_open_dir: String,
    cmd_open_video: String,
    cmd_open_web: String,
    js_window_option: String,
    enabled_web: bool,
    category: String,
}

impl Settings {
    fn new(config: &Config) -> Self {
        Settings {
            dir: config.dir.clone(),
            quality: config.quality,
            filter: FormatFilter { type_dl: config.type_dl, blacklist: config.blacklist.clone() },
            cmd_open_dir: config.cmd_open_dir.clone(),
            cmd_open_video: config.cmd_open_video.clone(),
            cmd_open_web: config.cmd_open_web.clone(),
            js_window_option: config.js_window_option.clone(),
            enabled_web: config.web_state != WebState::Disabled,
            category: String::new(),
        }
    }
}

struct ManagerInner {
    backend: Mutex<Arc<dyn Backend>>,
    settings: Mutex<Settings>,
    history: Mutex<VideoHistory>,
    /// Opened while choosing the format, kept once the video is queued and taken by the worker.
    filers: Mutex<HashMap<String, Arc<dyn Filer>>>,
    enabled_dl: Arc<AtomicBool>,
    started_web: Arc<AtomicBool>,
    active: AtomicBool,
    running: Mutex<Option<CancellationToken>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    progress: Progress,
    pre_check: Mutex<Option<Handler<()>>>,
    post_check: Mutex<Option<Handler<()>>>,
    popup: Arc<dyn Popup>,
    web: WebServer,
    actions: Actions,
    first_action: AtomicUsize,
}

/// Handle to the download manager. Clones share the same queue.
#[derive(Clone)]
pub struct Manager(Arc<ManagerInner>);

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("backend", &self.backend().name().to_string())
            .field("active", &self.is_active())
            .field("queued", &self.queued())
            .finish_non_exhaustive()
    }
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Run `command` (a program and its first arguments) on `arg`, without waiting for it.
fn spawn_command(command: &str, arg: impl AsRef<OsStr>) {
    let command = replace_env_var_references(command.to_string());
    let mut parts = command.split_whitespace();
    let Some(program) = parts.next() else {
        log::warn!("No command set to open {:?}", arg.as_ref());
        return;
    };
    if let Err(err) = tokio::process::Command::new(program).args(parts).arg(arg).stdin(Stdio::null()).spawn() {
        log::error!("Could not run {}: {}", command, err);
    }
}

/// The format chooser of one video, carried through the dialogs.
struct QualityChoice {
    video: Video,
    filer: Arc<dyn Filer>,
    formats: Vec<Format>,
    /// Delete the file of the current format once the new one is downloaded.
    delete_current: bool,
}

fn quality_dialog(choice: &QualityChoice, category: &str) -> DialogData {
    let mut values: Vec<String> = choice.formats.iter().map(Format::dialog_line).collect();
    values.push(format!("Category: {}", category));
    if choice.video.format.is_some() {
        values.push(format!("Delete current file: {}", if choice.delete_current { "Yes" } else { "No" }));
    }
    DialogData {
        message: format!("{}\n\nSelect quality:", choice.video.name),
        buttons: "ok;cancel".to_string(),
        widget: Some(DialogWidget::List(ListWidget { editable: false, values, initial: ListInitial::Index(0) })),
        ..Default::default()
    }
}

fn category_dialog(name: &str, current: &str) -> DialogData {
    let selected = CATEGORIES.iter().position(|c| *c == current).unwrap_or(0);
    DialogData {
        message: format!("{}\n\nSelect category:", name),
        buttons: "ok;cancel".to_string(),
        widget: Some(DialogWidget::List(ListWidget {
            editable: false,
            values: CATEGORIES.iter().map(|c| c.to_string()).collect(),
            initial: ListInitial::Index(selected as i32),
        })),
        ..Default::default()
    }
}

impl Manager {
    pub fn new(files: FileAccess, popup: Arc<dyn Popup>, web: WebServer, actions: Actions) -> Self {
        let config = Config::default();
        Manager(Arc::new(ManagerInner {
            backend: Mutex::new(Arc::new(YtDlp::new(config.backend))),
            settings: Mutex::new(Settings::new(&config)),
            history: Mutex::new(VideoHistory::new(files)),
            filers: Mutex::default(),
            enabled_dl: Arc::new(AtomicBool::new(config.enabled_dl)),
            started_web: Arc::default(),
            active: AtomicBool::new(false),
            running: Mutex::default(),
            worker: Mutex::default(),
            progress: Progress::default(),
            pre_check: Mutex::default(),
            post_check: Mutex::default(),
            popup,
            web,
            actions,
            first_action: AtomicUsize::new(0),
        }))
    }

    fn settings(&self) -> MutexGuard<'_, Settings> {
        locked(&self.0.settings)
    }

    fn backend(&self) -> Arc<dyn Backend> {
        locked(&self.0.backend).clone()
    }

    /// The history, locked. Don't hold it across an await.
    pub fn history(&self) -> MutexGuard<'_, VideoHistory> {
        locked(&self.0.history)
    }

    // Settings

    pub async fn set_config(&self, config: &Config) {
        self.set_backend(Arc::new(YtDlp::new(config.backend)));
        {
            let mut settings = self.settings();
            let category = std::mem::take(&mut settings.category);
            *settings = Settings { category, ..Settings::new(config) };
        }
        if !config.web_host.is_empty() {
            self.0.web.set_address(&config.web_host, DEFAULT_PORT);
        }
        self.set_enabled_web(config.web_state).await;
        self.set_enabled_dl(config.enabled_dl);
    }

    pub fn set_backend(&self, backend: Arc<dyn Backend>) {
        *locked(&self.0.backend) = backend;
    }

    pub fn set_dir(&self, dir: impl Into<PathBuf>) {
        self.settings().dir = dir.into();
    }

    pub fn dir(&self) -> PathBuf {
        self.settings().dir.clone()
    }

    pub fn quality(&self) -> Quality {
        self.settings().quality
    }

    pub fn set_quality(&self, quality: Quality) {
        self.settings().quality = quality;
    }

    pub fn type_dl(&self) -> TypeDL {
        self.settings().filter.type_dl
    }

    pub fn set_type_dl(&self, type_dl: TypeDL) {
        self.settings().filter.type_dl = type_dl;
    }

    pub fn js_window_option(&self) -> String {
        self.settings().js_window_option.clone()
    }

    pub fn set_history_file(&self, path: impl Into<PathBuf>) -> Result<()> {
        self.history().set_path(path)
    }

    pub fn set_history_size(&self, size: impl Into<HistoryLimit>) {
        self.history().set_limit(size);
    }

    /// Run before the worker starts, e.g. to show an activity emblem.
    pub fn set_pre_check<F, Fut>(&self, f: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        *locked(&self.0.pre_check) = Some(handler(move |()| f()));
    }

    pub fn set_post_check<F, Fut>(&self, f: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        *locked(&self.0.post_check) = Some(handler(move |()| f()));
    }

    // State

    pub fn is_active(&self) -> bool {
        self.0.active.load(Ordering::SeqCst)
    }

    /// Percentage of the running download.
    pub fn progress(&self) -> Option<f64> {
        self.is_active().then(|| self.0.progress.get())
    }

    pub fn queued(&self) -> usize {
        self.history().queued()
    }

    pub fn is_enabled_dl(&self) -> bool {
        self.0.enabled_dl.load(Ordering::SeqCst)
    }

    /// Pause or resume the queue. A paused queue finishes the running download.
    pub fn set_enabled_dl(&self, enabled: bool) {
        self.0.enabled_dl.store(enabled, Ordering::SeqCst);
        if enabled {
            self.start();
        }
    }

    pub fn toggle_enable_download(&self) {
        self.set_enabled_dl(!self.is_enabled_dl());
    }

    /// Where the video is (or will be) saved.
    pub fn file_path(&self, video: &Video) -> PathBuf {
        video.file_path(&self.settings().dir)
    }

    // Queue

    /// Add the video at `url`, with the configured quality, or asking for it.
    pub async fn download(&self, url: &str) -> Result<()> {
        let backend = self.backend();
        if !backend.supports(url) {
            return Err(Error::UnsupportedUrl(url.to_string()));
        }
        let filer = backend.open(url).await?;
        let mut video = Video::new(url, filer.title());
        video.category = self.settings().category.clone();
        self.choose_quality(video, filer, false).await
    }

    /// Ask again the format of a known video.
    pub async fn edit_quality(&self, url: &str) -> Result<()> {
        let video = self.history().find(url).cloned().ok_or_else(|| Error::NotFound(url.to_string()))?;
        let filer = self.backend().open(url).await?;
        self.choose_quality(video, filer, true).await
    }

    async fn choose_quality(&self, video: Video, filer: Arc<dyn Filer>, ask: bool) -> Result<()> {
        let (formats, quality) = {
            let settings = self.settings();
            (settings.filter.apply(filer.formats()), if ask { Quality::Ask } else { settings.quality })
        };
        if formats.is_empty() {
            return Err(Error::NoFormat);
        }
        match format::select(&formats, quality) {
            Some(format) => self.queue_with_format(video, format, false, filer),
            None => {
                let delete_current = video.format.is_some();
                self.dialog_quality(QualityChoice { video, filer, formats, delete_current }).await;
                Ok(())
            }
        }
    }

    fn queue_with_format(&self, mut video: Video, mut format: Format, delete_current: bool, filer: Arc<dyn Filer>) -> Result<()> {
        if let Some(current) = &video.format {
            // same extension: the current file is overwritten
            if delete_current && current.extension != format.extension {
                format.delete_after = Some(current.extension.clone());
            }
        }
        video.format = Some(format);
        // the worker may take the video as soon as it is queued
        let url = video.url.clone();
        locked(&self.0.filers).insert(url.clone(), filer);
        if let Err(err) = self.enqueue(video) {
            locked(&self.0.filers).remove(&url);
            return Err(err);
        }
        self.start();
        Ok(())
    }

    pub fn enqueue(&self, video: Video) -> Result<bool> {
        self.history().add(video)
    }

    /// Start the worker, unless it runs already, downloads are paused or the queue is empty.
    pub fn start(&self) -> bool {
        if !self.is_enabled_dl() || self.queued() == 0 {
            return false;
        }
        if self.0.active.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            return false;
        }
        let manager = self.clone();
        let worker = tokio::spawn(async move { manager.work().await });
        *locked(&self.0.worker) = Some(worker);
        true
    }

    /// Interrupt the running download. Its video stays at the head of the queue.
    pub fn cancel_download(&self) {
        if let Some(token) = locked(&self.0.running).take() {
            log::info!("Canceling the download");
            token.cancel();
        }
    }

    /// Wait until the worker is done.
    pub async fn wait_idle(&self) {
        let worker = locked(&self.0.worker).take();
        if let Some(worker) = worker {
            if let Err(err) = worker.await {
                log::error!("Download worker crashed: {}", err);
            }
        }
    }

    /// Cancel the running download and wait for the worker.
    pub async fn stop(&self) {
        self.cancel_download();
        self.wait_idle().await;
    }

    async fn work(&self) {
        let pre_check = locked(&self.0.pre_check).clone();
        if let Some(pre_check) = pre_check {
            pre_check(()).await;
        }

        let mut canceled = false;
        while self.is_enabled_dl() {
            let Some(video) = self.history().next().cloned() else { break };
            log::info!("Downloading {}", video.name);
            let result = self.download_head(&video).await;
            let failed = match result {
                Ok(Outcome::Canceled) => {
                    canceled = true;
                    break;
                }
                Ok(Outcome::Done) => false,
                Err(err) => {
                    log::error!("Download of {} failed: {}", video.url, err);
                    true
                }
            };
            // done or failed, the same video is not tried again in a row
            applet_runtime::print_result_err!("saving the video history", self.history().finish(&video.url, failed));
            if !failed {
                self.delete_previous_file(&video).await;
            }
        }

        let post_check = locked(&self.0.post_check).clone();
        if let Some(post_check) = post_check {
            post_check(()).await;
        }
        self.0.progress.set(0.0);
        self.0.active.store(false, Ordering::SeqCst);
        if !canceled {
            // catch videos queued while stopping
            self.start();
        }
    }

    async fn download_head(&self, video: &Video) -> Result<Outcome> {
        let token = CancellationToken::new();
        *locked(&self.0.running) = Some(token.clone());
        self.0.progress.set(0.0);
        let outcome = self.transfer(video, token).await;
        locked(&self.0.running).take();
        outcome
    }

    async fn transfer(&self, video: &Video, token: CancellationToken) -> Result<Outcome> {
        let cached = locked(&self.0.filers).remove(&video.url);
        let filer = match cached {
            Some(filer) => filer,
            None => {
                let backend = self.backend();
                if !backend.supports(&video.url) {
                    return Err(Error::UnsupportedUrl(video.url.clone()));
                }
                tokio::select! {
                    filer = backend.open(&video.url) => filer?,
                    _ = token.cancelled() => return Ok(Outcome::Canceled),
                }
            }
        };

        let format = match &video.format {
            Some(format) => format.clone(),
            None => {
                let (formats, quality) = {
                    let settings = self.settings();
                    (settings.filter.apply(filer.formats()), settings.quality)
                };
                let format = format::select(&formats, quality).or_else(|| formats.first().cloned()).ok_or(Error::NoFormat)?;
                let chosen = format.clone();
                self.history().update(&video.url, move |v| v.format = Some(chosen))?;
                format
            }
        };

        let dir = self.dir();
        if let Err(err) = tokio::fs::create_dir_all(&dir).await {
            log::warn!("Could not create {}: {}", dir.display(), err);
        }
        filer.download(&dir, &video.file_stem(), &format, self.0.progress.clone(), token).await
    }

    async fn delete_previous_file(&self, video: &Video) {
        let Some(extension) = video.format.as_ref().and_then(|f| f.delete_after.as_deref()) else { return };
        let path = video.file_path_with(&self.dir(), extension);
        log::info!("Deleting previous download {}", path.display());
        if let Err(err) = tokio::fs::remove_file(&path).await {
            log::warn!("Could not delete {}: {}", path.display(), err);
        }
    }

    // Dialogs

    fn dialog_quality(&self, choice: QualityChoice) -> BoxFuture<'static, ()> {
        let manager = self.clone();
        async move {
            let data = quality_dialog(&choice, &manager.settings().category);
            let count = choice.formats.len() as i32;
            let reselect = choice.video.format.is_some();
            let this = manager.clone();
            let callback = on_valid_int(move |index| async move {
                let mut choice = choice;
                match index {
                    i if (0..count).contains(&i) => {
                        let format = choice.formats[i as usize].clone();
                        let result = this.queue_with_format(choice.video, format, choice.delete_current, choice.filer);
                        applet_runtime::print_result_err!("queueing the video", result);
                    }
                    i if i == count => this.dialog_category(choice).await,
                    i if i == count + 1 && reselect => {
                        choice.delete_current = !choice.delete_current;
                        this.dialog_quality(choice).await
                    }
                    i => log::error!("Quality {} out of range", i),
                }
            });
            applet_runtime::print_result_err!("showing the quality dialog", manager.0.popup.popup(data, callback).await);
        }
        .boxed()
    }

    fn dialog_category(&self, choice: QualityChoice) -> BoxFuture<'static, ()> {
        let manager = self.clone();
        async move {
            let data = category_dialog(&choice.video.name, &manager.settings().category);
            let this = manager.clone();
            let callback = on_valid_int(move |index| async move {
                let mut choice = choice;
                let Some(category) = usize::try_from(index).ok().and_then(|i| CATEGORIES.get(i)) else {
                    log::error!("Category {} out of range", index);
                    return;
                };
                this.settings().category = category.to_string();
                choice.video.category = category.to_string();
                this.dialog_quality(choice).await
            });
            applet_runtime::print_result_err!("showing the category dialog", manager.0.popup.popup(data, callback).await);
        }
        .boxed()
    }

    // Web service

    pub fn web(&self) -> &WebServer {
        &self.0.web
    }

    /// Serve the web page routes, stopped until the web service is started.
    pub fn web_register(&self) {
        self.0.web.register(WEB_PATH, crate::web::router(self.clone()));
    }

    pub fn web_unregister(&self) {
        self.0.web.unregister(WEB_PATH);
        self.0.started_web.store(false, Ordering::SeqCst);
    }

    pub fn web_url(&self) -> String {
        format!("http://{}{}", self.0.web.url(), WEB_PATH)
    }

    pub fn is_started_web(&self) -> bool {
        self.0.started_web.load(Ordering::SeqCst)
    }

    pub async fn set_enabled_web(&self, state: WebState) {
        self.settings().enabled_web = state != WebState::Disabled;
        self.set_started_web(state == WebState::Started).await;
    }

    /// Start or stop serving the web page. Starting needs the web service enabled.
    pub async fn set_started_web(&self, start: bool) {
        if start {
            if !self.settings().enabled_web || self.is_started_web() {
                return;
            }
            match self.0.web.start(WEB_PATH).await {
                Ok(()) => self.0.started_web.store(true, Ordering::SeqCst),
                Err(err) => log::error!("Could not start the web service: {:?}", err),
            }
        } else if self.is_started_web() {
            self.0.web.stop(WEB_PATH);
            self.0.started_web.store(false, Ordering::SeqCst);
        }
    }

    pub async fn toggle_enable_web(&self) {
        self.set_started_web(!self.is_started_web()).await;
    }


    // Actions

    pub fn open_folder(&self) {
        let (command, dir) = {
            let settings = self.settings();
            (settings.cmd_open_dir.clone(), settings.dir.clone())
        };
        spawn_command(&command, dir);
    }

    pub fn open_video(&self, video: &Video) {
        let command = self.settings().cmd_open_video.clone();
        spawn_command(&command, self.file_path(video));
    }

    /// Open the web page in the browser, starting the web service.
    pub async fn edit_list(&self) {
        self.set_started_web(true).await;
        let command = self.settings().cmd_open_web.clone();
        spawn_command(&command, self.web_url());
    }

    fn action_id(&self, action: VideoAction) -> usize {
        self.0.first_action.load(Ordering::SeqCst) + action as usize
    }

    /// Add the manager actions to the actions table, from `first_id` on.
    pub fn define_actions(&self, first_id: usize) {
        self.0.first_action.store(first_id, Ordering::SeqCst);
        let actions = VideoAction::iter().map(|action| {
            let manager = self.clone();
            let id = first_id + action as usize;
            match action {
                VideoAction::OpenFolder => Action::new(id, "Open video folder", "folder", ActionMenu::Entry).with_call(move || {
                    manager.open_folder();
                    async {}
                }),
                VideoAction::CancelDownload => Action::new(id, "Cancel download", "edit-undo", ActionMenu::Entry).with_call(move || {
                    manager.cancel_download();
                    async {}
                }),
                VideoAction::EnableDownload => Action::new(id, "Enable download", "", ActionMenu::CheckBox)
                    .with_state(self.0.enabled_dl.clone())
                    .with_call(move || {
                        manager.toggle_enable_download();
                        async {}
                    }),
                VideoAction::EnableWeb => Action::new(id, "Enable web service", "", ActionMenu::CheckBox)
                    .with_state(self.0.started_web.clone())
                    .with_tooltip(WebState::tooltip())
                    .with_call(move || {
                        let manager = manager.clone();
                        async move { manager.toggle_enable_web().await }
                    }),
                VideoAction::EditList => Action::new(id, "Edit list", "media-playlist-repeat", ActionMenu::Entry)
                    .with_tooltip("Note that this will enable the web service\nYou may have to stop it manually when not needed anymore if you prefer.")
                    .threaded()
                    .with_call(move || {
                        let manager = manager.clone();
                        async move { manager.edit_list().await }
                    }),
            }
        });
        self.0.actions.add(actions.collect::<Vec<_>>());
    }

    // Menu

    /// Fill the applet menu with the manager entries.
    pub fn menu(&self, menu: &mut impl Menuer) {
        let actions = &self.0.actions;
        actions.build_menu(menu, &[self.action_id(VideoAction::OpenFolder), self.action_id(VideoAction::EnableDownload)]);
        if self.is_active() {
            actions.build_menu(menu, &[self.action_id(VideoAction::CancelDownload)]);
        }

        let title = if self.is_enabled_dl() { "Video Download".to_string() } else { "Video Download (paused)".to_string() };
        let mut sub = menu.add_sub_menu(&title, ICON_MENU);
        let queued = self.queued();
        if queued > 0 {
            sub.add_entry(&format!("Queued: {}", queued), "emblem-downloads", || {});
            sub.add_separator();
        }
        actions.build_menu(&mut sub, &[self.action_id(VideoAction::EditList), self.action_id(VideoAction::EnableWeb)]);
        self.menu_type_dl(&mut sub);
        self.menu_quality(&mut sub);
    }

    fn menu_type_dl(&self, menu: &mut impl Menuer) {
        let current = self.type_dl();
        let mut sub = menu.add_sub_menu(&format!("File Type: {}", current), ICON_MENU);
        for type_dl in TypeDL::iter() {
            let manager = self.clone();
            sub.add_radio_entry(&type_dl.to_string(), type_dl == current, GROUP_TYPE_DL, move || manager.set_type_dl(type_dl))
                .set_tooltip(type_dl.tooltip());
        }
    }

    fn menu_quality(&self, menu: &mut impl Menuer) {
        let qualities = self.backend().qualities().to_vec();
        if qualities.is_empty() {
            return;
        }
        let current = self.quality();
        let mut sub = menu.add_sub_menu(&format!("Quality: {}", current), ICON_MENU);
        for quality in qualities {
            let manager = self.clone();
            let item = sub.add_radio_entry(&quality.to_string(), quality == current, GROUP_QUALITY, move || manager.set_quality(quality));
            if !quality.tooltip().is_empty() {
                item.set_tooltip(quality.tooltip());
            }
        }
    }
}
