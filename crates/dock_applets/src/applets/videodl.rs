//! Downloads the videos whose links are dropped on the icon or sent from the browser.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use applet_runtime::{
    config::{ConfError, ConfGroup, FromKeyFile, KeyFile},
    AppBase, Applet, Defaults, EmblemPosition, Events,
};
use async_trait::async_trait;
use dockbus::DockConnection;
use smart_default::SmartDefault;
use videodl::{BackendId, Manager, Popup, Quality, TypeDL, VideoAction, WebState, HISTORY_FILE};

const EMBLEM_DOWNLOAD: &str = "emblem-downloads";
const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, SmartDefault)]
pub struct Config {
    pub name: String,
    pub video: videodl::Config,
    #[default(-1)]
    pub history_size: i32,
    pub debug: bool,
}

/// Read a choice stored as its position in the list shown by the config window.
fn fill_choice<T>(group: &mut ConfGroup, key: &str, target: &mut T, from_repr: fn(usize) -> Option<T>) {
    let Some(index) = group.primitive_optional::<i64>(key) else { return };
    match usize::try_from(index).ok().and_then(from_repr) {
        Some(value) => *target = value,
        None => log::warn!("[{}] {}: no choice {}, keeping the default", group.name(), key, index),
    }
}

impl FromKeyFile for Config {
    fn from_key_file(file: &KeyFile, errors: &mut Vec<ConfError>) -> Self {
        let mut conf = Config::default();
        ConfGroup::new(file, "Icon", errors).fill("name", &mut conf.name);

        let video = &mut conf.video;
        let mut group = ConfGroup::new(file, "Configuration", errors);
        if let Some(dir) = group.primitive_optional::<String>("Path") {
            video.dir = PathBuf::from(dir);
        }
        fill_choice(&mut group, "Backend", &mut video.backend, BackendId::from_repr);
        fill_choice(&mut group, "Quality", &mut video.quality, Quality::from_repr);
        fill_choice(&mut group, "TypeDL", &mut video.type_dl, TypeDL::from_repr);
        group.fill("BlackList", &mut video.blacklist);
        group.fill("EnabledDL", &mut video.enabled_dl);
        group.fill("CmdOpenDir", &mut video.cmd_open_dir);
        group.fill("CmdOpenVideo", &mut video.cmd_open_video);
        group.fill("CmdOpenWeb", &mut video.cmd_open_web);
        group.fill("HistorySize", &mut conf.history_size);
        group.fill("Debug", &mut conf.debug);

        let video = &mut conf.video;
        let mut web = ConfGroup::new(file, "Web", errors);
        fill_choice(&mut web, "WebState", &mut video.web_state, WebState::from_repr);
        web.fill("WebHost", &mut video.web_host);
        web.fill("JSWindowOption", &mut video.js_window_option);
        conf
    }
}

/// `~/Videos`, when no download directory is set.
fn default_dir() -> PathBuf {
    std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default().join("Videos")
}

pub struct VideoDLApplet {
    base: AppBase,
    conf: Config,
    manager: Manager,
}

pub fn new(base: AppBase, _con: &DockConnection) -> Result<Box<dyn Applet>> {
    Ok(Box::new(VideoDLApplet::new(base)))
}

impl VideoDLApplet {
    pub fn new(base: AppBase) -> Self {
        let popup: Arc<dyn Popup> = Arc::new(base.icon.clone());
        let manager = Manager::new(base.files.clone(), popup, base.web.clone(), base.actions.clone());
        manager.define_actions(0);

        // Shows the progress while the worker runs.
        let (icon, progress) = (base.icon.clone(), manager.clone());
        base.poller.add(move || {
            let (icon, progress) = (icon.clone(), progress.progress());
            async move {
                if let Some(percent) = progress {
                    applet_runtime::print_result_err!("showing the progress", icon.set_quick_info(&format!("{:.0}%", percent)).await);
                }
            }
        });
        base.poller.stop();

        let (icon, poller) = (base.icon.clone(), base.poller.clone());
        manager.set_pre_check(move || {
            let (icon, poller) = (icon.clone(), poller.clone());
            async move {
                applet_runtime::print_result_err!("setting the download emblem", icon.set_emblem(EMBLEM_DOWNLOAD, EmblemPosition::TopRight).await);
                poller.start();
                poller.restart();
            }
        });
        let (icon, poller) = (base.icon.clone(), base.poller.clone());
        manager.set_post_check(move || {
            let (icon, poller) = (icon.clone(), poller.clone());
            async move {
                poller.stop();
                applet_runtime::print_result_err!("clearing the download emblem", icon.set_emblem("none", EmblemPosition::TopRight).await);
                applet_runtime::print_result_err!("clearing the progress", icon.set_quick_info("").await);
            }
        });
        manager.web_register();

        VideoDLApplet { base, conf: Config::default(), manager }
    }
}

#[async_trait]
impl Applet for VideoDLApplet {
    fn base(&self) -> &AppBase {
        &self.base
    }

    async fn init(&mut self, load_conf: bool) -> Result<()> {
        if load_conf {
            self.conf = self.base.load_config()?;
        }
        let mut conf = self.conf.clone();
        if conf.video.dir.as_os_str().is_empty() {
            conf.video.dir = default_dir();
        }

        let history = self.base.paths.file_data_dir(PathBuf::from("appdata").join(HISTORY_FILE));
        self.manager.set_history_file(&history).with_context(|| format!("Failed to load the video history {}", history.display()))?;
        self.manager.set_history_size(conf.history_size);
        self.manager.set_config(&conf.video).await;

        self.base
            .set_defaults(Defaults { label: conf.name, poll_interval: Some(PROGRESS_INTERVAL), debug: conf.debug, ..Default::default() })
            .await;
        Ok(())
    }

    fn define_events(&mut self, events: &mut Events) {
        let actions = self.base.actions.clone();
        let middle = self.base.actions.clone();
        let dropped = self.manager.clone();
        let menu = self.manager.clone();
        let end = self.manager.clone();
        events
            .on_click(move || {
                let actions = actions.clone();
                async move { actions.launch(VideoAction::OpenFolder as usize).await }
            })
            .on_middle_click(move || {
                let actions = middle.clone();
                async move { actions.launch(VideoAction::EnableDownload as usize).await }
            })
            .on_drop_data(move |url| {
                let manager = dropped.clone();
                async move {
                    applet_runtime::try_logging_errors!(format!("downloading {}", url.trim()) => async {
                        manager.download(url.trim()).await?;
                    });
                }
            })
            .on_build_menu(move |m| menu.menu(m))
            .on_end(move || {
                let manager = end.clone();
                async move {
                    manager.set_started_web(false).await;
                    manager.stop().await;
                }
            });
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use applet_runtime::{AppletPaths, AppletRuntime};
    use dockbus::{testing::RecordingBus, Signal};
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;
    use videodl::{Backend, Filer, Format, Outcome, Progress};

    /// Stays at 40% until canceled.
    struct Hanging {
        formats: Vec<Format>,
        started: mpsc::UnboundedSender<()>,
    }

    impl Hanging {
        fn new(started: mpsc::UnboundedSender<()>) -> Self {
            let format = Format { id: "18".into(), extension: "mp4".into(), video_encoding: "avc1".into(), audio_encoding: "mp4a".into(), ..Default::default() };
            Hanging { formats: vec![format], started }
        }
    }

    #[async_trait]
    impl Backend for Hanging {
        fn name(&self) -> &str {
            "hanging"
        }

        fn qualities(&self) -> &[Quality] {
            &[]
        }

        async fn open(&self, _url: &str) -> videodl::Result<Arc<dyn Filer>> {
            Ok(Arc::new(Hanging { formats: self.formats.clone(), started: self.started.clone() }))
        }
    }

    #[async_trait]
    impl Filer for Hanging {
        fn title(&self) -> &str {
            "Clip"
        }

        fn formats(&self) -> &[Format] {
            &self.formats
        }

        async fn download(&self, _: &std::path::Path, _: &str, _: &Format, progress: Progress, cancel: CancellationToken) -> videodl::Result<Outcome> {
            progress.set(40.0);
            self.started.send(()).unwrap();
            cancel.cancelled().await;
            Ok(Outcome::Canceled)
        }
    }

    fn applet(root: &std::path::Path) -> (RecordingBus, VideoDLApplet) {
        let bus = RecordingBus::new();
        let paths = AppletPaths::new("VideoDL", "/tmp/VideoDL.conf", "/org/cairodock/CairoDock/VideoDL", root, "/usr/share/videodl", "cairo-dock").unwrap();
        (bus.clone(), VideoDLApplet::new(AppBase::new(paths, Arc::new(bus))))
    }

    #[test]
    fn test_config() {
        let file = KeyFile::parse(
            "[Icon]\nname = Videos\n\n[Configuration]\nPath = /data/videos\nQuality = 2\nTypeDL = 9\nBlackList = webm;3gp\nEnabledDL = false\nHistorySize = 50\n\n[Web]\nWebState = 1\n",
        )
        .unwrap();
        let mut errors = Vec::new();
        let conf = Config::from_key_file(&file, &mut errors);
        assert!(errors.is_empty());
        assert_eq!(
            conf,
            Config {
                name: "Videos".to_string(),
                video: videodl::Config {
                    dir: PathBuf::from("/data/videos"),
                    quality: Quality::BestPossible,
                    blacklist: vec!["webm".to_string(), "3gp".to_string()],
                    enabled_dl: false,
                    web_state: WebState::Stopped,
                    ..Default::default()
                },
                history_size: 50,
                debug: false,
            }
        );
    }

    #[tokio::test]
    async fn test_init_applies_the_config() {
        let dir = tempfile::tempdir().unwrap();
        let (bus, mut applet) = applet(dir.path());
        applet.conf.video.dir = dir.path().join("videos");
        applet.conf.video.quality = Quality::BestFound;
        applet.init(false).await.unwrap();

        assert_eq!(applet.manager.dir(), dir.path().join("videos"));
        assert_eq!(applet.manager.quality(), Quality::BestFound);
        assert_eq!(bus.calls_to("SetLabel")[0].args[0].to_string(), "VideoDL");
    }

    #[tokio::test]
    async fn test_progress_shown_while_downloading() {
        let dir = tempfile::tempdir().unwrap();
        let (bus, mut applet) = applet(dir.path());
        applet.conf.video.dir = dir.path().join("videos");
        applet.conf.video.quality = Quality::BestFound;
        applet.init(false).await.unwrap();
        assert_eq!(applet.base.poller.interval(), PROGRESS_INTERVAL);
        assert!(!applet.base.poller.is_enabled());

        let (started, mut rx) = mpsc::unbounded_channel();
        applet.manager.set_backend(Arc::new(Hanging::new(started)));
        bus.clear();
        applet.manager.download("https://host/clip").await.unwrap();
        rx.recv().await.unwrap();
        assert!(applet.base.poller.is_enabled());

        let shown = |bus: &RecordingBus| bus.calls_to("SetQuickInfo").iter().any(|call| call.args[0].to_string() == "40%");
        for _ in 0..100 {
            if shown(&bus) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(shown(&bus));

        applet.manager.stop().await;
        assert!(!applet.base.poller.is_enabled());
        assert_eq!(bus.calls_to("SetQuickInfo").last().unwrap().args[0].to_string(), "");
    }

    #[tokio::test]
    async fn test_menu() {
        let dir = tempfile::tempdir().unwrap();
        let (bus, applet) = applet(dir.path());
        let mut runtime = AppletRuntime::new(Box::new(applet));
        let signal = Signal::from_name("org.cairodock.CairoDock.applet.on_build_menu", "/org/cairodock/CairoDock/VideoDL", vec![]).unwrap();
        runtime.on_signal(signal).await;

        let items = bus.calls_to("AddMenuItems");
        assert_eq!(items.len(), 1);
        assert!(items[0].args[0].to_string().contains("Open video folder"));
    }
}
