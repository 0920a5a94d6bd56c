//! Keeps the desktop notifications other programs send, and shows how many are waiting on the icon.

use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use applet_runtime::{
    config::{ConfError, ConfGroup, FromKeyFile, KeyFile},
    dialog::on_ok,
    events::{handler, Handler},
    history::HistoryLimit,
    util::StringExt,
    Action, ActionMenu, AppBase, Applet, DialogData, Defaults, Events,
};
use async_trait::async_trait;
use dockbus::{DockConnection, Notification};
use futures::{stream::BoxStream, StreamExt};
use smart_default::SmartDefault;

const DEFAULT_ALT_ICON: &str = "img/active.png";

const ACTION_SHOW_ALL: usize = 1;
const ACTION_CLEAR: usize = 2;

#[derive(Debug, Clone, PartialEq, SmartDefault)]
pub struct Config {
    /// Empty for the icon shipped with the applet.
    pub icon: String,
    pub name: String,
    #[default(10)]
    pub notif_size: i32,
    /// Senders whose notifications are dropped.
    pub notif_blacklist: Vec<String>,
    /// Shown while notifications are waiting.
    pub notif_alt_icon: String,
    pub debug: bool,
}

impl FromKeyFile for Config {
    fn from_key_file(file: &KeyFile, errors: &mut Vec<ConfError>) -> Self {
        let mut conf = Config::default();
        let mut icon = ConfGroup::new(file, "Icon", errors);
        icon.fill("icon", &mut conf.icon);
        icon.fill("name", &mut conf.name);

        let mut group = ConfGroup::new(file, "Configuration", errors);
        group.fill("NotifSize", &mut conf.notif_size);
        group.fill("NotifBlackList", &mut conf.notif_blacklist);
        group.fill("NotifAltIcon", &mut conf.notif_alt_icon);
        group.fill("Debug", &mut conf.debug);
        conf
    }
}

#[derive(Default)]
struct NotifsState {
    messages: Vec<Notification>,
    limit: HistoryLimit,
    blacklist: Vec<String>,
    on_count: Option<Handler<usize>>,
}

/// The notifications received, oldest first. Clones share the same list.
#[derive(Clone, Default)]
pub struct Notifs(Arc<Mutex<NotifsState>>);

impl Notifs {
    fn state(&self) -> MutexGuard<'_, NotifsState> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_limit(&self, limit: impl Into<HistoryLimit>) {
        self.state().limit = limit.into();
    }

    pub fn set_blacklist(&self, blacklist: Vec<String>) {
        self.state().blacklist = blacklist;
    }

    /// Called with the number of notifications every time the list changes.
    pub fn set_on_count<F, Fut>(&self, f: F)
    where
        F: Fn(usize) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.state().on_count = Some(handler(f));
    }

    pub fn list(&self) -> Vec<Notification> {
        self.state().messages.clone()
    }

    /// Keep a notification. Titles shorter than 2 characters are volume or brightness popups, and are ignored.
    pub async fn add(&self, notif: Notification) {
        if notif.title.chars().count() < 2 {
            log::debug!("Ignored notification from {} with title {:?}", notif.sender, notif.title);
            return;
        }
        let (count, on_count) = {
            let mut state = self.state();
            if state.blacklist.contains(&notif.sender) {
                log::debug!("Ignored notification from blacklisted {}", notif.sender);
                return;
            }
            state.messages.push(notif);
            let limit = state.limit;
            limit.trim(&mut state.messages);
            (state.messages.len(), state.on_count.clone())
        };
        if let Some(on_count) = on_count {
            on_count(count).await;
        }
    }

    pub async fn clear(&self) {
        let on_count = {
            let mut state = self.state();
            state.messages.clear();
            state.on_count.clone()
        };
        if let Some(on_count) = on_count {
            on_count(0).await;
        }
    }

    /// Add every notification of the stream, until the applet stops.
    pub async fn listen(self, mut stream: BoxStream<'static, Notification>) {
        applet_runtime::loop_select_exiting! {
            notif = stream.next() => match notif {
                Some(notif) => self.add(notif).await,
                None => break,
            },
        }
        log::debug!("Stopped listening to notifications");
    }
}

fn escape_markup(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// The dialog text listing the notifications, newest last.
pub fn render_list(messages: &[Notification]) -> String {
    if messages.is_empty() {
        return "No recent notifications".to_string();
    }
    messages
        .iter()
        .map(|notif| {
            let title = format!("<b>{}</b>  <small>{}</small>", escape_markup(&notif.title), escape_markup(&notif.sender));
            if notif.body.is_empty() {
                title
            } else {
                format!("{}\n{}", title, escape_markup(&(&notif.body).trim_lines()))
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub struct NotificationsApplet {
    base: AppBase,
    conf: Config,
    notifs: Notifs,
    /// Icons shown without and with waiting notifications.
    icons: Arc<Mutex<(String, String)>>,
}

pub fn new(base: AppBase, con: &DockConnection) -> Result<Box<dyn Applet>> {
    let applet = NotificationsApplet::new(base);
    let notifs = applet.notifs.clone();
    let con = con.clone();
    tokio::spawn(async move {
        let stream = con.notifications().await;
        notifs.listen(stream).await;
    });
    Ok(Box::new(applet))
}

impl NotificationsApplet {
    pub fn new(base: AppBase) -> Self {
        let applet = NotificationsApplet { base, conf: Config::default(), notifs: Notifs::default(), icons: Arc::default() };
        let icon = applet.base.icon.clone();
        let icons = applet.icons.clone();
        applet.notifs.set_on_count(move |count| {
            let icon = icon.clone();
            let (normal, alternate) = icons.lock().unwrap_or_else(|e| e.into_inner()).clone();
            async move {
                let (image, info) = if count > 0 { (alternate, count.to_string()) } else { (normal, String::new()) };
                applet_runtime::print_result_err!("setting the quick-info", icon.set_quick_info(&info).await);
                applet_runtime::print_result_err!("setting the icon", icon.set_icon(&image).await);
            }
        });
        applet.define_actions();
        applet
    }

    fn define_actions(&self) {
        let base = self.base.clone();
        let notifs = self.notifs.clone();
        let cleared = self.notifs.clone();
        self.base.actions.add([
            Action::separator(0),
            Action::new(ACTION_SHOW_ALL, "Show messages", "media-seek-forward", ActionMenu::Entry).threaded().with_call(move || {
                let base = base.clone();
                let notifs = notifs.clone();
                async move { display_all(&base, &notifs).await }
            }),
            Action::new(ACTION_CLEAR, "Clear all", "edit-clear", ActionMenu::Entry).threaded().with_call(move || {
                let notifs = cleared.clone();
                async move { notifs.clear().await }
            }),
        ]);
    }
}

/// Pop the list of notifications. The first button clears it.
async fn display_all(base: &AppBase, notifs: &Notifs) {
    let data = DialogData {
        message: render_list(&notifs.list()),
        use_markup: true,
        buttons: "edit-clear;cancel".to_string(),
        ..Default::default()
    };
    let actions = base.actions.clone();
    let callback = on_ok(move || async move { actions.launch(ACTION_CLEAR).await });
    applet_runtime::print_result_err!("showing the notifications", base.icon.popup_dialog(data, callback).await);
}

#[async_trait]
impl Applet for NotificationsApplet {
    fn base(&self) -> &AppBase {
        &self.base
    }

    async fn init(&mut self, load_conf: bool) -> Result<()> {
        if load_conf {
            self.conf = self.base.load_config()?;
        }
        let conf = self.conf.clone();
        self.notifs.set_limit(conf.notif_size);
        self.notifs.set_blacklist(conf.notif_blacklist);

        let icon = if conf.icon.is_empty() { self.base.file_location("icon") } else { conf.icon };
        let alt_icon = if conf.notif_alt_icon.is_empty() { self.base.file_location(DEFAULT_ALT_ICON) } else { conf.notif_alt_icon };
        *self.icons.lock().unwrap_or_else(|e| e.into_inner()) = (icon.clone(), alt_icon);

        self.base.set_defaults(Defaults { icon, label: conf.name, debug: conf.debug, ..Default::default() }).await;
        Ok(())
    }

    fn define_events(&mut self, events: &mut Events) {
        let actions = self.base.actions.clone();
        let middle = self.base.actions.clone();
        let menu = self.base.actions.clone();
        events
            .on_click(move || {
                let actions = actions.clone();
                async move { actions.launch(ACTION_SHOW_ALL).await }
            })
            .on_middle_click(move || {
                let actions = middle.clone();
                async move { actions.launch(ACTION_CLEAR).await }
            })
            .on_build_menu(move |m| menu.build_menu(m, &[ACTION_SHOW_ALL, ACTION_CLEAR]));
    }
}
