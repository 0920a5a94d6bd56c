//! Binds an applet to the dock: runs its event loop, drives its poller and dispatches dock signals.

use std::{path::Path, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use dock_shared_util::{AppletName, FileAccess};
use dockbus::{DockBus, Signal};
use futures::{stream::BoxStream, StreamExt};

use crate::{
    action::Actions,
    config::{load_config, FromKeyFile},
    dialog::{DialogAnswer, DialogValue},
    events::{Event, Events},
    icon::Icon,
    menu::Menu,
    paths::AppletPaths,
    poller::Poller,
    shortkey::Shortkey,
    websrv::WebServer,
};

/// What every applet gets from the runtime.
#[derive(Debug, Clone)]
pub struct AppBase {
    pub paths: AppletPaths,
    pub icon: Icon,
    pub poller: Poller,
    pub actions: Actions,
    pub files: FileAccess,
    pub web: WebServer,
}

/// Icon state and timings applied by [`AppBase::set_defaults`], usually straight from the config.
#[derive(Debug, Default)]
pub struct Defaults {
    /// Empty for the `icon` file shipped with the applet.
    pub icon: String,
    /// Empty for the applet name.
    pub label: String,
    pub quick_info: String,
    pub shortkeys: Vec<Shortkey>,
    pub poll_interval: Option<Duration>,
    pub debug: bool,
}

impl AppBase {
    pub fn new(paths: AppletPaths, bus: Arc<dyn DockBus>) -> Self {
        AppBase {
            paths,
            icon: Icon::new(bus),
            poller: Poller::default(),
            actions: Actions::default(),
            files: FileAccess::new(),
            web: WebServer::default(),
        }
    }

    pub fn name(&self) -> &AppletName {
        &self.paths.name
    }

    pub fn file_location(&self, name: impl AsRef<Path>) -> String {
        self.paths.file_location(name).to_string_lossy().into_owned()
    }

    pub fn load_config<T: FromKeyFile>(&self) -> Result<T> {
        let path = self.paths.get_config_file();
        load_config(path, &self.files).with_context(|| format!("Failed to load config file {}", path.display()))
    }

    /// Apply the icon state, bind the shortkeys and set the poller interval.
    /// Shortkeys pointing to an action get that action as callback.
    pub async fn set_defaults(&self, defaults: Defaults) {
        let icon = if defaults.icon.is_empty() { self.file_location("icon") } else { defaults.icon };
        let label = if defaults.label.is_empty() { self.name().to_string() } else { defaults.label };
        crate::print_result_err!("setting the icon", self.icon.set_icon(&icon).await);
        crate::print_result_err!("setting the label", self.icon.set_label(&label).await);
        crate::print_result_err!("setting the quick-info", self.icon.set_quick_info(&defaults.quick_info).await);

        let shortkeys = defaults
            .shortkeys
            .into_iter()
            .map(|shortkey| match shortkey.action {
                Some(id) if shortkey.call.is_none() && id < self.actions.len() => {
                    let call = self.actions.handler(id);
                    shortkey.with_call(call)
                }
                Some(id) if shortkey.call.is_none() => {
                    log::warn!("Shortkey {} of [{}] points to undefined action {}", shortkey.key, shortkey.conf_group, id);
                    shortkey
                }
                _ => shortkey,
            })
            .collect();
        crate::print_result_err!("binding shortkeys", self.icon.bind_shortkey(shortkeys).await);

        if let Some(interval) = defaults.poll_interval {
            if self.poller.exists() {
                self.poller.set_interval(interval);
            }
        }
        if defaults.debug {
            log::set_max_level(log::LevelFilter::Debug);
        }
    }
}

/// An applet, as driven by the [`AppletRuntime`].
#[async_trait]
pub trait Applet: Send {
    fn base(&self) -> &AppBase;

    /// Apply the config, reading it again first when `load_conf` is set.
    /// Called at start and when the dock reloads the applet.
    async fn init(&mut self, load_conf: bool) -> Result<()>;

    /// Register the callbacks of the applet. Called once, before the first `init`.
    fn define_events(&mut self, events: &mut Events);
}

pub struct AppletRuntime {
    applet: Box<dyn Applet>,
    events: Events,
    menu: Menu,
}

impl AppletRuntime {
    pub fn new(mut applet: Box<dyn Applet>) -> Self {
        let mut events = Events::default();
        applet.define_events(&mut events);
        AppletRuntime { applet, events, menu: Menu::new() }
    }

    fn icon(&self) -> &Icon {
        &self.applet.base().icon
    }

    async fn init(&mut self, load_conf: bool) {
        if let Err(err) = self.applet.init(load_conf).await {
            log::error!("Could not initialise applet {}: {:?}", self.applet.base().name(), err);
        }
    }

    /// Run until the dock stops the applet. Losing the signal stream is an error.
    pub async fn run(mut self, mut signals: BoxStream<'static, Signal>) -> Result<()> {
        self.init(true).await;
        let poller = self.applet.base().poller.clone();
        poller.restart();
        let mut timer = poller.wait();
        log::info!("Applet {} started", self.applet.base().name());

        crate::loop_select_exiting! {
            signal = signals.next() => match signal {
                Some(signal) => {
                    if self.on_signal(signal).await {
                        break;
                    }
                }
                None => bail!("Lost the connection to the dock"),
            },
            _ = &mut timer => {
                poller.fire();
                timer = poller.wait();
            },
            _ = poller.restarted() => {
                timer = poller.wait();
            },
        }

        log::info!("Applet {} stopped", self.applet.base().name());
        Ok(())
    }

    /// Handle one signal. Returns true when the applet must stop.
    pub async fn on_signal(&mut self, signal: Signal) -> bool {
        match Event::from_signal(&signal) {
            Ok(Some(event)) => self.dispatch(event).await,
            Ok(None) => {
                log::warn!("Unknown signal {} on {}", signal.name(), signal.path);
                false
            }
            Err(err) => {
                log::warn!("Could not read signal: {}", err);
                false
            }
        }
    }

    async fn flush_menu(&self) {
        crate::print_result_err!("sending menu items", self.icon().add_menu_items(&self.menu).await);
    }

    async fn dispatch(&mut self, event: Event) -> bool {
        log::debug!("Event {:?}", event);
        match event {
            Event::Click(state) => {
                spawn_handler(&self.events.on_click, ());
                spawn_handler(&self.events.on_click_mod, state);
            }
            Event::MiddleClick => spawn_handler(&self.events.on_middle_click, ()),
            Event::Scroll(up) => spawn_handler(&self.events.on_scroll, up),
            Event::DropData(data) => spawn_handler(&self.events.on_drop_data, data),
            Event::ChangeFocus(active) => spawn_handler(&self.events.on_change_focus, active),
            Event::BuildMenu => {
                self.menu.clear();
                if let Some(build) = &self.events.on_build_menu {
                    build(&mut self.menu);
                }
                self.flush_menu().await;
            }
            Event::SubBuildMenu(id) => {
                self.menu.clear();
                if let Some(build) = &self.events.on_sub_build_menu {
                    build(&id, &mut self.menu);
                }
                self.flush_menu().await;
            }
            Event::MenuSelect(id) => self.menu.launch(id),
            Event::AnswerDialog { button, value } => match self.icon().take_dialog() {
                Some((kind, callback)) => {
                    let value = kind.read(&value).unwrap_or_else(|err| {
                        log::warn!("Could not read dialog answer: {}", err);
                        DialogValue::None
                    });
                    callback(DialogAnswer { button, value }).await;
                }
                None => log::debug!("Dialog answered without a callback waiting"),
            },
            Event::Shortkey(key) => match self.icon().shortkey_call(&key) {
                Some(call) => {
                    tokio::spawn(call(()));
                }
                None => log::debug!("No callback bound to shortkey {}", key),
            },
            Event::ReloadModule(load_conf) => match &self.events.reload {
                Some(reload) => reload(load_conf).await,
                None => {
                    self.init(load_conf).await;
                    self.applet.base().poller.restart();
                }
            },
            Event::StopModule => {
                if let Some(end) = &self.events.end {
                    end(()).await;
                }
                return true;
            }
            Event::SubClick(id, state) => spawn_handler(&self.events.on_sub_click, (id, state)),
            Event::SubMiddleClick(id) => spawn_handler(&self.events.on_sub_middle_click, id),
            Event::SubScroll(id, up) => spawn_handler(&self.events.on_sub_scroll, (id, up)),
            Event::SubDropData(id, data) => spawn_handler(&self.events.on_sub_drop_data, (id, data)),
        }
        false
    }
}

/// Gestures run in the background, so a slow callback can't hold the signal stream.
fn spawn_handler<A>(handler: &Option<crate::events::Handler<A>>, arg: A) {
    if let Some(handler) = handler {
        tokio::spawn(handler(arg));
    }
}
