#[macro_use]
pub mod util;
pub mod application_lifecycle;

pub mod action;
pub mod config;
pub mod dialog;
pub mod events;
pub mod history;
pub mod icon;
pub mod menu;
pub mod paths;
pub mod poller;
pub mod properties;
pub mod renderer;
pub mod runtime;
pub mod shortkey;
pub mod subicon;
pub mod websrv;
pub mod window;

pub use action::{Action, ActionMenu, Actions};
pub use dialog::{DialogAnswer, DialogData, DialogValue, DialogWidget};
pub use events::{Event, Events, Handler};
pub use icon::{EmblemPosition, Icon};
pub use menu::{Menu, Menuer};
pub use paths::AppletPaths;
pub use poller::Poller;
pub use runtime::{AppBase, Applet, AppletRuntime, Defaults};
pub use shortkey::Shortkey;
pub use websrv::WebServer;
