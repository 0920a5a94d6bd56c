//! The icon-control vocabulary: every call an applet makes to change how its icon looks.
//!
//! All operations return the transport error to the caller, which decides whether it matters.
//! Sub-icons, renderers, window control, shortkeys and properties extend [`Icon`] in their own modules.

use std::sync::{Arc, Mutex, MutexGuard};

use dock_shared_util::SubIconId;
use dockbus::{DockBus, Result, Target, Value};

use crate::{
    dialog::{DialogCallback, DialogData, WidgetKind},
    menu::Menu,
    renderer::RendererKind,
    shortkey::Shortkey,
};

/// Where an emblem is drawn over the icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[repr(i32)]
pub enum EmblemPosition {
    TopLeft = 0,
    BottomLeft,
    BottomRight,
    TopRight,
    Middle,
    Bottom,
    Top,
    Right,
    Left,
}

/// Icon state the runtime needs to interpret later signals.
#[derive(Default)]
pub(crate) struct IconState {
    pub(crate) dialog: Option<(WidgetKind, DialogCallback)>,
    pub(crate) sub_icons: Vec<SubIconId>,
    pub(crate) shortkeys: Vec<Shortkey>,
    pub(crate) renderer: Option<RendererKind>,
}

/// Handle on the main icon of the applet. Cheap to clone.
#[derive(Clone)]
pub struct Icon {
    pub(crate) bus: Arc<dyn DockBus>,
    pub(crate) state: Arc<Mutex<IconState>>,
}

impl std::fmt::Debug for Icon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Icon").finish_non_exhaustive()
    }
}

impl Icon {
    pub fn new(bus: Arc<dyn DockBus>) -> Self {
        Icon { bus, state: Arc::default() }
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, IconState> {
        // poisoning only means a callback panicked, the state itself stays consistent
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) async fn call(&self, method: &str, args: Vec<Value>) -> Result<Vec<Value>> {
        self.bus.call(Target::Icon, method, args).await
    }

    /// Set the image of the icon, as a path or a theme icon name.
    pub async fn set_icon(&self, icon: &str) -> Result<()> {
        self.call("SetIcon", vec![icon.into()]).await.map(drop)
    }

    pub async fn set_label(&self, label: &str) -> Result<()> {
        self.call("SetLabel", vec![label.into()]).await.map(drop)
    }

    /// Set the small text drawn over the icon. An empty string removes it.
    pub async fn set_quick_info(&self, info: &str) -> Result<()> {
        self.call("SetQuickInfo", vec![info.into()]).await.map(drop)
    }

    /// Draw an image over the icon. An empty path removes the emblem at that position.
    pub async fn set_emblem(&self, icon: &str, position: EmblemPosition) -> Result<()> {
        self.call("SetEmblem", vec![icon.into(), (position as i32).into()]).await.map(drop)
    }

    /// Run the animation `name` for `rounds` rounds.
    pub async fn animate(&self, name: &str, rounds: i32) -> Result<()> {
        self.call("Animate", vec![name.into(), rounds.into()]).await.map(drop)
    }

    /// Start or stop an endless animation.
    pub async fn demands_attention(&self, start: bool, name: &str) -> Result<()> {
        self.call("DemandsAttention", vec![start.into(), name.into()]).await.map(drop)
    }

    /// Show an information bubble for `seconds`. Doesn't wait for the dock.
    pub async fn show_dialog(&self, message: &str, seconds: i32) -> Result<()> {
        self.bus.send(Target::Icon, "ShowDialog", vec![message.into(), seconds.into()]).await
    }

    /// Pop a dialog and keep `callback` to handle its answer.
    /// A dialog popped before this one won't have its callback called anymore.
    pub async fn popup_dialog(&self, data: DialogData, callback: DialogCallback) -> Result<()> {
        self.state().dialog = Some((data.widget_kind(), callback));
        self.call("PopupDialog", data.to_args()).await.map(drop)
    }

    /// Send the items built during `on_build_menu`.
    pub async fn add_menu_items(&self, menu: &Menu) -> Result<()> {
        if menu.is_empty() {
            return Ok(());
        }
        self.call("AddMenuItems", menu.to_values()).await.map(drop)
    }

    pub(crate) fn take_dialog(&self) -> Option<(WidgetKind, DialogCallback)> {
        self.state().dialog.take()
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::dialog::{on_ok, DialogAnswer, DialogValue};
    use dockbus::testing::RecordingBus;
    use pretty_assertions::assert_eq;

    pub(crate) fn recording_icon() -> (RecordingBus, Icon) {
        let bus = RecordingBus::new();
        (bus.clone(), Icon::new(Arc::new(bus)))
    }

    #[tokio::test]
    async fn test_visual_updates() {
        let (bus, icon) = recording_icon();
        icon.set_label("hello").await.unwrap();
        icon.set_emblem("img/busy.png", EmblemPosition::Middle).await.unwrap();
        icon.demands_attention(true, "bounce").await.unwrap();

        let calls: Vec<_> = bus.calls().into_iter().map(|c| (c.method, c.args)).collect();
        assert_eq!(
            calls,
            vec![
                ("SetLabel".to_string(), vec![Value::from("hello")]),
                ("SetEmblem".to_string(), vec![Value::from("img/busy.png"), Value::Int(4)]),
                ("DemandsAttention".to_string(), vec![Value::Bool(true), Value::from("bounce")]),
            ]
        );
    }

    #[tokio::test]
    async fn test_second_popup_supersedes_first_callback() {
        let (_bus, icon) = recording_icon();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let tx2 = tx.clone();
        icon.popup_dialog(DialogData::default(), on_ok(move || async move { tx.send(1).unwrap() })).await.unwrap();
        icon.popup_dialog(DialogData::default(), on_ok(move || async move { tx2.send(2).unwrap() })).await.unwrap();

        let (kind, callback) = icon.take_dialog().unwrap();
        assert_eq!(kind, WidgetKind::None);
        callback(DialogAnswer { button: 0, value: DialogValue::None }).await;
        assert_eq!(rx.recv().await, Some(2));
        assert!(icon.take_dialog().is_none());
    }

    #[tokio::test]
    async fn test_failure_is_returned() {
        let (bus, icon) = recording_icon();
        bus.set_failing(true);
        assert!(icon.set_icon("x").await.is_err());
        assert!(icon.add_menu_items(&Menu::new()).await.is_ok());
    }
}
