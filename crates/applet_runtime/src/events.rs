//! Decoding of dock signals into typed events, and the table of callbacks an applet registers for them.

use std::sync::Arc;

use dock_shared_util::SubIconId;
use dockbus::{Error, Result, Signal, Value};
use futures::{future::BoxFuture, Future, FutureExt};

use crate::menu::Menu;

/// An async callback taking one argument. Cheap to clone.
pub type Handler<A> = Arc<dyn Fn(A) -> BoxFuture<'static, ()> + Send + Sync>;

pub fn handler<A, F, Fut>(f: F) -> Handler<A>
where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |arg| f(arg).boxed())
}

/// Fills the menu synchronously, while the dock waits for its items.
pub type MenuBuilder = Arc<dyn Fn(&mut Menu) + Send + Sync>;
pub type SubMenuBuilder = Arc<dyn Fn(&SubIconId, &mut Menu) + Send + Sync>;

/// A signal of the dock, with its body read into typed arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Click(i32),
    MiddleClick,
    BuildMenu,
    MenuSelect(i32),
    AnswerDialog { button: i32, value: Value },
    Scroll(bool),
    DropData(String),
    ChangeFocus(bool),
    Shortkey(String),
    ReloadModule(bool),
    StopModule,
    SubClick(SubIconId, i32),
    SubMiddleClick(SubIconId),
    SubScroll(SubIconId, bool),
    SubDropData(SubIconId, String),
    SubBuildMenu(SubIconId),
}

fn wrap<T>(signal: &Signal, index: usize, read: impl FnOnce(&Value) -> dockbus::value::Result<T>) -> Result<T> {
    read(signal.arg(index)?).map_err(|e| Error::protocol(signal.name(), e.to_string()))
}

fn int_arg(signal: &Signal, index: usize) -> Result<i32> {
    wrap(signal, index, Value::as_i32)
}

fn bool_arg(signal: &Signal, index: usize) -> Result<bool> {
    wrap(signal, index, Value::as_bool)
}

fn string_arg(signal: &Signal, index: usize) -> Result<String> {
    wrap(signal, index, Value::as_string)
}

/// Sub-icon signals carry the id of the sub-icon as their last argument.
fn sub_icon_arg(signal: &Signal) -> Result<SubIconId> {
    let last = signal.body.len().checked_sub(1).ok_or_else(|| Error::protocol(signal.name(), "missing sub-icon id"))?;
    string_arg(signal, last).map(SubIconId)
}

impl Event {
    /// Read a signal. Signals outside the dock vocabulary give `None`.
    pub fn from_signal(signal: &Signal) -> Result<Option<Event>> {
        let event = match signal.event() {
            "on_click" => Event::Click(int_arg(signal, 0)?),
            "on_middle_click" => Event::MiddleClick,
            "on_build_menu" => Event::BuildMenu,
            "on_menu_select" => Event::MenuSelect(int_arg(signal, 0)?),
            "on_answer_dialog" => Event::AnswerDialog { button: int_arg(signal, 0)?, value: signal.arg(1)?.clone() },
            "on_scroll" => Event::Scroll(bool_arg(signal, 0)?),
            "on_drop_data" => Event::DropData(string_arg(signal, 0)?),
            "on_change_focus" => Event::ChangeFocus(bool_arg(signal, 0)?),
            "on_shortkey" => Event::Shortkey(string_arg(signal, 0)?),
            "on_reload_module" => Event::ReloadModule(bool_arg(signal, 0)?),
            "on_stop_module" => Event::StopModule,
            "on_click_sub_icon" => Event::SubClick(sub_icon_arg(signal)?, int_arg(signal, 0)?),
            "on_middle_click_sub_icon" => Event::SubMiddleClick(sub_icon_arg(signal)?),
            "on_scroll_sub_icon" => Event::SubScroll(sub_icon_arg(signal)?, bool_arg(signal, 0)?),
            "on_drop_data_sub_icon" => Event::SubDropData(sub_icon_arg(signal)?, string_arg(signal, 0)?),
            "on_build_menu_sub_icon" => Event::SubBuildMenu(sub_icon_arg(signal)?),
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

/// The callbacks of an applet, one optional slot per gesture.
#[derive(Clone, Default)]
pub struct Events {
    pub(crate) on_click: Option<Handler<()>>,
    pub(crate) on_click_mod: Option<Handler<i32>>,
    pub(crate) on_middle_click: Option<Handler<()>>,
    pub(crate) on_build_menu: Option<MenuBuilder>,
    pub(crate) on_scroll: Option<Handler<bool>>,
    pub(crate) on_drop_data: Option<Handler<String>>,
    pub(crate) on_change_focus: Option<Handler<bool>>,
    pub(crate) on_sub_click: Option<Handler<(SubIconId, i32)>>,
    pub(crate) on_sub_middle_click: Option<Handler<SubIconId>>,
    pub(crate) on_sub_scroll: Option<Handler<(SubIconId, bool)>>,
    pub(crate) on_sub_drop_data: Option<Handler<(SubIconId, String)>>,
    pub(crate) on_sub_build_menu: Option<SubMenuBuilder>,
    pub(crate) reload: Option<Handler<bool>>,
    pub(crate) end: Option<Handler<()>>,
}

impl Events {
    pub fn on_click<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_click = Some(handler(move |()| f()));
        self
    }

    /// Click with the state of the modifier keys.
    pub fn on_click_mod<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(i32) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_click_mod = Some(handler(f));
        self
    }

    pub fn on_middle_click<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_middle_click = Some(handler(move |()| f()));
        self
    }

    pub fn on_build_menu(&mut self, f: impl Fn(&mut Menu) + Send + Sync + 'static) -> &mut Self {
        self.on_build_menu = Some(Arc::new(f));
        self
    }

    /// Scroll on the icon, `true` when scrolling up.
    pub fn on_scroll<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(bool) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_scroll = Some(handler(f));
        self
    }

    pub fn on_drop_data<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_drop_data = Some(handler(f));
        self
    }

    pub fn on_change_focus<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(bool) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_change_focus = Some(handler(f));
        self
    }

    pub fn on_sub_click<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(SubIconId, i32) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_sub_click = Some(handler(move |(id, state)| f(id, state)));
        self
    }

    pub fn on_sub_middle_click<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(SubIconId) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_sub_middle_click = Some(handler(f));
        self
    }

    pub fn on_sub_scroll<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(SubIconId, bool) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_sub_scroll = Some(handler(move |(id, up)| f(id, up)));
        self
    }

    pub fn on_sub_drop_data<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(SubIconId, String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.on_sub_drop_data = Some(handler(move |(id, data)| f(id, data)));
        self
    }

    pub fn on_sub_build_menu(&mut self, f: impl Fn(&SubIconId, &mut Menu) + Send + Sync + 'static) -> &mut Self {
        self.on_sub_build_menu = Some(Arc::new(f));
        self
    }

    /// Replace the default reload, which is `init` followed by a poller restart.
    pub fn on_reload<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn(bool) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.reload = Some(handler(f));
        self
    }

    /// Called once when the dock stops the applet.
    pub fn on_end<F, Fut>(&mut self, f: F) -> &mut Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.end = Some(handler(move |()| f()));
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn signal(name: &str, body: Vec<Value>) -> Signal {
        let interface = if name.ends_with("_sub_icon") { "org.cairodock.CairoDock.subapplet" } else { "org.cairodock.CairoDock.applet" };
        Signal::from_name(&format!("{}.{}", interface, name), "/demo", body).unwrap()
    }

    #[test]
    fn test_decode_main_icon_events() {
        let cases = vec![
            (signal("on_click", vec![Value::Int(4)]), Event::Click(4)),
            (signal("on_middle_click", vec![]), Event::MiddleClick),
            (signal("on_menu_select", vec![Value::Int(3)]), Event::MenuSelect(3)),
            (
                signal("on_answer_dialog", vec![Value::Int(-1), Value::from("text")]),
                Event::AnswerDialog { button: -1, value: Value::from("text") },
            ),
            (signal("on_scroll", vec![Value::Bool(true)]), Event::Scroll(true)),
            (signal("on_drop_data", vec![Value::from("file:///tmp/a")]), Event::DropData("file:///tmp/a".into())),
            (signal("on_shortkey", vec![Value::from("<Control>F8")]), Event::Shortkey("<Control>F8".into())),
            (signal("on_reload_module", vec![Value::Bool(false)]), Event::ReloadModule(false)),
            (signal("on_stop_module", vec![]), Event::StopModule),
        ];
        for (signal, expected) in cases {
            assert_eq!(Event::from_signal(&signal).unwrap(), Some(expected));
        }
    }

    #[test]
    fn test_sub_icon_id_moves_first() {
        assert_eq!(
            Event::from_signal(&signal("on_click_sub_icon", vec![Value::Int(1), Value::from("cpu")])).unwrap(),
            Some(Event::SubClick("cpu".into(), 1))
        );
        assert_eq!(
            Event::from_signal(&signal("on_drop_data_sub_icon", vec![Value::from("text"), Value::from("disk")])).unwrap(),
            Some(Event::SubDropData("disk".into(), "text".into()))
        );
        assert_eq!(
            Event::from_signal(&signal("on_build_menu_sub_icon", vec![Value::from("disk")])).unwrap(),
            Some(Event::SubBuildMenu("disk".into()))
        );
    }

    #[test]
    fn test_malformed_and_unknown_signals() {
        assert!(Event::from_signal(&signal("on_click", vec![])).is_err());
        assert!(Event::from_signal(&signal("on_scroll", vec![Value::from("up")])).is_err());
        assert!(Event::from_signal(&signal("on_middle_click_sub_icon", vec![])).is_err());
        assert_eq!(Event::from_signal(&signal("on_unknown", vec![])).unwrap(), None);
    }
}
