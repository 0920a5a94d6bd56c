//! Named actions of an applet, launched from menus, shortkeys or gestures.

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex, MutexGuard,
};

use crate::{
    events::{handler, Handler},
    menu::{MenuItem, Menuer},
};

/// How an action shows in a menu built from the actions table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionMenu {
    /// Not shown in menus.
    #[default]
    None,
    Entry,
    Separator,
    CheckBox,
    RadioButton,
}

#[derive(Clone, Default)]
pub struct Action {
    pub id: usize,
    pub name: String,
    pub icon: String,
    pub menu: ActionMenu,
    pub call: Option<Handler<()>>,
    /// Long running: the start and stop indicators are shown around it.
    pub threaded: bool,
    /// State of check and radio items.
    pub state: Option<Arc<AtomicBool>>,
    pub group: i32,
    pub tooltip: String,
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action").field("id", &self.id).field("name", &self.name).field("menu", &self.menu).finish_non_exhaustive()
    }
}

impl Action {
    pub fn new(id: usize, name: impl Into<String>, icon: impl Into<String>, menu: ActionMenu) -> Self {
        Action { id, name: name.into(), icon: icon.into(), menu, ..Default::default() }
    }

    pub fn separator(id: usize) -> Self {
        Action { id, menu: ActionMenu::Separator, ..Default::default() }
    }

    pub fn with_call<F, Fut>(self, call: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        Action { call: Some(handler(move |()| call())), ..self }
    }

    pub fn threaded(self) -> Self {
        Action { threaded: true, ..self }
    }

    pub fn with_state(self, state: Arc<AtomicBool>) -> Self {
        Action { state: Some(state), ..self }
    }

    pub fn with_group(self, group: i32) -> Self {
        Action { group, ..self }
    }

    pub fn with_tooltip(self, tooltip: impl Into<String>) -> Self {
        Action { tooltip: tooltip.into(), ..self }
    }

    fn is_active(&self) -> bool {
        self.state.as_ref().map_or(false, |state| state.load(Ordering::SeqCst))
    }
}

#[derive(Default)]
struct ActionsInner {
    list: Mutex<Vec<Action>>,
    indicators: Mutex<Option<(Handler<()>, Handler<()>)>>,
    max: AtomicUsize,
    current: AtomicUsize,
}

/// The actions table. Clones share the same table.
#[derive(Clone, Default)]
pub struct Actions(Arc<ActionsInner>);

impl std::fmt::Debug for Actions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actions").field("list", &*self.list()).field("current", &self.count()).finish()
    }
}

impl Actions {
    fn list(&self) -> MutexGuard<'_, Vec<Action>> {
        self.0.list.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append actions. Their ids are expected to match their position.
    pub fn add(&self, actions: impl IntoIterator<Item = Action>) {
        let mut list = self.list();
        for action in actions {
            if action.id != list.len() {
                log::warn!("Action {} ({}) registered at position {}", action.id, action.name, list.len());
            }
            list.push(action);
        }
    }

    pub fn len(&self) -> usize {
        self.list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.list().is_empty()
    }

    /// The id of the action called `name`.
    pub fn id(&self, name: &str) -> Option<usize> {
        self.list().iter().find(|a| a.name == name).map(|a| a.id)
    }

    /// Number of actions running right now.
    pub fn count(&self) -> usize {
        self.0.current.load(Ordering::SeqCst)
    }

    /// Maximum of actions running at once, 0 for no limit.
    pub fn set_max(&self, max: usize) {
        self.0.max.store(max, Ordering::SeqCst);
    }

    /// Hooks run around threaded actions.
    pub fn set_indicators<S, SFut, E, EFut>(&self, on_start: S, on_stop: E)
    where
        S: Fn() -> SFut + Send + Sync + 'static,
        SFut: std::future::Future<Output = ()> + Send + 'static,
        E: Fn() -> EFut + Send + Sync + 'static,
        EFut: std::future::Future<Output = ()> + Send + 'static,
    {
        *self.0.indicators.lock().unwrap_or_else(|e| e.into_inner()) =
            Some((handler(move |()| on_start()), handler(move |()| on_stop())));
    }

    pub fn set_state(&self, id: usize, state: Arc<AtomicBool>) {
        if let Some(action) = self.list().get_mut(id) {
            action.state = Some(state);
        }
    }

    /// Run action `id`. Ignored when the action has no call or too many actions are running.
    pub async fn launch(&self, id: usize) {
        let (call, threaded) = match self.list().get(id) {
            Some(action) => (action.call.clone(), action.threaded),
            None => {
                log::warn!("Could not launch action {}: no such action", id);
                return;
            }
        };
        let Some(call) = call else { return };

        let max = self.0.max.load(Ordering::SeqCst);
        let slot = self.0.current.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| (max == 0 || current < max).then_some(current + 1));
        if slot.is_err() {
            log::debug!("Action {} ignored, {} actions already running", id, max);
            return;
        }

        let indicators = if threaded { self.0.indicators.lock().unwrap_or_else(|e| e.into_inner()).clone() } else { None };
        if let Some((on_start, _)) = &indicators {
            on_start(()).await;
        }
        call(()).await;
        if let Some((_, on_stop)) = &indicators {
            on_stop(()).await;
        }
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }

    /// A callback launching action `id` in the background, for menus.
    pub fn menu_callback(&self, id: usize) -> impl Fn() + Send + Sync + 'static {
        let actions = self.clone();
        move || {
            let actions = actions.clone();
            tokio::spawn(async move { actions.launch(id).await });
        }
    }

    /// The launcher of action `id` as a handler, for shortkeys.
    pub fn handler(&self, id: usize) -> Handler<()> {
        let actions = self.clone();
        handler(move |()| {
            let actions = actions.clone();
            async move { actions.launch(id).await }
        })
    }

    /// Add the actions `ids` to a menu, in that order.
    pub fn build_menu(&self, menu: &mut impl Menuer, ids: &[usize]) {
        for &id in ids {
            let action = {
                let mut list = self.list();
                let Some(action) = list.get_mut(id) else {
                    log::warn!("Could not add action {} to the menu: no such action", id);
                    continue;
                };
                if action.menu == ActionMenu::CheckBox && action.call.is_none() {
                    let state = action.state.get_or_insert_with(Arc::default).clone();
                    action.call = Some(handler(move |()| {
                        state.fetch_xor(true, Ordering::SeqCst);
                        async {}
                    }));
                }
                action.clone()
            };

            let callback = self.menu_callback(action.id);
            let item: Option<&mut MenuItem> = match action.menu {
                ActionMenu::None => None,
                ActionMenu::Entry => Some(menu.add_entry(&action.name, &action.icon, callback)),
                ActionMenu::Separator => {
                    menu.add_separator();
                    None
                }
                ActionMenu::CheckBox => Some(menu.add_check_entry(&action.name, action.is_active(), callback)),
                ActionMenu::RadioButton => Some(menu.add_radio_entry(&action.name, action.is_active(), action.group, callback)),
            };
            if let Some(item) = item {
                if !action.tooltip.is_empty() {
                    item.set_tooltip(action.tooltip.clone());
                }
            }
        }
    }
}
