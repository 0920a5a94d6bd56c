//! Menu builder filled during `on_build_menu`.
//!
//! Item ids are dense and start at 0: the id of an item is its position in the build.
//! A submenu item's id is the `menu` field of its children, the root menu being 0.

use std::{collections::BTreeMap, sync::Arc};

use dockbus::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum MenuItemKind {
    Entry = 0,
    SubMenu = 1,
    Separator = 2,
    CheckBox = 3,
    RadioButton = 4,
}

pub type MenuCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct MenuItem {
    pub kind: MenuItemKind,
    pub label: String,
    pub icon: String,
    pub menu_id: i32,
    pub id: i32,
    pub state: Option<bool>,
    pub group: Option<i32>,
    pub tooltip: Option<String>,
}

impl MenuItem {
    pub fn set_tooltip(&mut self, tooltip: impl Into<String>) -> &mut Self {
        self.tooltip = Some(tooltip.into());
        self
    }

    /// The `a{sv}` map `AddMenuItems` expects for this item.
    pub fn to_value(&self) -> Value {
        let mut map = BTreeMap::new();
        map.insert("type".to_string(), Value::from(self.kind as i32));
        map.insert("menu".to_string(), Value::from(self.menu_id));
        map.insert("id".to_string(), Value::from(self.id));
        if self.kind != MenuItemKind::Separator {
            map.insert("label".to_string(), Value::from(self.label.clone()));
            map.insert("icon".to_string(), Value::from(self.icon.clone()));
        }
        if let Some(state) = self.state {
            map.insert("state".to_string(), Value::from(state));
        }
        if let Some(group) = self.group {
            map.insert("group".to_string(), Value::from(group));
        }
        if let Some(tooltip) = &self.tooltip {
            map.insert("tooltip".to_string(), Value::from(tooltip.clone()));
        }
        Value::Map(map)
    }
}

/// The items of the menu being built and their callbacks, indexed by item id.
#[derive(Default)]
pub struct Menu {
    items: Vec<MenuItem>,
    callbacks: Vec<Option<MenuCallback>>,
}

impl std::fmt::Debug for Menu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Menu").field("items", &self.items).finish()
    }
}

impl Menu {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.callbacks.clear();
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Argument list of the `AddMenuItems` call.
    pub fn to_values(&self) -> Vec<Value> {
        vec![Value::List(self.items.iter().map(MenuItem::to_value).collect())]
    }

    /// Fire the callback of item `id`. Unknown ids and items without callback are ignored.
    pub fn launch(&self, id: i32) {
        match usize::try_from(id).ok().and_then(|id| self.callbacks.get(id)) {
            Some(Some(callback)) => callback(),
            Some(None) => {}
            None => log::debug!("Menu item {} is not in the current menu", id),
        }
    }

    fn push(&mut self, menu_id: i32, kind: MenuItemKind, label: &str, icon: &str, callback: Option<MenuCallback>) -> &mut MenuItem {
        let index = self.items.len();
        self.items.push(MenuItem {
            kind,
            label: label.to_string(),
            icon: icon.to_string(),
            menu_id,
            id: index as i32,
            state: None,
            group: None,
            tooltip: None,
        });
        self.callbacks.push(callback);
        &mut self.items[index]
    }
}

/// Anything items can be added to: the root menu or one of its submenus.
pub trait Menuer {
    fn menu(&mut self) -> &mut Menu;

    /// The id children of this menu refer to.
    fn menu_id(&self) -> i32;

    fn add_entry(&mut self, label: &str, icon: &str, call: impl Fn() + Send + Sync + 'static) -> &mut MenuItem
    where
        Self: Sized,
    {
        let menu_id = self.menu_id();
        self.menu().push(menu_id, MenuItemKind::Entry, label, icon, Some(Arc::new(call)))
    }

    fn add_separator(&mut self) {
        let menu_id = self.menu_id();
        self.menu().push(menu_id, MenuItemKind::Separator, "", "", None);
    }

    fn add_check_entry(&mut self, label: &str, active: bool, call: impl Fn() + Send + Sync + 'static) -> &mut MenuItem
    where
        Self: Sized,
    {
        let menu_id = self.menu_id();
        let item = self.menu().push(menu_id, MenuItemKind::CheckBox, label, "", Some(Arc::new(call)));
        item.state = Some(active);
        item
    }

    fn add_radio_entry(&mut self, label: &str, active: bool, group: i32, call: impl Fn() + Send + Sync + 'static) -> &mut MenuItem
    where
        Self: Sized,
    {
        let menu_id = self.menu_id();
        let item = self.menu().push(menu_id, MenuItemKind::RadioButton, label, "", Some(Arc::new(call)));
        item.state = Some(active);
        item.group = Some(group);
        item
    }

    /// Add a submenu item and return a handle adding children to it.
    fn add_sub_menu(&mut self, label: &str, icon: &str) -> SubMenu<'_> {
        let menu_id = self.menu_id();
        let id = self.menu().push(menu_id, MenuItemKind::SubMenu, label, icon, None).id;
        SubMenu { menu: self.menu(), menu_id: id }
    }
}

impl Menuer for Menu {
    fn menu(&mut self) -> &mut Menu {
        self
    }

    fn menu_id(&self) -> i32 {
        0
    }
}

pub struct SubMenu<'a> {
    menu: &'a mut Menu,
    menu_id: i32,
}

impl Menuer for SubMenu<'_> {
    fn menu(&mut self) -> &mut Menu {
        self.menu
    }

    fn menu_id(&self) -> i32 {
        self.menu_id
    }
}
