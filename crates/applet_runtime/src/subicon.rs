use dock_shared_util::SubIconId;
use dockbus::{Error, Result, Target, Value};

use crate::icon::{EmblemPosition, Icon};

/// One sub-icon to add: what it shows and the id the dock reports it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubIconSpec {
    pub label: String,
    pub icon: String,
    pub id: SubIconId,
}

impl SubIconSpec {
    pub fn new(label: impl Into<String>, icon: impl Into<String>, id: impl Into<SubIconId>) -> Self {
        SubIconSpec { label: label.into(), icon: icon.into(), id: id.into() }
    }
}

impl Icon {
    /// Add sub-icons, sent to the dock as a flat list of `label, icon, id` triples.
    pub async fn add_sub_icons(&self, specs: &[SubIconSpec]) -> Result<()> {
        let flat: Vec<Value> =
            specs.iter().flat_map(|s| [s.label.clone(), s.icon.clone(), s.id.0.clone()]).map(Value::from).collect();
        self.call("AddSubIcons", vec![Value::List(flat)]).await?;
        let mut state = self.state();
        for spec in specs {
            if !state.sub_icons.contains(&spec.id) {
                state.sub_icons.push(spec.id.clone());
            }
        }
        Ok(())
    }

    /// Remove one sub-icon. Removing an id that was never added is an error and nothing is sent.
    pub async fn remove_sub_icon(&self, id: &str) -> Result<()> {
        {
            let mut state = self.state();
            let index = state.sub_icons.iter().position(|known| known.0 == id).ok_or_else(|| Error::UnknownSubIcon(id.to_string()))?;
            state.sub_icons.remove(index);
        }
        self.call("RemoveSubIcon", vec![id.into()]).await.map(drop)
    }

    pub async fn remove_sub_icons(&self) -> Result<()> {
        self.state().sub_icons.clear();
        self.call("RemoveSubIcon", vec![SubIconId::ANY.into()]).await.map(drop)
    }

    /// A handle on a sub-icon added earlier.
    pub fn sub_icon(&self, id: &str) -> Option<SubIcon> {
        let state = self.state();
        let id = state.sub_icons.iter().find(|known| known.0 == id)?.clone();
        Some(SubIcon { icon: self.clone(), id })
    }

    pub fn sub_icon_ids(&self) -> Vec<SubIconId> {
        self.state().sub_icons.clone()
    }
}

/// Handle on one sub-icon, offering the same visual updates as the main icon.
#[derive(Debug, Clone)]
pub struct SubIcon {
    icon: Icon,
    id: SubIconId,
}

impl SubIcon {
    pub fn id(&self) -> &SubIconId {
        &self.id
    }

    async fn call(&self, method: &str, mut args: Vec<Value>) -> Result<()> {
        args.push(self.id.0.clone().into());
        self.icon.bus.call(Target::SubIcons, method, args).await.map(drop)
    }

    pub async fn set_quick_info(&self, info: &str) -> Result<()> {
        self.call("SetQuickInfo", vec![info.into()]).await
    }

    pub async fn set_label(&self, label: &str) -> Result<()> {
        self.call("SetLabel", vec![label.into()]).await
    }

    pub async fn set_icon(&self, icon: &str) -> Result<()> {
        self.call("SetIcon", vec![icon.into()]).await
    }

    pub async fn set_emblem(&self, icon: &str, position: EmblemPosition) -> Result<()> {
        self.call("SetEmblem", vec![icon.into(), (position as i32).into()]).await
    }

    pub async fn animate(&self, name: &str, rounds: i32) -> Result<()> {
        self.call("Animate", vec![name.into(), rounds.into()]).await
    }

    pub async fn show_dialog(&self, message: &str, seconds: i32) -> Result<()> {
        self.call("ShowDialog", vec![message.into(), seconds.into()]).await
    }
}
