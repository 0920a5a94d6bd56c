//! Control of the application window an icon is bound to.

use dockbus::Result;

use crate::icon::Icon;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, strum::AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum WindowAction {
    Minimize,
    Show,
    ToggleVisibility,
    Maximize,
    Restore,
    ToggleSize,
    Close,
    Kill,
}

impl Icon {
    /// Bind the icon to the windows of the application with this class.
    /// An empty class releases the binding.
    pub async fn control_appli(&self, class: &str) -> Result<()> {
        self.call("ControlAppli", vec![class.into()]).await.map(drop)
    }

    pub async fn act_on_appli(&self, action: WindowAction) -> Result<()> {
        self.call("ActOnAppli", vec![action.as_ref().into()]).await.map(drop)
    }

    pub async fn show_appli(&self, show: bool) -> Result<()> {
        self.call("ShowAppli", vec![show.into()]).await.map(drop)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use dockbus::Value;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_act_on_appli() {
        let (bus, icon) = crate::icon::test::recording_icon();
        icon.act_on_appli(WindowAction::ToggleVisibility).await.unwrap();
        assert_eq!(bus.calls()[0].args, vec![Value::from("toggle-visibility")]);
        assert_eq!("toggle-size".parse::<WindowAction>().unwrap(), WindowAction::ToggleSize);
    }
}
