//! Global keyboard shortcuts bound through the dock, each calling back into the applet.

use dockbus::{Result, Value};

use crate::{events::Handler, icon::Icon};

/// A global keyboard shortcut, read from the applet config.
#[derive(Clone, Default)]
pub struct Shortkey {
    pub conf_group: String,
    pub conf_key: String,
    /// The key combination, e.g. `<Control>F8`. Empty when unbound.
    pub key: String,
    pub desc: String,
    /// Action launched when `call` is unset.
    pub action: Option<usize>,
    pub call: Option<Handler<()>>,
}

impl std::fmt::Debug for Shortkey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shortkey")
            .field("conf_group", &self.conf_group)
            .field("conf_key", &self.conf_key)
            .field("key", &self.key)
            .field("desc", &self.desc)
            .field("action", &self.action)
            .finish_non_exhaustive()
    }
}

impl Shortkey {
    pub fn new(conf_group: &str, conf_key: &str, desc: &str, key: impl Into<String>) -> Self {
        Shortkey { conf_group: conf_group.to_string(), conf_key: conf_key.to_string(), key: key.into(), desc: desc.to_string(), ..Default::default() }
    }

    pub fn with_action(self, action: usize) -> Self {
        Shortkey { action: Some(action), ..self }
    }

    pub fn with_call(self, call: Handler<()>) -> Self {
        Shortkey { call: Some(call), ..self }
    }
}

impl Icon {
    /// Install global shortcuts, replacing the ones bound before.
    pub async fn bind_shortkey(&self, shortkeys: Vec<Shortkey>) -> Result<()> {
        let keys: Vec<Value> = shortkeys.iter().map(|s| Value::from(s.key.clone())).collect();
        self.state().shortkeys = shortkeys;
        self.call("BindShortkey", vec![Value::List(keys)]).await.map(drop)
    }

    /// The callback of the first bound shortkey matching `key`.
    pub(crate) fn shortkey_call(&self, key: &str) -> Option<Handler<()>> {
        self.state().shortkeys.iter().find(|s| s.key == key).and_then(|s| s.call.clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::events::handler;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_rebinding_replaces_the_set() {
        let (bus, icon) = crate::icon::test::recording_icon();
        let first = Shortkey::new("Configuration", "ShortkeyOne", "Show", "<Control>F8").with_call(handler(|()| async {}));
        icon.bind_shortkey(vec![first]).await.unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let second = Shortkey::new("Configuration", "ShortkeyTwo", "Clear", "<Control>F9").with_call(handler(move |()| {
            let tx = tx.clone();
            async move { tx.send(()).unwrap() }
        }));
        icon.bind_shortkey(vec![second, Shortkey::new("Configuration", "Unbound", "", "")]).await.unwrap();

        assert!(icon.shortkey_call("<Control>F8").is_none());
        icon.shortkey_call("<Control>F9").unwrap()(()).await;
        assert_eq!(rx.recv().await, Some(()));
        assert_eq!(bus.calls()[1].args, vec![Value::List(vec![Value::from("<Control>F9"), Value::from("")])]);
    }
}
