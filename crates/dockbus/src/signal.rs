use crate::{
    dbus::{APPLET_INTERFACE, SUBAPPLET_INTERFACE},
    Error, Result, Value,
};

/// A signal the dock emitted for this applet.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub interface: String,
    pub member: String,
    pub path: String,
    pub body: Vec<Value>,
}

impl Signal {
    /// Build a signal from its full `<interface>.<event>` name.
    pub fn from_name(name: &str, path: impl Into<String>, body: Vec<Value>) -> Result<Self> {
        let (interface, member) = name.rsplit_once('.').ok_or_else(|| Error::protocol(name, "signal name carries no interface"))?;
        Ok(Signal { interface: interface.to_string(), member: member.to_string(), path: path.into(), body })
    }

    pub fn name(&self) -> String {
        format!("{}.{}", self.interface, self.member)
    }

    /// The bare event name the runtime dispatches on, e.g. `on_click`.
    pub fn event(&self) -> &str {
        &self.member
    }

    pub fn is_sub_icon(&self) -> bool {
        self.interface == SUBAPPLET_INTERFACE
    }

    pub fn is_main_icon(&self) -> bool {
        self.interface == APPLET_INTERFACE
    }

    pub fn arg(&self, index: usize) -> Result<&Value> {
        self.body.get(index).ok_or_else(|| Error::protocol(self.name(), format!("missing argument {}", index)))
    }
}
