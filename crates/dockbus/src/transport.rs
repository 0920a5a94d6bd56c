use async_trait::async_trait;

use crate::{Result, Value};

/// Which of the two dock objects of an applet a call is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// The main icon, at the bus path handed over by the dock.
    Icon,
    /// The sub-icons, at `<bus path>/sub_icons`.
    SubIcons,
}

/// Method calls from an applet to the dock.
///
/// Arguments and replies are positional [`Value`]s. Integers go out as 32 bit values,
/// homogeneous lists as typed arrays and maps as `a{sv}`.
#[async_trait]
pub trait DockBus: Send + Sync {
    /// Call `method` and wait for the reply.
    async fn call(&self, target: Target, method: &str, args: Vec<Value>) -> Result<Vec<Value>>;

    /// Call `method` without waiting for its reply.
    async fn send(&self, target: Target, method: &str, args: Vec<Value>) -> Result<()> {
        self.call(target, method, args).await.map(|_| ())
    }
}
