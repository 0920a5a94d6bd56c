use derive_more::{AsRef, Debug, Display, From, FromStr};
use serde::{Deserialize, Serialize};

/// The identifier the dock uses for one sub-icon of an applet.
#[derive(Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, AsRef, From, FromStr, Display, Debug)]
#[debug("SubIconId({})", _0)]
pub struct SubIconId(pub String);

impl SubIconId {
    /// The id understood by `RemoveSubIcon` as "every sub-icon".
    pub const ANY: &'static str = "any";
}

impl std::borrow::Borrow<str> for SubIconId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SubIconId {
    fn from(s: &str) -> Self {
        SubIconId(s.to_owned())
    }
}

/// The name an applet is registered and launched under, e.g. `UpToShare`.
#[derive(Clone, Hash, PartialEq, Eq, Serialize, Deserialize, AsRef, From, FromStr, Display, Debug)]
#[debug("AppletName({})", _0)]
pub struct AppletName(pub String);

impl std::borrow::Borrow<str> for AppletName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AppletName {
    fn from(s: &str) -> Self {
        AppletName(s.to_owned())
    }
}

impl AppletName {
    /// Applet names are matched case-insensitively when picking a constructor.
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}
