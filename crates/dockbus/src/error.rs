use thiserror::Error;

use crate::value::ConversionError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Dbus connection error")]
    DbusError(#[from] zbus::Error),
    #[error("Dbus value error")]
    VariantError(#[from] zbus::zvariant::Error),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error("Malformed body for {name}: {reason}")]
    ProtocolError { name: String, reason: String },
    #[error("Sub-icon {0} is not registered")]
    UnknownSubIcon(String),
}

impl Error {
    pub fn protocol(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::ProtocolError { name: name.into(), reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
