pub mod dbus;
pub mod testing;
pub mod value;

mod connection;
pub use connection::*;

mod eavesdrop;
pub use eavesdrop::*;

mod error;
pub use error::*;

mod signal;
pub use signal::*;

mod transport;
pub use transport::*;

pub use value::{ConversionError, DelaySpec, FromValue, Value};
