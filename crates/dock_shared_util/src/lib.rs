pub mod file_access;
pub mod wrappers;

pub use file_access::*;
pub use wrappers::*;
