//! Status synchronization

pub mod polling;
pub mod session;
pub mod source;
