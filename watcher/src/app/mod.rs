//! Application layer: options, shared state, rendering and commands

pub mod commands;
pub mod options;
pub mod render;
pub mod state;
pub mod watch;
