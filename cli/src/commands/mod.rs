//! Launcher commands.

pub mod knock;
pub mod plan;
