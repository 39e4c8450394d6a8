//! CLI command handlers for the wamcp gateway.

mod inspect;
mod serve;

pub(crate) use inspect::{handle_status_command, handle_tools_command};
pub(crate) use serve::handle_serve_command;
