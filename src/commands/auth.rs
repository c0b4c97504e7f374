//! Authentication command definitions.
//!
//! This module defines CLI commands related to session management.

use crate::commands::params::{COMMAND_LOGIN, COMMAND_LOGOUT};
use clap::Command;

/// Create the login command.
pub fn login_command() -> Command {
    Command::new(COMMAND_LOGIN)
        .about("Log in to the portal and cache the session")
}

/// Create the logout command.
pub fn logout_command() -> Command {
    Command::new(COMMAND_LOGOUT).about("Remove the cached session")
}
