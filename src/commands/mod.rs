//! CLI command definitions and argument parsing.
//!
//! This module defines all the CLI commands and their arguments using the
//! clap builder API. Each command group lives in its own file.

use clap::{ArgMatches, Command};

pub mod auth;
pub mod infrastructure;
pub mod params;
pub mod task;
pub mod volume;

pub use params::{
    COMMAND_CLUSTER, COMMAND_CREATE, COMMAND_DELETE, COMMAND_DOMAIN, COMMAND_LIST, COMMAND_LOGIN,
    COMMAND_LOGOUT, COMMAND_NODE, COMMAND_SHOW, COMMAND_STORAGE_POLICY, COMMAND_TASK,
    COMMAND_VOLUME, COMMAND_WAIT, PARAMETER_DEBUG, PARAMETER_FORMAT,
};

/// Build the whole command tree.
pub fn cli() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .propagate_version(true)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .args(params::global_parameters())
        .subcommand(auth::login_command())
        .subcommand(auth::logout_command())
        .subcommand(infrastructure::domain_command())
        .subcommand(infrastructure::node_command())
        .subcommand(infrastructure::cluster_command())
        .subcommand(infrastructure::storage_policy_command())
        .subcommand(volume::volume_command())
        .subcommand(task::task_command())
}

/// Parse the process arguments, exiting on usage errors.
pub fn create_cli_commands() -> ArgMatches {
    cli().get_matches()
}
