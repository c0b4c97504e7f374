//! Shared command parameters for all CLI commands.
//!
//! This module defines the command and parameter names and the argument
//! builders used by more than one command module.

use clap::{Arg, ArgAction};

use crate::format::OutputFormat;
use crate::size::get_size_in_bytes;

// Top-level command groups
pub const COMMAND_LOGIN: &str = "login";
pub const COMMAND_LOGOUT: &str = "logout";
pub const COMMAND_DOMAIN: &str = "domain";
pub const COMMAND_NODE: &str = "node";
pub const COMMAND_CLUSTER: &str = "cluster";
pub const COMMAND_STORAGE_POLICY: &str = "storage-policy";
pub const COMMAND_VOLUME: &str = "volume";
pub const COMMAND_TASK: &str = "task";

// Operations
pub const COMMAND_LIST: &str = "list";
pub const COMMAND_SHOW: &str = "show";
pub const COMMAND_CREATE: &str = "create";
pub const COMMAND_DELETE: &str = "delete";
pub const COMMAND_WAIT: &str = "wait";

// Global parameters
pub const PARAMETER_PORTAL: &str = "vinfra-portal";
pub const PARAMETER_USERNAME: &str = "vinfra-username";
pub const PARAMETER_PASSWORD: &str = "vinfra-password";
pub const PARAMETER_DOMAIN: &str = "vinfra-domain";
pub const PARAMETER_PROJECT: &str = "vinfra-project";
pub const PARAMETER_INSECURE: &str = "insecure";
pub const PARAMETER_DEBUG: &str = "debug";
pub const PARAMETER_FORMAT: &str = "format";

// Command parameters
pub const PARAMETER_REFERENCE: &str = "reference";
pub const PARAMETER_NAME: &str = "name";
pub const PARAMETER_SIZE: &str = "size";
pub const PARAMETER_STORAGE_POLICY: &str = "storage-policy";
pub const PARAMETER_TIMEOUT: &str = "timeout";
pub const PARAMETER_TASK_ID: &str = "task-id";

pub const ENV_PORTAL: &str = "VINFRA_PORTAL";
pub const ENV_USERNAME: &str = "VINFRA_USERNAME";
pub const ENV_PASSWORD: &str = "VINFRA_PASSWORD";
pub const ENV_DOMAIN: &str = "VINFRA_DOMAIN";
pub const ENV_PROJECT: &str = "VINFRA_PROJECT";
pub const ENV_INSECURE: &str = "VINFRA_INSECURE";

fn global_value(id: &'static str, env: &'static str, value_name: &'static str) -> Arg {
    Arg::new(id)
        .long(id)
        .num_args(1)
        .value_name(value_name)
        .env(env)
        .global(true)
}

/// Connection and output options accepted by every command
pub fn global_parameters() -> Vec<Arg> {
    vec![
        global_value(PARAMETER_PORTAL, ENV_PORTAL, "HOST[:PORT]")
            .help("Management portal address"),
        global_value(PARAMETER_USERNAME, ENV_USERNAME, "USERNAME")
            .help("User name to log in with"),
        global_value(PARAMETER_PASSWORD, ENV_PASSWORD, "PASSWORD")
            .hide_env_values(true)
            .help("Password; prompted for when needed and not given"),
        global_value(PARAMETER_DOMAIN, ENV_DOMAIN, "DOMAIN").help("Domain of the user"),
        global_value(PARAMETER_PROJECT, ENV_PROJECT, "PROJECT")
            .help("Project to scope requests to"),
        Arg::new(PARAMETER_INSECURE)
            .long(PARAMETER_INSECURE)
            .action(ArgAction::SetTrue)
            .env(ENV_INSECURE)
            .global(true)
            .help("Do not verify the portal's TLS certificate"),
        Arg::new(PARAMETER_FORMAT)
            .short('f')
            .long(PARAMETER_FORMAT)
            .num_args(1)
            .value_parser(OutputFormat::names())
            .global(true)
            .help("Machine-readable output format"),
        Arg::new(PARAMETER_DEBUG)
            .long(PARAMETER_DEBUG)
            .action(ArgAction::SetTrue)
            .global(true)
            .help("Log debugging output to stderr"),
    ]
}

/// One or more resource names or identifiers
pub fn references_parameter(value_name: &'static str, help: &'static str) -> Arg {
    Arg::new(PARAMETER_REFERENCE)
        .value_name(value_name)
        .num_args(1..)
        .required(true)
        .help(help)
}

/// Exactly one resource name or identifier
pub fn reference_parameter(value_name: &'static str, help: &'static str) -> Arg {
    Arg::new(PARAMETER_REFERENCE)
        .value_name(value_name)
        .num_args(1)
        .required(true)
        .help(help)
}

pub fn timeout_parameter() -> Arg {
    Arg::new(PARAMETER_TIMEOUT)
        .long(PARAMETER_TIMEOUT)
        .num_args(1)
        .value_name("SECONDS")
        .value_parser(clap::value_parser!(u64))
        .help("How long to wait for the backend task to finish")
}

fn parse_size(value: &str) -> Result<u64, String> {
    get_size_in_bytes(value).map_err(|e| e.to_string())
}

pub fn size_parameter() -> Arg {
    Arg::new(PARAMETER_SIZE)
        .long(PARAMETER_SIZE)
        .num_args(1)
        .required(true)
        .value_name("SIZE")
        .value_parser(parse_size)
        .help("Size in bytes, or with a KiB, MiB, GiB, TiB, PiB or EiB suffix")
}
