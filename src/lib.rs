//! The vinfra CLI client library.
//!
//! This crate provides the core of the command-line client for the
//! Virtuozzo Infrastructure management portal: session handling with an
//! on-disk credential cache, resolution of user-supplied resource names,
//! waiting on backend tasks, and the command tree built on top of them.
//!
//! # Modules
//!
//! - `auth`: Authentication policies and credential prompting
//! - `configuration`: Portal address, credentials and the defaults file
//! - `cookie_jar`: Cookie storage shared with the HTTP client
//! - `credential_store`: Per-identity session cache under `~/.vinfra`
//! - `manager`, `kinds`: Resource managers and the kinds the CLI knows
//! - `resolver`: Name-or-ID resolution
//! - `session`: The authenticated request path
//! - `task`, `task_waiter`: Backend tasks and waiting for them
//! - `commands`, `actions`, `context`: The command-line surface

pub mod actions;
pub mod auth;
pub mod commands;
pub mod configuration;
pub mod context;
pub mod cookie_jar;
pub mod credential_store;
pub mod error;
pub mod exit_codes;
pub mod format;
pub mod kinds;
pub mod logging;
pub mod manager;
pub mod resolver;
pub mod session;
pub mod size;
pub mod task;
pub mod task_waiter;
