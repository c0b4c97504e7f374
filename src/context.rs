//! Context builder for the vinfra CLI client.
//!
//! Most commands need the same things: resolved settings, an authenticated
//! session and the output format. [`ExecutionContext`] builds them once from
//! the parsed command line.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use clap::ArgMatches;
use serde::Serialize;
use tracing::debug;

use crate::auth::{CachedAuth, PasswordAuth};
use crate::commands::params::{
    PARAMETER_DOMAIN, PARAMETER_FORMAT, PARAMETER_INSECURE, PARAMETER_PASSWORD, PARAMETER_PORTAL,
    PARAMETER_PROJECT, PARAMETER_TIMEOUT, PARAMETER_USERNAME,
};
use crate::configuration::{ConfigurationFile, Settings, SettingsOverrides};
use crate::credential_store::CredentialStore;
use crate::error::Result;
use crate::format::{print_output, OutputFormat};
use crate::manager::{ResourceKind, RestManager};
use crate::session::{AuthSession, Transport};
use crate::task_waiter::{TaskWaiter, WaitMode};

/// Read the connection-related flags. clap has already merged in the
/// `VINFRA_*` environment variables.
pub fn overrides_from_args(matches: &ArgMatches) -> SettingsOverrides {
    let text = |id: &str| matches.get_one::<String>(id).cloned();
    SettingsOverrides {
        portal: text(PARAMETER_PORTAL),
        username: text(PARAMETER_USERNAME),
        password: text(PARAMETER_PASSWORD),
        domain: text(PARAMETER_DOMAIN),
        project: text(PARAMETER_PROJECT),
        insecure: matches.get_flag(PARAMETER_INSECURE),
    }
}

/// Execution context containing common resources needed by CLI commands.
pub struct ExecutionContext {
    pub settings: Settings,
    pub store: Option<CredentialStore>,
    pub format: OutputFormat,
    /// Output was explicitly requested in a machine-readable format
    pub machine_readable: bool,
    session: Arc<AuthSession>,
}

impl ExecutionContext {
    /// Create a new execution context from command-line arguments.
    ///
    /// The session is cache-backed when a home directory is available and
    /// memory-only otherwise. No request is made here.
    pub fn from_args(matches: &ArgMatches) -> Result<Self> {
        let store = match CredentialStore::default_location() {
            Ok(store) => Some(store),
            Err(e) => {
                debug!("Session caching disabled: {}", e);
                None
            }
        };

        let file = match &store {
            Some(_) => ConfigurationFile::load_default()?,
            None => ConfigurationFile::default(),
        };
        let settings = Settings::resolve(overrides_from_args(matches), file)?;

        let format = match matches.get_one::<String>(PARAMETER_FORMAT) {
            Some(name) => OutputFormat::from_str(name)?,
            None => OutputFormat::default(),
        };
        let machine_readable = matches.get_one::<String>(PARAMETER_FORMAT).is_some();

        let transport = Transport::new(settings.portal.base_url()?, settings.insecure)?;
        let credential = settings.credential.clone();
        let session = match &store {
            Some(store) => AuthSession::new(transport, CachedAuth::new(credential, store.clone())),
            None => AuthSession::new(transport, PasswordAuth::new(credential)),
        };

        Ok(ExecutionContext {
            settings,
            store,
            format,
            machine_readable,
            session: Arc::new(session),
        })
    }

    pub fn session(&self) -> Arc<AuthSession> {
        self.session.clone()
    }

    pub fn manager(&self, kind: &'static ResourceKind) -> RestManager {
        RestManager::new(self.session(), kind)
    }

    pub fn waiter(&self) -> TaskWaiter {
        TaskWaiter::new(WaitMode::detect(self.machine_readable))
    }

    /// `--timeout` of the given subcommand, or the configured default
    pub fn timeout(&self, sub_matches: &ArgMatches) -> Duration {
        sub_matches
            .try_get_one::<u64>(PARAMETER_TIMEOUT)
            .ok()
            .flatten()
            .map(|seconds| Duration::from_secs(*seconds))
            .unwrap_or(self.settings.default_timeout)
    }

    pub fn print<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        print_output(self.format, value)
    }
}
