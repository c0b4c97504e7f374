//! Connection settings and credentials.
//!
//! Values come from command-line flags (which clap already merges with the
//! `VINFRA_*` environment variables), then from the optional YAML file
//! `<home>/.vinfra/config.yml`, then from built-in defaults.

use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::PathBuf, str::FromStr, time::Duration};
use tracing::debug;
use url::Url;

use crate::error::{Result, VinfraError};

pub const DEFAULT_PORT: u16 = 8888;
pub const DEFAULT_SCHEME: &str = "https";
pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_TASK_TIMEOUT_SECS: u64 = 600;
pub const CACHE_DIRECTORY_NAME: &str = ".vinfra";
pub const CONFIGURATION_FILE_NAME: &str = "config.yml";

/// Overrides the home directory under which `.vinfra/` is kept
pub const HOME_ENV: &str = "VINFRA_HOME";

/// Root of all on-disk client state: `<home>/.vinfra`
pub fn vinfra_directory() -> Result<PathBuf> {
    let home = match std::env::var_os(HOME_ENV) {
        Some(home) => PathBuf::from(home),
        None => dirs::home_dir().ok_or_else(|| {
            VinfraError::Client("Could not determine the home directory".to_string())
        })?,
    };
    Ok(home.join(CACHE_DIRECTORY_NAME))
}

/// Backend address as given by `--vinfra-portal`: `[scheme://]host[:port]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Portal {
    scheme: String,
    host: String,
    port: u16,
}

impl Portal {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn base_url(&self) -> Result<Url> {
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        Ok(Url::parse(&format!("{}://{}:{}/", self.scheme, host, self.port))?)
    }
}

impl FromStr for Portal {
    type Err = VinfraError;

    fn from_str(value: &str) -> Result<Self> {
        let invalid = || VinfraError::Validation(format!("Invalid portal address '{}'", value));

        let value = value.trim();
        let (scheme, rest) = match value.split_once("://") {
            Some((scheme, rest)) if scheme == "http" || scheme == "https" => (scheme, rest),
            Some(_) => return Err(invalid()),
            None => (DEFAULT_SCHEME, value),
        };
        let rest = rest.trim_end_matches('/');
        if rest.is_empty() || rest.contains('/') {
            return Err(invalid());
        }

        let (host, port) = if let Some(bracketed) = rest.strip_prefix('[') {
            let (host, tail) = bracketed.split_once(']').ok_or_else(invalid)?;
            let port = match tail.strip_prefix(':') {
                Some(port) => port.parse().map_err(|_| invalid())?,
                None if tail.is_empty() => DEFAULT_PORT,
                None => return Err(invalid()),
            };
            (host.to_string(), port)
        } else {
            match rest.rsplit_once(':') {
                Some((host, port)) => (host.to_string(), port.parse().map_err(|_| invalid())?),
                None => (rest.to_string(), DEFAULT_PORT),
            }
        };

        if host.is_empty() {
            return Err(invalid());
        }

        Ok(Portal {
            scheme: scheme.to_string(),
            host,
            port,
        })
    }
}

impl fmt::Display for Portal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme, self.host, self.port)
    }
}

/// Who we authenticate as. Lives for the whole process.
///
/// The cache identity is `(host, username, domain)`; the password never
/// leaves memory.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub host: String,
    pub username: String,
    pub password: Option<String>,
    pub domain: Option<String>,
    pub project: Option<String>,
    pub scoped_token: Option<String>,
}

impl Credential {
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Credential {
            host: host.into(),
            username: username.into(),
            password: None,
            domain: None,
            project: None,
            scoped_token: None,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("domain", &self.domain)
            .field("project", &self.project)
            .field("scoped_token", &self.scoped_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Optional defaults file. Deliberately has no password field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl ConfigurationFile {
    pub fn default_path() -> Result<PathBuf> {
        Ok(vinfra_directory()?.join(CONFIGURATION_FILE_NAME))
    }

    /// Load the defaults file; a missing file yields empty defaults
    pub fn load_from_file(path: &std::path::Path) -> Result<ConfigurationFile> {
        if !path.exists() {
            debug!("No configuration file at {}", path.display());
            return Ok(ConfigurationFile::default());
        }

        debug!("Loading configuration from {}...", path.display());
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(ConfigurationFile::default());
        }
        serde_yaml::from_str(&content).map_err(|e| {
            VinfraError::Validation(format!(
                "Failed to parse configuration file {}: {}",
                path.display(),
                e
            ))
        })
    }

    pub fn load_default() -> Result<ConfigurationFile> {
        Self::load_from_file(&Self::default_path()?)
    }
}

/// Values taken from the command line (and therefore from the environment)
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub portal: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub domain: Option<String>,
    pub project: Option<String>,
    pub insecure: bool,
}

/// Fully resolved connection settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub portal: Portal,
    pub credential: Credential,
    pub insecure: bool,
    pub default_timeout: Duration,
}

impl Settings {
    pub fn resolve(overrides: SettingsOverrides, file: ConfigurationFile) -> Result<Settings> {
        let portal = overrides.portal.or(file.portal).ok_or_else(|| {
            VinfraError::Validation(
                "The portal address is not set. Use --vinfra-portal or VINFRA_PORTAL.".to_string(),
            )
        })?;
        let portal: Portal = portal.parse()?;

        let username = overrides
            .username
            .or(file.username)
            .unwrap_or_else(|| DEFAULT_USERNAME.to_string());

        let credential = Credential {
            host: portal.host().to_string(),
            username,
            password: overrides.password.filter(|p| !p.is_empty()),
            domain: overrides.domain.or(file.domain).filter(|d| !d.is_empty()),
            project: overrides.project.or(file.project).filter(|p| !p.is_empty()),
            scoped_token: None,
        };

        Ok(Settings {
            portal,
            credential,
            insecure: overrides.insecure || file.insecure.unwrap_or(false),
            default_timeout: Duration::from_secs(file.timeout.unwrap_or(DEFAULT_TASK_TIMEOUT_SECS)),
        })
    }
}
