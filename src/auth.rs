//! Authentication policies.
//!
//! A policy decides whether the current [`Transport`] still carries a usable
//! session and, when it does not, performs the login exchange. Two policies
//! exist: [`CachedAuth`] keeps its cookies and project token in a
//! [`CredentialStore`], [`PasswordAuth`] keeps everything in memory.

use std::fs::OpenOptions;
use std::io::{BufRead, IsTerminal};
use std::path::Path;

use async_trait::async_trait;
use inquire::{Password, PasswordDisplayMode, Text};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;

use crate::configuration::Credential;
use crate::credential_store::CredentialStore;
use crate::error::{Result, VinfraError};
use crate::session::{RequestOptions, Transport};

pub const LOGIN_PATH: &str = "api/v2/login";
pub const SCOPE_PATH: &str = "api/v2/login/scope";

/// Source of interactively entered credentials
pub trait Prompter: Send + Sync {
    fn prompt_username(&self) -> Result<String>;
    fn prompt_password(&self, credential: &Credential) -> Result<String>;
}

#[cfg(unix)]
const CONTROLLING_TERMINAL: &str = "/dev/tty";

/// Whether `path` opens to an interactive terminal
fn is_terminal_device(path: &Path) -> bool {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map(|device| device.is_terminal())
        .unwrap_or(false)
}

/// Whether the process has a controlling terminal, even when stdin is a pipe
fn has_controlling_terminal() -> bool {
    #[cfg(unix)]
    {
        is_terminal_device(Path::new(CONTROLLING_TERMINAL))
    }
    #[cfg(not(unix))]
    {
        std::io::stdin().is_terminal()
    }
}

/// Prompts on the controlling terminal, or reads a single line from stdin
/// when the process has none
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn prompt_username(&self) -> Result<String> {
        if !has_controlling_terminal() {
            return Err(VinfraError::Authentication(
                "No username given. Use --vinfra-username or VINFRA_USERNAME.".to_string(),
            ));
        }
        Text::new("Username:")
            .prompt()
            .map_err(|e| VinfraError::Authentication(format!("Failed to read username: {}", e)))
    }

    fn prompt_password(&self, credential: &Credential) -> Result<String> {
        if has_controlling_terminal() {
            let prompt = format!("Password for {}@{}:", credential.username, credential.host);
            return Password::new(&prompt)
                .without_confirmation()
                .with_display_mode(PasswordDisplayMode::Hidden)
                .prompt()
                .map_err(|e| {
                    VinfraError::Authentication(format!("Failed to read password: {}", e))
                });
        }

        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

#[async_trait]
pub trait AuthPolicy: Send {
    /// Whether a session from an earlier login is cached on disk. Policies
    /// without a cache always answer `false`.
    fn has_cached_session(&self) -> bool {
        false
    }

    /// Token to send for project-scoped requests, if any
    fn project_token(&self) -> Option<&str>;

    /// Whether a login must happen before the next authenticated request
    async fn needs_reauthenticate(&mut self, transport: &Transport) -> Result<bool>;

    /// Run the login exchange, prompting for missing credentials
    async fn make_authenticate(&mut self, transport: &Transport) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct ScopeResponse {
    token: String,
}

/// Fill in username and password, prompting where they are missing
fn complete_credential(credential: &mut Credential, prompter: &dyn Prompter) -> Result<String> {
    if credential.username.is_empty() {
        credential.username = prompter.prompt_username()?;
    }

    if let Some(password) = &credential.password {
        return Ok(password.clone());
    }

    let password = prompter.prompt_password(credential)?;
    if password.is_empty() {
        return Err(VinfraError::Authentication(
            "Empty password is not allowed".to_string(),
        ));
    }
    credential.password = Some(password.clone());
    Ok(password)
}

/// POST the credentials and, for a project, exchange the session for a
/// scoped token. Cookies land in the transport's jar.
async fn login_exchange(
    transport: &Transport,
    credential: &mut Credential,
    password: &str,
) -> Result<()> {
    tracing::debug!(
        "Logging in to {} as {}...",
        transport.base_url(),
        credential.username
    );

    transport.jar().clear();
    credential.scoped_token = None;

    let mut body = json!({
        "username": credential.username,
        "password": password,
    });
    if let Some(domain) = &credential.domain {
        body["domain"] = json!(domain);
    }

    let options = RequestOptions::unauthenticated().with_json(body);
    transport
        .send(Method::POST, LOGIN_PATH, &options, None)
        .await
        .map_err(rejected_login)?;

    if let Some(project) = &credential.project {
        tracing::debug!("Requesting token for project {}...", project);
        let options = RequestOptions::unauthenticated().with_json(json!({
            "project": project,
            "domain": credential.domain,
        }));
        let response = transport
            .send(Method::POST, SCOPE_PATH, &options, None)
            .await
            .map_err(rejected_login)?;
        let scope: ScopeResponse = response.json().await?;
        credential.scoped_token = Some(scope.token);
    }

    tracing::debug!("Login successful");
    Ok(())
}

/// HTTP rejections of a login turn into authentication failures. Transport
/// errors keep their own kind.
fn rejected_login(error: VinfraError) -> VinfraError {
    match error {
        VinfraError::Http { message, .. } => {
            VinfraError::Authentication(format!("Login failed: {}", message))
        }
        other => other,
    }
}

/// Login whose session survives the process in a [`CredentialStore`]
pub struct CachedAuth {
    credential: Credential,
    store: CredentialStore,
    prompter: Box<dyn Prompter>,
    cache_loaded: bool,
}

impl CachedAuth {
    pub fn new(credential: Credential, store: CredentialStore) -> Self {
        CachedAuth {
            credential,
            store,
            prompter: Box::new(TerminalPrompter),
            cache_loaded: false,
        }
    }

    pub fn with_prompter(mut self, prompter: impl Prompter + 'static) -> Self {
        self.prompter = Box::new(prompter);
        self
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    fn load_cache(&mut self, transport: &Transport) {
        self.cache_loaded = true;
        if self.store.load_cookies(transport.jar(), &self.credential) {
            tracing::debug!("Using cached session for {}", self.credential.username);
        }
        if self.credential.project.is_some() && self.credential.scoped_token.is_none() {
            self.credential.scoped_token = self.store.load_project_token(&self.credential);
        }
    }
}

#[async_trait]
impl AuthPolicy for CachedAuth {
    fn has_cached_session(&self) -> bool {
        self.store.session_exists(&self.credential)
    }

    fn project_token(&self) -> Option<&str> {
        self.credential.scoped_token.as_deref()
    }

    async fn needs_reauthenticate(&mut self, transport: &Transport) -> Result<bool> {
        if !self.cache_loaded {
            self.load_cache(transport);
        }
        let missing_scope =
            self.credential.project.is_some() && self.credential.scoped_token.is_none();
        Ok(!transport.has_session() || missing_scope)
    }

    async fn make_authenticate(&mut self, transport: &Transport) -> Result<()> {
        self.cache_loaded = true;
        let password = complete_credential(&mut self.credential, self.prompter.as_ref())?;

        if let Err(e) = login_exchange(transport, &mut self.credential, &password).await {
            if matches!(e, VinfraError::Authentication(_)) {
                self.credential.password = None;
            }
            return Err(e);
        }

        self.store.save_cookies(transport.jar(), &self.credential)?;
        if let Some(token) = &self.credential.scoped_token {
            self.store.save_project_token(&self.credential, token)?;
        }
        Ok(())
    }
}

/// Login kept in memory only, used when there is nowhere to cache a session
pub struct PasswordAuth {
    credential: Credential,
    prompter: Box<dyn Prompter>,
}

impl PasswordAuth {
    pub fn new(credential: Credential) -> Self {
        PasswordAuth {
            credential,
            prompter: Box::new(TerminalPrompter),
        }
    }

    pub fn with_prompter(mut self, prompter: impl Prompter + 'static) -> Self {
        self.prompter = Box::new(prompter);
        self
    }
}

#[async_trait]
impl AuthPolicy for PasswordAuth {
    fn project_token(&self) -> Option<&str> {
        self.credential.scoped_token.as_deref()
    }

    async fn needs_reauthenticate(&mut self, transport: &Transport) -> Result<bool> {
        let missing_scope =
            self.credential.project.is_some() && self.credential.scoped_token.is_none();
        Ok(!transport.has_session() || missing_scope)
    }

    async fn make_authenticate(&mut self, transport: &Transport) -> Result<()> {
        let password = complete_credential(&mut self.credential, self.prompter.as_ref())?;
        let result = login_exchange(transport, &mut self.credential, &password).await;
        if matches!(result, Err(VinfraError::Authentication(_))) {
            self.credential.password = None;
        }
        result
    }
}
