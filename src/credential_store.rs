//! On-disk session cache.
//!
//! Each credential identity maps to a cookie file
//! `<home>/.vinfra/<host>/<username>[.<domain>]`, and a project-scoped token
//! lives next to it with `.<project>` appended. Files are `0600`, the host
//! directory `0700`. Passwords are never written.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use crate::configuration::{vinfra_directory, Credential};
use crate::cookie_jar::CookieJar;
use crate::error::{Result, VinfraError};

#[cfg(unix)]
const PRIVATE_FILE_MODE: u32 = 0o600;
#[cfg(unix)]
const PRIVATE_DIRECTORY_MODE: u32 = 0o700;

/// Keep user-supplied identity parts from escaping the cache directory
fn path_component(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .map(|c| if c == '/' || c == '\\' || c == '\0' { '_' } else { c })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => format!("_{}", cleaned),
        _ => cleaned,
    }
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    root: PathBuf,
}

impl CredentialStore {
    /// Store rooted at an explicit `.vinfra` directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        CredentialStore { root: root.into() }
    }

    /// Store rooted at `<home>/.vinfra`
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(vinfra_directory()?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cookie file location for a credential identity
    pub fn path_for(&self, credential: &Credential) -> PathBuf {
        let mut file_name = path_component(&credential.username);
        if let Some(domain) = &credential.domain {
            file_name.push('.');
            file_name.push_str(&path_component(domain));
        }
        self.root.join(path_component(&credential.host)).join(file_name)
    }

    /// Token file location, when the credential is scoped to a project
    pub fn project_token_path(&self, credential: &Credential) -> Option<PathBuf> {
        let project = credential.project.as_ref()?;
        let mut path = self.path_for(credential).into_os_string();
        path.push(".");
        path.push(path_component(project));
        Some(PathBuf::from(path))
    }

    /// Whether a previous login left a cookie file behind
    pub fn session_exists(&self, credential: &Credential) -> bool {
        self.path_for(credential).is_file()
    }

    /// Adopt a cached session into `jar`.
    ///
    /// Returns whether any cookie was loaded. An unreadable, empty or
    /// malformed file counts as no cached session.
    pub fn load_cookies(&self, jar: &CookieJar, credential: &Credential) -> bool {
        let path = self.path_for(credential);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                trace!("No cached session at {}: {}", path.display(), e);
                return false;
            }
        };

        match jar.load_netscape(&text) {
            Ok(count) => {
                debug!("Loaded {} cached cookie(s) from {}", count, path.display());
                count > 0
            }
            Err(e) => {
                debug!("Ignoring unusable session cache {}: {}", path.display(), e);
                false
            }
        }
    }

    pub fn load_project_token(&self, credential: &Credential) -> Option<String> {
        let path = self.project_token_path(credential)?;
        let token = fs::read_to_string(&path).ok()?;
        let token = token.trim();
        if token.is_empty() {
            None
        } else {
            debug!("Loaded cached project token from {}", path.display());
            Some(token.to_string())
        }
    }

    /// Persist the jar's current cookies
    pub fn save_cookies(&self, jar: &CookieJar, credential: &Credential) -> Result<()> {
        let path = self.path_for(credential);
        write_private_file(&path, jar.to_netscape().as_bytes())?;
        debug!("Saved session cookies to {}", path.display());
        Ok(())
    }

    pub fn save_project_token(&self, credential: &Credential, token: &str) -> Result<()> {
        let path = self.project_token_path(credential).ok_or_else(|| {
            VinfraError::Client("Cannot cache a project token without a project".to_string())
        })?;
        write_private_file(&path, token.as_bytes())?;
        debug!("Saved project token to {}", path.display());
        Ok(())
    }

    /// Remove the cookie file and the project token. Returns whether
    /// anything was removed.
    pub fn clear(&self, credential: &Credential) -> Result<bool> {
        let mut removed = false;
        let paths = std::iter::once(self.path_for(credential))
            .chain(self.project_token_path(credential));
        for path in paths {
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!("Removed {}", path.display());
                    removed = true;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }
}

fn ensure_private_directory(directory: &Path) -> Result<()> {
    if directory.is_dir() {
        return Ok(());
    }

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(PRIVATE_DIRECTORY_MODE);
    }
    builder.create(directory).map_err(|e| {
        VinfraError::Client(format!(
            "Failed to create cache directory {}: {}",
            directory.display(),
            e
        ))
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(directory, fs::Permissions::from_mode(PRIVATE_DIRECTORY_MODE))?;
    }
    Ok(())
}

/// Write through a temporary file in the same directory and rename it into
/// place, so readers never observe a partially written cache file.
fn write_private_file(path: &Path, contents: &[u8]) -> Result<()> {
    let directory = path.parent().ok_or_else(|| {
        VinfraError::Client(format!("Invalid cache file path {}", path.display()))
    })?;
    ensure_private_directory(directory)?;

    let failed = |e: std::io::Error| {
        VinfraError::Client(format!("Failed to write {}: {}", path.display(), e))
    };

    let mut temporary = tempfile::NamedTempFile::new_in(directory).map_err(failed)?;
    temporary.write_all(contents).map_err(failed)?;
    temporary.as_file().sync_all().map_err(failed)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(temporary.path(), fs::Permissions::from_mode(PRIVATE_FILE_MODE))
            .map_err(failed)?;
    }

    temporary.persist(path).map_err(|e| {
        warn!("Could not move cache file into place: {}", e);
        failed(e.error)
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookie_jar::StoredCookie;

    fn credential() -> Credential {
        Credential::new("backend.example.com", "admin")
    }

    fn jar_with(cookies: &[(&str, &str)]) -> CookieJar {
        let jar = CookieJar::new();
        for (name, value) in cookies {
            jar.insert(StoredCookie {
                domain: "backend.example.com".to_string(),
                include_subdomains: false,
                path: "/".to_string(),
                secure: true,
                expires: None,
                name: name.to_string(),
                value: value.to_string(),
            });
        }
        jar
    }

    #[test]
    fn test_path_for_layout() {
        let store = CredentialStore::new("/home/u/.vinfra");
        assert_eq!(
            store.path_for(&credential()),
            PathBuf::from("/home/u/.vinfra/backend.example.com/admin")
        );

        let scoped = credential().with_domain("Default").with_project("admin");
        assert_eq!(
            store.path_for(&scoped),
            PathBuf::from("/home/u/.vinfra/backend.example.com/admin.Default")
        );
        assert_eq!(
            store.project_token_path(&scoped).unwrap(),
            PathBuf::from("/home/u/.vinfra/backend.example.com/admin.Default.admin")
        );
        assert!(store.project_token_path(&credential()).is_none());
    }

    #[test]
    fn test_path_for_cannot_escape_root() {
        let store = CredentialStore::new("/root/.vinfra");
        let sneaky = Credential::new("..", "../../etc/passwd");
        let path = store.path_for(&sneaky);
        assert!(path.starts_with("/root/.vinfra"));
        assert_eq!(path.components().count(), 5);
    }

    #[test]
    fn test_save_and_load_cookies_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join(".vinfra"));
        let saved = jar_with(&[("session", "abc"), ("csrftoken", "xyz")]);

        store.save_cookies(&saved, &credential()).unwrap();
        assert!(store.session_exists(&credential()));

        let fresh = CookieJar::new();
        assert!(store.load_cookies(&fresh, &credential()));

        let pairs = |jar: &CookieJar| {
            let mut pairs: Vec<(String, String)> = jar
                .snapshot()
                .into_iter()
                .map(|c| (c.name, c.value))
                .collect();
            pairs.sort();
            pairs
        };
        assert_eq!(pairs(&fresh), pairs(&saved));
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_files_are_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join(".vinfra"));
        let scoped = credential().with_project("p1");

        store.save_cookies(&jar_with(&[("s", "1")]), &scoped).unwrap();
        store.save_project_token(&scoped, "token-1").unwrap();

        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
        let cookie_path = store.path_for(&scoped);
        assert_eq!(mode(&cookie_path), 0o600);
        assert_eq!(mode(cookie_path.parent().unwrap()), 0o700);
        assert_eq!(mode(&store.project_token_path(&scoped).unwrap()), 0o600);
    }

    #[test]
    fn test_password_is_never_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        let with_password = credential().with_password("s3cr3t-pw");

        store.save_cookies(&jar_with(&[("s", "1")]), &with_password).unwrap();
        let text = fs::read_to_string(store.path_for(&with_password)).unwrap();
        assert!(!text.contains("s3cr3t-pw"));
    }

    #[test]
    fn test_malformed_or_empty_cache_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        let path = store.path_for(&credential());
        fs::create_dir_all(path.parent().unwrap()).unwrap();

        fs::write(&path, "").unwrap();
        let jar = CookieJar::new();
        assert!(!store.load_cookies(&jar, &credential()));

        fs::write(&path, "not a cookie file").unwrap();
        assert!(!store.load_cookies(&jar, &credential()));
        assert!(jar.is_empty());
    }

    #[test]
    fn test_missing_cache_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        assert!(!store.session_exists(&credential()));
        assert!(!store.load_cookies(&CookieJar::new(), &credential()));
        assert!(store.load_project_token(&credential().with_project("p")).is_none());
    }

    #[test]
    fn test_project_token_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        let scoped = credential().with_project("p1");

        store.save_project_token(&scoped, "opaque-token\n").unwrap();
        assert_eq!(store.load_project_token(&scoped).as_deref(), Some("opaque-token"));

        let err = store.save_project_token(&credential(), "t").unwrap_err();
        assert!(matches!(err, VinfraError::Client(_)));
    }

    #[test]
    fn test_save_failure_is_surfaced() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();
        let store = CredentialStore::new(&blocker);

        let err = store
            .save_cookies(&jar_with(&[("s", "1")]), &credential())
            .unwrap_err();
        assert!(matches!(err, VinfraError::Client(_)));
    }

    #[test]
    fn test_clear_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path());
        let scoped = credential().with_project("p1");
        store.save_cookies(&jar_with(&[("s", "1")]), &scoped).unwrap();
        store.save_project_token(&scoped, "t").unwrap();

        assert!(store.clear(&scoped).unwrap());
        assert!(!store.session_exists(&scoped));
        assert!(!store.clear(&scoped).unwrap());
    }
}
