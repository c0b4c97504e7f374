//! In-memory cookie jar shared with the HTTP client.
//!
//! reqwest consults the jar through its `CookieStore` seam on every request
//! and feeds it every `Set-Cookie` header it receives. The jar can be written
//! to and restored from the Netscape/Mozilla `cookies.txt` text format, which
//! is what the session cache on disk uses.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::header::HeaderValue;
use thiserror::Error;
use tracing::trace;
use url::Url;

pub const NETSCAPE_HEADER: &str = "# Netscape HTTP Cookie File";
const LEGACY_HEADER: &str = "# HTTP Cookie File";
const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CookieFileError {
    #[error("cookie file does not start with a Netscape cookie file header")]
    MissingHeader,
    #[error("malformed cookie file line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },
}

/// One cookie as kept in the jar and in `cookies.txt`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCookie {
    /// Host name, with a leading dot when the cookie applies to subdomains
    pub domain: String,
    pub include_subdomains: bool,
    pub path: String,
    pub secure: bool,
    /// Unix timestamp; `None` for session cookies
    pub expires: Option<i64>,
    pub name: String,
    pub value: String,
}

impl StoredCookie {
    fn bare_domain(&self) -> &str {
        self.domain.trim_start_matches('.')
    }

    fn is_expired(&self, now: i64) -> bool {
        matches!(self.expires, Some(expires) if expires <= now)
    }

    fn same_slot(&self, other: &StoredCookie) -> bool {
        self.name == other.name
            && self.path == other.path
            && self.bare_domain().eq_ignore_ascii_case(other.bare_domain())
    }

    fn matches_url(&self, url: &Url, now: i64) -> bool {
        self.matches_host(url, now) && path_matches(url.path(), &self.path)
    }

    /// Domain, scheme and expiry checks; the cookie path is ignored
    fn matches_host(&self, url: &Url, now: i64) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if self.is_expired(now) {
            return false;
        }
        if self.secure && url.scheme() != "https" {
            return false;
        }

        let domain = self.bare_domain();
        let domain_ok = if self.include_subdomains {
            domain_matches(host, domain)
        } else {
            host.eq_ignore_ascii_case(domain)
        };

        domain_ok
    }

    fn to_netscape_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.domain,
            bool_field(self.include_subdomains),
            self.path,
            bool_field(self.secure),
            self.expires.map(|e| e.to_string()).unwrap_or_default(),
            self.name,
            self.value
        )
    }
}

fn bool_field(value: bool) -> &'static str {
    if value {
        "TRUE"
    } else {
        "FALSE"
    }
}

fn parse_bool_field(value: &str, line: usize) -> Result<bool, CookieFileError> {
    match value {
        "TRUE" => Ok(true),
        "FALSE" => Ok(false),
        other => Err(CookieFileError::MalformedLine {
            line,
            reason: format!("expected TRUE or FALSE, got '{}'", other),
        }),
    }
}

fn domain_matches(host: &str, domain: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let domain = domain.to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{}", domain))
}

fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/'))
}

/// Default cookie path per RFC 6265: the request path up to its last slash
fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(index) => path[..index].to_string(),
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Parse the text of a `cookies.txt` file.
///
/// The header line is mandatory; an empty file is malformed.
pub fn parse_netscape(text: &str) -> Result<Vec<StoredCookie>, CookieFileError> {
    let mut lines = text.lines().enumerate();

    match lines.next() {
        Some((_, header))
            if header.trim_start().starts_with(NETSCAPE_HEADER)
                || header.trim_start().starts_with(LEGACY_HEADER) => {}
        _ => return Err(CookieFileError::MissingHeader),
    }

    let mut cookies = Vec::new();
    for (index, raw) in lines {
        let line_number = index + 1;
        let line = raw.trim_end_matches('\r');

        let line = match line.strip_prefix(HTTP_ONLY_PREFIX) {
            Some(rest) => rest,
            None if line.trim_start().starts_with('#') || line.trim().is_empty() => continue,
            None => line,
        };

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 7 {
            return Err(CookieFileError::MalformedLine {
                line: line_number,
                reason: format!("expected 7 tab-separated fields, got {}", fields.len()),
            });
        }

        let expires = match fields[4] {
            "" | "0" => None,
            value => Some(value.parse::<i64>().map_err(|_| CookieFileError::MalformedLine {
                line: line_number,
                reason: format!("invalid expiry '{}'", value),
            })?),
        };

        if fields[0].is_empty() || fields[5].is_empty() {
            return Err(CookieFileError::MalformedLine {
                line: line_number,
                reason: "empty domain or cookie name".to_string(),
            });
        }

        cookies.push(StoredCookie {
            domain: fields[0].to_string(),
            include_subdomains: parse_bool_field(fields[1], line_number)?,
            path: fields[2].to_string(),
            secure: parse_bool_field(fields[3], line_number)?,
            expires,
            name: fields[5].to_string(),
            value: fields[6].to_string(),
        });
    }

    Ok(cookies)
}

/// Cookie storage plugged into the reqwest client
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: RwLock<Vec<StoredCookie>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<StoredCookie>> {
        self.cookies.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<StoredCookie>> {
        self.cookies.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a cookie, replacing any cookie with the same domain, path and name
    pub fn insert(&self, cookie: StoredCookie) {
        let mut cookies = self.write();
        cookies.retain(|existing| !existing.same_slot(&cookie));
        cookies.push(cookie);
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    pub fn len(&self) -> usize {
        let now = unix_now();
        self.read().iter().filter(|c| !c.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether any live cookie would be sent to `url`
    pub fn has_cookies_for(&self, url: &Url) -> bool {
        let now = unix_now();
        self.read().iter().any(|c| c.matches_url(url, now))
    }

    /// Whether any live cookie belongs to the host of `url`, whatever its path
    pub fn has_cookies_for_host(&self, url: &Url) -> bool {
        let now = unix_now();
        self.read().iter().any(|c| c.matches_host(url, now))
    }

    pub fn snapshot(&self) -> Vec<StoredCookie> {
        self.read().clone()
    }

    /// Render every unexpired cookie, session cookies included, as `cookies.txt`
    pub fn to_netscape(&self) -> String {
        let now = unix_now();
        let mut text = String::from(NETSCAPE_HEADER);
        text.push_str("\n# This file is generated by vinfra. Do not edit.\n\n");
        for cookie in self.read().iter().filter(|c| !c.is_expired(now)) {
            text.push_str(&cookie.to_netscape_line());
            text.push('\n');
        }
        text
    }

    /// Merge cookies from `cookies.txt` text into the jar. Expired entries are
    /// skipped. Returns the number of cookies adopted.
    pub fn load_netscape(&self, text: &str) -> Result<usize, CookieFileError> {
        let now = unix_now();
        let parsed = parse_netscape(text)?;
        let mut adopted = 0;
        for cookie in parsed.into_iter().filter(|c| !c.is_expired(now)) {
            self.insert(cookie);
            adopted += 1;
        }
        Ok(adopted)
    }

    fn store_set_cookie(&self, header: &str, url: &Url, now: i64) {
        let parsed = match cookie::Cookie::parse(header) {
            Ok(parsed) => parsed,
            Err(e) => {
                trace!("Ignoring unparsable Set-Cookie header: {}", e);
                return;
            }
        };
        let Some(host) = url.host_str() else {
            return;
        };
        let host = host.trim_start_matches('[').trim_end_matches(']').to_ascii_lowercase();

        let (domain, include_subdomains) = match parsed.domain() {
            Some(domain) => {
                let domain = domain.trim_start_matches('.').to_ascii_lowercase();
                if !domain_matches(&host, &domain) {
                    trace!("Rejecting cookie {} for foreign domain {}", parsed.name(), domain);
                    return;
                }
                (format!(".{}", domain), true)
            }
            None => (host, false),
        };

        let path = parsed
            .path()
            .filter(|p| p.starts_with('/'))
            .map(str::to_string)
            .unwrap_or_else(|| default_path(url));

        let expires = match (parsed.max_age(), parsed.expires_datetime()) {
            (Some(max_age), _) => Some(now.saturating_add(max_age.whole_seconds())),
            (None, Some(at)) => Some(at.unix_timestamp()),
            (None, None) => None,
        };

        let stored = StoredCookie {
            domain,
            include_subdomains,
            path,
            secure: parsed.secure().unwrap_or(false),
            expires,
            name: parsed.name().to_string(),
            value: parsed.value().to_string(),
        };

        if stored.is_expired(now) {
            self.write().retain(|existing| !existing.same_slot(&stored));
        } else {
            self.insert(stored);
        }
    }
}

impl reqwest::cookie::CookieStore for CookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let now = unix_now();
        for header in cookie_headers {
            if let Ok(text) = header.to_str() {
                self.store_set_cookie(text, url, now);
            }
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let now = unix_now();
        let header = self
            .read()
            .iter()
            .filter(|c| c.matches_url(url, now))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ");

        if header.is_empty() {
            None
        } else {
            HeaderValue::from_str(&header).ok()
        }
    }
}
