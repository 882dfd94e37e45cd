//! Cookie jar capability and the deletion wire format.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

/// Expiry date used to clear a cookie.
pub const EXPIRED: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// Instruction to clear one cookie for one domain/path scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CookieDeletion {
    pub name: String,
    /// `None` clears the host-only cookie.
    pub domain: Option<String>,
    pub path: String,
}

impl CookieDeletion {
    /// `Set-Cookie` header value that clears the cookie.
    pub fn to_set_cookie_header(&self) -> String {
        let mut header = format!(
            "{}=; Expires={}; Max-Age=0; Path={}",
            self.name, EXPIRED, self.path
        );
        if let Some(domain) = &self.domain {
            header.push_str("; Domain=");
            header.push_str(domain);
        }
        header
    }
}

impl fmt::Display for CookieDeletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_set_cookie_header())
    }
}

/// Where cookies live. Deleting an absent cookie is a no-op.
pub trait CookieJar: Send + Sync {
    fn delete(&self, deletion: &CookieDeletion);
}

/// A cookie held by [`MemoryCookieJar`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: Option<String>,
    pub path: String,
}

/// In-process cookie jar.
///
/// Deletions match on exact name, domain and path, so a cookie stored for
/// `.example.com` is only removed by a deletion for `.example.com`.
#[derive(Debug, Default)]
pub struct MemoryCookieJar {
    cookies: Mutex<Vec<StoredCookie>>,
}

impl MemoryCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or replace a cookie.
    pub fn set(
        &self,
        name: impl Into<String>,
        value: impl Into<String>,
        domain: Option<&str>,
        path: impl Into<String>,
    ) {
        let cookie = StoredCookie {
            name: name.into(),
            value: value.into(),
            domain: domain.map(String::from),
            path: path.into(),
        };
        let mut cookies = self.cookies.lock().unwrap_or_else(PoisonError::into_inner);
        cookies.retain(|c| {
            !(c.name == cookie.name && c.domain == cookie.domain && c.path == cookie.path)
        });
        cookies.push(cookie);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|c| c.name == name)
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value.clone())
    }

    /// Sorted, de-duplicated cookie names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|c| c.name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn snapshot(&self) -> Vec<StoredCookie> {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CookieJar for MemoryCookieJar {
    fn delete(&self, deletion: &CookieDeletion) {
        self.cookies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|c| {
                !(c.name == deletion.name
                    && c.domain == deletion.domain
                    && c.path == deletion.path)
            });
    }
}

/// Collects `Set-Cookie` headers for an HTTP response.
#[derive(Debug, Default)]
pub struct HeaderCookieJar {
    headers: Mutex<Vec<String>>,
}

impl HeaderCookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headers(&self) -> Vec<String> {
        self.headers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drain collected headers.
    pub fn take_headers(&self) -> Vec<String> {
        std::mem::take(&mut *self.headers.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl CookieJar for HeaderCookieJar {
    fn delete(&self, deletion: &CookieDeletion) {
        let header = deletion.to_set_cookie_header();
        let mut headers = self.headers.lock().unwrap_or_else(PoisonError::into_inner);
        if !headers.contains(&header) {
            headers.push(header);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deletion(domain: Option<&str>) -> CookieDeletion {
        CookieDeletion {
            name: "_ga".into(),
            domain: domain.map(String::from),
            path: "/".into(),
        }
    }

    #[test]
    fn test_header_format() {
        assert_eq!(
            deletion(Some(".example.com")).to_set_cookie_header(),
            "_ga=; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0; Path=/; Domain=.example.com"
        );
        assert_eq!(
            deletion(None).to_set_cookie_header(),
            "_ga=; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0; Path=/"
        );
    }

    #[test]
    fn test_memory_jar_matches_scope_exactly() {
        let jar = MemoryCookieJar::new();
        jar.set("_ga", "GA1.1", Some(".example.com"), "/");
        jar.set("_ga", "GA1.2", None, "/");

        jar.delete(&deletion(Some("example.com")));
        assert_eq!(jar.snapshot().len(), 2);

        jar.delete(&deletion(Some(".example.com")));
        assert_eq!(jar.get("_ga").as_deref(), Some("GA1.2"));

        jar.delete(&deletion(None));
        assert!(!jar.contains("_ga"));

        jar.delete(&deletion(None));
        assert!(jar.names().is_empty());
    }

    #[test]
    fn test_header_jar_deduplicates() {
        let jar = HeaderCookieJar::new();
        jar.delete(&deletion(None));
        jar.delete(&deletion(None));
        assert_eq!(jar.headers().len(), 1);
        assert_eq!(jar.take_headers().len(), 1);
        assert!(jar.headers().is_empty());
    }
}
