//! Backend URL parsing.
//!
//! URLs have the form `scheme://[user[:password]@][host]/path`. User and
//! password are percent-decoded, so an e-mail login is written as
//! `user%40example.com`. The host is accepted and ignored.

use crate::{MegapoolError, Result};

/// A parsed backend URL.
#[derive(Clone, PartialEq, Eq)]
pub struct BackendUrl {
    /// URL scheme, lower-cased
    pub scheme: String,
    /// Decoded user name, if present
    pub username: Option<String>,
    /// Decoded password, if present
    pub password: Option<String>,
    /// Path, starting with `/` (empty if the URL has none)
    pub path: String,
}

impl std::fmt::Debug for BackendUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendUrl")
            .field("scheme", &self.scheme)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("path", &self.path)
            .finish()
    }
}

impl BackendUrl {
    /// Parses a backend URL.
    ///
    /// # Errors
    ///
    /// Returns [`MegapoolError::InvalidUrl`] if there is no `scheme://`
    /// prefix or the user info is not valid percent-encoded UTF-8.
    ///
    /// # Example
    ///
    /// ```
    /// use megapool::url::BackendUrl;
    ///
    /// let url = BackendUrl::parse("mega://alice%40example.com:pw@/Root/backup").unwrap();
    /// assert_eq!(url.scheme, "mega");
    /// assert_eq!(url.username.as_deref(), Some("alice@example.com"));
    /// assert_eq!(url.password.as_deref(), Some("pw"));
    /// assert_eq!(url.path, "/Root/backup");
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let (scheme, rest) = input.split_once("://").ok_or_else(|| {
            MegapoolError::InvalidUrl(format!("missing scheme in '{}'", redact(input)))
        })?;

        if scheme.is_empty()
            || !scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        {
            return Err(MegapoolError::InvalidUrl(format!("bad scheme '{}'", scheme)));
        }

        let (authority, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        };

        let (username, password) = match authority.rsplit_once('@') {
            Some((userinfo, _host)) => match userinfo.split_once(':') {
                Some((user, pass)) => (Some(decode(user)?), Some(decode(pass)?)),
                None => (Some(decode(userinfo)?), None),
            },
            None => (None, None),
        };

        Ok(Self {
            scheme: scheme.to_ascii_lowercase(),
            username: username.filter(|u| !u.is_empty()),
            password,
            path: path.to_string(),
        })
    }
}

fn decode(part: &str) -> Result<String> {
    urlencoding::decode(part)
        .map(|s| s.into_owned())
        .map_err(|e| MegapoolError::InvalidUrl(format!("bad percent-encoding: {}", e)))
}

/// Hides the user info of a URL for error messages.
fn redact(input: &str) -> String {
    match input.rsplit_once('@') {
        Some((_, tail)) => format!("***@{}", tail),
        None => input.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_account_url() {
        let url = BackendUrl::parse("mega://user%40domain.com:p%2Fss@/Root/backup").unwrap();

        assert_eq!(url.username.as_deref(), Some("user@domain.com"));
        assert_eq!(url.password.as_deref(), Some("p/ss"));
        assert_eq!(url.path, "/Root/backup");
    }

    #[test]
    fn test_url_without_password() {
        let url = BackendUrl::parse("MEGA://alice@mega.nz/Root").unwrap();

        assert_eq!(url.scheme, "mega");
        assert_eq!(url.username.as_deref(), Some("alice"));
        assert_eq!(url.password, None);
        assert_eq!(url.path, "/Root");
    }

    #[test]
    fn test_file_style_url() {
        let url = BackendUrl::parse("megapool:///etc/megapool/accounts.toml").unwrap();

        assert_eq!(url.scheme, "megapool");
        assert_eq!(url.username, None);
        assert_eq!(url.path, "/etc/megapool/accounts.toml");
    }

    #[test]
    fn test_missing_scheme() {
        let err = BackendUrl::parse("alice:secret@/Root").unwrap_err();

        assert!(matches!(err, MegapoolError::InvalidUrl(_)));
        assert!(!err.to_string().contains("secret"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let url = BackendUrl::parse("mega://a:hunter2@/Root").unwrap();
        assert!(!format!("{:?}", url).contains("hunter2"));
    }
}
