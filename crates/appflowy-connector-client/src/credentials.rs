//! Connection credentials.

use crate::error::ApiError;
use std::fmt;
use url::Url;

/// Host used when none is configured.
pub const DEFAULT_HOST: &str = "https://beta.appflowy.cloud";

/// Host and login of an AppFlowy account.
#[derive(Clone)]
pub struct Credentials {
    host: String,
    username: String,
    password: String,
}

impl Credentials {
    /// Create credentials for `host`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::MalformedInput`] if `host` is not an http(s) URL.
    pub fn new(
        host: &str,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let url = Url::parse(host)
            .map_err(|e| ApiError::MalformedInput(format!("invalid host {host}: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ApiError::MalformedInput(format!(
                "invalid host {host}: unsupported scheme '{}'",
                url.scheme()
            )));
        }

        Ok(Self {
            host: host.trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
        })
    }

    /// Base URL without trailing slash.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Login e-mail.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Login password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Absolute URL of an API path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.host)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
