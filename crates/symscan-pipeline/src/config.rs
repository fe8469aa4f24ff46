//! Backend address configuration.
//!
//! The base URL is injected into every transport at construction so
//! tests and deployments can point the client anywhere.

use std::fmt;

use crate::ports::Endpoint;

/// Validation failures for [`BackendConfig`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The URL does not start with `http://` or `https://`.
    #[error("backend URL must start with http:// or https://, got {0:?}")]
    UnsupportedScheme(String),

    /// The URL has a scheme but no host.
    #[error("backend URL has no host: {0:?}")]
    MissingHost(String),
}

/// Where the detection backend lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    base_url: String,
}

impl BackendConfig {
    /// Backend address used when nothing else is configured.
    pub const DEFAULT_BASE_URL: &'static str = "http://127.0.0.1:8000";

    /// Validate and normalize a base URL.
    ///
    /// Surrounding whitespace and trailing `/` characters are removed so
    /// joined paths never contain `//`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedScheme`] for anything other
    /// than `http` / `https`, and [`ConfigError::MissingHost`] when
    /// nothing follows the scheme.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let rest = trimmed
            .strip_prefix("http://")
            .or_else(|| trimmed.strip_prefix("https://"))
            .ok_or_else(|| ConfigError::UnsupportedScheme(base_url.to_owned()))?;
        if rest.is_empty() || rest.starts_with('/') {
            return Err(ConfigError::MissingHost(base_url.to_owned()));
        }
        Ok(Self {
            base_url: trimmed.to_owned(),
        })
    }

    /// The normalized base URL, without a trailing `/`.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL of a pipeline endpoint.
    #[must_use]
    pub fn endpoint_url(&self, endpoint: Endpoint) -> String {
        self.asset_url(endpoint.path())
    }

    /// Absolute URL of a backend-relative asset path.
    ///
    /// A separating `/` is inserted only when `path` lacks one.
    #[must_use]
    pub fn asset_url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_owned(),
        }
    }
}

impl fmt::Display for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slashes_are_trimmed() {
        let config = BackendConfig::new(" http://localhost:8000// ").unwrap();
        assert_eq!(config.base_url(), "http://localhost:8000");
    }

    #[test]
    fn rejects_other_schemes() {
        assert_eq!(
            BackendConfig::new("ftp://host"),
            Err(ConfigError::UnsupportedScheme("ftp://host".into()))
        );
        assert!(BackendConfig::new("localhost:8000").is_err());
    }

    #[test]
    fn rejects_missing_host() {
        assert!(matches!(
            BackendConfig::new("https://"),
            Err(ConfigError::MissingHost(_))
        ));
    }

    #[test]
    fn asset_url_inserts_separator_only_when_needed() {
        let config = BackendConfig::new("http://b").unwrap();
        assert_eq!(config.asset_url("/static/p1.png"), "http://b/static/p1.png");
        assert_eq!(config.asset_url("static/p1.png"), "http://b/static/p1.png");
    }

    #[test]
    fn endpoint_urls() {
        let config = BackendConfig::default();
        assert_eq!(
            config.endpoint_url(Endpoint::LoadModel),
            "http://127.0.0.1:8000/load_model"
        );
    }
}
