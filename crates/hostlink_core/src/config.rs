//! Configuration for the facade.

use crate::error::ConfigError;
use std::fmt;
use std::path::PathBuf;
use url::Url;

/// Environment variable holding the service base URL.
pub const ENV_URL: &str = "HOSTLINK_URL";

/// Environment variable holding the public (anon) API key.
pub const ENV_PUBLIC_KEY: &str = "HOSTLINK_PUBLIC_KEY";

/// Environment variable holding the session file path.
pub const ENV_SESSION_FILE: &str = "HOSTLINK_SESSION_FILE";

/// Configuration for a [`crate::BackendFacade`].
///
/// There is deliberately no built-in default for the URL or key: both must
/// come from the caller or the environment.
#[derive(Clone)]
pub struct FacadeConfig {
    /// Service base URL, without a trailing slash.
    pub base_url: String,
    /// Public (anon/publishable) API key. Not suitable for privileged calls.
    pub public_key: String,
    /// Session behavior.
    pub auth: AuthOptions,
    /// Where persisted sessions are written, if file persistence is wanted.
    pub session_path: Option<PathBuf>,
}

impl FacadeConfig {
    /// Creates a configuration after validating the base URL.
    pub fn new(
        base_url: impl Into<String>,
        public_key: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let base_url = normalize_base_url(&base_url.into())?;
        let public_key = public_key.into();
        if public_key.trim().is_empty() {
            return Err(ConfigError::Missing(ENV_PUBLIC_KEY));
        }

        Ok(Self {
            base_url,
            public_key,
            auth: AuthOptions::default(),
            session_path: None,
        })
    }

    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, treating blank values as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let url = get(ENV_URL).ok_or(ConfigError::Missing(ENV_URL))?;
        let key = get(ENV_PUBLIC_KEY).ok_or(ConfigError::Missing(ENV_PUBLIC_KEY))?;

        let mut config = Self::new(url, key)?;
        config.session_path = get(ENV_SESSION_FILE).map(PathBuf::from);
        Ok(config)
    }

    /// Sets the session options.
    pub fn with_auth_options(mut self, auth: AuthOptions) -> Self {
        self.auth = auth;
        self
    }

    /// Persists sessions to the given file.
    pub fn with_session_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_path = Some(path.into());
        self
    }
}

impl fmt::Debug for FacadeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FacadeConfig")
            .field("base_url", &self.base_url)
            .field("public_key", &redact(&self.public_key))
            .field("auth", &self.auth)
            .field("session_path", &self.session_path)
            .finish()
    }
}

/// Session handling options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthOptions {
    /// Exchange the refresh token when the access token has expired.
    pub auto_refresh_token: bool,
    /// Keep the session in a [`crate::SessionStore`] across facade instances.
    pub persist_session: bool,
    /// Accept sessions carried in redirect URLs.
    pub detect_session_in_url: bool,
}

impl AuthOptions {
    /// Sets token auto-refresh.
    pub fn with_auto_refresh(mut self, enabled: bool) -> Self {
        self.auto_refresh_token = enabled;
        self
    }

    /// Sets session persistence.
    pub fn with_persist_session(mut self, enabled: bool) -> Self {
        self.persist_session = enabled;
        self
    }

    /// Sets session detection in redirect URLs.
    pub fn with_detect_session_in_url(mut self, enabled: bool) -> Self {
        self.detect_session_in_url = enabled;
        self
    }
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            auto_refresh_token: true,
            persist_session: true,
            detect_session_in_url: true,
        }
    }
}

fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::Missing(ENV_URL));
    }

    let parsed = Url::parse(trimmed).map_err(|e| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme {other:?}"),
        }),
    }
}

fn redact(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    format!("{visible}…")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn config_from_lookup() {
        let config = FacadeConfig::from_lookup(lookup(&[
            (ENV_URL, "https://project.example.com/"),
            (ENV_PUBLIC_KEY, "anon-key"),
        ]))
        .unwrap();

        assert_eq!(config.base_url, "https://project.example.com");
        assert_eq!(config.public_key, "anon-key");
        assert!(config.session_path.is_none());
        assert_eq!(config.auth, AuthOptions::default());
    }

    #[test]
    fn missing_values_have_no_fallback() {
        let err = FacadeConfig::from_lookup(lookup(&[(ENV_PUBLIC_KEY, "k")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing(ENV_URL));

        let err = FacadeConfig::from_lookup(lookup(&[
            (ENV_URL, "https://project.example.com"),
            (ENV_PUBLIC_KEY, "   "),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing(ENV_PUBLIC_KEY));
    }

    #[test]
    fn rejects_bad_urls() {
        assert!(matches!(
            FacadeConfig::new("not a url", "k"),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert!(matches!(
            FacadeConfig::new("ftp://files.example.com", "k"),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn session_file_from_env() {
        let config = FacadeConfig::from_lookup(lookup(&[
            (ENV_URL, "http://localhost:54321"),
            (ENV_PUBLIC_KEY, "k"),
            (ENV_SESSION_FILE, "/tmp/session.json"),
        ]))
        .unwrap();
        assert_eq!(config.session_path, Some(PathBuf::from("/tmp/session.json")));
    }

    #[test]
    fn debug_redacts_key() {
        let config = FacadeConfig::new("https://project.example.com", "sb_publishable_abcdef").unwrap();
        let text = format!("{config:?}");
        assert!(!text.contains("abcdef"));
    }

    #[test]
    fn auth_options_default_to_everything_on() {
        let opts = AuthOptions::default();
        assert!(opts.auto_refresh_token);
        assert!(opts.persist_session);
        assert!(opts.detect_session_in_url);
    }

    #[test]
    fn auth_options_builder() {
        let opts = AuthOptions::default()
            .with_auto_refresh(false)
            .with_persist_session(false)
            .with_detect_session_in_url(false);
        assert!(!opts.auto_refresh_token);
        assert!(!opts.persist_session);
        assert!(!opts.detect_session_in_url);
    }
}
