use std::time::Duration;

use crate::error::{PanelError, PanelResult};

/// Backend client configuration loaded from environment variables.
///
/// All fields have defaults suitable for a local backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the dashboard backend, without a trailing slash.
    pub backend_url: String,
    /// Bearer token sent with every request, if set.
    pub api_token: Option<String>,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            api_token: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

const DEFAULT_BACKEND_URL: &str = "http://localhost:3000";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

impl ClientConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                          | Default                 |
    /// |----------------------------------|-------------------------|
    /// | `DASHPANEL_BACKEND_URL`          | `http://localhost:3000` |
    /// | `DASHPANEL_API_TOKEN`            | unset                   |
    /// | `DASHPANEL_REQUEST_TIMEOUT_SECS` | `30`                    |
    pub fn from_env() -> PanelResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> PanelResult<Self> {
        let backend_url = lookup("DASHPANEL_BACKEND_URL")
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.into())
            .trim_end_matches('/')
            .to_string();

        let api_token = lookup("DASHPANEL_API_TOKEN").filter(|t| !t.is_empty());

        let request_timeout_secs: u64 = match lookup("DASHPANEL_REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                PanelError::Config(format!(
                    "DASHPANEL_REQUEST_TIMEOUT_SECS must be a valid u64, got '{raw}'"
                ))
            })?,
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        Ok(Self {
            backend_url,
            api_token,
            request_timeout: Duration::from_secs(request_timeout_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, ClientConfig::default());
    }

    #[test]
    fn reads_overrides_and_trims_slash() {
        let cfg = ClientConfig::from_lookup(lookup(&[
            ("DASHPANEL_BACKEND_URL", "https://dash.example.com/"),
            ("DASHPANEL_API_TOKEN", "secret"),
            ("DASHPANEL_REQUEST_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(cfg.backend_url, "https://dash.example.com");
        assert_eq!(cfg.api_token.as_deref(), Some("secret"));
        assert_eq!(cfg.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn empty_token_is_none() {
        let cfg = ClientConfig::from_lookup(lookup(&[("DASHPANEL_API_TOKEN", "")])).unwrap();
        assert_eq!(cfg.api_token, None);
    }

    #[test]
    fn invalid_timeout_is_config_error() {
        let result =
            ClientConfig::from_lookup(lookup(&[("DASHPANEL_REQUEST_TIMEOUT_SECS", "soon")]));
        assert_matches!(result, Err(PanelError::Config(_)));
    }
}
