use dashpanel_core::error::CoreError;

/// Error type for the panel controllers and their collaborators.
///
/// Wraps [`CoreError`] for domain errors and adds transport and
/// configuration variants.
#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    /// A domain-level error from `dashpanel_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("Backend API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// A configuration value is missing or malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for controller return values.
pub type PanelResult<T> = Result<T, PanelError>;
