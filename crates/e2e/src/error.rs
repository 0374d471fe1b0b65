//! Error types for the E2E suite

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    /// A wait condition never became true.
    #[error("Timeout after {timeout_ms} ms waiting for: {what}")]
    Timeout { what: String, timeout_ms: u64 },

    /// Observed UI state contradicts the permissions of the expected role.
    #[error("Role assertion failed for {role}: {detail}")]
    RoleAssertion { role: String, detail: String },

    #[error("Event '{name}' was not confirmed within {timeout_ms} ms")]
    CreationTimeout { name: String, timeout_ms: u64 },

    #[error("Expected exactly one match for {locator}, found {count}")]
    AmbiguousLookup { locator: String, count: usize },

    /// An absence assertion saw the element.
    #[error("{what} should be absent but appeared within {within_ms} ms")]
    UnexpectedElement { what: String, within_ms: u64 },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Cannot {action} while session is {state}")]
    PermissionDenied { action: String, state: String },

    #[error("WebDriver server failed to start: {0}")]
    DriverStartup(String),

    #[error("WebDriver health check failed after {0} attempts")]
    DriverHealthCheck(usize),

    #[error("Application at {url} did not answer after {attempts} attempts")]
    AppUnreachable { url: String, attempts: usize },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebDriver error: {0}")]
    WebDriver(#[from] thirtyfour::error::WebDriverError),
}

pub type E2eResult<T> = Result<T, E2eError>;

/// Stable label for an error, recorded in the JSON report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Timeout,
    RoleAssertion,
    CreationTimeout,
    AmbiguousLookup,
    UnexpectedElement,
    Assertion,
    PermissionDenied,
    Driver,
    Config,
    Io,
    WebDriver,
}

impl E2eError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            E2eError::Timeout { .. } => ErrorKind::Timeout,
            E2eError::RoleAssertion { .. } => ErrorKind::RoleAssertion,
            E2eError::CreationTimeout { .. } => ErrorKind::CreationTimeout,
            E2eError::AmbiguousLookup { .. } => ErrorKind::AmbiguousLookup,
            E2eError::UnexpectedElement { .. } => ErrorKind::UnexpectedElement,
            E2eError::AssertionFailed(_) => ErrorKind::Assertion,
            E2eError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            E2eError::DriverStartup(_)
            | E2eError::DriverHealthCheck(_)
            | E2eError::AppUnreachable { .. }
            | E2eError::Http(_) => ErrorKind::Driver,
            E2eError::Config(_) | E2eError::Yaml(_) => ErrorKind::Config,
            E2eError::Io(_) | E2eError::Json(_) => ErrorKind::Io,
            E2eError::WebDriver(_) => ErrorKind::WebDriver,
        }
    }

    /// True when a wait condition simply never held.
    pub fn is_timeout(&self) -> bool {
        matches!(self, E2eError::Timeout { .. })
    }

    pub(crate) fn timeout(what: impl Into<String>, timeout: std::time::Duration) -> Self {
        E2eError::Timeout {
            what: what.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }
}
