//! Error types and handling for the `Wanderlens` pipeline

use std::fmt;
use thiserror::Error;

/// Upstream services the pipeline talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    Ideas,
    Detail,
    Accessibility,
    Itinerary,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Service::Ideas => "ideas",
            Service::Detail => "detail",
            Service::Accessibility => "accessibility",
            Service::Itinerary => "itinerary",
        };
        f.write_str(name)
    }
}

/// How a required upstream call failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamFailure {
    /// The service answered with a non-2xx status
    Status(u16),
    /// The service could not be reached (connect error, timeout, broken body)
    Unreachable(String),
}

impl fmt::Display for UpstreamFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpstreamFailure::Status(status) => write!(f, "status {status}"),
            UpstreamFailure::Unreachable(reason) => write!(f, "unreachable ({reason})"),
        }
    }
}

/// Main error type for the `Wanderlens` application
#[derive(Error, Debug)]
pub enum WanderlensError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Caller supplied input that violates a precondition
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// A required upstream call failed
    #[error("Upstream {service} service failed: {failure}")]
    Upstream {
        service: Service,
        failure: UpstreamFailure,
    },

    /// A required upstream answered 2xx with a body that breaks its contract
    #[error("Upstream {service} service returned an invalid response: {message}")]
    InvalidResponse { service: Service, message: String },

    /// Durable storage errors
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// General application errors
    #[error("Application error: {message}")]
    General { message: String },
}

impl WanderlensError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn upstream_status(service: Service, status: u16) -> Self {
        Self::Upstream {
            service,
            failure: UpstreamFailure::Status(status),
        }
    }

    pub fn upstream_unreachable<S: Into<String>>(service: Service, reason: S) -> Self {
        Self::Upstream {
            service,
            failure: UpstreamFailure::Unreachable(reason.into()),
        }
    }

    pub fn invalid_response<S: Into<String>>(service: Service, message: S) -> Self {
        Self::InvalidResponse {
            service,
            message: message.into(),
        }
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a new general error
    pub fn general<S: Into<String>>(message: S) -> Self {
        Self::General {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, WanderlensError::Validation { .. })
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            WanderlensError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            WanderlensError::Validation { message } => {
                format!("Invalid input: {message}")
            }
            WanderlensError::Upstream { service, .. }
            | WanderlensError::InvalidResponse { service, .. } => {
                format!("The {service} service is unavailable right now. Please try again later.")
            }
            WanderlensError::Storage { .. } => {
                "Saved data could not be read or written. You may need to reset local state."
                    .to_string()
            }
            WanderlensError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
            WanderlensError::General { message } => message.clone(),
        }
    }
}

impl From<anyhow::Error> for WanderlensError {
    fn from(err: anyhow::Error) -> Self {
        WanderlensError::storage(format!("{err:#}"))
    }
}
