//! Error types shared by every stage of the dispatch pipeline.

use std::fmt::{self, Display, Formatter};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, NotificationError>;

#[derive(Error, Debug, Clone)]
pub enum NotificationError {
    /// A required argument was missing or unusable.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Provider settings or a notification definition failed validation.
    #[error("Validation error: {field}: {message}")]
    Validation { field: String, message: String },

    /// Template syntax rejected by validation.
    #[error("Template error: {0}")]
    Template(String),

    #[error("No provider registered for type '{0}'")]
    UnknownProvider(String),

    /// Failure reported by a provider while talking to its channel.
    #[error("Provider error: {message}")]
    Provider {
        message: String,
        status_code: Option<u16>,
        retryable: bool,
    },

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Operation cancelled")]
    Cancelled,

    /// Queue backend failure.
    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// One or more event handlers failed during a publish.
    #[error("{0}")]
    Handlers(HandlerErrors),
}

impl NotificationError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// A failure the provider expects to clear up on its own.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
            status_code: None,
            retryable: true,
        }
    }

    /// A failure that will not succeed on retry (bad credentials, rejected payload).
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
            status_code: None,
            retryable: false,
        }
    }

    /// Provider failure carrying the status code returned by the remote side.
    /// 408, 429 and 5xx are treated as retryable.
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let retryable = status_code == 408 || status_code == 429 || status_code >= 500;
        Self::Provider {
            message: message.into(),
            status_code: Some(status_code),
            retryable,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Provider { status_code, .. } => *status_code,
            _ => None,
        }
    }

    /// Transient or permanent, as reported by the failing call. Consulted by
    /// `RetryConfig::honour_error_hints`.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider { retryable, .. } => *retryable,
            Self::Timeout(_) | Self::Cancelled | Self::Queue(_) => true,
            Self::InvalidInput(_)
            | Self::Validation { .. }
            | Self::Template(_)
            | Self::UnknownProvider(_)
            | Self::NotFound(_)
            | Self::Serialization(_)
            | Self::Handlers(_) => false,
        }
    }
}

impl From<serde_json::Error> for NotificationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<redis::RedisError> for NotificationError {
    fn from(err: redis::RedisError) -> Self {
        Self::Queue(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct HandlerFailure {
    pub handler: String,
    pub error: String,
}

/// Aggregate of every handler failure observed during one publish.
#[derive(Debug, Clone, Default)]
pub struct HandlerErrors(pub Vec<HandlerFailure>);

impl HandlerErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HandlerFailure> {
        self.0.iter()
    }
}

impl Display for HandlerErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} handler(s) failed", self.0.len())?;
        for failure in &self.0 {
            write!(f, "; {}: {}", failure.handler, failure.error)?;
        }
        Ok(())
    }
}
