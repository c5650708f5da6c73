//! Access denial raised by the storage and authorization layers
//!
//! Denial is a protocol-level Forbidden condition: whatever status the
//! failure carries internally, clients always receive 403.

use crate::exception::{ExceptionFilter, Failure, error_as_json};
use crate::representation::output_git_lfs_json;
use axum::{http::StatusCode, response::Response};
use serde_json::{Map, Value};
use std::fmt;

const DEFAULT_MESSAGE: &str = "Access denied";

/// An actor was not allowed to perform a storage operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDenied {
    message: String,
    actor: Option<String>,
    action: Option<String>,
    subject: Option<String>,
    status: Option<StatusCode>,
}

impl AccessDenied {
    pub fn new(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self {
            message: if message.trim().is_empty() {
                DEFAULT_MESSAGE.to_string()
            } else {
                message
            },
            actor: None,
            action: None,
            subject: None,
            status: None,
        }
    }

    /// The identity that was refused
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// The operation that was refused, e.g. `read` or `write`
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    /// The object or repository the operation targeted
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Record an internal status. It is never used for the response.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn actor(&self) -> Option<&str> {
        self.actor.as_deref()
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Structured serialization: `message` plus every contextual field
    /// that is present.
    pub fn as_dict(&self) -> Map<String, Value> {
        let mut dict = Map::new();
        dict.insert("message".to_string(), Value::from(self.message.as_str()));

        let context = [
            ("actor", &self.actor),
            ("action", &self.action),
            ("subject", &self.subject),
        ];
        for (key, value) in context {
            if let Some(value) = value {
                dict.insert(key.to_string(), Value::from(value.as_str()));
            }
        }
        dict
    }
}

impl fmt::Display for AccessDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for AccessDenied {}

/// Render an access denial as Git LFS JSON with status 403.
pub fn access_denied_as_json(denied: &AccessDenied) -> Response {
    let body = Value::Object(denied.as_dict());
    let status = StatusCode::FORBIDDEN;

    tracing::debug!(%body, status = status.as_u16(), "Rendering access denied response");

    output_git_lfs_json(&body, status)
}

/// The filter bound to access-denied failures
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessDeniedFilter;

impl ExceptionFilter for AccessDeniedFilter {
    fn catch(&self, failure: Failure) -> Response {
        error_as_json(&failure)
    }
}
