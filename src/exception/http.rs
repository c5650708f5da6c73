use crate::error::{LfsError, Result};
use crate::exception::{ExceptionFilter, Failure, access_denied_as_json};
use crate::representation::output_git_lfs_json;
use axum::{http::StatusCode, response::Response};
use serde_json::json;
use std::fmt;

/// A member of the generic HTTP exception family
///
/// Coded exceptions carry the status they will be rendered with. Uncoded
/// ones stand for any failure without HTTP semantics and are rendered as
/// 500 Internal Server Error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpException {
    status: Option<StatusCode>,
    message: String,
}

macro_rules! http_exceptions {
    ($($name:ident => $status:ident),* $(,)?) => {
        impl HttpException {
            $(
                #[doc = concat!("A `", stringify!($status), "` exception")]
                pub fn $name(message: impl Into<String>) -> Self {
                    Self::new(StatusCode::$status, message)
                }
            )*
        }
    };
}

http_exceptions! {
    bad_request => BAD_REQUEST,
    unauthorized => UNAUTHORIZED,
    forbidden => FORBIDDEN,
    not_found => NOT_FOUND,
    method_not_allowed => METHOD_NOT_ALLOWED,
    not_acceptable => NOT_ACCEPTABLE,
    request_timeout => REQUEST_TIMEOUT,
    conflict => CONFLICT,
    gone => GONE,
    length_required => LENGTH_REQUIRED,
    precondition_failed => PRECONDITION_FAILED,
    payload_too_large => PAYLOAD_TOO_LARGE,
    uri_too_long => URI_TOO_LONG,
    unsupported_media_type => UNSUPPORTED_MEDIA_TYPE,
    range_not_satisfiable => RANGE_NOT_SATISFIABLE,
    expectation_failed => EXPECTATION_FAILED,
    unprocessable_entity => UNPROCESSABLE_ENTITY,
    locked => LOCKED,
    failed_dependency => FAILED_DEPENDENCY,
    precondition_required => PRECONDITION_REQUIRED,
    too_many_requests => TOO_MANY_REQUESTS,
    request_header_fields_too_large => REQUEST_HEADER_FIELDS_TOO_LARGE,
    unavailable_for_legal_reasons => UNAVAILABLE_FOR_LEGAL_REASONS,
    internal_server_error => INTERNAL_SERVER_ERROR,
    not_implemented => NOT_IMPLEMENTED,
    bad_gateway => BAD_GATEWAY,
    service_unavailable => SERVICE_UNAVAILABLE,
    gateway_timeout => GATEWAY_TIMEOUT,
    http_version_not_supported => HTTP_VERSION_NOT_SUPPORTED,
}

impl HttpException {
    /// A coded exception. Statuses outside 4xx/5xx carry no error
    /// semantics, so they are dropped and the exception is uncoded.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        if !(status.is_client_error() || status.is_server_error()) {
            tracing::warn!(
                status = status.as_u16(),
                "Non-error status on HTTP exception, treating it as uncoded"
            );
            return Self::uncoded(message);
        }
        Self {
            status: Some(status),
            message: non_empty(message.into(), status),
        }
    }

    /// A failure with no HTTP semantics of its own
    pub fn uncoded(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: non_empty(message.into(), StatusCode::INTERNAL_SERVER_ERROR),
        }
    }

    /// Build from a raw numeric code, which must be a 4xx or 5xx status.
    /// Unlike [`new`](Self::new), anything else is an error.
    pub fn from_code(code: u16, message: impl Into<String>) -> Result<Self> {
        let status = StatusCode::from_u16(code).map_err(|_| LfsError::InvalidStatus(code))?;
        if !(status.is_client_error() || status.is_server_error()) {
            return Err(LfsError::InvalidStatus(code));
        }
        Ok(Self::new(status, message))
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

fn non_empty(message: String, status: StatusCode) -> String {
    if message.trim().is_empty() {
        status.canonical_reason().unwrap_or("Error").to_string()
    } else {
        message
    }
}

impl From<StatusCode> for HttpException {
    fn from(status: StatusCode) -> Self {
        Self::new(status, "")
    }
}

impl fmt::Display for HttpException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HttpException {}

/// Render any generic failure as Git LFS JSON.
///
/// The status is the one attached to the failure, or 500 when there is
/// none. The body is `{"message": <failure>}`. Access denial keeps its own
/// rendering (always 403) even when it reaches this formatter.
pub fn error_as_json(failure: &Failure) -> Response {
    if let Failure::AccessDenied(denied) = failure {
        return access_denied_as_json(denied);
    }

    let status = failure
        .status()
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = json!({ "message": failure.to_string() });

    tracing::debug!(%body, status = status.as_u16(), "Rendering error response");

    output_git_lfs_json(&body, status)
}

/// The filter bound to every code of the generic HTTP exception family
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpExceptionFilter;

impl ExceptionFilter for HttpExceptionFilter {
    fn catch(&self, failure: Failure) -> Response {
        error_as_json(&failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::representation::GIT_LFS_MEDIA_TYPE;
    use axum::http::header;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_coded_failures_keep_their_status() {
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::NOT_FOUND,
            StatusCode::CONFLICT,
            StatusCode::SERVICE_UNAVAILABLE,
        ] {
            let failure = Failure::from(HttpException::new(status, "nope"));
            let response = error_as_json(&failure);

            assert_eq!(response.status(), status);
            assert_eq!(
                response.headers()[header::CONTENT_TYPE],
                GIT_LFS_MEDIA_TYPE
            );
            assert_eq!(body_json(response).await, json!({ "message": "nope" }));
        }
    }

    #[tokio::test]
    async fn test_not_found_scenario() {
        let failure = Failure::from(HttpException::not_found("object abc123 not found"));
        let response = HttpExceptionFilter.catch(failure);

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({ "message": "object abc123 not found" })
        );
    }

    #[tokio::test]
    async fn test_uncoded_failure_is_internal_server_error() {
        let failure = Failure::from(HttpException::uncoded("boom"));
        let response = error_as_json(&failure);

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await, json!({ "message": "boom" }));
    }

    #[test]
    fn test_empty_message_falls_back_to_reason() {
        assert_eq!(HttpException::not_found("").message(), "Not Found");
        assert_eq!(HttpException::uncoded("  ").message(), "Internal Server Error");
        assert_eq!(
            HttpException::from(StatusCode::METHOD_NOT_ALLOWED).to_string(),
            "Method Not Allowed"
        );
    }

    #[tokio::test]
    async fn test_non_error_status_is_uncoded() {
        let ex = HttpException::new(StatusCode::OK, "not really fine");
        assert_eq!(ex.status(), None);

        let response = error_as_json(&Failure::from(StatusCode::FOUND));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({ "message": "Internal Server Error" })
        );
    }

    #[tokio::test]
    async fn test_access_denied_keeps_forbidden() {
        let denied = crate::exception::AccessDenied::new("write denied")
            .with_actor("bob")
            .with_status(StatusCode::UNAUTHORIZED);
        let response = error_as_json(&Failure::from(denied));

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_json(response).await,
            json!({ "message": "write denied", "actor": "bob" })
        );
    }

    #[test]
    fn test_from_code_rejects_non_error_statuses() {
        assert!(matches!(
            HttpException::from_code(204, "fine"),
            Err(LfsError::InvalidStatus(204))
        ));
        assert!(matches!(
            HttpException::from_code(1000, "huh"),
            Err(LfsError::InvalidStatus(1000))
        ));

        let ex = HttpException::from_code(422, "invalid object").unwrap();
        assert_eq!(ex.status(), Some(StatusCode::UNPROCESSABLE_ENTITY));
    }
}
