//! Git LFS JSON representation
//!
//! Every response of the Git LFS API, error responses included, must carry
//! the `application/vnd.git-lfs+json` media type. This module owns that
//! rendering; the error formatters never build raw HTTP responses themselves.

use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Media type required on all Git LFS API responses
pub const GIT_LFS_MEDIA_TYPE: &str = "application/vnd.git-lfs+json";

const FALLBACK_BODY: &str = r#"{"message":"Internal Server Error"}"#;

/// Render `data` as a Git LFS JSON response with the given status.
///
/// Serialization failures never escape: they are logged and replaced by a
/// generic 500 body carrying the same media type.
pub fn output_git_lfs_json<T: Serialize + ?Sized>(data: &T, status: StatusCode) -> Response {
    match serde_json::to_vec(data) {
        Ok(body) => lfs_response(status, body),
        Err(err) => {
            tracing::error!(error = %err, "Failed to serialize Git LFS response body");
            lfs_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                FALLBACK_BODY.as_bytes().to_vec(),
            )
        }
    }
}

fn lfs_response(status: StatusCode, body: Vec<u8>) -> Response {
    (
        status,
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static(GIT_LFS_MEDIA_TYPE),
        )],
        body,
    )
        .into_response()
}

/// Response wrapper for payloads that must go out as Git LFS JSON
///
/// # Example
/// ```
/// use lfs_errors::representation::LfsJsonResponse;
/// use axum::http::StatusCode;
/// use serde_json::json;
///
/// async fn batch() -> LfsJsonResponse<serde_json::Value> {
///     LfsJsonResponse::ok(json!({ "transfer": "basic", "objects": [] }))
/// }
/// ```
#[derive(Debug)]
pub struct LfsJsonResponse<T: Serialize> {
    pub data: T,
    pub status: StatusCode,
}

impl<T: Serialize> LfsJsonResponse<T> {
    /// Defaults to HTTP 200 OK.
    pub fn ok(data: T) -> Self {
        Self::with_status(data, StatusCode::OK)
    }

    pub fn with_status(data: T, status: StatusCode) -> Self {
        Self { data, status }
    }
}

impl<T: Serialize> IntoResponse for LfsJsonResponse<T> {
    fn into_response(self) -> Response {
        output_git_lfs_json(&self.data, self.status)
    }
}
