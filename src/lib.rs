//! # lfs-errors
//!
//! Git LFS compliant error responses for axum based LFS API servers.
//!
//! Every failure surfacing while a request is handled, whether a coded HTTP
//! exception, an arbitrary error with no HTTP semantics, or an access denial
//! raised by the storage layer, is converted into a JSON body with at least
//! a `message` field and the `application/vnd.git-lfs+json` media type.
//!
//! ## Features
//!
//! - **Handler Registry**: bind a formatter to every HTTP exception code and
//!   to access denial, once at startup
//! - **Generic Formatter**: coded failures keep their status, uncoded ones
//!   become 500 Internal Server Error
//! - **Access-Denied Formatter**: always 403 Forbidden, with the failure's
//!   structured context as the body
//! - **Tower Layer**: hooks the routing table into any axum `Router`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lfs_errors::prelude::*;
//! use axum::routing::post;
//! use tower_http::catch_panic::CatchPanicLayer;
//!
//! async fn batch() -> Result<Json<serde_json::Value>, Failure> {
//!     Err(AccessDenied::new("write denied")
//!         .with_actor("bob")
//!         .with_action("write")
//!         .into())
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let errors = ErrorHandlerLayer::from_config(&ErrorHandlingConfig::from_env())
//!         .expect("error handlers installed once");
//!     let panics = CatchPanicLayer::custom(errors.routes().clone().panic_handler());
//!
//!     let app: Router = Router::new()
//!         .route("/objects/batch", post(batch))
//!         .layer(errors)
//!         .layer(panics);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

pub mod config;
pub mod error;
pub mod exception;
pub mod layer;
pub mod registry;
pub mod representation;

// Re-export core types
pub use error::{LfsError, Result};
pub use exception::{AccessDenied, ExceptionFilter, Failure, FailureKind, HttpException};
pub use layer::ErrorHandlerLayer;
pub use registry::{ApiErrorHandler, ErrorDispatcher, ErrorRoutes, FailureRoute};
pub use representation::GIT_LFS_MEDIA_TYPE;

/// Prelude module for convenient imports
///
/// ```
/// use lfs_errors::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{ConfigService, ErrorHandlingConfig};
    pub use crate::error::LfsError;
    pub use crate::exception::{
        AccessDenied, AccessDeniedFilter, ExceptionFilter, Failure, FailureKind, HttpException,
        HttpExceptionFilter, access_denied_as_json, error_as_json,
    };
    pub use crate::layer::ErrorHandlerLayer;
    pub use crate::registry::{ApiErrorHandler, ErrorDispatcher, ErrorRoutes, FailureRoute};
    pub use crate::representation::{GIT_LFS_MEDIA_TYPE, LfsJsonResponse, output_git_lfs_json};
    pub use axum::{
        Json, Router,
        http::StatusCode,
        response::{IntoResponse, Response},
    };
    pub use std::sync::Arc;
}
