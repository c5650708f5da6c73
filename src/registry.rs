//! Handler registry
//!
//! Binds a formatter to every failure kind the server can produce. The
//! bindings are installed once at startup into an [`ErrorDispatcher`] and
//! the resulting table is read-only while requests are served.
//!
//! # Example
//!
//! ```
//! use lfs_errors::registry::{ApiErrorHandler, ErrorRoutes};
//! use lfs_errors::exception::HttpException;
//! use axum::http::StatusCode;
//!
//! let mut routes = ErrorRoutes::new();
//! ApiErrorHandler::install(&mut routes);
//!
//! let failure = HttpException::not_found("object abc123 not found");
//! let response = routes.dispatch(failure.into());
//! assert_eq!(response.status(), StatusCode::NOT_FOUND);
//! ```

use crate::error::{LfsError, Result};
use crate::exception::{
    AccessDeniedFilter, ExceptionFilter, Failure, FailureKind, HttpException,
    HttpExceptionFilter, error_as_json,
};
use axum::{http::StatusCode, response::Response};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// The predefined HTTP exception family, one kind per status code
pub const DEFAULT_EXCEPTION_CODES: [u16; 30] = [
    400, 401, 403, 404, 405, 406, 408, 409, 410, 411, 412, 413, 414, 415, 416, 417, 418, 422,
    423, 424, 428, 429, 431, 451, 500, 501, 502, 503, 504, 505,
];

/// Key of a binding in the error-routing table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureRoute {
    Status(StatusCode),
    AccessDenied,
}

impl FailureRoute {
    /// The route a failure is looked up under first
    pub fn of(failure: &Failure) -> Self {
        match failure.kind() {
            FailureKind::AccessDenied => FailureRoute::AccessDenied,
            FailureKind::Generic => FailureRoute::Status(
                failure
                    .status()
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            ),
        }
    }
}

/// A request-dispatch facility that can associate failure kinds with filters
pub trait ErrorDispatcher {
    /// Bind `filter` to `route`, replacing any previous binding.
    fn register_error_handler(&mut self, route: FailureRoute, filter: Arc<dyn ExceptionFilter>);

    fn is_routed(&self, route: &FailureRoute) -> bool;
}

/// Error-routing table: failure route to exception filter
#[derive(Clone, Default)]
pub struct ErrorRoutes {
    handlers: HashMap<FailureRoute, Arc<dyn ExceptionFilter>>,
}

impl ErrorRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table with the Git LFS bindings installed
    pub fn installed() -> Self {
        let mut routes = Self::new();
        ApiErrorHandler::install(&mut routes);
        routes
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Find the filter for a failure.
    ///
    /// Generic failures whose status has no binding fall back to the
    /// 500 binding. Access denial only resolves to its own binding.
    pub fn resolve(&self, failure: &Failure) -> Option<&Arc<dyn ExceptionFilter>> {
        let route = FailureRoute::of(failure);
        self.handlers.get(&route).or_else(|| match route {
            FailureRoute::AccessDenied => None,
            FailureRoute::Status(_) => self
                .handlers
                .get(&FailureRoute::Status(StatusCode::INTERNAL_SERVER_ERROR)),
        })
    }

    /// Turn a failure into the response the client sees.
    pub fn dispatch(&self, failure: Failure) -> Response {
        match self.resolve(&failure) {
            Some(filter) => filter.catch(failure),
            None => {
                tracing::warn!(
                    kind = %failure.kind(),
                    "No error handler bound for failure, using the default formatter"
                );
                error_as_json(&failure)
            }
        }
    }

    /// A panic handler for `tower_http::catch_panic::CatchPanicLayer::custom`.
    ///
    /// The panic payload is logged and never sent to the client.
    pub fn panic_handler(
        self: Arc<Self>,
    ) -> impl Fn(Box<dyn Any + Send + 'static>) -> Response + Clone + Send + Sync + 'static {
        move |payload: Box<dyn Any + Send + 'static>| {
            let detail = payload
                .downcast_ref::<String>()
                .map(String::as_str)
                .or_else(|| payload.downcast_ref::<&str>().copied())
                .unwrap_or("unknown panic payload");
            tracing::error!(panic = detail, "Request handler panicked");

            self.dispatch(HttpException::uncoded("Internal Server Error").into())
        }
    }
}

impl ErrorDispatcher for ErrorRoutes {
    fn register_error_handler(&mut self, route: FailureRoute, filter: Arc<dyn ExceptionFilter>) {
        if self.handlers.insert(route, filter).is_some() {
            tracing::debug!(?route, "Replaced existing error handler binding");
        }
    }

    fn is_routed(&self, route: &FailureRoute) -> bool {
        self.handlers.contains_key(route)
    }
}

/// Installs the Git LFS error handlers
///
/// Every code of the generic HTTP exception family is bound to
/// [`HttpExceptionFilter`] and access denial to [`AccessDeniedFilter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiErrorHandler;

impl ApiErrorHandler {
    /// Register all bindings. Installing twice overwrites the same
    /// bindings with equivalent ones.
    pub fn install<D: ErrorDispatcher + ?Sized>(dispatcher: &mut D) {
        let generic: Arc<dyn ExceptionFilter> = Arc::new(HttpExceptionFilter);
        for code in DEFAULT_EXCEPTION_CODES {
            match StatusCode::from_u16(code) {
                Ok(status) => {
                    dispatcher.register_error_handler(FailureRoute::Status(status), generic.clone())
                }
                Err(_) => tracing::warn!(code, "Skipping invalid status code"),
            }
        }

        dispatcher.register_error_handler(FailureRoute::AccessDenied, Arc::new(AccessDeniedFilter));
        tracing::debug!(
            codes = DEFAULT_EXCEPTION_CODES.len(),
            "Installed Git LFS error handlers"
        );
    }

    /// Like [`install`](Self::install), but refuses a dispatcher that
    /// already routes access-denied failures.
    pub fn try_install<D: ErrorDispatcher + ?Sized>(dispatcher: &mut D) -> Result<()> {
        if dispatcher.is_routed(&FailureRoute::AccessDenied) {
            return Err(LfsError::AlreadyInstalled);
        }
        Self::install(dispatcher);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::AccessDenied;
    use axum::response::IntoResponse;

    #[test]
    fn test_install_binds_every_default_code() {
        let routes = ErrorRoutes::installed();

        for code in DEFAULT_EXCEPTION_CODES {
            let status = StatusCode::from_u16(code).unwrap();
            assert!(routes.is_routed(&FailureRoute::Status(status)), "{code}");
        }
        assert!(routes.is_routed(&FailureRoute::AccessDenied));
        assert_eq!(routes.len(), DEFAULT_EXCEPTION_CODES.len() + 1);
    }

    #[test]
    fn test_reinstall_does_not_duplicate_bindings() {
        let mut routes = ErrorRoutes::new();
        ApiErrorHandler::install(&mut routes);
        ApiErrorHandler::install(&mut routes);

        assert_eq!(routes.len(), DEFAULT_EXCEPTION_CODES.len() + 1);
    }

    #[test]
    fn test_latest_registration_wins() {
        let mut routes = ErrorRoutes::installed();
        routes.register_error_handler(
            FailureRoute::Status(StatusCode::NOT_FOUND),
            Arc::new(|_: Failure| StatusCode::IM_A_TEAPOT.into_response()),
        );

        let response = routes.dispatch(HttpException::not_found("gone fishing").into());
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
        assert_eq!(routes.len(), DEFAULT_EXCEPTION_CODES.len() + 1);
    }

    #[test]
    fn test_try_install_fails_loudly_on_second_call() {
        let mut routes = ErrorRoutes::new();
        ApiErrorHandler::try_install(&mut routes).unwrap();

        assert!(matches!(
            ApiErrorHandler::try_install(&mut routes),
            Err(LfsError::AlreadyInstalled)
        ));
    }

    #[test]
    fn test_dispatch_routes_by_kind() {
        let routes = ErrorRoutes::installed();

        let denied = AccessDenied::new("write denied").with_status(StatusCode::UNAUTHORIZED);
        assert_eq!(routes.dispatch(denied.into()).status(), StatusCode::FORBIDDEN);

        let uncoded = HttpException::uncoded("boom");
        assert_eq!(
            routes.dispatch(uncoded.into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unbound_status_falls_back_to_500_binding() {
        let mut routes = ErrorRoutes::new();
        routes.register_error_handler(
            FailureRoute::Status(StatusCode::INTERNAL_SERVER_ERROR),
            Arc::new(|_: Failure| StatusCode::SERVICE_UNAVAILABLE.into_response()),
        );

        let failure = HttpException::new(StatusCode::MISDIRECTED_REQUEST, "wrong host");
        let response = routes.dispatch(failure.into());
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_unbound_access_denied_is_still_forbidden() {
        let denied = AccessDenied::new("write denied")
            .with_actor("bob")
            .with_status(StatusCode::UNAUTHORIZED);

        let mut only_internal = ErrorRoutes::new();
        only_internal.register_error_handler(
            FailureRoute::Status(StatusCode::INTERNAL_SERVER_ERROR),
            Arc::new(|_: Failure| StatusCode::SERVICE_UNAVAILABLE.into_response()),
        );

        for routes in [ErrorRoutes::new(), only_internal] {
            let response = routes.dispatch(denied.clone().into());
            assert_eq!(response.status(), StatusCode::FORBIDDEN);

            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(
                body,
                serde_json::json!({ "message": "write denied", "actor": "bob" })
            );
        }
    }

    #[test]
    fn test_empty_table_still_renders() {
        let routes = ErrorRoutes::new();

        let response = routes.dispatch(HttpException::conflict("locked").into());
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_panic_handler_hides_payload() {
        let handler = Arc::new(ErrorRoutes::installed()).panic_handler();

        let payload: Box<dyn Any + Send> = Box::new("secret stack detail");
        let response = handler(payload);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
