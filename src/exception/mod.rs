use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::convert::Infallible;
use std::error::Error;
use std::fmt;

pub mod access_denied;
pub mod http;

pub use access_denied::{AccessDenied, AccessDeniedFilter, access_denied_as_json};
pub use http::{HttpException, HttpExceptionFilter, error_as_json};

/// Discriminator between the two failure families this layer routes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display, strum_macros::AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum FailureKind {
    Generic,
    AccessDenied,
}

/// A failure raised while handling a Git LFS API request
///
/// Every failure is consumed exactly once by the formatter its route is
/// bound to and is discarded once the response has been produced.
#[derive(Debug, Clone)]
pub enum Failure {
    /// A member of the generic HTTP exception family, coded or not
    Http(HttpException),
    /// The storage layer refused the requested operation
    AccessDenied(AccessDenied),
}

impl Failure {
    pub fn kind(&self) -> FailureKind {
        match self {
            Failure::Http(_) => FailureKind::Generic,
            Failure::AccessDenied(_) => FailureKind::AccessDenied,
        }
    }

    /// The status attached to the failure itself, if any.
    ///
    /// For access-denied failures this is internal state only; the wire
    /// status is always 403.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Failure::Http(ex) => ex.status(),
            Failure::AccessDenied(ex) => ex.status(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Failure::Http(ex) => ex.message(),
            Failure::AccessDenied(ex) => ex.message(),
        }
    }

    fn from_dyn(error: Box<dyn Error + Send + Sync>) -> Self {
        let error = match error.downcast::<Failure>() {
            Ok(failure) => return *failure,
            Err(error) => error,
        };
        let error = match error.downcast::<AccessDenied>() {
            Ok(denied) => return Failure::AccessDenied(*denied),
            Err(error) => error,
        };
        match error.downcast::<HttpException>() {
            Ok(ex) => Failure::Http(*ex),
            Err(error) => Failure::Http(HttpException::uncoded(error.to_string())),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl Error for Failure {}

impl From<HttpException> for Failure {
    fn from(ex: HttpException) -> Self {
        Failure::Http(ex)
    }
}

impl From<AccessDenied> for Failure {
    fn from(ex: AccessDenied) -> Self {
        Failure::AccessDenied(ex)
    }
}

impl From<StatusCode> for Failure {
    fn from(status: StatusCode) -> Self {
        Failure::Http(HttpException::from(status))
    }
}

impl From<Infallible> for Failure {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

impl From<Box<dyn Error + Send + Sync>> for Failure {
    fn from(error: Box<dyn Error + Send + Sync>) -> Self {
        Failure::from_dyn(error)
    }
}

impl From<anyhow::Error> for Failure {
    fn from(error: anyhow::Error) -> Self {
        if let Some(failure) = error.downcast_ref::<Failure>() {
            return failure.clone();
        }
        if let Some(denied) = error.downcast_ref::<AccessDenied>() {
            return Failure::AccessDenied(denied.clone());
        }
        if let Some(ex) = error.downcast_ref::<HttpException>() {
            return Failure::Http(ex.clone());
        }
        Failure::Http(HttpException::uncoded(error.to_string()))
    }
}

/// Renders with the default formatters and tags the response with the
/// failure, so an installed [`ErrorHandlerLayer`](crate::layer::ErrorHandlerLayer)
/// can route it through the registered bindings instead.
impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let mut response = error_as_json(&self);
        response.extensions_mut().insert(self);
        response
    }
}

/// The ExceptionFilter trait
///
/// Filters turn a caught failure into the response the client sees.
/// They must be total: every failure handed to a filter yields a valid
/// response and nothing is raised back to the caller.
pub trait ExceptionFilter: Send + Sync + 'static {
    /// Catch a failure and return a response
    fn catch(&self, failure: Failure) -> Response;
}

impl<F> ExceptionFilter for F
where
    F: Fn(Failure) -> Response + Send + Sync + 'static,
{
    fn catch(&self, failure: Failure) -> Response {
        self(failure)
    }
}
