use crate::config::ErrorHandlingConfig;
use crate::error::Result;
use crate::exception::{Failure, HttpException};
use crate::registry::{ApiErrorHandler, ErrorRoutes};
use crate::representation::GIT_LFS_MEDIA_TYPE;
use axum::{
    body::Body,
    http::{HeaderMap, Request, header},
    response::Response,
};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service, ServiceExt};

/// Tower Layer routing every failure through the installed error handlers
///
/// The routing table is frozen behind an `Arc` once the layer is built.
///
/// # Example
///
/// ```
/// use lfs_errors::layer::ErrorHandlerLayer;
/// use lfs_errors::registry::ErrorRoutes;
/// use axum::{Router, routing::get};
/// use std::sync::Arc;
///
/// let app: Router = Router::new()
///     .route("/objects/batch", get(|| async { "ok" }))
///     .layer(ErrorHandlerLayer::new(Arc::new(ErrorRoutes::installed())));
/// ```
#[derive(Clone)]
pub struct ErrorHandlerLayer {
    routes: Arc<ErrorRoutes>,
    convert_foreign_errors: bool,
}

impl ErrorHandlerLayer {
    pub fn new(routes: Arc<ErrorRoutes>) -> Self {
        Self {
            routes,
            convert_foreign_errors: true,
        }
    }

    /// Install the Git LFS handlers into a fresh table, honoring `config`.
    pub fn from_config(config: &ErrorHandlingConfig) -> Result<Self> {
        Self::with_config(ErrorRoutes::new(), config)
    }

    /// Install the Git LFS handlers into `routes`, which may already hold
    /// bindings. With `strict_install` set an existing installation is an
    /// error instead of being overwritten.
    pub fn with_config(mut routes: ErrorRoutes, config: &ErrorHandlingConfig) -> Result<Self> {
        if config.strict_install {
            ApiErrorHandler::try_install(&mut routes)?;
        } else {
            ApiErrorHandler::install(&mut routes);
        }
        Ok(Self::new(Arc::new(routes)).convert_foreign_errors(config.convert_foreign_errors))
    }

    /// Whether 4xx/5xx responses that are not Git LFS JSON, such as router
    /// fallbacks and extractor rejections, get re-rendered as Git LFS JSON.
    pub fn convert_foreign_errors(mut self, enabled: bool) -> Self {
        self.convert_foreign_errors = enabled;
        self
    }

    pub fn routes(&self) -> &Arc<ErrorRoutes> {
        &self.routes
    }
}

impl<S> Layer<S> for ErrorHandlerLayer {
    type Service = ErrorHandlerService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ErrorHandlerService {
            inner,
            routes: self.routes.clone(),
            convert_foreign_errors: self.convert_foreign_errors,
        }
    }
}

#[derive(Clone)]
pub struct ErrorHandlerService<S> {
    inner: S,
    routes: Arc<ErrorRoutes>,
    convert_foreign_errors: bool,
}

impl<S> Service<Request<Body>> for ErrorHandlerService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<Failure> + Send,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = std::result::Result<Response, Infallible>> + Send>>;

    // Readiness is checked by `oneshot` in `call`, where an error can still
    // be turned into a response.
    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Infallible>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let routes = self.routes.clone();
        let convert_foreign_errors = self.convert_foreign_errors;
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let response = match inner.oneshot(request).await {
                Ok(response) => response,
                Err(err) => return Ok(routes.dispatch(err.into())),
            };
            Ok(reroute(&routes, convert_foreign_errors, response).await)
        })
    }
}

// Upper bound on a foreign error body read back for its message.
const FOREIGN_BODY_LIMIT: usize = 64 * 1024;

async fn reroute(
    routes: &ErrorRoutes,
    convert_foreign_errors: bool,
    mut response: Response,
) -> Response {
    if let Some(failure) = response.extensions_mut().remove::<Failure>() {
        let mut rendered = routes.dispatch(failure);
        carry_headers(response.headers(), &mut rendered);
        return rendered;
    }

    let status = response.status();
    let is_error = status.is_client_error() || status.is_server_error();
    if !convert_foreign_errors || !is_error || is_lfs_json(response.headers()) {
        return response;
    }

    let (parts, body) = response.into_parts();
    let message = match axum::body::to_bytes(body, FOREIGN_BODY_LIMIT).await {
        Ok(bytes) => foreign_message(&bytes),
        Err(err) => {
            tracing::warn!(error = %err, "Failed to read error response body");
            String::new()
        }
    };

    let mut rendered = routes.dispatch(HttpException::new(status, message).into());
    carry_headers(&parts.headers, &mut rendered);
    rendered
}

fn is_lfs_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with(GIT_LFS_MEDIA_TYPE))
}

// A JSON object's `message` wins over the raw text. An empty result is
// replaced by the canonical reason downstream.
fn foreign_message(bytes: &[u8]) -> String {
    if let Ok(serde_json::Value::Object(object)) = serde_json::from_slice(bytes) {
        if let Some(serde_json::Value::String(message)) = object.get("message") {
            return message.clone();
        }
    }
    String::from_utf8_lossy(bytes).trim().to_string()
}

// Keeps headers such as `Allow` or `WWW-Authenticate` from the original
// response. Body framing headers belong to the new body.
fn carry_headers(original: &HeaderMap, rendered: &mut Response) {
    for (name, value) in original {
        if name == header::CONTENT_TYPE || name == header::CONTENT_LENGTH {
            continue;
        }
        if !rendered.headers().contains_key(name) {
            rendered.headers_mut().append(name.clone(), value.clone());
        }
    }
}
