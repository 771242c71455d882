//! The application: middleware registry and dispatch entry points.

use std::fmt;
use std::iter;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use http::{HeaderValue, Method};
use tracing::{error, warn};

use crate::body::Body;
use crate::context::Context;
use crate::error::{Error, Failure};
use crate::headers::Headers;
use crate::middleware::{Layer, Middleware, MiddlewareFuture, Next, NotFound, invoke_middlewares};
use crate::request::Request;
use crate::response::Response;

/// Content-type set on every response before the chain runs, unless
/// overridden with [`Application::set_default_content_type`].
pub const DEFAULT_CONTENT_TYPE: &str = "application/hal+json";

type ErrorListener = Arc<dyn Fn(&Error) + Send + Sync>;

/// An ordered middleware chain plus the entry points that run it.
///
/// Build it once at startup with `&mut self` registration calls, then share
/// it (`Arc<Application>`) for dispatching, which only needs `&self`.
///
/// ```rust
/// use peel::{Application, Method, StatusCode};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mut app = Application::new();
/// app.use_fn(|ctx, _next| Box::pin(async move {
///     ctx.response.set_body("hi");
///     Ok(())
/// }));
///
/// let res = app.sub_request_with(Method::GET, "/", None, ()).await;
/// assert_eq!(res.status(), StatusCode::OK);
/// assert_eq!(res.body().as_text(), Some("hi"));
/// # }
/// ```
pub struct Application {
    layers: Vec<Layer>,
    fallback: Layer,
    default_content_type: String,
    error_listeners: Vec<ErrorListener>,
}

impl Application {
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            fallback: Layer::from(NotFound),
            default_content_type: DEFAULT_CONTENT_TYPE.to_owned(),
            error_listeners: Vec::new(),
        }
    }

    // ── Registration ─────────────────────────────────────────────────────────

    /// Appends a closure middleware. Middleware runs in registration order.
    pub fn use_fn<F>(&mut self, f: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut Context, Next<'a>) -> MiddlewareFuture<'a> + Send + Sync + 'static,
    {
        self.layers.push(Layer::from_fn(f));
        self
    }

    /// Appends a [`Middleware`] value.
    pub fn use_middleware(&mut self, middleware: impl Middleware) -> &mut Self {
        self.layers.push(Layer::from_middleware(middleware));
        self
    }

    /// Appends several layers at once, in iteration order.
    ///
    /// Nothing is deduplicated: registering the same middleware twice runs it
    /// twice.
    pub fn use_layers<I>(&mut self, layers: I) -> &mut Self
    where
        I: IntoIterator,
        I::Item: Into<Layer>,
    {
        self.layers.extend(layers.into_iter().map(Into::into));
        self
    }

    /// Registered middleware, terminal fallback excluded.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Replaces the content-type every dispatch starts with.
    ///
    /// Rejected up front when it is not a valid header value, so a bad
    /// setting cannot fail every later dispatch.
    pub fn set_default_content_type(&mut self, content_type: impl Into<String>) -> Result<&mut Self, Error> {
        let content_type = content_type.into();
        if HeaderValue::from_str(&content_type).is_err() {
            return Err(Error::InvalidHeader(format!("content-type: {content_type:?}")));
        }
        self.default_content_type = content_type;
        Ok(self)
    }

    pub fn default_content_type(&self) -> &str {
        &self.default_content_type
    }

    /// Registers an observer for failures caught by [`sub_request`].
    ///
    /// Listeners are called synchronously, in registration order, once per
    /// failing dispatch. They cannot change the response. A listener that
    /// panics is logged and skipped; the remaining listeners still run.
    ///
    /// [`sub_request`]: Application::sub_request
    pub fn on_error<F>(&mut self, listener: F) -> &mut Self
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.error_listeners.push(Arc::new(listener));
        self
    }

    pub fn error_listener_count(&self) -> usize {
        self.error_listeners.len()
    }

    // ── Dispatch ─────────────────────────────────────────────────────────────

    /// Runs the chain against `ctx`.
    ///
    /// Sets the default content-type, then calls every registered middleware
    /// followed by the [`NotFound`] fallback. Failures are returned as-is;
    /// the caller owns the catch boundary.
    pub async fn handle(&self, ctx: &mut Context) -> Result<(), Error> {
        ctx.response.set_content_type(self.default_content_type.as_str())?;

        let chain: Vec<Layer> = self.layers.iter()
            .cloned()
            .chain(iter::once(self.fallback.clone()))
            .collect();

        invoke_middlewares(ctx, &chain).await
    }

    /// Runs `request` through the chain in memory and returns the response,
    /// or the classified failure if a middleware error went uncaught.
    ///
    /// On failure the error is logged and passed to every error listener
    /// before this returns.
    pub async fn try_sub_request(&self, request: Request) -> Result<Response, Failure> {
        let mut ctx = Context::for_request(request);

        match self.handle(&mut ctx).await {
            Ok(()) => Ok(ctx.into_response()),
            Err(err) => {
                let failure = Failure::new(err, ctx.into_response());
                error!(
                    error = %failure.error(),
                    status = failure.kind().status().as_u16(),
                    "uncaught middleware error"
                );
                self.emit_error(failure.error());
                Err(failure)
            }
        }
    }

    /// Runs `request` through the chain in memory. Always returns a response.
    ///
    /// An uncaught failure becomes its HTTP status (or 500 when it has none)
    /// with a fixed diagnostic body.
    pub async fn sub_request(&self, request: Request) -> Response {
        self.try_sub_request(request)
            .await
            .unwrap_or_else(Failure::into_response)
    }

    /// [`sub_request`](Application::sub_request) for a request built from
    /// parts.
    pub async fn sub_request_with(
        &self,
        method: Method,
        path: &str,
        headers: Option<Headers>,
        body: impl Into<Body>,
    ) -> Response {
        let request = Request::new(method, path)
            .with_headers(headers.unwrap_or_default())
            .with_body(body);
        self.sub_request(request).await
    }

    fn emit_error(&self, err: &Error) {
        if self.error_listeners.is_empty() {
            return;
        }
        for (index, listener) in self.error_listeners.iter().enumerate() {
            if panic::catch_unwind(AssertUnwindSafe(|| listener(err))).is_err() {
                warn!(listener = index, "error listener panicked");
            }
        }
    }
}

impl Default for Application {
    fn default() -> Self { Self::new() }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("layers", &self.layers.len())
            .field("default_content_type", &self.default_content_type)
            .field("error_listeners", &self.error_listeners.len())
            .finish()
    }
}
