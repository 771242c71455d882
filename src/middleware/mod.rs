//! Middleware chain engine.
//!
//! # The onion
//!
//! Every middleware receives the [`Context`] and a [`Next`] standing for
//! "everything after me". Code before `next.run(ctx)` runs on the way in,
//! code after it runs on the way out:
//!
//! ```text
//! A before ─┐
//!           B before ─┐
//!                     C before / after
//!           B after  ─┘
//! A after  ─┘
//! ```
//!
//! Dropping `next` without running it short-circuits: nothing downstream
//! runs, and whatever the middleware wrote to the response stands.
//!
//! # How the two middleware shapes are stored
//!
//! A middleware is either a plain closure or a value implementing the
//! [`Middleware`] trait. Both are erased into a [`Layer`], a two-variant enum
//! holding an `Arc` to the callable, so the application can keep them in one
//! `Vec` and clone them cheaply per dispatch:
//!
//! ```text
//! |ctx, next| Box::pin(async move { … })    ← Layer::from_fn
//! MyMiddleware { … }                        ← Layer::from_middleware
//!        ↓
//! Layer::Function(Arc<dyn Fn>) | Layer::Object(Arc<dyn Middleware>)
//!        ↓  resolved with one `match` per call
//! BoxFuture<'_, Result<(), Error>>
//! ```
//!
//! # Writing a closure middleware
//!
//! The closure must return a boxed future borrowing the context, which is
//! what [`BoxFuture`] is for. `Box::pin(async move { … })` is enough; the
//! signature is inferred from [`Layer::from_fn`]'s bound.
//!
//! ```rust
//! use peel::Application;
//!
//! let mut app = Application::new();
//! app.use_fn(|ctx, next| Box::pin(async move {
//!     ctx.response.headers_mut().set("x-powered-by", "peel")?;
//!     next.run(ctx).await
//! }));
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::error::Error;

mod not_found;
mod trace;

pub use not_found::NotFound;
pub use trace::Trace;

/// A heap-allocated, type-erased future borrowing the dispatch for `'a`.
///
/// `Send` so dispatches can move between tokio worker threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What every middleware returns.
pub type MiddlewareFuture<'a> = BoxFuture<'a, Result<(), Error>>;

// ── Middleware trait ──────────────────────────────────────────────────────────

/// A middleware implemented as a value.
///
/// Use this shape when the middleware carries configuration or shared state;
/// for one-off logic a closure registered with
/// [`Application::use_fn`](crate::Application::use_fn) is shorter.
///
/// ```rust
/// use peel::{Context, Middleware, MiddlewareFuture, Next};
///
/// struct ServerHeader(&'static str);
///
/// impl Middleware for ServerHeader {
///     fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> MiddlewareFuture<'a> {
///         Box::pin(async move {
///             next.run(ctx).await?;
///             ctx.response.headers_mut().set("server", self.0)
///         })
///     }
/// }
/// ```
pub trait Middleware: Send + Sync + 'static {
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> MiddlewareFuture<'a>;
}

type MiddlewareFn = dyn for<'a> Fn(&'a mut Context, Next<'a>) -> MiddlewareFuture<'a> + Send + Sync;

// ── Layer ─────────────────────────────────────────────────────────────────────

/// One entry of a middleware chain: either shape, type-erased.
#[derive(Clone)]
pub enum Layer {
    /// A plain function or closure.
    Function(Arc<MiddlewareFn>),
    /// A value implementing [`Middleware`].
    Object(Arc<dyn Middleware>),
}

impl Layer {
    pub fn from_fn<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a mut Context, Next<'a>) -> MiddlewareFuture<'a> + Send + Sync + 'static,
    {
        Self::Function(Arc::new(f))
    }

    pub fn from_middleware<M: Middleware>(middleware: M) -> Self {
        Self::Object(Arc::new(middleware))
    }

    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> MiddlewareFuture<'a> {
        match self {
            Self::Function(f) => f(ctx, next),
            Self::Object(m) => m.call(ctx, next),
        }
    }
}

impl<M: Middleware> From<M> for Layer {
    fn from(middleware: M) -> Self {
        Self::from_middleware(middleware)
    }
}

impl std::fmt::Debug for Layer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Function(_) => f.write_str("Layer::Function"),
            Self::Object(_) => f.write_str("Layer::Object"),
        }
    }
}

// ── Next ──────────────────────────────────────────────────────────────────────

/// The rest of the chain after the current middleware.
///
/// `run` consumes `self`, so the downstream chain can run at most once per
/// middleware invocation. A second call does not compile.
pub struct Next<'a> {
    rest: &'a [Layer],
}

impl<'a> Next<'a> {
    pub(crate) fn new(rest: &'a [Layer]) -> Self {
        Self { rest }
    }

    /// Runs every remaining middleware against `ctx` and resolves once they
    /// have all returned.
    pub fn run<'c>(self, ctx: &'c mut Context) -> MiddlewareFuture<'c>
    where
        'a: 'c,
    {
        invoke_middlewares(ctx, self.rest)
    }

    /// Number of middleware still ahead, terminal fallback included.
    pub fn remaining(&self) -> usize {
        self.rest.len()
    }
}

// ── Engine ────────────────────────────────────────────────────────────────────

/// Calls `chain` in order against `ctx`.
///
/// The head is invoked with a [`Next`] over the tail; the tail only runs if
/// the head runs that `Next`. An empty chain completes immediately. Errors
/// are never caught here.
pub fn invoke_middlewares<'a>(ctx: &'a mut Context, chain: &'a [Layer]) -> MiddlewareFuture<'a> {
    Box::pin(async move {
        let Some((head, rest)) = chain.split_first() else {
            return Ok(());
        };
        tracing::trace!(remaining = rest.len(), "calling middleware");
        head.call(ctx, Next::new(rest)).await
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use http::{Method, StatusCode};

    use super::*;
    use crate::error::HttpError;
    use crate::request::Request;

    fn ctx() -> Context {
        Context::for_request(Request::new(Method::GET, "/"))
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>, name: &'static str) -> Layer {
        let log = Arc::clone(log);
        Layer::from_fn(move |ctx, next| {
            let log = Arc::clone(&log);
            Box::pin(async move {
                log.lock().unwrap().push(format!("{name} in"));
                next.run(ctx).await?;
                log.lock().unwrap().push(format!("{name} out"));
                Ok(())
            })
        })
    }

    #[tokio::test]
    async fn empty_chain_completes_without_touching_response() {
        let mut ctx = ctx();
        invoke_middlewares(&mut ctx, &[]).await.unwrap();
        assert_eq!(ctx.response, crate::Response::new());
    }

    #[tokio::test]
    async fn onion_order_is_fifo_in_lifo_out() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = [recorder(&log, "a"), recorder(&log, "b"), recorder(&log, "c")];

        invoke_middlewares(&mut ctx(), &chain).await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            ["a in", "b in", "c in", "c out", "b out", "a out"],
        );
    }

    #[tokio::test]
    async fn object_and_function_layers_mix() {
        struct Stamp;
        impl Middleware for Stamp {
            fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> MiddlewareFuture<'a> {
                Box::pin(async move {
                    ctx.response.set_body("object");
                    next.run(ctx).await
                })
            }
        }

        let chain = [
            Layer::from(Stamp),
            Layer::from_fn(|ctx, _next| Box::pin(async move {
                let seen = ctx.response.body().as_text().unwrap_or_default().to_owned();
                ctx.response.set_body(format!("{seen}+function"));
                Ok(())
            })),
        ];

        let mut ctx = ctx();
        invoke_middlewares(&mut ctx, &chain).await.unwrap();
        assert_eq!(ctx.response.body().as_text(), Some("object+function"));
    }

    #[tokio::test]
    async fn not_running_next_short_circuits() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = [
            Layer::from_fn(|ctx, _next| Box::pin(async move {
                ctx.response.set_body("early");
                Ok(())
            })),
            recorder(&log, "never"),
        ];

        let mut ctx = ctx();
        invoke_middlewares(&mut ctx, &chain).await.unwrap();
        assert_eq!(ctx.response.body().as_text(), Some("early"));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn errors_propagate_through_awaiting_layers() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let chain = [
            recorder(&log, "outer"),
            Layer::from_fn(|_ctx, _next| Box::pin(async move {
                Err(HttpError::forbidden().into())
            })),
        ];

        let err = invoke_middlewares(&mut ctx(), &chain).await.unwrap_err();
        assert_eq!(err.http_status(), Some(StatusCode::FORBIDDEN));
        // "outer out" is skipped because `?` returned early.
        assert_eq!(*log.lock().unwrap(), ["outer in"]);
    }

    #[tokio::test]
    async fn middleware_may_recover_from_downstream_error() {
        let chain = [
            Layer::from_fn(|ctx, next| Box::pin(async move {
                if let Err(e) = next.run(ctx).await {
                    ctx.response.set_status(e.http_status().unwrap_or(StatusCode::BAD_GATEWAY));
                    ctx.response.set_body("recovered");
                }
                Ok(())
            })),
            Layer::from_fn(|_ctx, _next| Box::pin(async move { Err(Error::other("boom")) })),
        ];

        let mut ctx = ctx();
        invoke_middlewares(&mut ctx, &chain).await.unwrap();
        assert_eq!(ctx.response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(ctx.response.body().as_text(), Some("recovered"));
    }

    #[tokio::test]
    async fn next_reports_remaining_layers() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let make = |seen: &Arc<Mutex<Vec<usize>>>| {
            let seen = Arc::clone(seen);
            Layer::from_fn(move |ctx, next| {
                seen.lock().unwrap().push(next.remaining());
                next.run(ctx)
            })
        };
        let chain = [make(&seen), make(&seen), make(&seen)];

        invoke_middlewares(&mut ctx(), &chain).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), [2, 1, 0]);
    }
}
