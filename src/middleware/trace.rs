//! Per-request tracing span with method, path, status and latency.

use std::time::Instant;

use tracing::{Instrument, info, info_span, warn};

use super::{Middleware, MiddlewareFuture, Next};
use crate::context::Context;

/// Wraps the rest of the chain in a `request` span and logs one line when it
/// finishes.
///
/// Register it first so the span covers every other middleware:
///
/// ```rust
/// use peel::{Application, middleware::Trace};
///
/// let mut app = Application::new();
/// app.use_middleware(Trace);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Trace;

impl Middleware for Trace {
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> MiddlewareFuture<'a> {
        let span = info_span!(
            "request",
            method = %ctx.request.method(),
            path = ctx.request.path()
        );

        Box::pin(
            async move {
                let start = Instant::now();
                let result = next.run(ctx).await;
                let latency = start.elapsed();
                match &result {
                    Ok(()) => info!(status = ctx.response.status().as_u16(), ?latency, "request completed"),
                    Err(e) => warn!(error = %e, ?latency, "request failed"),
                }
                result
            }
            .instrument(span),
        )
    }
}
