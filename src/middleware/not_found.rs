//! Terminal fallback.

use http::StatusCode;

use super::{Middleware, MiddlewareFuture, Next};
use crate::context::Context;
use crate::response::ContentType;

/// Always the last middleware of a dispatch.
///
/// Reaching it means every registered middleware ran its continuation, so
/// nobody answered the request: it replies `404 Not Found`. It never runs
/// its own `Next` (there is nothing after it).
#[derive(Clone, Copy, Debug, Default)]
pub struct NotFound;

impl Middleware for NotFound {
    fn call<'a>(&'a self, ctx: &'a mut Context, _next: Next<'a>) -> MiddlewareFuture<'a> {
        Box::pin(async move {
            ctx.response.set_status(StatusCode::NOT_FOUND);
            ctx.response.set_content_type(ContentType::Text)?;
            ctx.response.set_body("Not Found");
            Ok(())
        })
    }
}
