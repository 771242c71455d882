//! Minimal peel example: tracing, a request-id header, an auth gate and a
//! couple of hand-dispatched paths.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/hello
//!   curl -i http://localhost:3000/admin                      # 401
//!   curl -i -H 'authorization: token' http://localhost:3000/admin
//!   curl -i http://localhost:3000/missing                    # 404 fallback

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use peel::{Application, HttpError, Server, StatusCode, middleware::Trace};

#[tokio::main]
async fn main() -> Result<(), peel::Error> {
    tracing_subscriber::fmt::init();

    let next_id = Arc::new(AtomicU64::new(1));

    let mut app = Application::new();
    app.on_error(|err| eprintln!("uncaught: {err}"));

    app.use_middleware(Trace)
        // Post-processing: stamp every response on the way out.
        .use_fn(move |ctx, next| {
            let id = next_id.fetch_add(1, Ordering::Relaxed);
            Box::pin(async move {
                next.run(ctx).await?;
                ctx.response.headers_mut().set("x-request-id", &id.to_string())
            })
        })
        // Pre-processing: refuse /admin without credentials.
        .use_fn(|ctx, next| Box::pin(async move {
            if ctx.request.path().starts_with("/admin") && ctx.request.header("authorization").is_none() {
                return Err(HttpError::unauthorized().into());
            }
            next.run(ctx).await
        }))
        // Terminal handlers: answer known paths, pass everything else on.
        .use_fn(|ctx, next| Box::pin(async move {
            let path = ctx.request.path().to_owned();
            match path.as_str() {
                "/hello" => {
                    ctx.response.set_content_type("text/plain; charset=utf-8")?;
                    ctx.response.set_body("hello");
                    Ok(())
                }
                "/admin" => {
                    ctx.response.set_json(&serde_json::json!({ "role": "admin" }))?;
                    Ok(())
                }
                "/teapot" => {
                    ctx.response.set_status(StatusCode::IM_A_TEAPOT);
                    Ok(())
                }
                _ => next.run(ctx).await,
            }
        }));

    Server::bind("0.0.0.0:3000")?.serve(app).await
}
