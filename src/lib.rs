//! # peel
//!
//! A minimal onion-model HTTP middleware core.
//!
//! An [`Application`] holds an ordered list of middleware. Each middleware
//! gets the [`Context`] (one [`Request`], one [`Response`]) and a [`Next`]
//! standing for the rest of the chain. Code before `next.run(ctx)` runs on
//! the way in, code after it on the way out. A middleware that never runs
//! `next` answers the request itself.
//!
//! What peel owns:
//!
//! - The chain engine ([`middleware`]) and its ordering guarantees
//! - A transport-free request/response/context model
//! - A catch boundary that turns uncaught failures into HTTP responses
//!
//! What it leaves to you: routing, content negotiation, body formats. A thin
//! hyper-based [`Server`] is included for running an application on a socket.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use peel::{Application, HttpError, Server, middleware::Trace};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), peel::Error> {
//!     let mut app = Application::new();
//!     app.use_middleware(Trace)
//!         .use_fn(|ctx, next| Box::pin(async move {
//!             if ctx.request.header("authorization").is_none() {
//!                 return Err(HttpError::unauthorized().into());
//!             }
//!             next.run(ctx).await
//!         }))
//!         .use_fn(|ctx, _next| Box::pin(async move {
//!             ctx.response.set_body(format!("hello from {}", ctx.request.path()));
//!             Ok(())
//!         }));
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//! ```

mod app;
mod body;
mod context;
mod error;
mod headers;
mod request;
mod response;
mod server;

pub mod middleware;

pub use app::{Application, DEFAULT_CONTENT_TYPE};
pub use body::Body;
pub use context::Context;
pub use error::{BoxError, Error, Failure, FailureKind, HttpError};
pub use headers::Headers;
pub use middleware::{BoxFuture, Layer, Middleware, MiddlewareFuture, Next};
pub use request::Request;
pub use response::{ContentType, Response};
pub use server::Server;

pub use http::{Method, StatusCode};
