use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use peel::{
    Application, Context, Error, Headers, HttpError, Layer, Method, Middleware,
    MiddlewareFuture, Next, Request, StatusCode,
};

const DIAGNOSTIC_PREFIX: &str =
    "Uncaught exception. No middleware was defined to handle it. We got the following HTTP status: ";

struct Log {
    name: &'static str,
    entries: Arc<Mutex<Vec<String>>>,
}

impl Middleware for Log {
    fn call<'a>(&'a self, ctx: &'a mut Context, next: Next<'a>) -> MiddlewareFuture<'a> {
        Box::pin(async move {
            self.entries.lock().unwrap().push(format!("enter {}", self.name));
            next.run(ctx).await?;
            self.entries.lock().unwrap().push(format!("exit {}", self.name));
            Ok(())
        })
    }
}

fn respond_with(body: &'static str) -> Layer {
    Layer::from_fn(move |ctx, _next| Box::pin(async move {
        ctx.response.set_body(body);
        Ok(())
    }))
}

#[tokio::test]
async fn test_onion_order() {
    let entries = Arc::new(Mutex::new(Vec::new()));
    let mut app = Application::new();
    app.use_layers(["a", "b", "c"].map(|name| Log { name, entries: Arc::clone(&entries) }))
        .use_layers([respond_with("done")]);

    let res = app.sub_request_with(Method::GET, "/", None, ()).await;

    assert_eq!(res.body().as_text(), Some("done"));
    assert_eq!(
        *entries.lock().unwrap(),
        ["enter a", "enter b", "enter c", "exit c", "exit b", "exit a"],
    );
}

#[tokio::test]
async fn test_empty_registry_yields_not_found() {
    let app = Application::new();
    let res = app.sub_request_with(Method::GET, "/anything", None, ()).await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.body().as_text(), Some("Not Found"));
}

#[tokio::test]
async fn test_short_circuit_skips_downstream() {
    let downstream_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&downstream_calls);

    let mut app = Application::new();
    app.use_layers([respond_with("short")]).use_fn(move |ctx, next| {
        counter.fetch_add(1, Ordering::SeqCst);
        next.run(ctx)
    });

    let res = app.sub_request_with(Method::GET, "/", None, ()).await;

    assert_eq!(res.body().as_text(), Some("short"));
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(downstream_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_sub_request_returns_body_with_default_status() {
    let mut app = Application::new();
    app.use_fn(|ctx, _next| Box::pin(async move {
        ctx.response.set_body("hi");
        Ok(())
    }));

    let res = app.sub_request_with(Method::GET, "/", None, ()).await;

    assert_eq!(res.body().as_text(), Some("hi"));
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.content_type().as_deref(), Some(peel::DEFAULT_CONTENT_TYPE));
}

#[tokio::test]
async fn test_http_error_maps_to_its_status() {
    let mut app = Application::new();
    app.use_fn(|_ctx, _next| Box::pin(async move {
        Err(HttpError::forbidden().with_message("no entry").into())
    }));

    let res = app.sub_request_with(Method::GET, "/admin", None, ()).await;

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body = res.body().as_text().unwrap();
    assert_eq!(body, format!("{DIAGNOSTIC_PREFIX}403"));
    assert!(body.contains("403"));
}

#[tokio::test]
async fn test_plain_error_maps_to_500() {
    let mut app = Application::new();
    app.use_fn(|_ctx, _next| Box::pin(async move {
        Err(Error::other("database unreachable"))
    }));

    let res = app.sub_request_with(Method::GET, "/", None, ()).await;

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.body().as_text(), Some(format!("{DIAGNOSTIC_PREFIX}500").as_str()));
}

#[tokio::test]
async fn test_error_after_next_is_still_caught() {
    let mut app = Application::new();
    app.use_fn(|ctx, next| Box::pin(async move {
        next.run(ctx).await?;
        Err(HttpError::service_unavailable().into())
    }));

    let res = app.sub_request_with(Method::GET, "/", None, ()).await;
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_listeners_receive_each_failure_once() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut app = Application::new();
    {
        let seen = Arc::clone(&seen);
        app.on_error(move |err| seen.lock().unwrap().push(err.http_status()));
    }
    app.use_fn(|ctx, next| Box::pin(async move {
        if ctx.request.path() == "/fail" {
            return Err(HttpError::forbidden().into());
        }
        next.run(ctx).await
    }));

    app.sub_request_with(Method::GET, "/fail", None, ()).await;
    app.sub_request_with(Method::GET, "/ok", None, ()).await;
    app.sub_request_with(Method::GET, "/fail", None, ()).await;

    assert_eq!(
        *seen.lock().unwrap(),
        [Some(StatusCode::FORBIDDEN), Some(StatusCode::FORBIDDEN)],
    );
}

#[tokio::test]
async fn test_no_listeners_is_silent() {
    let mut app = Application::new();
    app.use_fn(|_ctx, _next| Box::pin(async move { Err(Error::other("boom")) }));
    assert_eq!(app.error_listener_count(), 0);

    let res = app.sub_request_with(Method::GET, "/", None, ()).await;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_sub_request_is_idempotent() {
    let mut app = Application::new();
    app.use_fn(|ctx, _next| Box::pin(async move {
        let greeting = format!("{} {}", ctx.request.method(), ctx.request.path());
        ctx.response.headers_mut().set("x-echo", ctx.request.path())?;
        ctx.response.set_body(greeting);
        Ok(())
    }));

    let headers = Headers::from_pairs([("accept", "text/plain")]).unwrap();
    let first = app.sub_request_with(Method::POST, "/echo", Some(headers.clone()), "payload").await;
    let second = app.sub_request_with(Method::POST, "/echo", Some(headers), "payload").await;

    assert_eq!(first, second);
    assert_eq!(first.body().as_text(), Some("POST /echo"));
}

#[tokio::test]
async fn test_prebuilt_request_and_json_body() {
    #[derive(serde::Deserialize)]
    struct NewUser {
        name: String,
    }

    let mut app = Application::new();
    app.use_fn(|ctx, _next| Box::pin(async move {
        let user: NewUser = ctx.request.json()?;
        ctx.response.set_status(StatusCode::CREATED);
        ctx.response.set_json(&serde_json::json!({ "name": user.name }))?;
        Ok(())
    }));

    let req = Request::new(Method::POST, "/users")
        .with_header("content-type", "application/json").unwrap()
        .with_body(r#"{"name":"alice"}"#);
    let res = app.sub_request(req).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(res.body(), &peel::Body::Json(serde_json::json!({ "name": "alice" })));

    // Malformed body: the decode failure carries 400.
    let bad = Request::new(Method::POST, "/users").with_body("{");
    let res = app.sub_request(bad).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_registration_after_dispatch_affects_only_later_dispatches() {
    let mut app = Application::new();
    let before = app.sub_request_with(Method::GET, "/", None, ()).await;
    assert_eq!(before.status(), StatusCode::NOT_FOUND);

    app.use_layers([respond_with("now handled")]);
    let after = app.sub_request_with(Method::GET, "/", None, ()).await;
    assert_eq!(after.status(), StatusCode::OK);
    assert_eq!(after.body().as_text(), Some("now handled"));
    assert_eq!(app.layers().len(), 1);
}
