//! The request/response pair that flows through one dispatch.

use crate::request::Request;
use crate::response::Response;

/// One request and the response being built for it.
///
/// A context lives for exactly one dispatch. Middleware receives it as
/// `&mut Context` and hands it back to [`Next::run`](crate::Next::run) to let
/// downstream layers see it.
#[derive(Debug)]
pub struct Context {
    pub request: Request,
    pub response: Response,
}

impl Context {
    pub fn new(request: Request, response: Response) -> Self {
        Self { request, response }
    }

    /// A context for `request` with a fresh `200 OK` response.
    pub fn for_request(request: Request) -> Self {
        Self::new(request, Response::new())
    }

    pub fn into_response(self) -> Response {
        self.response
    }
}
