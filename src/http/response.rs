//! Response construction for the hop handler.
//!
//! - Terminal: fixed body, `text/plain`
//! - Relay: preamble streamed ahead of the upstream body, byte for byte
//! - Failure: 500, preamble followed by the error description, plus an
//!   `x-hopper-error` code header for machines

use axum::body::{Body, Bytes};
use axum::http::header::{HeaderName, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::{future, stream, StreamExt};
use hyper::body::Incoming;

use crate::http::client::ForwardError;

pub const TERMINAL_BODY: &str = "This is the last host, no more upstream requests";
pub const ERROR_CODE_HEADER: HeaderName = HeaderName::from_static("x-hopper-error");

const TEXT_PLAIN: &str = "text/plain";
const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";

pub fn terminal() -> Response {
    ([(CONTENT_TYPE, TEXT_PLAIN)], TERMINAL_BODY).into_response()
}

/// Stream `preamble` then the upstream body. Upstream status and headers
/// are not relayed.
pub fn relay(preamble: String, upstream: Response<Incoming>) -> Response {
    let upstream_body = Body::new(upstream.into_body()).into_data_stream();
    let body = stream::once(future::ready(Ok::<_, axum::Error>(Bytes::from(preamble))))
        .chain(upstream_body);

    (
        StatusCode::OK,
        [(CONTENT_TYPE, TEXT_PLAIN_UTF8)],
        Body::from_stream(body),
    )
        .into_response()
}

pub fn upstream_failure(preamble: String, err: &ForwardError) -> Response {
    let body = format!("{}Error {}", preamble, err.describe());
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(CONTENT_TYPE, TEXT_PLAIN_UTF8), (ERROR_CODE_HEADER, err.code())],
        body,
    )
        .into_response()
}
