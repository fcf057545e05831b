//! Hop handler and handler table.
//!
//! # Responsibilities
//! - Open one server span per request, parented on inbound trace context
//! - Answer `/` locally (end of the chain)
//! - Forward every other path to the next hop and relay its reply
//! - Record per-request metrics

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{MatchedPath, State},
    http::{Request, StatusCode},
    response::Response,
    routing::any,
    Router,
};
use opentelemetry::KeyValue;

use crate::config::ForwardMode;
use crate::http::client::{self, build_client, HopClient};
use crate::http::request::HopRequest;
use crate::http::response;
use crate::lifecycle::BaseContext;
use crate::observability::metrics::{self, Outcome};
use crate::observability::Telemetry;

/// Span name for the hop operation.
pub const OPERATION: &str = "pathWalk";

/// State injected into the hop handler.
#[derive(Clone)]
pub struct HopState {
    pub telemetry: Arc<Telemetry>,
    pub client: HopClient,
    pub forward_mode: ForwardMode,
}

impl HopState {
    pub fn new(telemetry: Arc<Telemetry>, forward_mode: ForwardMode) -> Self {
        Self {
            telemetry,
            client: build_client(),
            forward_mode,
        }
    }
}

/// Handler table: every path goes to [`path_walk`].
pub fn routes(state: HopState) -> Router {
    Router::new()
        .route("/", any(path_walk))
        .route("/{*path}", any(path_walk))
        .with_state(state)
}

/// Terminate at `/`, otherwise forward to the next hop.
pub async fn path_walk(State(state): State<HopState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let parent = state.telemetry.extract(request.headers());
    let span = state.telemetry.start_server_span(OPERATION, &parent);

    let hop = HopRequest::from_request(&request);
    if let Some(route) = request.extensions().get::<MatchedPath>() {
        span.set_attribute(KeyValue::new("http.route", route.as_str().to_string()));
    }
    span.set_attribute(KeyValue::new("url.path", hop.path().to_string()));
    span.set_attribute(KeyValue::new("server.address", hop.host().to_string()));

    if hop.is_terminal() {
        tracing::debug!(host = %hop.host(), "Last hop reached");
        span.set_attribute(KeyValue::new("http.response.status_code", 200_i64));
        metrics::record_hop(Outcome::Terminal, StatusCode::OK.as_u16(), start);
        return response::terminal();
    }

    let cancel = request
        .extensions()
        .get::<BaseContext>()
        .map(BaseContext::request_token)
        .unwrap_or_default();
    let target = hop.target(state.forward_mode);
    let preamble = hop.preamble(&target);
    span.set_attribute(KeyValue::new("hop.target", target.clone()));

    tracing::debug!(
        host = %hop.host(),
        path = %hop.path(),
        upstream = %target,
        "Forwarding to next hop"
    );

    match client::forward(&state.client, &state.telemetry, span.context(), &target, &cancel).await {
        Ok(upstream) => {
            let status = upstream.status();
            tracing::debug!(upstream = %target, status = %status, "Upstream replied");
            span.set_attribute(KeyValue::new("http.response.status_code", 200_i64));
            metrics::record_hop(Outcome::Forwarded, StatusCode::OK.as_u16(), start);
            response::relay(preamble, upstream)
        }
        Err(err) => {
            let description = err.describe();
            tracing::warn!(
                upstream = %target,
                code = err.code(),
                error = %description,
                "Upstream call failed"
            );
            span.set_attribute(KeyValue::new("http.response.status_code", 500_i64));
            span.fail(description);
            metrics::record_hop(
                Outcome::Failed,
                StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
                start,
            );
            response::upstream_failure(preamble, &err)
        }
    }
}
