//! Outbound calls to the next hop.

use axum::body::Body;
use axum::http::uri::InvalidUri;
use axum::http::{Method, Request, Response, Uri};
use hyper::body::Incoming;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use opentelemetry::Context;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::observability::Telemetry;

pub type HopClient = Client<HttpConnector, Body>;

pub fn build_client() -> HopClient {
    Client::builder(TokioExecutor::new()).build(HttpConnector::new())
}

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid upstream target {target}")]
    InvalidTarget {
        target: String,
        #[source]
        source: InvalidUri,
    },

    #[error("failed to build upstream request")]
    Request(#[from] axum::http::Error),

    #[error("upstream request failed")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("upstream request cancelled")]
    Cancelled,
}

impl ForwardError {
    /// Stable machine-readable code, sent alongside the free-text description.
    pub fn code(&self) -> &'static str {
        match self {
            ForwardError::InvalidTarget { .. } | ForwardError::Request(_) => "invalid_target",
            ForwardError::Upstream(_) => "upstream_unreachable",
            ForwardError::Cancelled => "cancelled",
        }
    }

    /// The error and its sources, joined with `": "`.
    pub fn describe(&self) -> String {
        let mut description = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            description.push_str(": ");
            description.push_str(&err.to_string());
            source = err.source();
        }
        description
    }
}

/// GET `target` with the trace context of `cx` injected.
///
/// Resolves once upstream response headers arrive; the body is left to
/// stream. Cancelling `cancel` aborts the call.
pub async fn forward(
    client: &HopClient,
    telemetry: &Telemetry,
    cx: &Context,
    target: &str,
    cancel: &CancellationToken,
) -> Result<Response<Incoming>, ForwardError> {
    let uri: Uri = target.parse().map_err(|source| ForwardError::InvalidTarget {
        target: target.to_string(),
        source,
    })?;

    let mut request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())?;
    telemetry.inject(cx, request.headers_mut());

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ForwardError::Cancelled),
        response = client.request(request) => response.map_err(ForwardError::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ForwardError::Cancelled.code(), "cancelled");
        let invalid = "http://bad host/".parse::<Uri>().unwrap_err();
        let err = ForwardError::InvalidTarget {
            target: "http://bad host/".into(),
            source: invalid,
        };
        assert_eq!(err.code(), "invalid_target");
        assert!(err.describe().starts_with("invalid upstream target http://bad host/: "));
    }

    #[tokio::test]
    async fn refused_connection_is_upstream_error() {
        let err = forward(
            &build_client(),
            &Telemetry::disabled(),
            &Context::new(),
            "http://127.0.0.1:1/x",
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.code(), "upstream_unreachable");
        assert!(err.describe().len() > "upstream request failed".len());
    }

    #[tokio::test]
    async fn cancelled_token_aborts_call() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = forward(
            &build_client(),
            &Telemetry::disabled(),
            &Context::new(),
            "http://127.0.0.1:1/x",
            &cancel,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ForwardError::Cancelled));
    }
}
