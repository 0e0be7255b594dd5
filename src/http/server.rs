//! HTTP listener backed by Axum.
//!
//! # Responsibilities
//! - Bind the TCP socket for the configured host and port
//! - Create the Axum Router that forwards every request to the dispatcher
//! - Wire up middleware (tracing, request ID)
//! - Serve until the shutdown signal fires, then release the socket

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use futures_util::stream;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::error::{Result, StubError};
use crate::http::request::RequestMeta;
use crate::http::response::Reply;
use crate::net::{Hooks, Listener};
use crate::routing::Dispatcher;

/// State injected into the dispatch handler.
#[derive(Clone)]
struct AppState {
    dispatcher: Arc<Dispatcher>,
    max_body_bytes: usize,
}

/// The default listener: Axum over a Tokio TCP socket.
pub struct HttpListener {
    listener: TcpListener,
    local_addr: SocketAddr,
    router: Router,
}

impl HttpListener {
    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ServerConfig, dispatcher: Arc<Dispatcher>) -> Router {
        let state = AppState {
            dispatcher,
            max_body_bytes: config.max_body_bytes,
        };

        Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }
}

impl Listener for HttpListener {
    async fn bind(config: &ServerConfig, dispatcher: Arc<Dispatcher>) -> Result<Self> {
        let listener = TcpListener::bind((config.host.as_str(), config.port))
            .await
            .map_err(|source| StubError::Bind {
                address: config.bind_address(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| StubError::Bind {
            address: config.bind_address(),
            source,
        })?;

        tracing::info!(
            address = %local_addr,
            environment = %config.environment,
            "Listener bound"
        );

        Ok(Self {
            listener,
            local_addr,
            router: Self::build_router(config, dispatcher),
        })
    }

    fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    async fn serve(self, mut hooks: Hooks, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let address = self.local_addr;
        tracing::info!(address = %address, "HTTP server starting");
        hooks.started();

        axum::serve(self.listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::debug!("Shutdown signal received");
            })
            .await?;

        tracing::info!(address = %address, "HTTP server stopped");
        hooks.stopped();
        Ok(())
    }
}

/// Forward a request to the dispatcher and write back its reply.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(uri = %parts.uri, error = %e, "Failed to read request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, e.to_string()).into_response();
        }
    };

    let request = RequestMeta {
        method: parts.method.to_string(),
        uri: parts.uri.to_string(),
        headers: parts
            .headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect(),
        body: String::from_utf8_lossy(&body).into_owned(),
    };

    match state.dispatcher.dispatch(&request) {
        Ok(reply) => into_http_response(reply),
        Err(e) => {
            tracing::error!(
                request_id = request.request_id().unwrap_or("unknown"),
                method = %request.method,
                uri = %request.uri,
                error = %e,
                "Dispatch failed"
            );
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

fn into_http_response(reply: Reply) -> Response {
    let status = StatusCode::from_u16(reply.status).unwrap_or_else(|_| {
        tracing::warn!(status = reply.status, "Invalid stub status, answering 500");
        StatusCode::INTERNAL_SERVER_ERROR
    });

    let mut headers = HeaderMap::new();
    for (name, value) in &reply.headers {
        match (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "Skipping invalid stub header"),
        }
    }

    let mut chunks = reply.body;
    let body = if chunks.len() == 1 {
        Body::from(chunks.remove(0))
    } else {
        Body::from_stream(stream::iter(chunks.into_iter().map(Ok::<_, Infallible>)))
    };

    (status, headers, body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_reply_conversion() {
        let reply = Reply {
            status: 201,
            headers: vec![
                ("Content-Type".into(), "text/plain".into()),
                ("bad header".into(), "x".into()),
            ],
            body: vec![Bytes::from("ok")],
        };
        let response = into_http_response(reply);
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["content-type"], "text/plain");
        assert_eq!(response.headers().len(), 1);
    }

    #[test]
    fn test_invalid_status_becomes_500() {
        let reply = Reply {
            status: 1000,
            headers: Vec::new(),
            body: vec![Bytes::new()],
        };
        assert_eq!(
            into_http_response(reply).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
