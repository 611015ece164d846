//! Admission filter applied in front of every route.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};

use crate::admission::{AdmissionEngine, Decision};
use crate::error::NetwardenError;

/// Header carrying the originating client address when behind a proxy.
pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Body sent with every 429 response.
pub const TOO_MANY_REQUESTS_BODY: &str = "Too many requests\n";

/// Admit or reject the request before it reaches a handler.
pub async fn enforce_admission(
    State(engine): State<Arc<AdmissionEngine>>,
    req: Request,
    next: Next,
) -> Response {
    let address = client_address(&req).unwrap_or_default();

    match engine.check_request(&address) {
        Ok(Decision::Admit) => next.run(req).await,
        Ok(Decision::RateExceeded { retry_after }) => {
            debug!(address = %address, "Request rejected, rate exceeded");
            too_many_requests(retry_after)
        }
        Err(e) => {
            warn!(address = %address, error = %e, "Rejecting request with malformed client address");
            e.into_response()
        }
    }
}

/// The client address for `req`.
///
/// Uses the first entry of `X-Forwarded-For` when present, otherwise the
/// peer address of the connection without its port.
pub fn client_address(req: &Request) -> Option<String> {
    forwarded_address(req.headers()).or_else(|| {
        req.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(peer)| peer.ip().to_canonical().to_string())
    })
}

fn forwarded_address(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(FORWARDED_FOR)?.to_str().ok()?;
    let first = value.split(',').next()?.trim();
    (!first.is_empty()).then(|| first.to_string())
}

fn too_many_requests(retry_after: Duration) -> Response {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    (
        StatusCode::TOO_MANY_REQUESTS,
        [(header::RETRY_AFTER, HeaderValue::from(secs))],
        TOO_MANY_REQUESTS_BODY,
    )
        .into_response()
}

impl IntoResponse for NetwardenError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, format!("{self}\n")).into_response()
    }
}
