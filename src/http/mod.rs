//! HTTP transport for the admission filter.

mod handlers;
mod middleware;
mod server;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use crate::admission::AdmissionEngine;

pub use handlers::{clear_limits, index};
pub use middleware::{client_address, enforce_admission, FORWARDED_FOR, TOO_MANY_REQUESTS_BODY};
pub use server::HttpServer;

/// Build the router with every route behind the admission filter.
pub fn router(engine: Arc<AdmissionEngine>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/clear", get(clear_limits))
        .route("/clear/", get(clear_limits))
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&engine),
            enforce_admission,
        ))
        .with_state(engine)
}
