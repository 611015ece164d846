//! Route handlers.

use std::sync::Arc;

use axum::extract::State;

use crate::admission::AdmissionEngine;

/// `GET /`
pub async fn index() -> &'static str {
    "Hello from netwarden\n"
}

/// `GET /clear`: forget every tracked network.
pub async fn clear_limits(State(engine): State<Arc<AdmissionEngine>>) -> &'static str {
    engine.reset_all();
    "Limits are cleared\n"
}
