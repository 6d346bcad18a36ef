// Payment provider stubs. No provider calls are made from here.

use crate::{
    api::response::{ok, Envelope},
    config::Config,
};
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
pub struct PingResponse {
    pub ok: bool,
    pub env: &'static str,
    pub publishable_key_configured: bool,
}

#[derive(Debug, Serialize)]
pub struct CheckoutAccepted {
    pub status: &'static str,
    pub env: &'static str,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub ok: bool,
    pub message: &'static str,
}

/// GET /api/stripe/ping
///
/// Reports which key set the service was configured with
pub async fn ping(State(config): State<Arc<Config>>) -> Json<PingResponse> {
    Json(PingResponse {
        ok: true,
        env: config.payments.mode(),
        publishable_key_configured: config.payments.publishable_key().is_some(),
    })
}

/// POST /api/stripe/checkout
///
/// Rate limited by the checkout policy before reaching here
pub async fn checkout(
    State(config): State<Arc<Config>>,
) -> (StatusCode, Json<Envelope<CheckoutAccepted>>) {
    tracing::info!(env = config.payments.mode(), "Checkout requested");

    (
        StatusCode::ACCEPTED,
        ok(CheckoutAccepted {
            status: "pending",
            env: config.payments.mode(),
        }),
    )
}

/// POST /api/stripe/webhook
pub async fn webhook() -> Json<WebhookResponse> {
    Json(WebhookResponse {
        ok: true,
        message: "not implemented yet",
    })
}
