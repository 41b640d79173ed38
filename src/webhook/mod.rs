// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP surfaces of the operator: the `Plan` validating webhook and the metrics endpoint.
//!
//! # Routes
//!
//! Webhook server (TLS when a certificate is configured):
//! - `POST /validate-plan` - `AdmissionReview` for Forklift `Plan` objects
//! - `GET /healthz`, `GET /readyz` - Probes
//!
//! Metrics server:
//! - `GET /metrics` - Prometheus text exposition

pub mod plan;

use crate::constants::{METRICS_SERVER_PATH, WEBHOOK_VALIDATE_PLAN_PATH};
use crate::errors::AdmissionError;
use crate::metrics;
use anyhow::{Context as _, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_server::tls_rustls::RustlsConfig;
use kube::api::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview};
use plan::DecisionReason;
use serde_json::Value;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

pub use plan::{PlanAdmission, VisibilityQuery};

/// Shared state for webhook handlers.
#[derive(Clone)]
pub struct WebhookState {
    pub plans: PlanAdmission,
}

impl WebhookState {
    #[must_use]
    pub fn new(plans: PlanAdmission) -> Self {
        Self { plans }
    }
}

/// Serving certificate and key, PEM encoded.
#[derive(Debug, Clone)]
pub struct TlsFiles {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Router for the admission endpoints and probes.
pub fn webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route(WEBHOOK_VALIDATE_PLAN_PATH, post(validate_plan_handler))
        .route("/healthz", get(|| async { "ok" }))
        .route("/readyz", get(|| async { "ok" }))
        .with_state(state)
}

/// Router for the Prometheus endpoint.
pub fn metrics_router() -> Router {
    Router::new().route(METRICS_SERVER_PATH, get(metrics_handler))
}

/// Handle a validating admission review for a `Plan`.
///
/// The review is decoded here rather than by the extractor so that an object
/// which does not decode still gets a denial instead of a 422.
pub async fn validate_plan_handler(
    State(state): State<Arc<WebhookState>>,
    Json(body): Json<Value>,
) -> Json<AdmissionReview<DynamicObject>> {
    let uid = body
        .pointer("/request/uid")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let review: AdmissionReview<DynamicObject> = match serde_json::from_value(body) {
        Ok(review) => review,
        Err(e) => return Json(undecodable_review(uid, e).into_review()),
    };

    let req: AdmissionRequest<DynamicObject> = match review.try_into() {
        Ok(req) => req,
        Err(e) => {
            error!(error = %e, "Failed to parse admission request");
            return Json(AdmissionResponse::invalid(e.to_string()).into_review());
        }
    };

    let response = state.plans.review(&req).await;
    Json(response.into_review())
}

/// Denial for a review whose request could not be decoded, echoing its uid.
fn undecodable_review(uid: String, err: serde_json::Error) -> AdmissionResponse {
    let err = AdmissionError::MalformedPlan(err);
    warn!(uid = %uid, error = %err, "Rejecting undecodable admission review");
    metrics::record_admission_decision(false, DecisionReason::InvalidRequest.as_str());

    let mut response = AdmissionResponse::invalid(err.denial_message());
    response.uid = uid;
    response
}

async fn metrics_handler() -> Response {
    match metrics::gather_metrics() {
        Ok(body) => (
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Serve the webhook router until the listener fails.
///
/// Kubernetes only calls admission webhooks over HTTPS; plain HTTP is for local runs
/// behind a terminating proxy.
///
/// # Errors
///
/// Returns an error if the certificate cannot be loaded or the server stops.
pub async fn serve_webhook(
    addr: SocketAddr,
    tls: Option<TlsFiles>,
    state: Arc<WebhookState>,
) -> Result<()> {
    let app = webhook_router(state);

    match tls {
        Some(files) => {
            let tls_config = RustlsConfig::from_pem_file(&files.cert, &files.key)
                .await
                .with_context(|| {
                    format!(
                        "failed to load webhook certificate {} / {}",
                        files.cert.display(),
                        files.key.display()
                    )
                })?;
            info!(addr = %addr, "Starting admission webhook server (TLS)");
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await
                .context("admission webhook server failed")?;
        }
        None => {
            info!(addr = %addr, "Starting admission webhook server (plain HTTP)");
            serve_plain(addr, app).await.context("admission webhook server failed")?;
        }
    }
    Ok(())
}

/// Serve the metrics router until the listener fails.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server stops.
pub async fn serve_metrics(addr: SocketAddr) -> Result<()> {
    info!(addr = %addr, path = METRICS_SERVER_PATH, "Starting metrics server");
    serve_plain(addr, metrics_router())
        .await
        .context("metrics server failed")
}

async fn serve_plain(addr: SocketAddr, app: Router) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod mod_tests;
