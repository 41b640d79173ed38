// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for the lifecycle controller and the `Plan` admission webhook.
//!
//! Reconcilers work with `anyhow::Result` internally. At the controller boundary the
//! error is wrapped in [`ReconcileError`] so the error policy can tell a failed
//! prerequisite check (fixed retry) from a failed lifecycle stage (exponential backoff).
//! Admission failures never surface as HTTP errors; [`AdmissionError`] values are
//! turned into denials with a fixed, user-facing message.

use thiserror::Error;

/// Errors returned from a managed cluster reconciliation pass.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// The prerequisite CRD could not be read.
    ///
    /// Retried on a fixed delay; the cluster itself was not evaluated.
    #[error("prerequisite check failed: {0:#}")]
    Gate(anyhow::Error),

    /// A lifecycle stage failed against the Kubernetes API.
    #[error(transparent)]
    Stage(#[from] anyhow::Error),
}

impl ReconcileError {
    /// Metric label for this error category.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            ReconcileError::Gate(_) => "prerequisite_error",
            ReconcileError::Stage(err) => {
                let stale = err
                    .chain()
                    .filter_map(|cause| cause.downcast_ref::<kube::Error>())
                    .any(is_conflict);
                if stale {
                    "conflict"
                } else {
                    "api_error"
                }
            }
        }
    }
}

/// Errors that can occur while reviewing a `Plan` admission request.
///
/// Every variant fails closed: the request is denied with [`AdmissionError::denial_message`].
#[derive(Error, Debug)]
pub enum AdmissionError {
    /// The admission request carried no object.
    #[error("admission request has no object")]
    EmptyObject,

    /// The object could not be read as a Forklift `Plan`.
    #[error("object is not a valid Plan: {0}")]
    MalformedPlan(#[source] serde_json::Error),

    /// The impersonating client could not be built.
    #[error("failed to build impersonating client: {0}")]
    ClientSetup(String),

    /// Listing cluster views as the caller failed.
    #[error("failed to list cluster views as caller: {0}")]
    VisibilityQuery(String),
}

impl AdmissionError {
    /// Message returned to the user whose request was denied.
    #[must_use]
    pub fn denial_message(&self) -> &'static str {
        match self {
            AdmissionError::EmptyObject => "Request object is empty",
            AdmissionError::MalformedPlan(_) => "Failed to parse request object into Plan",
            AdmissionError::ClientSetup(_) => "Failed to setup dynamic client",
            AdmissionError::VisibilityQuery(_) => "Authorization check for cluster access failed",
        }
    }
}

/// Whether a Kubernetes API error is a 404 Not Found.
#[must_use]
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}

/// Whether a Kubernetes API error is a 409 Conflict (stale `resourceVersion` or already exists).
#[must_use]
pub fn is_conflict(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 409)
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
