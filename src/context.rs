// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shared context for the managed cluster controller.
//!
//! The controller receives an `Arc<Context>` that contains:
//! - Kubernetes client
//! - The integration settings (names of the fixed namespace, label, finalizer, ...)
//! - Per-cluster error backoff state for the error policy
//!
//! Fixed names are carried as configuration instead of being read from globals so
//! tests and alternative deployments can change them without touching the reconcilers.

use crate::constants::{
    DEFAULT_ADDON_AGENT_DEPLOYMENT, DEFAULT_ADDON_NAMESPACE, DEFAULT_INTEGRATION_NAMESPACE,
    DEFAULT_PROVIDER_CRD_NAME, MTV_NAME_SUFFIX, PROVIDER_CLUSTER_ROLE, PROVIDER_TYPE_OPENSHIFT,
};
use crate::labels::{FINALIZER_MANAGED_CLUSTER, LABEL_CNV_OPERATOR_INSTALL};
use crate::reconcilers::backoff::ErrorBackoff;
use kube::Client;
use std::sync::Arc;

/// Names and values shared by every stage of the lifecycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntegrationSettings {
    /// Namespace hosting provider secrets and `Provider` registrations
    pub integration_namespace: String,

    /// Label on `ManagedCluster` that opts the cluster in
    pub gate_label: String,

    /// Finalizer placed on opted-in managed clusters
    pub finalizer: String,

    /// CRD that must be established before anything is reconciled
    pub provider_crd_name: String,

    /// Deployment whose namespace hosts the managed service accounts
    pub addon_agent_deployment: String,

    /// Namespace used when the addon agent deployment cannot be found
    pub default_addon_namespace: String,

    /// Cluster role bound to the managed service account
    pub cluster_role: String,

    /// Forklift provider type registered for every cluster
    pub provider_type: String,
}

impl Default for IntegrationSettings {
    fn default() -> Self {
        Self {
            integration_namespace: DEFAULT_INTEGRATION_NAMESPACE.to_string(),
            gate_label: LABEL_CNV_OPERATOR_INSTALL.to_string(),
            finalizer: FINALIZER_MANAGED_CLUSTER.to_string(),
            provider_crd_name: DEFAULT_PROVIDER_CRD_NAME.to_string(),
            addon_agent_deployment: DEFAULT_ADDON_AGENT_DEPLOYMENT.to_string(),
            default_addon_namespace: DEFAULT_ADDON_NAMESPACE.to_string(),
            cluster_role: PROVIDER_CLUSTER_ROLE.to_string(),
            provider_type: PROVIDER_TYPE_OPENSHIFT.to_string(),
        }
    }
}

/// Deterministic name of every resource created for a managed cluster (`<cluster>-mtv`).
#[must_use]
pub fn managed_cluster_mtv_name(cluster_name: &str) -> String {
    format!("{cluster_name}{MTV_NAME_SUFFIX}")
}

/// Shared context passed to the managed cluster controller.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client for API operations
    pub client: Client,

    /// Fixed names used by every stage
    pub settings: Arc<IntegrationSettings>,

    /// Per-cluster failure counts driving the error policy
    pub backoff: Arc<ErrorBackoff>,
}

impl Context {
    /// Create a context with a fresh backoff tracker.
    #[must_use]
    pub fn new(client: Client, settings: IntegrationSettings) -> Self {
        Self {
            client,
            settings: Arc::new(settings),
            backoff: Arc::new(ErrorBackoff::default()),
        }
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
