// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Typed views of the external custom resources this operator reads and writes.
//!
//! None of these CRDs are owned by this operator. `ManagedCluster` and
//! `ManagedServiceAccount` come from Open Cluster Management, `Plan` from Forklift.
//! Only the fields the operator needs are modelled; every field defaults so that
//! objects written by newer versions of those projects still deserialize.
//!
//! `ClusterPermission` and `Provider` are intentionally absent: they are created
//! from untyped payloads (see [`crate::reconcilers::payloads`]).

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// `ManagedCluster` is a remote cluster registered with the hub.
///
/// # Example
///
/// ```yaml
/// apiVersion: cluster.open-cluster-management.io/v1
/// kind: ManagedCluster
/// metadata:
///   name: foo
///   labels:
///     acm/cnv-operator-install: "true"
/// spec:
///   hubAcceptsClient: true
///   managedClusterClientConfigs:
///     - url: https://api.foo.example.com:6443
/// ```
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cluster.open-cluster-management.io",
    version = "v1",
    kind = "ManagedCluster",
    doc = "ManagedCluster represents a remote cluster registered with the Open Cluster Management hub."
)]
#[serde(rename_all = "camelCase")]
pub struct ManagedClusterSpec {
    /// Whether the hub accepts the cluster's registration.
    #[serde(default)]
    pub hub_accepts_client: bool,

    /// API endpoints of the managed cluster. The first entry is used for providers.
    #[serde(default)]
    pub managed_cluster_client_configs: Vec<ClientConfig>,
}

/// A client endpoint of a managed cluster.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// API server URL.
    #[serde(default)]
    pub url: String,

    /// Base64-encoded CA bundle for the API server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_bundle: Option<String>,
}

impl ManagedCluster {
    /// URL of the first client endpoint, if the cluster has registered one.
    #[must_use]
    pub fn primary_url(&self) -> Option<&str> {
        self.spec
            .managed_cluster_client_configs
            .first()
            .map(|config| config.url.as_str())
            .filter(|url| !url.is_empty())
    }
}

/// `ManagedServiceAccount` asks the managed-serviceaccount addon to provision a
/// service account on the managed cluster and project its token back to the hub.
///
/// # Example
///
/// ```yaml
/// apiVersion: authentication.open-cluster-management.io/v1beta1
/// kind: ManagedServiceAccount
/// metadata:
///   name: foo-mtv
///   namespace: foo
/// spec:
///   rotation:
///     enabled: true
///     validity: 1h0m0s
/// ```
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "authentication.open-cluster-management.io",
    version = "v1beta1",
    kind = "ManagedServiceAccount",
    namespaced,
    doc = "ManagedServiceAccount provisions a rotating service account token on a managed cluster."
)]
#[kube(status = "ManagedServiceAccountStatus")]
#[serde(rename_all = "camelCase")]
pub struct ManagedServiceAccountSpec {
    /// Token rotation settings.
    #[serde(default)]
    pub rotation: ManagedServiceAccountRotation,
}

/// Rotation settings of a `ManagedServiceAccount`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ManagedServiceAccountRotation {
    /// Whether the token is rotated.
    #[serde(default)]
    pub enabled: bool,

    /// Token validity as a Go duration string (e.g. `1h0m0s`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validity: Option<String>,
}

/// Status written by the managed-serviceaccount addon.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ManagedServiceAccountStatus {
    /// Reference to the hub secret holding the projected token, once issued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_secret_ref: Option<TokenSecretRef>,

    /// When the current token expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_timestamp: Option<String>,
}

/// Reference to the token secret of a `ManagedServiceAccount`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenSecretRef {
    /// Secret name, in the namespace of the `ManagedServiceAccount`.
    #[serde(default)]
    pub name: String,

    /// When the addon last refreshed the token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_refresh_timestamp: Option<String>,
}

impl ManagedServiceAccount {
    /// Name of the issued token secret, or `None` while the addon has not issued one.
    #[must_use]
    pub fn token_secret_name(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|status| status.token_secret_ref.as_ref())
            .map(|secret_ref| secret_ref.name.as_str())
            .filter(|name| !name.is_empty())
    }
}

/// Forklift migration `Plan`. Only the fields read by the admission webhook are modelled.
///
/// # Example
///
/// ```yaml
/// apiVersion: forklift.konveyor.io/v1beta1
/// kind: Plan
/// metadata:
///   name: migrate-vms
///   namespace: openshift-mtv
/// spec:
///   targetNamespace: ns1
///   provider:
///     source:
///       name: host
///       namespace: openshift-mtv
///     destination:
///       name: foo-mtv
///       namespace: mtv-integrations
/// ```
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "forklift.konveyor.io",
    version = "v1beta1",
    kind = "Plan",
    namespaced,
    doc = "Plan describes a Forklift virtual machine migration."
)]
#[serde(rename_all = "camelCase")]
pub struct PlanSpec {
    /// Namespace on the destination cluster that receives the migrated workloads.
    #[serde(default)]
    pub target_namespace: String,

    /// Source and destination providers.
    #[serde(default)]
    pub provider: PlanProviderPair,
}

/// Source and destination provider references of a `Plan`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlanProviderPair {
    /// Provider the workloads are migrated from.
    #[serde(default)]
    pub source: ProviderReference,

    /// Provider the workloads are migrated to.
    #[serde(default)]
    pub destination: ProviderReference,
}

/// Reference to a Forklift `Provider`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderReference {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub namespace: String,
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
