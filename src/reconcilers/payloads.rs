// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Untyped payloads for downstream resources whose CRDs this operator does not model.
//!
//! Each resource kind is described by a [`ResourceDescriptor`] and its document is built
//! with `serde_json::json!`. The generic reconciler in [`super::resources`] turns the
//! document into a `DynamicObject`.

use crate::constants::{
    CLUSTER_PERMISSION_GROUP, CLUSTER_PERMISSION_PLURAL, CLUSTER_PERMISSION_VERSION,
    FORKLIFT_API_GROUP, FORKLIFT_API_VERSION, KIND_CLUSTER_PERMISSION, KIND_PROVIDER,
    PROVIDER_PLURAL,
};
use crate::context::{managed_cluster_mtv_name, IntegrationSettings};
use crate::crd::ManagedCluster;
use crate::reconcilers::credential::cluster_owner_reference;
use anyhow::{anyhow, bail, Context as _, Result};
use kube::core::{ApiResource, GroupVersionKind};
use kube::ResourceExt;
use serde_json::{json, Value};

/// Group, version, kind and plural of an untyped resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDescriptor {
    pub group: &'static str,
    pub version: &'static str,
    pub kind: &'static str,
    pub plural: &'static str,
}

impl ResourceDescriptor {
    /// `apiVersion` string (`group/version`).
    #[must_use]
    pub fn api_version(&self) -> String {
        format!("{}/{}", self.group, self.version)
    }

    /// Dynamic API resource for `Api<DynamicObject>`.
    #[must_use]
    pub fn api_resource(&self) -> ApiResource {
        ApiResource::from_gvk_with_plural(
            &GroupVersionKind::gvk(self.group, self.version, self.kind),
            self.plural,
        )
    }
}

/// `rbac.open-cluster-management.io/v1alpha1` `ClusterPermission`
pub const CLUSTER_PERMISSION: ResourceDescriptor = ResourceDescriptor {
    group: CLUSTER_PERMISSION_GROUP,
    version: CLUSTER_PERMISSION_VERSION,
    kind: KIND_CLUSTER_PERMISSION,
    plural: CLUSTER_PERMISSION_PLURAL,
};

/// `forklift.konveyor.io/v1beta1` `Provider`
pub const PROVIDER: ResourceDescriptor = ResourceDescriptor {
    group: FORKLIFT_API_GROUP,
    version: FORKLIFT_API_VERSION,
    kind: KIND_PROVIDER,
    plural: PROVIDER_PLURAL,
};

/// `ClusterPermission` binding the cluster's service account, as it exists in the
/// addon namespace, to the configured cluster role.
///
/// # Errors
///
/// Returns an error if the cluster has no UID for the owner reference.
pub fn cluster_permission_payload(
    cluster: &ManagedCluster,
    settings: &IntegrationSettings,
    addon_namespace: &str,
) -> Result<Value> {
    let cluster_name = cluster.name_any();
    let name = managed_cluster_mtv_name(&cluster_name);
    let owner = cluster_owner_reference(cluster)?;

    Ok(json!({
        "apiVersion": CLUSTER_PERMISSION.api_version(),
        "kind": CLUSTER_PERMISSION.kind,
        "metadata": {
            "name": name,
            "namespace": cluster_name,
            "ownerReferences": [owner],
        },
        "spec": {
            "clusterRoleBinding": {
                "subject": {
                    "kind": "ServiceAccount",
                    "name": name,
                    "namespace": addon_namespace,
                },
                "roleRef": {
                    "kind": "ClusterRole",
                    "name": settings.cluster_role,
                    "apiGroup": "rbac.authorization.k8s.io",
                },
            },
        },
    }))
}

/// API endpoint of a managed cluster, as written into the provider secret and `Provider`.
///
/// # Errors
///
/// Returns an error if the cluster has not registered an endpoint or it is not an
/// absolute `http(s)` URL.
pub fn cluster_endpoint(cluster: &ManagedCluster) -> Result<&str> {
    let raw = cluster
        .primary_url()
        .ok_or_else(|| anyhow!("ManagedCluster {} has no client endpoint", cluster.name_any()))?;
    let parsed = url::Url::parse(raw).with_context(|| {
        format!("ManagedCluster {} has an invalid endpoint {raw}", cluster.name_any())
    })?;
    if !matches!(parsed.scheme(), "https" | "http") || parsed.host_str().is_none() {
        bail!(
            "ManagedCluster {} endpoint {raw} is not an http(s) URL",
            cluster.name_any()
        );
    }
    Ok(raw)
}

/// Forklift `Provider` registering the cluster's API endpoint with its provider secret.
///
/// # Errors
///
/// Returns an error if the cluster has no usable API endpoint.
pub fn provider_payload(cluster: &ManagedCluster, settings: &IntegrationSettings) -> Result<Value> {
    let name = managed_cluster_mtv_name(&cluster.name_any());
    let url = cluster_endpoint(cluster)?;

    Ok(json!({
        "apiVersion": PROVIDER.api_version(),
        "kind": PROVIDER.kind,
        "metadata": {
            "name": name,
            "namespace": settings.integration_namespace,
        },
        "spec": {
            "type": settings.provider_type,
            "url": url,
            "secret": {
                "name": name,
                "namespace": settings.integration_namespace,
            },
        },
    }))
}

#[cfg(test)]
#[path = "payloads_tests.rs"]
mod payloads_tests;
