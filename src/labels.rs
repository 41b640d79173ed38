// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Common label, annotation and finalizer constants.
//!
//! This module defines the standard Kubernetes labels, the opt-in gate label read
//! from managed clusters, and the labels Forklift and the cluster view API use, so
//! that every reconciler and the admission webhook agree on the same keys.

use std::collections::BTreeMap;

// ============================================================================
// Kubernetes Standard Labels
// https://kubernetes.io/docs/concepts/overview/working-with-objects/common-labels/
// ============================================================================

/// Standard label for the tool being used to manage the operation of an application
pub const K8S_MANAGED_BY: &str = "app.kubernetes.io/managed-by";

/// Standard label for the name of a higher-level application this one is part of
pub const K8S_PART_OF: &str = "app.kubernetes.io/part-of";

/// Value for both `managed-by` and `part-of` on resources created by this operator
pub const MANAGED_BY_MTV_INTEGRATIONS: &str = "mtv-integrations";

// ============================================================================
// Managed Cluster Labels
// ============================================================================

/// Opt-in label on a `ManagedCluster`; the integration is active only when it is `"true"`
pub const LABEL_CNV_OPERATOR_INSTALL: &str = "acm/cnv-operator-install";

/// Value of the gate label that enables the integration
pub const LABEL_VALUE_TRUE: &str = "true";

// ============================================================================
// Forklift Provider Secret Labels
// ============================================================================

/// Forklift label naming the provider type a secret was created for
pub const LABEL_CREATED_FOR_PROVIDER_TYPE: &str = "createdForProviderType";

/// Forklift label naming the resource type a secret was created for
pub const LABEL_CREATED_FOR_RESOURCE_TYPE: &str = "createdForResourceType";

/// Value of `createdForResourceType` on provider secrets
pub const RESOURCE_TYPE_PROVIDERS: &str = "providers";

// ============================================================================
// Cluster View Labels
// ============================================================================

/// Label on a `KubevirtProject` naming the managed cluster it belongs to
pub const VIEW_LABEL_CLUSTER: &str = "cluster";

/// Label on a `KubevirtProject` naming the project (namespace) it grants
pub const VIEW_LABEL_PROJECT: &str = "project";

/// Project value granting visibility into every namespace of a cluster
pub const VIEW_ALL_PROJECTS: &str = "all_projects";

// ============================================================================
// Finalizers
// ============================================================================

/// Finalizer placed on `ManagedCluster` resources while downstream resources exist
pub const FINALIZER_MANAGED_CLUSTER: &str =
    "mtv-integrations.open-cluster-management.io/resource-cleanup";

/// Labels stamped on every provider secret.
#[must_use]
pub fn provider_secret_labels(provider_type: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            LABEL_CREATED_FOR_PROVIDER_TYPE.to_string(),
            provider_type.to_string(),
        ),
        (
            LABEL_CREATED_FOR_RESOURCE_TYPE.to_string(),
            RESOURCE_TYPE_PROVIDERS.to_string(),
        ),
        (
            K8S_MANAGED_BY.to_string(),
            MANAGED_BY_MTV_INTEGRATIONS.to_string(),
        ),
        (
            K8S_PART_OF.to_string(),
            MANAGED_BY_MTV_INTEGRATIONS.to_string(),
        ),
    ])
}
