// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Removal of every downstream resource created for a managed cluster.
//!
//! Resources are deleted in a fixed order: `ClusterPermission`, `ManagedServiceAccount`,
//! provider secret, `Provider`. A resource that is already gone counts as deleted, and
//! the first genuine failure stops the sequence so the finalizer stays in place.

use crate::constants::{KIND_MANAGED_SERVICE_ACCOUNT, KIND_PROVIDER_SECRET};
use crate::context::{managed_cluster_mtv_name, Context};
use crate::crd::{ManagedCluster, ManagedServiceAccount};
use crate::errors::is_not_found;
use crate::metrics;
use crate::reconcilers::finalizers::FinalizerCleanup;
use crate::reconcilers::payloads::{CLUSTER_PERMISSION, PROVIDER};
use anyhow::{Context as _, Result};
use k8s_openapi::api::core::v1::Secret;
use kube::api::{DeleteParams, DynamicObject};
use kube::{Api, ResourceExt};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::{debug, info};

/// Delete `name` through `api`, treating not-found as success.
///
/// # Returns
///
/// `true` if a delete was accepted, `false` if the object was already gone.
///
/// # Errors
///
/// Returns any error other than not-found.
pub async fn delete_if_present<K>(api: &Api<K>, kind: &str, name: &str) -> Result<bool>
where
    K: Clone + DeserializeOwned + Debug,
{
    match api.delete(name, &DeleteParams::default()).await {
        Ok(_) => {
            metrics::record_resource_deleted(kind);
            info!(kind = %kind, name = %name, "Deleted resource");
            Ok(true)
        }
        Err(e) if is_not_found(&e) => {
            debug!(kind = %kind, name = %name, "Resource already deleted");
            Ok(false)
        }
        Err(e) => Err(e).with_context(|| format!("failed to delete {kind} {name}")),
    }
}

#[async_trait::async_trait]
impl FinalizerCleanup for ManagedCluster {
    async fn cleanup(&self, ctx: &Context) -> Result<()> {
        let cluster_name = self.name_any();
        let name = managed_cluster_mtv_name(&cluster_name);
        let integration_namespace = &ctx.settings.integration_namespace;

        info!(cluster = %cluster_name, "Removing MTV integration resources");

        let permissions: Api<DynamicObject> = Api::namespaced_with(
            ctx.client.clone(),
            &cluster_name,
            &CLUSTER_PERMISSION.api_resource(),
        );
        delete_if_present(&permissions, CLUSTER_PERMISSION.kind, &name).await?;

        let credentials: Api<ManagedServiceAccount> =
            Api::namespaced(ctx.client.clone(), &cluster_name);
        delete_if_present(&credentials, KIND_MANAGED_SERVICE_ACCOUNT, &name).await?;

        let secrets: Api<Secret> = Api::namespaced(ctx.client.clone(), integration_namespace);
        delete_if_present(&secrets, KIND_PROVIDER_SECRET, &name).await?;

        let providers: Api<DynamicObject> = Api::namespaced_with(
            ctx.client.clone(),
            integration_namespace,
            &PROVIDER.api_resource(),
        );
        delete_if_present(&providers, PROVIDER.kind, &name).await?;

        info!(cluster = %cluster_name, "MTV integration resources removed");
        Ok(())
    }
}

#[cfg(test)]
#[path = "cleanup_tests.rs"]
mod cleanup_tests;
