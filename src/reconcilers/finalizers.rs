// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Finalizer management for cluster-scoped resources.
//!
//! Finalizers are added and removed with merge patches that carry the
//! `metadata.resourceVersion` of the object the controller read. If the object
//! changed in the meantime the API server answers 409 and the pass is retried with
//! a fresh read, so a concurrent finalizer edit is never overwritten.
//!
//! # Example
//!
//! ```rust,ignore
//! use mtv_integrations::reconcilers::finalizers::{ensure_cluster_finalizer, handle_cluster_deletion};
//!
//! async fn reconcile(ctx: &Context, cluster: ManagedCluster) -> Result<()> {
//!     if cluster.metadata.deletion_timestamp.is_some() {
//!         return handle_cluster_deletion(ctx, &cluster, FINALIZER).await;
//!     }
//!     ensure_cluster_finalizer(&ctx.client, &cluster, FINALIZER).await?;
//!     Ok(())
//! }
//! ```

use crate::context::Context;
use anyhow::{Context as _, Result};
use kube::api::{Patch, PatchParams};
use kube::core::ClusterResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde_json::{json, Value};
use tracing::info;

/// Cleanup that must finish before a resource's finalizer is removed.
#[async_trait::async_trait]
pub trait FinalizerCleanup: Resource + ResourceExt + Clone {
    /// Delete everything the controller created for this resource.
    ///
    /// # Errors
    ///
    /// An error keeps the finalizer in place; the whole cleanup is retried later.
    async fn cleanup(&self, ctx: &Context) -> Result<()>;
}

/// Whether `finalizer` is present on the resource.
#[must_use]
pub fn has_finalizer<T: ResourceExt>(resource: &T, finalizer: &str) -> bool {
    resource.finalizers().iter().any(|f| f == finalizer)
}

/// Merge patch replacing the finalizer list, guarded by the read `resourceVersion`.
fn finalizer_patch<T: ResourceExt>(resource: &T, finalizers: Vec<String>) -> Value {
    let mut patch = json!({ "metadata": { "finalizers": finalizers } });
    if let Some(resource_version) = resource.resource_version() {
        patch["metadata"]["resourceVersion"] = Value::String(resource_version);
    }
    patch
}

async fn patch_finalizers<T>(client: &Client, resource: &T, finalizers: Vec<String>) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = ClusterResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    let name = resource.name_any();
    let api: Api<T> = Api::all(client.clone());
    let patch = finalizer_patch(resource, finalizers);
    api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .with_context(|| format!("failed to patch finalizers of {} {name}", T::kind(&())))?;
    Ok(())
}

/// Add a finalizer to a cluster-scoped resource if not already present.
///
/// # Errors
///
/// Returns an error if the patch fails, including a conflict on a stale `resourceVersion`.
pub async fn ensure_cluster_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = ClusterResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    if has_finalizer(resource, finalizer) {
        return Ok(());
    }

    let mut finalizers = resource.finalizers().to_vec();
    finalizers.push(finalizer.to_string());
    patch_finalizers(client, resource, finalizers).await?;

    info!(
        "Added finalizer {} to {} {}",
        finalizer,
        T::kind(&()),
        resource.name_any()
    );
    Ok(())
}

/// Remove a finalizer from a cluster-scoped resource. Absent finalizer is a no-op.
///
/// # Errors
///
/// Returns an error if the patch fails, including a conflict on a stale `resourceVersion`.
pub async fn remove_cluster_finalizer<T>(client: &Client, resource: &T, finalizer: &str) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = ClusterResourceScope>
        + ResourceExt
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    if !has_finalizer(resource, finalizer) {
        return Ok(());
    }

    let finalizers: Vec<String> = resource
        .finalizers()
        .iter()
        .filter(|f| *f != finalizer)
        .cloned()
        .collect();
    patch_finalizers(client, resource, finalizers).await?;

    info!(
        "Removed finalizer {} from {} {}",
        finalizer,
        T::kind(&()),
        resource.name_any()
    );
    Ok(())
}

/// Run the resource's cleanup, then remove the finalizer.
///
/// Does nothing when the finalizer is already gone. A cleanup error leaves the
/// finalizer in place.
///
/// # Errors
///
/// Returns the first cleanup error or the finalizer patch error.
pub async fn handle_cluster_deletion<T>(ctx: &Context, resource: &T, finalizer: &str) -> Result<()>
where
    T: Resource<DynamicType = (), Scope = ClusterResourceScope>
        + ResourceExt
        + FinalizerCleanup
        + Clone
        + std::fmt::Debug
        + serde::Serialize
        + for<'de> serde::Deserialize<'de>,
{
    if !has_finalizer(resource, finalizer) {
        return Ok(());
    }

    info!("Running cleanup for {} {}", T::kind(&()), resource.name_any());
    resource.cleanup(ctx).await?;
    remove_cluster_finalizer(&ctx.client, resource, finalizer).await
}

#[cfg(test)]
#[path = "finalizers_tests.rs"]
mod finalizers_tests;
