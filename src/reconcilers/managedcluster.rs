// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Lifecycle reconciliation for `ManagedCluster` resources.
//!
//! A managed cluster opts in with the `acm/cnv-operator-install: "true"` label. Once
//! the Forklift `Provider` CRD is established, every opted-in cluster is driven through
//! the same stages, each one a conditional create-or-defer:
//!
//! 1. Integration namespace and finalizer
//! 2. `ManagedServiceAccount` `<cluster>-mtv` (requeue until the token is issued)
//! 3. `ClusterPermission` binding the service account to `cluster-admin`
//! 4. Provider secret mirroring the issued token
//! 5. Forklift `Provider` registration
//!
//! Removing the label or deleting the cluster runs the cleanup sequence and drops the
//! finalizer. Any API error aborts the pass; the error policy decides when to retry.

use crate::constants::{GATE_ERROR_REQUEUE_SECS, TOKEN_ISSUANCE_REQUEUE_SECS};
use crate::context::{managed_cluster_mtv_name, Context};
use crate::crd::ManagedCluster;
use crate::errors::ReconcileError;
use crate::labels::LABEL_VALUE_TRUE;
use crate::reconcilers::addon::discover_addon_namespace;
use crate::reconcilers::credential::{ensure_credential, CredentialState};
use crate::reconcilers::finalizers::{
    ensure_cluster_finalizer, handle_cluster_deletion, has_finalizer,
};
use crate::reconcilers::gate::check_provider_crd;
use crate::reconcilers::payloads::{
    cluster_permission_payload, provider_payload, CLUSTER_PERMISSION, PROVIDER,
};
use crate::reconcilers::resources::{ensure_namespace, ensure_resource};
use crate::reconcilers::secret_sync::sync_provider_secret;
use anyhow::{anyhow, Context as _, Result};
use k8s_openapi::api::core::v1::Secret;
use kube::runtime::controller::Action;
use kube::{Api, ResourceExt};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where a managed cluster stands, derived from its labels, finalizers and deletion marker.
///
/// `Active` is not derivable from the object itself; a `Provisioning` pass that finds
/// every downstream resource converged reports [`Progress::Converged`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// No gate label, no finalizer
    Unmanaged,
    /// Gate label set, finalizer not yet added
    Initializing,
    /// Finalizer present and gate label set
    Provisioning,
    /// Deletion requested or gate label removed while the finalizer is present
    Terminating,
    /// Deletion requested and the finalizer is already gone
    Terminated,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Nothing left to do until the object changes
    Idle,
    /// Check again after the given delay
    Requeue(Duration),
    /// Waiting for the addon to issue the token; the owned-object watch wakes us
    AwaitingToken,
    /// All downstream resources exist and the provider secret is in sync
    Converged,
    /// The prerequisite CRD is not established; the cluster was not evaluated.
    /// The CRD watch triggers another pass once it changes.
    GateClosed,
}

/// Derive the lifecycle phase of a managed cluster.
#[must_use]
pub fn lifecycle_phase(cluster: &ManagedCluster, gate_label: &str, finalizer: &str) -> LifecyclePhase {
    let opted_in = cluster
        .labels()
        .get(gate_label)
        .is_some_and(|value| value == LABEL_VALUE_TRUE);
    let finalized = has_finalizer(cluster, finalizer);
    let deleting = cluster.metadata.deletion_timestamp.is_some();

    match (deleting, finalized, opted_in) {
        (true, true, _) | (false, true, false) => LifecyclePhase::Terminating,
        (true, false, _) => LifecyclePhase::Terminated,
        (false, true, true) => LifecyclePhase::Provisioning,
        (false, false, true) => LifecyclePhase::Initializing,
        (false, false, false) => LifecyclePhase::Unmanaged,
    }
}

/// Reconcile the managed cluster `name`.
///
/// The prerequisite CRD is checked before the cluster is read. A cluster that no longer
/// exists is treated as already handled.
///
/// # Errors
///
/// Returns [`ReconcileError::Gate`] if the CRD cannot be read and
/// [`ReconcileError::Stage`] for any failure while driving the lifecycle.
pub async fn reconcile_managed_cluster(ctx: &Context, name: &str) -> Result<Progress, ReconcileError> {
    let established = check_provider_crd(&ctx.client, &ctx.settings.provider_crd_name)
        .await
        .map_err(ReconcileError::Gate)?;
    if !established {
        debug!(
            cluster = %name,
            crd = %ctx.settings.provider_crd_name,
            "Prerequisite CRD not established, skipping"
        );
        return Ok(Progress::GateClosed);
    }

    let api: Api<ManagedCluster> = Api::all(ctx.client.clone());
    let Some(cluster) = api
        .get_opt(name)
        .await
        .with_context(|| format!("failed to read ManagedCluster {name}"))?
    else {
        debug!(cluster = %name, "ManagedCluster no longer exists");
        return Ok(Progress::Idle);
    };

    let phase = lifecycle_phase(&cluster, &ctx.settings.gate_label, &ctx.settings.finalizer);
    debug!(cluster = %name, phase = ?phase, "Evaluated lifecycle phase");

    let progress = match phase {
        LifecyclePhase::Unmanaged | LifecyclePhase::Terminated => Progress::Idle,
        LifecyclePhase::Initializing => initialize(ctx, &cluster).await?,
        LifecyclePhase::Provisioning => provision(ctx, &cluster).await?,
        LifecyclePhase::Terminating => {
            handle_cluster_deletion(ctx, &cluster, &ctx.settings.finalizer).await?;
            info!(cluster = %name, "MTV integration removed");
            Progress::Idle
        }
    };
    Ok(progress)
}

async fn initialize(ctx: &Context, cluster: &ManagedCluster) -> Result<Progress> {
    ensure_namespace(&ctx.client, &ctx.settings.integration_namespace).await?;
    ensure_cluster_finalizer(&ctx.client, cluster, &ctx.settings.finalizer).await?;
    info!(cluster = %cluster.name_any(), "MTV integration enabled");
    Ok(Progress::Idle)
}

async fn provision(ctx: &Context, cluster: &ManagedCluster) -> Result<Progress> {
    let cluster_name = cluster.name_any();
    let name = managed_cluster_mtv_name(&cluster_name);

    let msa = match ensure_credential(&ctx.client, cluster).await? {
        CredentialState::Created => {
            return Ok(Progress::Requeue(Duration::from_secs(
                TOKEN_ISSUANCE_REQUEUE_SECS,
            )))
        }
        CredentialState::Pending => return Ok(Progress::AwaitingToken),
        CredentialState::Ready(msa) => msa,
    };

    let addon_namespace = discover_addon_namespace(&ctx.client, &ctx.settings).await?;
    ensure_resource(
        &ctx.client,
        &CLUSTER_PERMISSION,
        &cluster_name,
        &name,
        cluster_permission_payload(cluster, &ctx.settings, &addon_namespace)?,
    )
    .await?;

    let token_secret = msa
        .token_secret_name()
        .ok_or_else(|| anyhow!("ManagedServiceAccount {cluster_name}/{name} lost its token"))?;
    let secrets: Api<Secret> = Api::namespaced(ctx.client.clone(), &cluster_name);
    let source = secrets
        .get_opt(token_secret)
        .await
        .with_context(|| format!("failed to read token secret {cluster_name}/{token_secret}"))?
        .ok_or_else(|| anyhow!("token secret {cluster_name}/{token_secret} not found"))?;
    sync_provider_secret(&ctx.client, &ctx.settings, &source, cluster).await?;

    ensure_resource(
        &ctx.client,
        &PROVIDER,
        &ctx.settings.integration_namespace,
        &name,
        provider_payload(cluster, &ctx.settings)?,
    )
    .await?;

    debug!(cluster = %cluster_name, "MTV integration converged");
    Ok(Progress::Converged)
}

/// Controller action for a successful pass.
#[must_use]
pub fn progress_action(progress: Progress) -> Action {
    match progress {
        Progress::Requeue(delay) => Action::requeue(delay),
        Progress::GateClosed
        | Progress::Idle
        | Progress::AwaitingToken
        | Progress::Converged => Action::await_change(),
    }
}

/// Controller action for a failed pass.
///
/// Prerequisite failures retry on a fixed delay; stage failures back off per cluster.
#[must_use]
pub fn error_action(ctx: &Context, name: &str, err: &ReconcileError) -> Action {
    match err {
        ReconcileError::Gate(_) => Action::requeue(Duration::from_secs(GATE_ERROR_REQUEUE_SECS)),
        ReconcileError::Stage(_) => {
            let delay = ctx.backoff.next_backoff(name);
            warn!(cluster = %name, retry_after = ?delay, "Backing off after failed reconciliation");
            Action::requeue(delay)
        }
    }
}

#[cfg(test)]
#[path = "managedcluster_tests.rs"]
mod managedcluster_tests;
