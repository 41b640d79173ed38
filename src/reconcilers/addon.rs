// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Discovery of the namespace hosting the managed-serviceaccount addon agent.
//!
//! Service accounts requested through `ManagedServiceAccount` are created in that
//! namespace on the managed cluster, so the `ClusterPermission` subject must name it.

use crate::context::IntegrationSettings;
use anyhow::{Context as _, Result};
use k8s_openapi::api::apps::v1::Deployment;
use kube::api::ListParams;
use kube::{Api, Client};
use tracing::debug;

/// Namespace of the addon agent deployment, or the configured default when none exists.
///
/// # Errors
///
/// Returns an error if deployments cannot be listed.
pub async fn discover_addon_namespace(
    client: &Client,
    settings: &IntegrationSettings,
) -> Result<String> {
    let api: Api<Deployment> = Api::all(client.clone());
    let params = ListParams::default().fields(&format!(
        "metadata.name={}",
        settings.addon_agent_deployment
    ));

    let deployments = api.list(&params).await.with_context(|| {
        format!(
            "failed to list deployments named {}",
            settings.addon_agent_deployment
        )
    })?;

    let namespace = deployments
        .items
        .iter()
        .find_map(|deployment| deployment.metadata.namespace.clone())
        .unwrap_or_else(|| settings.default_addon_namespace.clone());

    debug!(namespace = %namespace, "Resolved addon agent namespace");
    Ok(namespace)
}

#[cfg(test)]
#[path = "addon_tests.rs"]
mod addon_tests;
