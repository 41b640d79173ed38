// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # MTV Integrations - Migration Provider Operator for Open Cluster Management
//!
//! This operator runs on an Open Cluster Management hub and turns every opted-in
//! `ManagedCluster` into a Forklift (Migration Toolkit for Virtualization) migration
//! destination.
//!
//! ## Overview
//!
//! For each cluster labelled `acm/cnv-operator-install: "true"` the operator:
//!
//! - Provisions a rotating `ManagedServiceAccount` credential
//! - Binds it to `cluster-admin` on the managed cluster with a `ClusterPermission`
//! - Mirrors the issued token into a Forklift provider `Secret`
//! - Registers a Forklift `Provider` pointing at the cluster's API server
//!
//! Removing the label or deleting the cluster undoes all of it. A validating admission
//! webhook makes sure a `Plan` targeting one of these providers only lands in namespaces
//! the requesting user can already see on that cluster.
//!
//! ## Modules
//!
//! - [`crd`] - Types for the external resources the operator reads and writes
//! - [`reconcilers`] - Lifecycle state machine and its stages
//! - [`context`] - Shared controller context and settings
//! - [`webhook`] - `Plan` admission review, probes and the metrics endpoint
//! - [`metrics`] - Prometheus metrics
//! - [`errors`] - Controller and admission error types
//!
//! ## Example
//!
//! ```rust,no_run
//! use mtv_integrations::context::{Context, IntegrationSettings};
//! use mtv_integrations::reconcilers::{progress_action, reconcile_managed_cluster};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let client = kube::Client::try_default().await?;
//! let ctx = Context::new(client, IntegrationSettings::default());
//!
//! let progress = reconcile_managed_cluster(&ctx, "prod-east").await?;
//! let _action = progress_action(progress);
//! # Ok(())
//! # }
//! ```

pub mod constants;
pub mod context;
pub mod crd;
pub mod errors;
pub mod labels;
pub mod metrics;
pub mod reconcilers;
pub mod webhook;

#[cfg(test)]
mod test_support;
