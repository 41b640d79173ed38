// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prerequisite check for the Forklift `Provider` CRD.
//!
//! Nothing is reconciled until the CRD exists and reports `Established=True`.
//! The CRD is watched by name so that installing, upgrading or removing it
//! re-evaluates every managed cluster.

use anyhow::{Context as _, Result};
use futures::channel::mpsc;
use futures::{Future, Stream, StreamExt};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::runtime::watcher::{self, Event};
use kube::runtime::WatchStreamExt;
use kube::{Api, Client};
use tracing::{debug, info, warn};

/// CRD condition type reporting that the API is served
const CONDITION_ESTABLISHED: &str = "Established";

/// Check whether the named CRD is installed and established.
///
/// # Returns
///
/// `Ok(false)` when the CRD is absent or not yet established, `Ok(true)` when its
/// `Established` condition is `True`.
///
/// # Errors
///
/// Returns an error for any read failure other than not-found.
pub async fn check_provider_crd(client: &Client, crd_name: &str) -> Result<bool> {
    let api: Api<CustomResourceDefinition> = Api::all(client.clone());

    let Some(crd) = api
        .get_opt(crd_name)
        .await
        .with_context(|| format!("failed to read CustomResourceDefinition {crd_name}"))?
    else {
        debug!(crd = %crd_name, "Prerequisite CRD not installed");
        return Ok(false);
    };

    Ok(is_established(&crd))
}

/// Whether the CRD carries `Established=True`.
#[must_use]
pub fn is_established(crd: &CustomResourceDefinition) -> bool {
    crd.status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .is_some_and(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == CONDITION_ESTABLISHED && c.status == "True")
        })
}

/// Whether a watch event on the prerequisite CRD should re-evaluate the gate.
///
/// Initial listing items are skipped; the end of a (re)list counts, so changes
/// missed while the watch was down are still picked up.
#[must_use]
pub fn is_gate_change(event: &Event<CustomResourceDefinition>) -> bool {
    matches!(event, Event::Apply(_) | Event::Delete(_) | Event::InitDone)
}

/// Forward gate changes from a CRD event stream into `tx`.
///
/// A full channel already holds a pending trigger, so extra changes are dropped.
/// Returns when the stream ends or the receiver is gone.
pub async fn relay_gate_changes<S>(events: S, mut tx: mpsc::Sender<()>)
where
    S: Stream<Item = Result<Event<CustomResourceDefinition>, watcher::Error>>,
{
    futures::pin_mut!(events);
    while let Some(event) = events.next().await {
        match event {
            Ok(event) if is_gate_change(&event) => {
                if let Event::Apply(crd) | Event::Delete(crd) = &event {
                    info!(
                        crd = ?crd.metadata.name,
                        established = is_established(crd),
                        "Prerequisite CRD changed, re-evaluating managed clusters"
                    );
                }
                if let Err(e) = tx.try_send(()) {
                    if e.is_disconnected() {
                        return;
                    }
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Prerequisite CRD watch failed"),
        }
    }
}

/// Watch the named CRD and yield a trigger for every change to it.
///
/// The returned stream feeds `Controller::reconcile_all_on`; the future drives
/// the watch and must be spawned alongside the controller.
pub fn provider_crd_changes(
    client: Client,
    crd_name: &str,
) -> (mpsc::Receiver<()>, impl Future<Output = ()> + Send + 'static) {
    let (tx, rx) = mpsc::channel(1);
    let api: Api<CustomResourceDefinition> = Api::all(client);
    let config = watcher::Config::default().fields(&format!("metadata.name={crd_name}"));
    let events = watcher::watcher(api, config).default_backoff();
    (rx, relay_gate_changes(events, tx))
}

#[cfg(test)]
#[path = "gate_tests.rs"]
mod gate_tests;
