// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::{Context as _, Result};
use clap::Parser;
use futures::StreamExt;
use kube::{
    runtime::{
        controller::{self, Action},
        watcher, Controller,
    },
    Api, Client, ResourceExt,
};
use kube_lease_manager::LeaseManagerBuilder;
use mtv_integrations::{
    constants::{
        DEFAULT_ADDON_AGENT_DEPLOYMENT, DEFAULT_ADDON_NAMESPACE,
        DEFAULT_ADMISSION_QUERY_TIMEOUT_SECS, DEFAULT_INTEGRATION_NAMESPACE,
        DEFAULT_LEASE_DURATION_SECS, DEFAULT_LEASE_GRACE_SECS, DEFAULT_METRICS_BIND_ADDRESS,
        DEFAULT_PROVIDER_CRD_NAME, DEFAULT_RECONCILE_CONCURRENCY, DEFAULT_WEBHOOK_BIND_ADDRESS,
        KIND_MANAGED_CLUSTER, LEADER_LEASE_NAME, PROVIDER_CLUSTER_ROLE, PROVIDER_TYPE_OPENSHIFT,
        TOKIO_WORKER_THREADS,
    },
    context::{Context, IntegrationSettings},
    crd::{ManagedCluster, ManagedServiceAccount},
    errors::ReconcileError,
    labels::{FINALIZER_MANAGED_CLUSTER, LABEL_CNV_OPERATOR_INSTALL},
    metrics,
    reconcilers::{
        credential::owning_clusters, error_action, gate::provider_crd_changes, progress_action,
        reconcile_managed_cluster, Progress,
    },
    webhook::{
        plan::ImpersonatedViewQuery, serve_metrics, serve_webhook, PlanAdmission, TlsFiles,
        WebhookState,
    },
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Registers Open Cluster Management managed clusters as Forklift migration providers
/// and guards `Plan` objects that target them.
#[derive(Parser, Debug)]
#[command(name = "mtv-integrations", version, about)]
struct Args {
    /// Namespace hosting provider secrets and Provider registrations
    #[arg(long, env = "MTV_INTEGRATION_NAMESPACE", default_value = DEFAULT_INTEGRATION_NAMESPACE)]
    integration_namespace: String,

    /// ManagedCluster label that opts a cluster in
    #[arg(long, env = "MTV_GATE_LABEL", default_value = LABEL_CNV_OPERATOR_INSTALL)]
    gate_label: String,

    /// Finalizer placed on opted-in managed clusters
    #[arg(long, env = "MTV_FINALIZER", default_value = FINALIZER_MANAGED_CLUSTER)]
    finalizer: String,

    /// CRD that must be established before any cluster is reconciled
    #[arg(long, env = "MTV_PROVIDER_CRD", default_value = DEFAULT_PROVIDER_CRD_NAME)]
    provider_crd: String,

    /// Deployment of the managed-serviceaccount addon agent
    #[arg(long, env = "MTV_ADDON_DEPLOYMENT", default_value = DEFAULT_ADDON_AGENT_DEPLOYMENT)]
    addon_deployment: String,

    /// Addon namespace used when the agent deployment cannot be found
    #[arg(long, env = "MTV_ADDON_NAMESPACE", default_value = DEFAULT_ADDON_NAMESPACE)]
    addon_namespace: String,

    /// Number of managed clusters reconciled concurrently
    #[arg(long, env = "MTV_CONCURRENCY", default_value_t = DEFAULT_RECONCILE_CONCURRENCY)]
    concurrency: u16,

    /// Bind address of the admission webhook server
    #[arg(long, env = "MTV_WEBHOOK_BIND_ADDRESS", default_value = DEFAULT_WEBHOOK_BIND_ADDRESS)]
    webhook_bind_address: SocketAddr,

    /// PEM certificate for the webhook server
    #[arg(long, env = "MTV_TLS_CERT_FILE", requires = "tls_key_file")]
    tls_cert_file: Option<PathBuf>,

    /// PEM private key for the webhook server
    #[arg(long, env = "MTV_TLS_KEY_FILE", requires = "tls_cert_file")]
    tls_key_file: Option<PathBuf>,

    /// Bind address of the Prometheus metrics server
    #[arg(long, env = "MTV_METRICS_BIND_ADDRESS", default_value = DEFAULT_METRICS_BIND_ADDRESS)]
    metrics_bind_address: SocketAddr,

    /// Timeout in seconds for the impersonated cluster view query
    #[arg(long, env = "MTV_ADMISSION_TIMEOUT_SECS", default_value_t = DEFAULT_ADMISSION_QUERY_TIMEOUT_SECS)]
    admission_timeout_secs: u64,

    /// Only reconcile while holding the leader lease
    #[arg(long, env = "MTV_LEADER_ELECT", default_value_t = false)]
    leader_elect: bool,

    /// Namespace of the leader lease (defaults to the integration namespace)
    #[arg(long, env = "MTV_LEASE_NAMESPACE")]
    lease_namespace: Option<String>,

    /// Leader lease duration in seconds
    #[arg(long, env = "MTV_LEASE_DURATION_SECS", default_value_t = DEFAULT_LEASE_DURATION_SECS)]
    lease_duration_secs: u64,

    /// Leader lease grace period in seconds
    #[arg(long, env = "MTV_LEASE_GRACE_SECS", default_value_t = DEFAULT_LEASE_GRACE_SECS)]
    lease_grace_secs: u64,
}

impl Args {
    fn settings(&self) -> IntegrationSettings {
        IntegrationSettings {
            integration_namespace: self.integration_namespace.clone(),
            gate_label: self.gate_label.clone(),
            finalizer: self.finalizer.clone(),
            provider_crd_name: self.provider_crd.clone(),
            addon_agent_deployment: self.addon_deployment.clone(),
            default_addon_namespace: self.addon_namespace.clone(),
            cluster_role: PROVIDER_CLUSTER_ROLE.to_string(),
            provider_type: PROVIDER_TYPE_OPENSHIFT.to_string(),
        }
    }

    fn tls_files(&self) -> Option<TlsFiles> {
        match (&self.tls_cert_file, &self.tls_key_file) {
            (Some(cert), Some(key)) => Some(TlsFiles {
                cert: cert.clone(),
                key: key.clone(),
            }),
            _ => None,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("mtv-integrations")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<()> {
    // Respects RUST_LOG (default INFO) and RUST_LOG_FORMAT=json
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    info!("Starting MTV integrations operator");
    debug!(args = ?args, "Parsed command line");

    install_crypto_provider();

    debug!("Initializing Kubernetes client");
    let kube_config = kube::Config::infer()
        .await
        .context("failed to infer Kubernetes configuration")?;
    let client = Client::try_from(kube_config.clone())?;
    debug!("Kubernetes client initialized successfully");

    let ctx = Arc::new(Context::new(client.clone(), args.settings()));

    let query = ImpersonatedViewQuery::new(
        kube_config,
        Duration::from_secs(args.admission_timeout_secs),
    );
    let webhook_state = Arc::new(WebhookState::new(PlanAdmission::new(Arc::new(query))));

    info!(
        integration_namespace = %ctx.settings.integration_namespace,
        gate_label = %ctx.settings.gate_label,
        leader_elect = args.leader_elect,
        "Starting controller and servers"
    );

    // Controller exit on signal is a clean shutdown; servers must never exit
    tokio::select! {
        result = run_controller(client, ctx, &args) => {
            result?;
            info!("Controller stopped, shutting down");
            Ok(())
        }
        result = serve_webhook(args.webhook_bind_address, args.tls_files(), webhook_state) => {
            error!("CRITICAL: admission webhook server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Admission webhook server exited unexpectedly without error")
        }
        result = serve_metrics(args.metrics_bind_address) => {
            error!("CRITICAL: metrics server exited unexpectedly: {:?}", result);
            result?;
            anyhow::bail!("Metrics server exited unexpectedly without error")
        }
    }
}

/// Run the controller, holding the leader lease first if leader election is enabled.
async fn run_controller(client: Client, ctx: Arc<Context>, args: &Args) -> Result<()> {
    if !args.leader_elect {
        return run_managed_cluster_controller(client, ctx, args.concurrency).await;
    }

    let identity = std::env::var("POD_NAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .unwrap_or_else(|_| format!("mtv-integrations-{}", std::process::id()));
    let namespace = args
        .lease_namespace
        .clone()
        .unwrap_or_else(|| ctx.settings.integration_namespace.clone());

    let manager = LeaseManagerBuilder::new(client.clone(), LEADER_LEASE_NAME)
        .with_namespace(&namespace)
        .with_identity(&identity)
        .with_duration(args.lease_duration_secs)
        .with_grace(args.lease_grace_secs)
        .build()
        .await
        .context("failed to create leader lease manager")?;
    let (mut leader, lease_task) = manager.watch().await;

    info!(identity = %identity, lease = LEADER_LEASE_NAME, namespace = %namespace, "Waiting for leadership");

    let result = loop {
        if !wait_for_leadership(&mut leader).await {
            break Err(anyhow::anyhow!("leader lease manager stopped"));
        }
        info!(identity = %identity, "Acquired leadership, starting controller");
        metrics::record_leader_elected(&identity);

        tokio::select! {
            result = run_managed_cluster_controller(client.clone(), ctx.clone(), args.concurrency) => {
                metrics::record_leader_lost(&identity);
                break result;
            }
            () = leadership_lost(&mut leader) => {
                warn!(identity = %identity, "Lost leadership, stopping controller");
                metrics::record_leader_lost(&identity);
            }
        }
    };

    // Dropping the receiver makes the lease task release the lease and exit
    drop(leader);
    match lease_task.await {
        Ok(Ok(_manager)) => debug!(identity = %identity, "Leader lease released"),
        Ok(Err(e)) => warn!(error = %e, "Leader lease manager failed"),
        Err(e) => warn!(error = %e, "Leader lease task panicked"),
    }
    result
}

/// Wait until this replica holds the lease. Returns `false` if the lease manager stopped.
async fn wait_for_leadership(leader: &mut watch::Receiver<bool>) -> bool {
    while !*leader.borrow_and_update() {
        if leader.changed().await.is_err() {
            return false;
        }
    }
    true
}

async fn leadership_lost(leader: &mut watch::Receiver<bool>) {
    while *leader.borrow_and_update() {
        if leader.changed().await.is_err() {
            return;
        }
    }
}

/// Run the `ManagedCluster` controller until a shutdown signal arrives
/// Install the ring provider as the process-wide rustls default.
///
/// Returns `false` when a provider was already installed.
fn install_crypto_provider() -> bool {
    let installed = rustls::crypto::ring::default_provider()
        .install_default()
        .is_ok();
    if !installed {
        debug!("rustls crypto provider already installed, keeping it");
    }
    installed
}

async fn run_managed_cluster_controller(
    client: Client,
    ctx: Arc<Context>,
    concurrency: u16,
) -> Result<()> {
    info!(concurrency, "Starting ManagedCluster controller");

    let clusters = Api::<ManagedCluster>::all(client.clone());
    let credentials = Api::<ManagedServiceAccount>::all(client.clone());
    let (gate_changes, gate_watch) =
        provider_crd_changes(client, &ctx.settings.provider_crd_name);
    let gate_watch = tokio::spawn(gate_watch);

    Controller::new(clusters, watcher::Config::default())
        .watches(credentials, watcher::Config::default(), |msa| {
            owning_clusters(&msa)
        })
        .reconcile_all_on(gate_changes)
        .with_config(controller::Config::default().concurrency(concurrency))
        .shutdown_on_signal()
        .run(reconcile_managed_cluster_wrapper, error_policy, ctx)
        .for_each(|result| {
            if let Err(e) = result {
                debug!(error = %e, "Controller event not reconciled");
            }
            futures::future::ready(())
        })
        .await;

    gate_watch.abort();
    Ok(())
}

/// Reconcile wrapper for `ManagedCluster`
async fn reconcile_managed_cluster_wrapper(
    cluster: Arc<ManagedCluster>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcileError> {
    let start = Instant::now();
    let name = cluster.name_any();

    match reconcile_managed_cluster(&ctx, &name).await {
        Ok(progress) => {
            ctx.backoff.reset(&name);
            match progress {
                Progress::GateClosed => metrics::record_reconciliation_skipped(KIND_MANAGED_CLUSTER),
                Progress::Requeue(_) => {
                    metrics::record_reconciliation_success(KIND_MANAGED_CLUSTER, start.elapsed());
                    metrics::record_reconciliation_requeue(KIND_MANAGED_CLUSTER, "token_issuance");
                }
                Progress::Idle | Progress::AwaitingToken | Progress::Converged => {
                    metrics::record_reconciliation_success(KIND_MANAGED_CLUSTER, start.elapsed());
                }
            }
            debug!(cluster = %name, progress = ?progress, "Reconciled ManagedCluster");
            Ok(progress_action(progress))
        }
        Err(e) => {
            error!(cluster = %name, error = %e, "Failed to reconcile ManagedCluster");
            metrics::record_reconciliation_error(KIND_MANAGED_CLUSTER, start.elapsed());
            Err(e)
        }
    }
}

/// Error policy for the `ManagedCluster` controller
fn error_policy(cluster: Arc<ManagedCluster>, err: &ReconcileError, ctx: Arc<Context>) -> Action {
    metrics::record_error(KIND_MANAGED_CLUSTER, err.category());
    error_action(&ctx, &cluster.name_any(), err)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod main_tests;
