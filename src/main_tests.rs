// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `main.rs` - command line parsing and leadership signalling

#[cfg(test)]
mod tests {
    use super::super::{install_crypto_provider, leadership_lost, wait_for_leadership, Args};
    use clap::Parser;
    use mtv_integrations::context::IntegrationSettings;
    use std::time::Duration as StdDuration;
    use tokio::sync::watch;
    use tokio::time::timeout;

    #[test]
    fn test_defaults_match_settings_defaults() {
        let args = Args::try_parse_from(["mtv-integrations"]).unwrap();

        assert_eq!(args.settings(), IntegrationSettings::default());
        assert_eq!(args.concurrency, 4);
        assert_eq!(args.webhook_bind_address.port(), 9443);
        assert_eq!(args.metrics_bind_address.port(), 8080);
        assert!(!args.leader_elect);
        assert!(args.tls_files().is_none());
    }

    #[test]
    fn test_overrides_flow_into_settings() {
        let args = Args::try_parse_from([
            "mtv-integrations",
            "--integration-namespace",
            "migrations",
            "--gate-label",
            "example.com/migrate",
            "--addon-namespace",
            "addons",
            "--concurrency",
            "8",
        ])
        .unwrap();

        let settings = args.settings();
        assert_eq!(settings.integration_namespace, "migrations");
        assert_eq!(settings.gate_label, "example.com/migrate");
        assert_eq!(settings.default_addon_namespace, "addons");
        assert_eq!(args.concurrency, 8);
    }

    #[test]
    fn test_tls_files_require_each_other() {
        assert!(Args::try_parse_from(["mtv-integrations", "--tls-cert-file", "/tls/tls.crt"]).is_err());

        let args = Args::try_parse_from([
            "mtv-integrations",
            "--tls-cert-file",
            "/tls/tls.crt",
            "--tls-key-file",
            "/tls/tls.key",
        ])
        .unwrap();
        let files = args.tls_files().unwrap();
        assert_eq!(files.cert.to_str(), Some("/tls/tls.crt"));
        assert_eq!(files.key.to_str(), Some("/tls/tls.key"));
    }

    #[test]
    fn test_invalid_bind_address_is_rejected() {
        assert!(Args::try_parse_from(["mtv-integrations", "--metrics-bind-address", "nope"]).is_err());
    }

    #[tokio::test]
    async fn test_wait_for_leadership() {
        let (tx, mut rx) = watch::channel(false);

        let waiter = tokio::spawn(async move { wait_for_leadership(&mut rx).await });
        tokio::time::sleep(StdDuration::from_millis(10)).await;
        tx.send(true).unwrap();

        assert!(timeout(StdDuration::from_secs(1), waiter).await.unwrap().unwrap());
    }

    #[tokio::test]
    async fn test_wait_for_leadership_stops_with_manager() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);

        assert!(!wait_for_leadership(&mut rx).await);
    }

    #[tokio::test]
    async fn test_leadership_lost() {
        let (tx, mut rx) = watch::channel(true);

        let watcher = tokio::spawn(async move { leadership_lost(&mut rx).await });
        tokio::time::sleep(StdDuration::from_millis(10)).await;
        assert!(!watcher.is_finished());

        tx.send(false).unwrap();
        timeout(StdDuration::from_secs(1), watcher).await.unwrap().unwrap();
    }

    #[test]
    fn test_crypto_provider_installs_once() {
        install_crypto_provider();

        assert!(!install_crypto_provider());
        assert!(rustls::crypto::CryptoProvider::get_default().is_some());
    }
}
