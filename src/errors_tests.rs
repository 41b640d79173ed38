// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `errors.rs`

#[cfg(test)]
mod tests {
    use crate::errors::{AdmissionError, ReconcileError};

    #[test]
    fn test_denial_messages_are_user_facing() {
        assert_eq!(
            AdmissionError::EmptyObject.denial_message(),
            "Request object is empty"
        );

        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(
            AdmissionError::MalformedPlan(parse_err).denial_message(),
            "Failed to parse request object into Plan"
        );
        assert_eq!(
            AdmissionError::ClientSetup("bad header".into()).denial_message(),
            "Failed to setup dynamic client"
        );
        assert_eq!(
            AdmissionError::VisibilityQuery("forbidden".into()).denial_message(),
            "Authorization check for cluster access failed"
        );
    }

    #[test]
    fn test_admission_error_display_keeps_cause() {
        let err = AdmissionError::VisibilityQuery("connection refused".into());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_reconcile_error_category() {
        let gate = ReconcileError::Gate(anyhow::anyhow!("timeout"));
        assert_eq!(gate.category(), "prerequisite_error");
        assert!(gate.to_string().contains("prerequisite check failed"));

        let stage: ReconcileError = anyhow::anyhow!("create failed").into();
        assert_eq!(stage.category(), "api_error");
        assert_eq!(stage.to_string(), "create failed");
    }
}
