use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::TriageConfig;
use crate::llm::TextGenerator;
use crate::narrative::{self, HealthNarrative};
use crate::transport::{LookupKind, ObservabilitySource, TransportError};

pub const SENTINEL_UNKNOWN: &str = "Unknown";
pub const SENTINEL_NA: &str = "N/A";

/// Per-application observability snapshot. Never partially constructed:
/// a field with no real data holds a sentinel, not an absence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservabilitySnapshot {
    pub status: String,
    pub last_check_time: String,
    pub version: String,
    pub deployed_at: String,
    pub deployed_by: String,
    pub change_summary: String,
    pub smoke: String,
}

impl ObservabilitySnapshot {
    /// All-sentinel snapshot with the given status label, stamped now.
    pub fn degraded(status: &str) -> Self {
        Self {
            status: status.to_string(),
            last_check_time: crate::now_iso(),
            version: SENTINEL_NA.into(),
            deployed_at: SENTINEL_NA.into(),
            deployed_by: SENTINEL_NA.into(),
            change_summary: SENTINEL_NA.into(),
            smoke: SENTINEL_NA.into(),
        }
    }

    /// True when the status field carries a sentinel; the narrative prompt
    /// then grounds itself in the alert instead of the snapshot.
    pub fn mostly_unavailable(&self) -> bool {
        self.status == SENTINEL_UNKNOWN || self.status == SENTINEL_NA
    }
}

#[derive(Clone, Debug)]
pub struct Enrichment {
    pub snapshot: ObservabilitySnapshot,
    pub narrative: Option<HealthNarrative>,
}

/// Enrich one owning application: three independent lookups plus a health
/// narrative. A lookup failure never aborts the other two; failures fold
/// into sentinel fields. Only the all-failed case skips the narrative.
pub async fn enrich(
    config: &TriageConfig,
    observability: &dyn ObservabilitySource,
    generator: &dyn TextGenerator,
    service: &str,
    alert_title: &str,
    alert_summary: Option<&str>,
) -> Enrichment {
    if !config.observability_enabled {
        debug!(service, "observability disabled; narrative grounded in the alert only");
        let snapshot = ObservabilitySnapshot::degraded("Disabled");
        let narrative =
            narrative::summarize(generator, &snapshot, alert_title, alert_summary).await;
        return Enrichment { snapshot, narrative };
    }

    let (status_res, deploy_res, smoke_res) = futures::join!(
        observability.lookup(LookupKind::Status, service),
        observability.lookup(LookupKind::Deployment, service),
        observability.lookup(LookupKind::Smoke, service),
    );

    let failures: Vec<&TransportError> = [
        status_res.as_ref().err(),
        deploy_res.as_ref().err(),
        smoke_res.as_ref().err(),
    ]
    .into_iter()
    .flatten()
    .collect();

    if failures.len() == 3 {
        let cors_blocked = failures.iter().any(|e| e.is_cors_like());
        warn!(
            service,
            cors_blocked, "all observability lookups failed; skipping narrative"
        );
        let status = if cors_blocked { "CORS Blocked" } else { "Unavailable" };
        return Enrichment {
            snapshot: ObservabilitySnapshot::degraded(status),
            narrative: None,
        };
    }

    for (kind, result) in [
        (LookupKind::Status, &status_res),
        (LookupKind::Deployment, &deploy_res),
        (LookupKind::Smoke, &smoke_res),
    ] {
        if let Err(err) = result {
            warn!(service, action = kind.as_str(), %err, "observability lookup failed");
        }
    }

    let snapshot = merge_snapshot(
        status_res.ok(),
        deploy_res.ok(),
        smoke_res.ok(),
    );
    let narrative = narrative::summarize(generator, &snapshot, alert_title, alert_summary).await;

    Enrichment { snapshot, narrative }
}

/// Merge by lookup kind, not arrival order. Missing lookups default to
/// sentinels.
fn merge_snapshot(
    status: Option<Value>,
    deployment: Option<Value>,
    smoke: Option<Value>,
) -> ObservabilitySnapshot {
    let field = |value: &Option<Value>, key: &str, sentinel: &str| -> String {
        value
            .as_ref()
            .and_then(|v| v.get(key))
            .and_then(Value::as_str)
            .unwrap_or(sentinel)
            .to_string()
    };

    let smoke_label = match &smoke {
        Some(value) => match value.get("success").and_then(Value::as_bool) {
            Some(true) => "Passed".to_string(),
            Some(false) => "Failed".to_string(),
            None => SENTINEL_NA.to_string(),
        },
        None => SENTINEL_NA.to_string(),
    };

    ObservabilitySnapshot {
        status: field(&status, "status", SENTINEL_UNKNOWN),
        last_check_time: status
            .as_ref()
            .and_then(|v| v.get("lastCheckTime"))
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .unwrap_or_else(crate::now_iso),
        version: field(&deployment, "version", SENTINEL_NA),
        deployed_at: field(&deployment, "deployedAt", SENTINEL_NA),
        deployed_by: field(&deployment, "deployedBy", SENTINEL_NA),
        change_summary: field(&deployment, "changeSummary", SENTINEL_NA),
        smoke: smoke_label,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::GenerationError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeObservability {
        status: Result<Value, ()>,
        deployment: Result<Value, ()>,
        smoke: Result<Value, ()>,
        cors: bool,
        calls: AtomicUsize,
    }

    impl FakeObservability {
        fn failing(cors: bool) -> Self {
            Self {
                status: Err(()),
                deployment: Err(()),
                smoke: Err(()),
                cors,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ObservabilitySource for FakeObservability {
        async fn lookup(
            &self,
            kind: LookupKind,
            _service: &str,
        ) -> Result<Value, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let slot = match kind {
                LookupKind::Status => &self.status,
                LookupKind::Deployment => &self.deployment,
                LookupKind::Smoke => &self.smoke,
            };
            match slot {
                Ok(value) => Ok(value.clone()),
                Err(()) if self.cors => {
                    Err(TransportError::Network("connection refused".into()))
                }
                Err(()) => Err(TransportError::Status {
                    status: 500,
                    body: String::new(),
                }),
            }
        }
    }

    struct CountingGenerator {
        calls: AtomicUsize,
    }

    impl CountingGenerator {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for CountingGenerator {
        async fn generate(
            &self,
            _preamble: &str,
            _prompt: &str,
        ) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({
                "statusSection": "• order-api: degraded",
                "deploymentSection": "• v2.1 deployed",
                "smokeSection": "• smoke failing",
                "conclusion": "investigate now",
                "recommendedSeverity": "P1"
            })
            .to_string())
        }
    }

    #[tokio::test]
    async fn all_cors_failures_yield_cors_blocked_and_no_narrative() {
        let config = TriageConfig::default();
        let observability = FakeObservability::failing(true);
        let generator = CountingGenerator::new();

        let enrichment = enrich(
            &config,
            &observability,
            &generator,
            "order-api",
            "Order API 500",
            None,
        )
        .await;

        assert_eq!(enrichment.snapshot.status, "CORS Blocked");
        assert_eq!(enrichment.snapshot.smoke, SENTINEL_NA);
        assert!(enrichment.narrative.is_none());
        assert_eq!(observability.calls.load(Ordering::SeqCst), 3);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn all_http_failures_yield_unavailable() {
        let config = TriageConfig::default();
        let observability = FakeObservability::failing(false);
        let generator = CountingGenerator::new();

        let enrichment = enrich(
            &config,
            &observability,
            &generator,
            "order-api",
            "Order API 500",
            None,
        )
        .await;

        assert_eq!(enrichment.snapshot.status, "Unavailable");
        assert!(enrichment.narrative.is_none());
    }

    #[tokio::test]
    async fn partial_success_merges_and_still_narrates() {
        let config = TriageConfig::default();
        let observability = FakeObservability {
            status: Ok(json!({"status": "Degraded", "lastCheckTime": "2026-02-11T08:00:00Z"})),
            deployment: Err(()),
            smoke: Ok(json!({"success": false, "error": "timeout on /health"})),
            cors: false,
            calls: AtomicUsize::new(0),
        };
        let generator = CountingGenerator::new();

        let enrichment = enrich(
            &config,
            &observability,
            &generator,
            "order-api",
            "Order API 500",
            Some("500s on POST /orders"),
        )
        .await;

        assert_eq!(enrichment.snapshot.status, "Degraded");
        assert_eq!(enrichment.snapshot.last_check_time, "2026-02-11T08:00:00Z");
        assert_eq!(enrichment.snapshot.version, SENTINEL_NA);
        assert_eq!(enrichment.snapshot.smoke, "Failed");
        assert!(enrichment.narrative.is_some());
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_smoke_lookup_is_a_sentinel_not_failed() {
        let config = TriageConfig::default();
        let observability = FakeObservability {
            status: Ok(json!({"status": "Healthy"})),
            deployment: Ok(json!({"version": "1.4.2"})),
            smoke: Err(()),
            cors: false,
            calls: AtomicUsize::new(0),
        };
        let generator = CountingGenerator::new();

        let enrichment = enrich(
            &config,
            &observability,
            &generator,
            "order-api",
            "t",
            None,
        )
        .await;

        assert_eq!(enrichment.snapshot.smoke, SENTINEL_NA);
        assert_eq!(enrichment.snapshot.version, "1.4.2");
    }

    #[tokio::test]
    async fn disabled_observability_skips_lookups_but_narrates() {
        let config = TriageConfig {
            observability_enabled: false,
            ..TriageConfig::default()
        };
        let observability = FakeObservability::failing(true);
        let generator = CountingGenerator::new();

        let enrichment = enrich(
            &config,
            &observability,
            &generator,
            "order-api",
            "Order API 500",
            None,
        )
        .await;

        assert_eq!(enrichment.snapshot.status, "Disabled");
        assert_eq!(observability.calls.load(Ordering::SeqCst), 0);
        assert!(enrichment.narrative.is_some());
    }
}
