use std::sync::Arc;

use alert_schema::{ClassifiedAlert, Severity, StrippedAlert};
use serde_json::Value;
use tracing::{info, warn};

use crate::classify;
use crate::config::TriageConfig;
use crate::error::Result;
use crate::incident::{AnalysisResponse, Incident};
use crate::llm::{NullGenerator, RigGenerator, TextGenerator};
use crate::observability;
use crate::runbook::{self, Runbook};
use crate::severity::Priority;
use crate::transport::{AlertQuery, AlertsSource, HttpGateway, ObservabilitySource};

/// Drives one analysis run: normalize -> classify -> per-incident
/// enrichment -> merge. All collaborators are injected so tests can
/// substitute deterministic fakes per call kind.
pub struct Analyzer {
    config: TriageConfig,
    alerts: Arc<dyn AlertsSource>,
    observability: Arc<dyn ObservabilitySource>,
    generator: Arc<dyn TextGenerator>,
}

impl Analyzer {
    pub fn new(
        config: TriageConfig,
        alerts: Arc<dyn AlertsSource>,
        observability: Arc<dyn ObservabilitySource>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            config,
            alerts,
            observability,
            generator,
        }
    }

    /// Production wiring: one HTTP gateway for both upstreams, and the
    /// configured generator (or the credential-less one, which fails
    /// classification with a typed error and silently skips narratives).
    pub fn from_config(config: TriageConfig) -> Result<Self> {
        let gateway = Arc::new(HttpGateway::new(&config)?);
        let generator: Arc<dyn TextGenerator> = match config.llm.clone() {
            Some(llm) => Arc::new(RigGenerator::new(llm)),
            None => Arc::new(NullGenerator),
        };
        Ok(Self::new(config, gateway.clone(), gateway, generator))
    }

    pub async fn analyze(&self, query: &AlertQuery) -> Result<AnalysisResponse> {
        let raw = self.alerts.fetch_alerts(query).await?;
        let raw_emails = crate::alerts::normalize_alerts(raw)?;
        if raw_emails.is_empty() {
            warn!("alerts source returned an empty batch");
        }

        let stripped: Vec<StrippedAlert> = raw_emails
            .iter()
            .enumerate()
            .map(|(index, email)| StrippedAlert::from_raw(email, index))
            .collect();

        let classified = classify::classify_alerts(self.generator.as_ref(), &stripped).await?;

        // Enrichment is per incident, not per unique application: repeats of
        // an app name trigger repeat lookups. Kept as-is pending product
        // confirmation that dedup is wanted.
        let incidents = futures::future::join_all(
            classified
                .iter()
                .enumerate()
                .map(|(position, alert)| self.build_incident(position, alert, &raw_emails)),
        )
        .await;

        if incidents.is_empty() {
            return Ok(AnalysisResponse {
                incidents: Vec::new(),
                top_incident_service: "None".into(),
                runbook: Runbook::empty(),
            });
        }

        // The run's "top incident" is the first classified element, not the
        // highest-severity one.
        let top = &incidents[0];
        info!(
            incidents = incidents.len(),
            top = %top.service,
            "analysis run complete"
        );

        Ok(AnalysisResponse {
            top_incident_service: top.service.clone(),
            runbook: runbook::synthesize(raw_emails.len(), &top.summary, &classified),
            incidents,
        })
    }

    async fn build_incident(
        &self,
        position: usize,
        alert: &ClassifiedAlert,
        raw_emails: &[Value],
    ) -> Incident {
        let app_name = if alert.app_name.trim().is_empty() {
            "Unknown API".to_string()
        } else {
            alert.app_name.clone()
        };

        let enrichment = observability::enrich(
            &self.config,
            self.observability.as_ref(),
            self.generator.as_ref(),
            &app_name,
            &alert.title,
            Some(alert.summary.as_str()).filter(|s| !s.is_empty()),
        )
        .await;

        // Raw content comes from the original email, never from the
        // classifier's summary, to avoid a lossy round-trip through the
        // generation service.
        let raw_content = match pair_original(alert, raw_emails) {
            Pairing::ByIndex(email) | Pairing::BySubject(email) => email
                .get("content")
                .and_then(Value::as_str)
                .filter(|content| !content.is_empty())
                .map(ToString::to_string),
            Pairing::Unmatched => None,
        }
        .or_else(|| Some(alert.summary.clone()).filter(|s| !s.is_empty()));

        let importance = match alert.severity {
            Severity::Critical | Severity::High => "high",
            _ => "normal",
        };

        Incident {
            id: if alert.id.is_empty() {
                format!("ai-{}", alert.email_index.unwrap_or(position))
            } else {
                alert.id.clone()
            },
            service: alert.title.clone(),
            severity: Priority::from_severity(alert.severity),
            summary: alert.summary.clone(),
            timestamp: if alert.timestamp.is_empty() {
                crate::now_iso()
            } else {
                alert.timestamp.clone()
            },
            source: if alert.sender.is_empty() {
                "Alerts Mailbox".into()
            } else {
                alert.sender.clone()
            },
            status: "Investigating".into(),
            raw_content,
            app_name,
            environment: alert
                .environment
                .clone()
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| "Unspecified".into()),
            object: alert
                .object
                .clone()
                .filter(|o| !o.is_empty())
                .unwrap_or_else(|| "Unspecified".into()),
            importance: importance.into(),
            error_message: alert.summary.clone(),
            observability_data: enrichment.snapshot,
            ai_health_summary: enrichment.narrative,
        }
    }
}

/// How a classified alert was paired back to its source email. The subject
/// heuristic is a degraded path for legacy inputs without an index; its
/// activation is explicit here so callers and tests can observe it.
#[derive(Clone, Copy, Debug)]
pub enum Pairing<'a> {
    ByIndex(&'a Value),
    BySubject(&'a Value),
    Unmatched,
}

pub fn pair_original<'a>(alert: &ClassifiedAlert, raw_emails: &'a [Value]) -> Pairing<'a> {
    if let Some(index) = alert.email_index {
        return match raw_emails.get(index) {
            Some(email) => Pairing::ByIndex(email),
            None => Pairing::Unmatched,
        };
    }

    warn!(
        title = %alert.title,
        "pairing alert by subject heuristic; classifier omitted emailIndex"
    );

    let title = alert.title.to_lowercase();
    let matched = raw_emails.iter().find(|email| {
        let subject = email.get("subject").and_then(Value::as_str).unwrap_or("");
        if subject.is_empty() {
            return false;
        }
        if alert.original_subject.as_deref() == Some(subject) {
            return true;
        }
        let subject = subject.to_lowercase();
        subject.contains(&title) || title.contains(&subject)
    });

    match matched {
        Some(email) => Pairing::BySubject(email),
        None => Pairing::Unmatched,
    }
}
