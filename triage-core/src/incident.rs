use serde::{Deserialize, Serialize};

use crate::narrative::HealthNarrative;
use crate::observability::ObservabilitySnapshot;
use crate::runbook::{Hypothesis, Runbook, RunbookStep};
use crate::severity::Priority;

/// One triaged incident: a classified alert merged with its original email
/// content and its application's enrichment. Pure value, rebuilt wholesale
/// on every analysis run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: String,
    pub service: String,
    pub severity: Priority,
    pub summary: String,
    pub timestamp: String,
    pub source: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_content: Option<String>,
    pub app_name: String,
    pub environment: String,
    pub object: String,
    pub importance: String,
    pub error_message: String,
    pub observability_data: ObservabilitySnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_health_summary: Option<HealthNarrative>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub incidents: Vec<Incident>,
    pub top_incident_service: String,
    pub runbook: Runbook,
}

/// Canned response for sample-data mode, used by the serving layer when a
/// caller wants the UI populated without touching any upstream.
pub fn sample_response() -> AnalysisResponse {
    let now = crate::now_iso();

    let incidents = vec![
        Incident {
            id: "1".into(),
            service: "order-api".into(),
            severity: Priority::P1,
            summary: "High error rate in POST /orders".into(),
            timestamp: now.clone(),
            source: "Alerts Mailbox".into(),
            status: "Investigating".into(),
            raw_content: None,
            app_name: "order-api".into(),
            environment: "prod".into(),
            object: "order".into(),
            importance: "high".into(),
            error_message: "High error rate in POST /orders".into(),
            observability_data: ObservabilitySnapshot {
                status: "Degraded".into(),
                last_check_time: now.clone(),
                version: "2.4.1".into(),
                deployed_at: now.clone(),
                deployed_by: "ci-bot".into(),
                change_summary: "Connection pool tuning".into(),
                smoke: "Failed".into(),
            },
            ai_health_summary: None,
        },
        Incident {
            id: "2".into(),
            service: "inventory-service".into(),
            severity: Priority::P2,
            summary: "Latency spike in database queries".into(),
            timestamp: now.clone(),
            source: "DataDog".into(),
            status: "Open".into(),
            raw_content: None,
            app_name: "inventory-service".into(),
            environment: "prod".into(),
            object: "inventory".into(),
            importance: "normal".into(),
            error_message: "Latency spike in database queries".into(),
            observability_data: ObservabilitySnapshot {
                status: "Healthy".into(),
                last_check_time: now.clone(),
                version: "1.9.0".into(),
                deployed_at: now.clone(),
                deployed_by: "release-team".into(),
                change_summary: "Index rebuild job".into(),
                smoke: "Passed".into(),
            },
            ai_health_summary: None,
        },
        Incident {
            id: "3".into(),
            service: "notification-service".into(),
            severity: Priority::P3,
            summary: "Email delivery delay".into(),
            timestamp: now.clone(),
            source: "CloudWatch".into(),
            status: "Resolved".into(),
            raw_content: None,
            app_name: "notification-service".into(),
            environment: "prod".into(),
            object: "notification".into(),
            importance: "normal".into(),
            error_message: "Email delivery delay".into(),
            observability_data: ObservabilitySnapshot {
                status: "Healthy".into(),
                last_check_time: now.clone(),
                version: "3.2.7".into(),
                deployed_at: now.clone(),
                deployed_by: "release-team".into(),
                change_summary: "Template refresh".into(),
                smoke: "Passed".into(),
            },
            ai_health_summary: None,
        },
    ];

    AnalysisResponse {
        top_incident_service: "order-api".into(),
        runbook: Runbook {
            incident_summary: "The order-api is experiencing a 15% increase in 500 errors. \
                               Initial analysis suggests database connection pool exhaustion."
                .into(),
            hypotheses: vec![
                Hypothesis {
                    id: "h1".into(),
                    title: "Database Connection Pool Exhaustion".into(),
                    explanation: "The application cannot acquire connections from the pool, \
                                  leading to timeouts."
                        .into(),
                    confidence: 85,
                },
                Hypothesis {
                    id: "h2".into(),
                    title: "Downstream Payment Gateway Failure".into(),
                    explanation: "payment-api is responding slowly, causing backpressure."
                        .into(),
                    confidence: 40,
                },
            ],
            steps: vec![
                RunbookStep {
                    id: "s1".into(),
                    description: "Check database connection pool metrics.".into(),
                    tool_to_call: Some("get_db_metrics".into()),
                    tool_result: Some("Pool utilization > 95%".into()),
                },
                RunbookStep {
                    id: "s2".into(),
                    description: "Verify order-api logs for \"Connection timeout\" errors."
                        .into(),
                    tool_to_call: Some("search_logs".into()),
                    tool_result: None,
                },
                RunbookStep {
                    id: "s3".into(),
                    description: "Restart the order-api pods to reset connections \
                                  (temporary mitigation)."
                        .into(),
                    tool_to_call: Some("restart_pods".into()),
                    tool_result: None,
                },
            ],
        },
        incidents,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_response_is_well_formed() {
        let sample = sample_response();
        assert_eq!(sample.incidents.len(), 3);
        assert_eq!(sample.top_incident_service, "order-api");
        assert_eq!(sample.incidents[0].severity, Priority::P1);
        assert_eq!(sample.runbook.steps.len(), 3);
    }

    #[test]
    fn incident_serializes_camel_case() {
        let sample = sample_response();
        let json = serde_json::to_value(&sample.incidents[0]).expect("serialize");
        assert!(json.get("appName").is_some());
        assert!(json.get("observabilityData").is_some());
        assert_eq!(
            json.get("severity").and_then(serde_json::Value::as_str),
            Some("P1")
        );
        // absent narrative is omitted, not null
        assert!(json.get("aiHealthSummary").is_none());
    }
}
