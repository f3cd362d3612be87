use alert_schema::ClassifiedAlert;
use serde::{Deserialize, Serialize};

/// Diagnostic tool identifier attached to every synthesized step.
pub const DIAGNOSTIC_TOOL: &str = "check_sf_connector";

const FALLBACK_STEP: &str = "Review system logs for specific error details.";
const EMPTY_RUN_SUMMARY: &str = "No critical alerts identified in the analyzed period.";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hypothesis {
    pub id: String,
    pub title: String,
    pub explanation: String,
    /// 0-100.
    pub confidence: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunbookStep {
    pub id: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_to_call: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<String>,
}

/// One runbook per analysis run, not per incident.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Runbook {
    pub incident_summary: String,
    pub hypotheses: Vec<Hypothesis>,
    pub steps: Vec<RunbookStep>,
}

impl Runbook {
    pub fn empty() -> Self {
        Self {
            incident_summary: EMPTY_RUN_SUMMARY.into(),
            hypotheses: Vec::new(),
            steps: Vec::new(),
        }
    }
}

/// Synthesize the run's runbook: a fixed count template, exactly one
/// hypothesis built from the top incident's summary, and up to three steps
/// from the first alerts' suggested actions.
pub fn synthesize(
    email_count: usize,
    top_incident_summary: &str,
    alerts: &[ClassifiedAlert],
) -> Runbook {
    Runbook {
        incident_summary: format!(
            "System analyzed {email_count} emails and identified {} actionable incidents.",
            alerts.len()
        ),
        hypotheses: vec![Hypothesis {
            id: "h1".into(),
            title: "AI Root Cause Analysis".into(),
            explanation: top_incident_summary.to_string(),
            confidence: 90,
        }],
        steps: alerts
            .iter()
            .take(3)
            .enumerate()
            .map(|(idx, alert)| RunbookStep {
                id: format!("step-{idx}"),
                description: alert
                    .suggested_action
                    .clone()
                    .filter(|action| !action.trim().is_empty())
                    .unwrap_or_else(|| FALLBACK_STEP.into()),
                tool_to_call: Some(DIAGNOSTIC_TOOL.into()),
                tool_result: None,
            })
            .collect(),
    }
}
