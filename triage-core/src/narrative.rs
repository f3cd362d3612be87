use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::llm::TextGenerator;
use crate::observability::ObservabilitySnapshot;

const PREAMBLE: &str = "You are an expert site reliability engineer.";

/// Structured health narrative for one application. Best-effort: absent when
/// generation fails, never present with meaningless empty sections.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthNarrative {
    pub status_section: String,
    pub deployment_section: String,
    pub smoke_section: String,
    pub conclusion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_severity: Option<String>,
}

/// Request a health narrative. Any failure — unreachable service, missing
/// credential, malformed output — yields `None`; narrative absence must
/// never block incident assembly.
pub async fn summarize(
    generator: &dyn TextGenerator,
    snapshot: &ObservabilitySnapshot,
    alert_title: &str,
    alert_summary: Option<&str>,
) -> Option<HealthNarrative> {
    let prompt = build_prompt(snapshot, alert_title, alert_summary)?;

    let raw = match generator.generate(PREAMBLE, &prompt).await {
        Ok(raw) => raw,
        Err(err) => {
            debug!(%err, "health narrative skipped");
            return None;
        }
    };

    parse_narrative(&raw)
}

fn build_prompt(
    snapshot: &ObservabilitySnapshot,
    alert_title: &str,
    alert_summary: Option<&str>,
) -> Option<String> {
    let snapshot_json = serde_json::to_string(snapshot).ok()?;
    let schema = serde_json::to_string(&schemars::schema_for!(HealthNarrative)).ok()?;

    let grounding = if snapshot.mostly_unavailable() {
        "The observability data is unavailable. You MUST analyze based on the alert \
         title and summary instead: extract insights from the error message, API \
         name, and alert severity. Acknowledge the monitoring gap professionally; \
         never fabricate observability claims."
    } else {
        "Ground every section in the observability data. Start the status section \
         with the API name; include version, time, and deployer when available; if \
         smoke tests failed, extract the error message."
    };

    let summary_line = alert_summary
        .map(|s| format!("Alert summary: {s}\n"))
        .unwrap_or_default();

    Some(format!(
        "Analyze the health of the application behind this alert: \"{alert_title}\"\n\
         {summary_line}\
         Observability data:\n{snapshot_json}\n\
         \n\
         {grounding}\n\
         \n\
         Provide short key points (max 15 words each, bullet style) for \
         statusSection, deploymentSection and smokeSection, a one-sentence \
         conclusion stating situation and urgency, and recommendedSeverity: \
         \"P1\" if the service is down or erroring critically, \"P2\" for \
         significant but partial errors, \"P3\" for minor issues or monitoring \
         gaps, \"P4\" if informational only.\n\
         Never output just \"N/A\" or \"Unknown\" — always provide context, and \
         state what engineers should investigate.\n\
         Return ONLY valid JSON conforming to this schema:\n{schema}"
    ))
}

/// Tolerant parse: every section is coerced to a string; a non-object or a
/// parse with nothing in it yields `None`.
fn parse_narrative(raw: &str) -> Option<HealthNarrative> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            debug!(%err, "narrative response is not json");
            return None;
        }
    };

    if !value.is_object() {
        return None;
    }

    let narrative = HealthNarrative {
        status_section: coerce_text(value.get("statusSection")),
        deployment_section: coerce_text(value.get("deploymentSection")),
        smoke_section: coerce_text(value.get("smokeSection")),
        conclusion: coerce_text(value.get("conclusion")),
        recommended_severity: value
            .get("recommendedSeverity")
            .and_then(Value::as_str)
            .map(ToString::to_string),
    };

    let all_empty = narrative.status_section.is_empty()
        && narrative.deployment_section.is_empty()
        && narrative.smoke_section.is_empty()
        && narrative.conclusion.is_empty();
    if all_empty {
        return None;
    }

    Some(narrative)
}

fn coerce_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
