use alert_schema::Severity;
use serde::{Deserialize, Serialize};

use crate::incident::Incident;

/// Priority scale used for filtering and display. Classifier labels are
/// qualitative; the narrative override speaks this scale directly. The two
/// mappings below compose: label -> priority for storage, then
/// priority/label -> display label for rendering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    P1,
    P2,
    P3,
}

impl Priority {
    pub fn from_severity(severity: Severity) -> Self {
        match severity {
            Severity::Critical => Priority::P1,
            Severity::High => Priority::P2,
            _ => Priority::P3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::P1 => "P1",
            Priority::P2 => "P2",
            Priority::P3 => "P3",
        }
    }
}

/// Map a P-label or classifier label to the display label. Unrecognized
/// values pass through unchanged.
pub fn display_label(value: &str) -> String {
    match value.to_uppercase().as_str() {
        "P1" | "CRITICAL" => "High".to_string(),
        "P2" | "HIGH" => "Medium".to_string(),
        "P3" | "MEDIUM" | "P4" | "LOW" => "Low".to_string(),
        _ => value.to_string(),
    }
}

/// Display severity for an incident: the narrative's recommended severity
/// wins over the classifier-derived priority wherever severity is shown.
pub fn incident_severity_label(incident: &Incident) -> String {
    let effective = incident
        .ai_health_summary
        .as_ref()
        .and_then(|narrative| narrative.recommended_severity.as_deref())
        .unwrap_or_else(|| incident.severity.as_str());
    display_label(effective)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::incident::Incident;
    use crate::narrative::HealthNarrative;
    use crate::observability::ObservabilitySnapshot;

    fn incident(severity: Priority, recommended: Option<&str>) -> Incident {
        Incident {
            id: "1".into(),
            service: "order-api".into(),
            severity,
            summary: "s".into(),
            timestamp: "2026-02-11T08:00:00Z".into(),
            source: "Alerts Mailbox".into(),
            status: "Investigating".into(),
            raw_content: None,
            app_name: "order-api".into(),
            environment: "prod".into(),
            object: "order".into(),
            importance: "high".into(),
            error_message: "s".into(),
            observability_data: ObservabilitySnapshot::degraded("Unknown"),
            ai_health_summary: recommended.map(|r| HealthNarrative {
                status_section: "x".into(),
                deployment_section: String::new(),
                smoke_section: String::new(),
                conclusion: String::new(),
                recommended_severity: Some(r.into()),
            }),
        }
    }

    #[test]
    fn critical_normalizes_to_p1() {
        assert_eq!(
            Priority::from_severity(alert_schema::Severity::Critical),
            Priority::P1
        );
        assert_eq!(
            Priority::from_severity(alert_schema::Severity::High),
            Priority::P2
        );
        assert_eq!(
            Priority::from_severity(alert_schema::Severity::Medium),
            Priority::P3
        );
    }

    #[test]
    fn p1_without_override_displays_high() {
        let incident = incident(Priority::P1, None);
        assert_eq!(incident_severity_label(&incident), "High");
    }

    #[test]
    fn narrative_override_wins_over_classifier() {
        let incident = incident(Priority::P1, Some("P3"));
        assert_eq!(incident_severity_label(&incident), "Low");
    }

    #[test]
    fn display_chain_handles_p4_and_unknown() {
        assert_eq!(display_label("P4"), "Low");
        assert_eq!(display_label("medium"), "Low");
        assert_eq!(display_label("weird"), "weird");
    }
}
