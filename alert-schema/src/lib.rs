use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Severity labels emitted by the alert classifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "medium" => Severity::Medium,
            _ => Severity::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }
}

impl From<String> for Severity {
    fn from(value: String) -> Self {
        Severity::parse(&value)
    }
}

/// Lightweight alert record sent to the classifier. Markup and full body
/// content are stripped; `body_preview` carries the plain-text excerpt the
/// severity policy reads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StrippedAlert {
    pub email_index: usize,
    pub subject: String,
    pub sender: String,
    pub timestamp: String,
    pub api_name: String,
    pub environment: String,
    pub object: String,
    pub priority: String,
    pub importance: String,
    pub body_preview: String,
}

impl StrippedAlert {
    /// Build from a raw mailbox record. Field names vary between alert
    /// sources; each logical field probes its candidate keys in order.
    pub fn from_raw(raw: &Value, index: usize) -> Self {
        Self {
            email_index: index,
            subject: text_field(raw, &["subject"]),
            sender: text_field(raw, &["displayName", "from"]),
            timestamp: text_field(raw, &["lastupdatedTime", "date"]),
            api_name: text_field(raw, &["apiName"]),
            environment: text_field(raw, &["environment"]),
            object: text_field(raw, &["object"]),
            priority: text_field(raw, &["priority"]),
            importance: text_field(raw, &["importance"]),
            body_preview: text_field(raw, &["bodyPreview"]),
        }
    }
}

fn text_field(raw: &Value, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|key| raw.get(key).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string()
}

/// One classified alert, paired back to its source record by `email_index`.
/// The index is mandatory for current inputs; it is optional here only so
/// legacy classifier outputs without one can fall through to subject-based
/// pairing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedAlert {
    #[serde(default)]
    pub email_index: Option<usize>,
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub original_subject: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[schemars(with = "String")]
    pub severity: Severity,
    #[serde(default)]
    pub suggested_action: Option<String>,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub app_name: String,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub object: Option<String>,
}

pub fn validate_classified(alert: &ClassifiedAlert) -> Result<(), String> {
    if alert.title.trim().is_empty() {
        return Err("title is required".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn severity_parse_is_case_insensitive() {
        assert_eq!(Severity::parse("CRITICAL"), Severity::Critical);
        assert_eq!(Severity::parse("high"), Severity::High);
        assert_eq!(Severity::parse("Medium"), Severity::Medium);
        assert_eq!(Severity::parse("informational"), Severity::Low);
    }

    #[test]
    fn stripped_alert_probes_fallback_keys() {
        let raw = json!({
            "subject": "CRITICAL: order-api 500",
            "from": "alerts@example.com",
            "date": "2026-02-11T08:30:00Z",
            "apiName": "order-api",
            "bodyPreview": "HTTP 500 INTERNAL_SERVER_ERROR at POST /orders"
        });
        let stripped = StrippedAlert::from_raw(&raw, 4);
        assert_eq!(stripped.email_index, 4);
        assert_eq!(stripped.sender, "alerts@example.com");
        assert_eq!(stripped.timestamp, "2026-02-11T08:30:00Z");
        assert_eq!(stripped.api_name, "order-api");
        assert_eq!(stripped.environment, "");
    }

    #[test]
    fn stripped_alert_prefers_display_name_over_from() {
        let raw = json!({
            "subject": "s",
            "displayName": "Alerts Mailbox",
            "from": "alerts@example.com",
            "lastupdatedTime": "2026-02-11T08:30:00Z",
            "date": "2026-02-10T00:00:00Z"
        });
        let stripped = StrippedAlert::from_raw(&raw, 0);
        assert_eq!(stripped.sender, "Alerts Mailbox");
        assert_eq!(stripped.timestamp, "2026-02-11T08:30:00Z");
    }

    #[test]
    fn classified_alert_deserializes_with_lenient_severity() {
        let alert: ClassifiedAlert = serde_json::from_value(json!({
            "emailIndex": 2,
            "title": "Order API Internal Server Error (500)",
            "severity": "critical",
            "appName": "order-api"
        }))
        .expect("deserialize");
        assert_eq!(alert.email_index, Some(2));
        assert_eq!(alert.severity, Severity::Critical);
        assert_eq!(alert.summary, "");
        assert_eq!(alert.suggested_action, None);
    }

    #[test]
    fn validate_rejects_empty_title() {
        let alert: ClassifiedAlert = serde_json::from_value(json!({
            "title": "  ",
            "severity": "Low"
        }))
        .expect("deserialize");
        assert!(validate_classified(&alert).is_err());
    }
}
