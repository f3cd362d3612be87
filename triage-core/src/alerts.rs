use serde_json::Value;
use tracing::debug;

use crate::error::AnalyzeError;

/// Wrapper keys probed when the alerts payload is not a bare array.
/// Fixed priority order; first key holding an array wins.
const WRAPPER_KEYS: [&str; 4] = ["data", "alerts", "emails", "items"];

/// The alerts upstream answers in one of several undocumented shapes.
/// Modeled explicitly instead of ad hoc property probing so the
/// unrecognized case keeps the raw value for diagnostics.
#[derive(Clone, Debug, PartialEq)]
pub enum AlertsPayload {
    Bare(Vec<Value>),
    Wrapped {
        key: &'static str,
        alerts: Vec<Value>,
    },
    Unrecognized(Value),
}

impl AlertsPayload {
    pub fn from_value(raw: Value) -> Self {
        match raw {
            Value::Array(alerts) => AlertsPayload::Bare(alerts),
            Value::Object(mut map) => {
                for key in WRAPPER_KEYS {
                    if map.get(key).map(Value::is_array).unwrap_or(false) {
                        let Some(Value::Array(alerts)) = map.remove(key) else {
                            continue;
                        };
                        return AlertsPayload::Wrapped { key, alerts };
                    }
                }
                AlertsPayload::Unrecognized(Value::Object(map))
            }
            other => AlertsPayload::Unrecognized(other),
        }
    }

    pub fn into_alerts(self) -> Result<Vec<Value>, AnalyzeError> {
        match self {
            AlertsPayload::Bare(alerts) => Ok(alerts),
            AlertsPayload::Wrapped { key, alerts } => {
                debug!(wrapper = key, "unwrapped alerts envelope");
                Ok(alerts)
            }
            AlertsPayload::Unrecognized(raw) => Err(AnalyzeError::MalformedResponse {
                shape: describe_shape(&raw),
            }),
        }
    }
}

/// Canonicalize an alerts payload into the ordered alert sequence.
/// An empty sequence is valid here; the caller decides whether to warn.
pub fn normalize_alerts(raw: Value) -> Result<Vec<Value>, AnalyzeError> {
    AlertsPayload::from_value(raw).into_alerts()
}

fn describe_shape(value: &Value) -> String {
    match value {
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("object with keys [{}]", keys.join(", "))
        }
        Value::Array(_) => "array".into(),
        Value::String(_) => "string".into(),
        Value::Number(_) => "number".into(),
        Value::Bool(_) => "boolean".into(),
        Value::Null => "null".into(),
    }
}
