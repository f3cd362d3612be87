use alert_schema::{validate_classified, ClassifiedAlert, StrippedAlert};
use serde_json::Value;
use tracing::debug;

use crate::error::AnalyzeError;
use crate::llm::{GenerationError, TextGenerator};

const PREAMBLE: &str = "You are an expert security and system administrator.";

/// Classify a batch of stripped alerts in a single generation call.
/// The output MUST contain exactly one record per input, each carrying its
/// input's emailIndex; anything else is a contract failure and the whole
/// run fails with it.
pub async fn classify_alerts(
    generator: &dyn TextGenerator,
    stripped: &[StrippedAlert],
) -> Result<Vec<ClassifiedAlert>, AnalyzeError> {
    let prompt = build_prompt(stripped).map_err(|reason| {
        AnalyzeError::ClassificationUnavailable { reason }
    })?;

    let raw = generator
        .generate(PREAMBLE, &prompt)
        .await
        .map_err(|err| AnalyzeError::ClassificationUnavailable {
            reason: match err {
                GenerationError::MissingCredential => {
                    "no generation credential configured".into()
                }
                other => other.to_string(),
            },
        })?;

    let alerts = parse_classified(&raw)
        .map_err(|reason| AnalyzeError::ClassificationUnavailable { reason })?;

    if alerts.len() != stripped.len() {
        return Err(AnalyzeError::ClassificationUnavailable {
            reason: format!(
                "classifier returned {} alerts for {} inputs",
                alerts.len(),
                stripped.len()
            ),
        });
    }

    for alert in &alerts {
        validate_classified(alert)
            .map_err(|reason| AnalyzeError::ClassificationUnavailable { reason })?;
    }

    debug!(count = alerts.len(), "classified alert batch");
    Ok(alerts)
}

fn build_prompt(stripped: &[StrippedAlert]) -> Result<String, String> {
    let input = serde_json::to_string(stripped).map_err(|e| e.to_string())?;
    let schema = serde_json::to_string(&schemars::schema_for!(ClassifiedAlert))
        .map_err(|e| e.to_string())?;

    Ok(format!(
        "Analyze the following JSON array of email alert metadata.\n\
         Each email has a unique emailIndex. Return JSON only: an array of alert \
         objects conforming to this schema:\n{schema}\n\
         \n\
         CRITICAL INSTRUCTIONS:\n\
         1. Return exactly ONE alert object for EACH input email. If the input has \
         7 emails, the output MUST have 7 alerts.\n\
         2. Each output alert MUST carry the emailIndex of its input email.\n\
         3. Read bodyPreview carefully and extract the SPECIFIC error for each \
         alert: error types (e.g. INTERNAL_SERVER_ERROR, FORBIDDEN, \
         TOO_MANY_REQUESTS, BAD_SQL_SYNTAX), HTTP status codes, error messages, \
         correlation IDs.\n\
         4. Return timestamp in ISO 8601 format (YYYY-MM-DDTHH:mm:ssZ).\n\
         5. Severity mapping: \"CRITICAL\" in the subject or HTTP 5xx errors => \
         Critical; 4xx errors or \"High\" => High; \"Medium\" or minor issues => \
         Medium; otherwise Low.\n\
         6. id should be \"alert-{{emailIndex}}\"; title must be a concise, SPECIFIC \
         title reflecting the unique error; summary a technical summary from \
         bodyPreview; originalSubject the exact input subject; suggestedAction a \
         root-cause fix specific to this error; appName the input apiName; \
         environment from bodyPreview or \"prod\"; object from bodyPreview.\n\
         \n\
         VALIDATION: output array length MUST equal input array length. Each alert \
         MUST have unique, specific details from its own bodyPreview. DO NOT merge \
         or deduplicate alerts with similar errors.\n\
         \n\
         Input JSON:\n{input}"
    ))
}

/// The model usually returns the array directly; with JSON response mode it
/// sometimes wraps it in an object under "alerts" or an arbitrary key.
fn parse_classified(raw: &str) -> Result<Vec<ClassifiedAlert>, String> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| format!("invalid classifier json: {e}"))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(map) => {
            let wrapped = map
                .get("alerts")
                .and_then(Value::as_array)
                .cloned()
                .or_else(|| {
                    map.values()
                        .find_map(|v| v.as_array().cloned())
                });
            wrapped.ok_or_else(|| "classifier response holds no alert array".to_string())?
        }
        _ => return Err("classifier response is not an alert array".into()),
    };

    items
        .into_iter()
        .map(|item| {
            serde_json::from_value::<ClassifiedAlert>(item)
                .map_err(|e| format!("invalid classified alert: {e}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alert_schema::Severity;
    use async_trait::async_trait;
    use serde_json::json;

    struct FakeGenerator {
        response: Result<String, GenerationError>,
    }

    impl FakeGenerator {
        fn returning(response: &str) -> Self {
            Self {
                response: Ok(response.to_string()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for FakeGenerator {
        async fn generate(
            &self,
            _preamble: &str,
            _prompt: &str,
        ) -> Result<String, GenerationError> {
            match &self.response {
                Ok(text) => Ok(text.clone()),
                Err(GenerationError::MissingCredential) => {
                    Err(GenerationError::MissingCredential)
                }
                Err(other) => Err(GenerationError::Prompt(other.to_string())),
            }
        }
    }

    fn stripped(n: usize) -> Vec<StrippedAlert> {
        (0..n)
            .map(|i| {
                StrippedAlert::from_raw(
                    &json!({"subject": format!("alert {i}"), "bodyPreview": "HTTP 500"}),
                    i,
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn bare_array_response_is_accepted() {
        let generator = FakeGenerator::returning(
            r#"[{"emailIndex":0,"title":"Order API 500","severity":"Critical"},
                {"emailIndex":1,"title":"Payment API 403","severity":"High"}]"#,
        );
        let alerts = classify_alerts(&generator, &stripped(2))
            .await
            .expect("classify");
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].severity, Severity::Critical);
        assert_eq!(alerts[1].email_index, Some(1));
    }

    #[tokio::test]
    async fn wrapped_response_is_unwrapped() {
        let generator = FakeGenerator::returning(
            r#"{"alerts":[{"emailIndex":0,"title":"t","severity":"Low"}]}"#,
        );
        let alerts = classify_alerts(&generator, &stripped(1))
            .await
            .expect("classify");
        assert_eq!(alerts.len(), 1);
    }

    #[tokio::test]
    async fn arbitrary_wrapper_key_is_probed() {
        let generator = FakeGenerator::returning(
            r#"{"results":[{"emailIndex":0,"title":"t","severity":"Low"}]}"#,
        );
        let alerts = classify_alerts(&generator, &stripped(1))
            .await
            .expect("classify");
        assert_eq!(alerts.len(), 1);
    }

    #[tokio::test]
    async fn cardinality_mismatch_is_a_contract_failure() {
        let generator = FakeGenerator::returning(
            r#"[{"emailIndex":0,"title":"merged","severity":"Critical"}]"#,
        );
        let err = classify_alerts(&generator, &stripped(3))
            .await
            .expect_err("must reject");
        match err {
            AnalyzeError::ClassificationUnavailable { reason } => {
                assert!(reason.contains("1 alerts for 3 inputs"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_credential_is_fatal() {
        let generator = FakeGenerator {
            response: Err(GenerationError::MissingCredential),
        };
        let err = classify_alerts(&generator, &stripped(1))
            .await
            .expect_err("must fail");
        assert!(matches!(
            err,
            AnalyzeError::ClassificationUnavailable { .. }
        ));
    }

    #[tokio::test]
    async fn unparseable_response_is_fatal() {
        let generator = FakeGenerator::returning("the service is down, try later");
        let err = classify_alerts(&generator, &stripped(1))
            .await
            .expect_err("must fail");
        assert!(matches!(
            err,
            AnalyzeError::ClassificationUnavailable { .. }
        ));
    }
}
