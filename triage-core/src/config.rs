use std::time::Duration;

use crate::llm::LlmConfig;

/// Immutable pipeline configuration, built once at the entry point and
/// passed down explicitly. Nothing below this layer reads the environment.
#[derive(Clone, Debug)]
pub struct TriageConfig {
    pub alerts_base_url: String,
    pub observability_base_url: String,
    /// When set, both upstreams are reached through the forwarding proxy
    /// instead of directly.
    pub proxy_url: Option<String>,
    pub observability_enabled: bool,
    /// Overall bound for a single upstream request.
    pub request_timeout: Duration,
    /// Tighter bound for each of the three observability sub-lookups.
    pub lookup_timeout: Duration,
    pub llm: Option<LlmConfig>,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            alerts_base_url: String::new(),
            observability_base_url: String::new(),
            proxy_url: None,
            observability_enabled: true,
            request_timeout: Duration::from_secs(10),
            lookup_timeout: Duration::from_secs(5),
            llm: None,
        }
    }
}

impl TriageConfig {
    pub fn from_env() -> Self {
        let enabled = std::env::var("TRIAGE_ENABLE_OBSERVABILITY")
            .map(|v| v != "false")
            .unwrap_or(true);

        Self {
            alerts_base_url: std::env::var("TRIAGE_ALERTS_BASE_URL").unwrap_or_default(),
            observability_base_url: std::env::var("TRIAGE_OBSERVABILITY_BASE_URL")
                .unwrap_or_default(),
            proxy_url: std::env::var("TRIAGE_PROXY_URL").ok().filter(|v| !v.is_empty()),
            observability_enabled: enabled,
            request_timeout: duration_from_env("TRIAGE_REQUEST_TIMEOUT_SECS", 10),
            lookup_timeout: duration_from_env("TRIAGE_LOOKUP_TIMEOUT_SECS", 5),
            llm: LlmConfig::from_env(),
        }
    }
}

fn duration_from_env(var: &str, default_secs: u64) -> Duration {
    let secs = std::env::var(var)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default_secs);
    Duration::from_secs(secs)
}
