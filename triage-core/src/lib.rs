pub mod alerts;
pub mod analyzer;
pub mod classify;
pub mod config;
pub mod error;
pub mod incident;
pub mod llm;
pub mod narrative;
pub mod observability;
pub mod profile;
pub mod runbook;
pub mod severity;
pub mod transport;

pub(crate) fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
