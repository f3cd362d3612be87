use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::config::TriageConfig;

/// Per-call transport failures, kept separate from the run-level taxonomy
/// so enrichment can triage them without aborting anything.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request went out but no HTTP response came back. In a browser
    /// this is the shape a CORS rejection takes.
    #[error("no response received: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP {status}")]
    Status { status: u16, body: String },

    /// The forwarding proxy answered, but reported failure.
    #[error("proxy error: {0}")]
    Proxy(String),

    #[error("invalid payload: {0}")]
    Decode(String),
}

impl TransportError {
    /// Network-level failure with no response — the CORS-blocked shape.
    /// Timeouts are deliberately excluded; they are reported on their own.
    pub fn is_cors_like(&self) -> bool {
        matches!(self, TransportError::Network(_))
    }

    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if let Some(status) = err.status() {
            TransportError::Status {
                status: status.as_u16(),
                body: String::new(),
            }
        } else {
            TransportError::Network(err.to_string())
        }
    }
}

/// Query parameters for the alerts source. `to` is required whenever `from`
/// is supplied; that rule belongs to the analysis dialog, not this layer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AlertQuery {
    pub count: Option<u32>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LookupKind {
    Status,
    Deployment,
    Smoke,
}

impl LookupKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupKind::Status => "status",
            LookupKind::Deployment => "deployment",
            LookupKind::Smoke => "smoke",
        }
    }
}

#[async_trait]
pub trait AlertsSource: Send + Sync {
    async fn fetch_alerts(&self, query: &AlertQuery) -> Result<Value, TransportError>;
}

#[async_trait]
pub trait ObservabilitySource: Send + Sync {
    async fn lookup(&self, kind: LookupKind, service: &str) -> Result<Value, TransportError>;
}

/// Production transport for both upstreams. Routes directly or through the
/// forwarding proxy depending on configuration.
pub struct HttpGateway {
    client: reqwest::Client,
    alerts_base: String,
    observability_base: String,
    proxy_url: Option<String>,
    lookup_timeout: std::time::Duration,
}

impl HttpGateway {
    pub fn new(config: &TriageConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::Decode(format!("failed to build http client: {e}")))?;

        Ok(Self {
            client,
            alerts_base: config.alerts_base_url.trim_end_matches('/').to_string(),
            observability_base: config
                .observability_base_url
                .trim_end_matches('/')
                .to_string(),
            proxy_url: config.proxy_url.clone(),
            lookup_timeout: config.lookup_timeout,
        })
    }

    async fn forward(&self, proxy_url: &str, body: Value) -> Result<Value, TransportError> {
        let response = self
            .client
            .post(proxy_url)
            .json(&body)
            .send()
            .await
            .map_err(TransportError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: Value = response
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))?;

        // The proxy always answers 200; failure is carried in the envelope.
        let success = envelope
            .get("success")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if success {
            Ok(envelope.get("data").cloned().unwrap_or(Value::Null))
        } else {
            let error = envelope
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown proxy error")
                .to_string();
            Err(TransportError::Proxy(error))
        }
    }

    async fn get_json(
        &self,
        url: &str,
        timeout: Option<std::time::Duration>,
    ) -> Result<Value, TransportError> {
        let mut request = self.client.get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await.map_err(TransportError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}

#[async_trait]
impl AlertsSource for HttpGateway {
    async fn fetch_alerts(&self, query: &AlertQuery) -> Result<Value, TransportError> {
        if let Some(proxy_url) = &self.proxy_url {
            debug!("fetching alerts through forwarding proxy");
            let mut body = json!({ "endpoint": "alerts" });
            if let Some(count) = query.count {
                body["count"] = json!(count);
            }
            if let Some(from) = &query.from {
                body["from"] = json!(from);
            }
            if let Some(to) = &query.to {
                body["to"] = json!(to);
            }
            return self.forward(proxy_url, body).await;
        }

        let mut url = format!("{}/api/alerts", self.alerts_base);
        let mut params = Vec::new();
        if let Some(count) = query.count {
            params.push(format!("count={count}"));
        }
        if let Some(from) = &query.from {
            params.push(format!("from={from}"));
        }
        if let Some(to) = &query.to {
            params.push(format!("to={to}"));
        }
        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }

        debug!(%url, "fetching alerts");
        self.get_json(&url, None).await
    }
}

#[async_trait]
impl ObservabilitySource for HttpGateway {
    async fn lookup(&self, kind: LookupKind, service: &str) -> Result<Value, TransportError> {
        if let Some(proxy_url) = &self.proxy_url {
            let body = json!({
                "endpoint": "observability",
                "action": kind.as_str(),
                "service": service,
            });
            return self.forward(proxy_url, body).await;
        }

        let url = format!(
            "{}/observability?action={}&service={}",
            self.observability_base,
            kind.as_str(),
            service
        );
        debug!(%url, "observability lookup");
        self.get_json(&url, Some(self.lookup_timeout)).await
    }
}
