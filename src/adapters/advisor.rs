//! Hand-off to the external advisory (LLM agent) service.
//!
//! The service gets the task text and the data as JSON and answers with
//! free-form text. That text is passed through untouched.

use crate::config::toml_config::AdvisorConfig;
use crate::core::Advisor;
use crate::domain::ports::{Advice, AdvisoryRequest};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub struct HttpAdvisor {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpAdvisor {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: None,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `None` when the advisor is disabled.
    pub fn from_config(config: &AdvisorConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        let endpoint = validation::validate_required_field("advisor.endpoint", &config.endpoint)?;
        validation::validate_url("advisor.endpoint", endpoint)?;

        let mut advisor = HttpAdvisor::new(endpoint.clone())
            .with_timeout(Duration::from_secs(config.timeout_seconds));
        // An unset ${VAR} placeholder means no key was provided.
        if let Some(key) = config.api_key.as_ref().filter(|k| !k.is_empty() && !k.starts_with("${")) {
            advisor = advisor.with_api_key(key.clone());
        }
        Ok(Some(advisor))
    }
}

#[async_trait]
impl Advisor for HttpAdvisor {
    async fn advise(&self, request: &AdvisoryRequest) -> Result<Advice> {
        tracing::debug!("Sending advisory request to: {}", self.endpoint);

        let mut builder = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        tracing::debug!("Advisor response status: {}", status);

        let text = response.error_for_status()?.text().await?;
        Ok(Advice { text })
    }
}

/// Asks the advisor, if any. Failures are logged and yield `None`.
pub async fn request_advice(advisor: Option<&dyn Advisor>, request: AdvisoryRequest) -> Option<String> {
    let advisor = advisor?;
    match advisor.advise(&request).await {
        Ok(advice) => Some(advice.text),
        Err(e) => {
            log_advisor_failure(&e);
            None
        }
    }
}

fn log_advisor_failure(e: &EtlError) {
    tracing::warn!("⚠️ Advisor unavailable, continuing without advice: {}", e);
    tracing::debug!("💡 {}", e.recovery_suggestion());
}
