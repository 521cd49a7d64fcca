//! Quality engine reached over HTTP
//!
//! Posts the [`QualityRequest`] as JSON to the service URL and expects a
//! [`CheckResult`] document back.

use std::time::Duration;

use tracing::debug;

use super::{CheckResult, QualityEngine, QualityError, QualityRequest};

pub struct HttpQualityEngine {
    url: String,
    auth_token: Option<String>,
    client: reqwest::blocking::Client,
}

impl HttpQualityEngine {
    /// Create a client for the service at `url`
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use std::time::Duration;
    /// use file_ingest_pipeline::quality::HttpQualityEngine;
    ///
    /// let engine = HttpQualityEngine::new("http://localhost:8080/check", Duration::from_secs(30))?;
    /// # Ok::<(), file_ingest_pipeline::quality::QualityError>(())
    /// ```
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, QualityError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QualityError::Transport(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            auth_token: None,
            client,
        })
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }
}

impl QualityEngine for HttpQualityEngine {
    fn check(&self, request: &QualityRequest<'_>) -> Result<CheckResult, QualityError> {
        let mut http_request = self.client.post(&self.url).json(request);
        if let Some(ref token) = self.auth_token {
            http_request = http_request.header("Authorization", format!("Bearer {}", token));
        }

        let response = http_request
            .send()
            .map_err(|e| QualityError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(QualityError::Engine(format!("HTTP {}: {}", status, body)));
        }

        let body = response
            .bytes()
            .map_err(|e| QualityError::Transport(e.to_string()))?;
        let result = CheckResult::from_json(&body)?;
        debug!(
            url = %self.url,
            overall_score = result.overall_score,
            passed = result.passed,
            "Quality check answered"
        );
        Ok(result)
    }
}
