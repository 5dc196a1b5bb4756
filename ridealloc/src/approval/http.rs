//! Remote approval provider.
//!
//! Sends the requested totals as a JSON object (`{"<destination>": <requested>, ...}`) in a
//! `POST` to the configured URL and expects a JSON object of the same shape holding the approved
//! totals. An optional API key is sent as `Authorization: Bearer <key>`.

use async_trait::async_trait;
use url::Url;

use crate::{
    approval::{ApprovalError, ApprovalProvider, Result},
    config::HttpApprovalConfig,
    types::{ApprovedTotals, RequestedTotals},
};

/// Approval provider backed by a remote HTTP service.
#[derive(Clone)]
pub struct HttpApprovalProvider {
    client: reqwest::Client,
    url: Url,
    api_key: Option<String>,
}

impl HttpApprovalProvider {
    /// Create a provider from configuration. Fails only if the HTTP client cannot be built.
    pub fn new(config: &HttpApprovalConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApprovalError::Unavailable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl ApprovalProvider for HttpApprovalProvider {
    #[tracing::instrument(skip(self, requested), fields(url = %self.url, destinations = requested.len()))]
    async fn request_approval(&self, requested: &RequestedTotals) -> Result<ApprovedTotals> {
        let mut request = self.client.post(self.url.clone()).json(requested);

        // Only add Authorization header if an api key is configured
        if let Some(api_key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(error = %e, "Approval request failed");
            ApprovalError::Unavailable(e.to_string())
        })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ApprovalError::Unavailable(format!("failed to read approval response: {e}")))?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Approval service returned an error status");
            return Err(ApprovalError::Unavailable(format!(
                "approval service returned {status}: {}",
                String::from_utf8_lossy(&body)
            )));
        }

        let approved: ApprovedTotals = serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(error = %e, "Approval response is not a destination to count map");
            ApprovalError::Malformed(e.to_string())
        })?;

        tracing::info!(status = status.as_u16(), destinations = approved.len(), "Approval received");

        Ok(approved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, header, method, path},
    };

    fn provider(server: &MockServer, api_key: Option<&str>) -> HttpApprovalProvider {
        HttpApprovalProvider::new(&HttpApprovalConfig {
            url: format!("{}/approve", server.uri()).parse().unwrap(),
            api_key: api_key.map(str::to_string),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    fn requested() -> RequestedTotals {
        [("11 times sq".to_string(), 500), ("770 Broadway".to_string(), 400)].into_iter().collect()
    }

    #[tokio::test]
    async fn test_successful_approval() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/approve"))
            .and(body_json(serde_json::json!({"11 times sq": 500, "770 Broadway": 400})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "11 times sq": 350,
                "770 Broadway": 280
            })))
            .expect(1)
            .mount(&server)
            .await;

        let approved = provider(&server, None).request_approval(&requested()).await.unwrap();

        assert_eq!(approved["11 times sq"], 350);
        assert_eq!(approved["770 Broadway"], 280);
    }

    #[tokio::test]
    async fn test_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/approve"))
            .and(header("authorization", "Bearer secret-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let approved = provider(&server, Some("secret-key"))
            .request_approval(&requested())
            .await
            .unwrap();

        assert!(approved.is_empty());
    }

    #[tokio::test]
    async fn test_error_status_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/approve"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .expect(1)
            .mount(&server)
            .await;

        let err = provider(&server, None).request_approval(&requested()).await.unwrap_err();

        assert!(matches!(err, ApprovalError::Unavailable(_)));
        assert!(err.to_string().contains("maintenance"));
    }

    #[tokio::test]
    async fn test_non_numeric_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/approve"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"11 times sq": "lots"})))
            .mount(&server)
            .await;

        let err = provider(&server, None).request_approval(&requested()).await.unwrap_err();

        assert!(matches!(err, ApprovalError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_negative_count_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/approve"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"11 times sq": -1})))
            .mount(&server)
            .await;

        let err = provider(&server, None).request_approval(&requested()).await.unwrap_err();

        assert!(matches!(err, ApprovalError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        // Bind and drop a server so the port is almost certainly closed
        let server = MockServer::start().await;
        let provider = provider(&server, None);
        drop(server);

        let err = provider.request_approval(&requested()).await.unwrap_err();

        assert!(matches!(err, ApprovalError::Unavailable(_)));
    }
}
