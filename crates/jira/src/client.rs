//! Main client for the Jira REST API.

use crate::api::*;
use crate::config::{ClientConfig, JiraAuth, RetryConfig};
use crate::error::{JiraError, JiraResult};
use crate::transport::HttpTransport;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Jira client; cheap to clone.
#[derive(Clone)]
pub struct JiraClient {
    config: Arc<ClientConfig>,
    pub(crate) http: HttpTransport,
}

impl JiraClient {
    pub fn builder() -> JiraClientBuilder {
        JiraClientBuilder::new()
    }

    fn from_config(config: ClientConfig) -> JiraResult<Self> {
        let config = Arc::new(config);
        let http = HttpTransport::new(config.clone())?;

        Ok(Self { config, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.config.base_url
    }

    pub fn issues(&self) -> IssuesApi<'_> {
        IssuesApi::new(self)
    }

    pub fn search(&self) -> SearchApi<'_> {
        SearchApi::new(self)
    }

    pub fn transitions(&self) -> TransitionsApi<'_> {
        TransitionsApi::new(self)
    }

    pub fn comments(&self) -> CommentsApi<'_> {
        CommentsApi::new(self)
    }

    pub fn projects(&self) -> ProjectsApi<'_> {
        ProjectsApi::new(self)
    }

    pub fn users(&self) -> UsersApi<'_> {
        UsersApi::new(self)
    }
}

/// Builder for creating a JiraClient.
pub struct JiraClientBuilder {
    base_url: Option<String>,
    auth: Option<JiraAuth>,
    timeout: Duration,
    retry_config: RetryConfig,
}

impl JiraClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            auth: None,
            timeout: Duration::from_secs(30),
            retry_config: RetryConfig::default(),
        }
    }

    /// Base URL of the Jira instance, e.g. `https://acme.atlassian.net`.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Jira Cloud credentials.
    pub fn basic_auth(mut self, email: impl Into<String>, api_token: impl Into<String>) -> Self {
        self.auth = Some(JiraAuth::Basic {
            email: email.into(),
            api_token: api_token.into(),
        });
        self
    }

    /// Server / Data Center personal access token.
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.auth = Some(JiraAuth::Bearer(token.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    pub fn build(self) -> JiraResult<JiraClient> {
        let base_url_str = self
            .base_url
            .ok_or_else(|| JiraError::Config("Jira base URL is required".to_string()))?;

        // Join semantics need a trailing slash to keep a context path like /jira
        let normalized = if base_url_str.ends_with('/') {
            base_url_str
        } else {
            format!("{}/", base_url_str)
        };
        let base_url = Url::parse(&normalized)?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(JiraError::Config(format!(
                "Unsupported URL scheme '{}'",
                base_url.scheme()
            )));
        }

        let auth = self.auth.ok_or_else(|| {
            JiraError::Config(
                "Jira credentials are required: email + API token or a personal access token"
                    .to_string(),
            )
        })?;

        let config = ClientConfig {
            base_url,
            auth,
            timeout: self.timeout,
            retry_config: self.retry_config,
        };

        JiraClient::from_config(config)
    }
}

impl Default for JiraClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_base_url() {
        let result = JiraClient::builder().bearer_token("pat").build();
        assert!(matches!(result, Err(JiraError::Config(_))));
    }

    #[test]
    fn test_builder_requires_credentials() {
        let result = JiraClient::builder()
            .base_url("https://acme.atlassian.net")
            .build();
        assert!(matches!(result, Err(JiraError::Config(_))));
    }

    #[test]
    fn test_builder_normalizes_base_url() {
        let client = JiraClient::builder()
            .base_url("https://jira.example.com/jira")
            .basic_auth("dev@example.com", "token")
            .build()
            .unwrap();
        assert_eq!(client.base_url().as_str(), "https://jira.example.com/jira/");
    }

    #[test]
    fn test_builder_rejects_bad_urls() {
        let result = JiraClient::builder()
            .base_url("not a url")
            .bearer_token("pat")
            .build();
        assert!(matches!(result, Err(JiraError::InvalidUrl(_))));

        let result = JiraClient::builder()
            .base_url("ftp://jira.example.com")
            .bearer_token("pat")
            .build();
        assert!(matches!(result, Err(JiraError::Config(_))));
    }

    #[test]
    fn test_builder_custom_timeout() {
        let client = JiraClient::builder()
            .base_url("https://acme.atlassian.net")
            .bearer_token("pat")
            .timeout(Duration::from_secs(5))
            .retry_config(RetryConfig::no_retry())
            .build()
            .unwrap();
        assert_eq!(client.config.timeout, Duration::from_secs(5));
        assert_eq!(client.config.retry_config.max_retries, 0);
    }
}
