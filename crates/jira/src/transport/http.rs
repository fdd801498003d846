//! HTTP transport layer for the Jira client.

use crate::config::{ClientConfig, JiraAuth};
use crate::error::{JiraError, JiraResult};
use base64::Engine;
use reqwest::{header, Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// HTTP transport for making API requests.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    config: Arc<ClientConfig>,
}

impl HttpTransport {
    /// Create a new HTTP transport with the given configuration.
    pub fn new(config: Arc<ClientConfig>) -> JiraResult<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let credentials = match &config.auth {
            JiraAuth::Basic { email, api_token } => {
                let encoded = base64::engine::general_purpose::STANDARD
                    .encode(format!("{}:{}", email, api_token));
                format!("Basic {}", encoded)
            }
            JiraAuth::Bearer(token) => format!("Bearer {}", token),
        };
        let mut auth_value = header::HeaderValue::from_str(&credentials)
            .map_err(|_| JiraError::Config("Invalid credential format".to_string()))?;
        auth_value.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth_value);

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    /// Resolve an API path against the base URL, keeping any context path.
    fn build_url(&self, path: &str) -> JiraResult<url::Url> {
        Ok(self.config.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Execute a request with retries.
    async fn execute_with_retry(&self, request_builder: RequestBuilder) -> JiraResult<Response> {
        let retry_config = &self.config.retry_config;
        let mut attempts = 0;

        loop {
            let request = request_builder
                .try_clone()
                .ok_or_else(|| JiraError::Config("Request cannot be cloned".to_string()))?;

            match request.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();

                    if response.status().is_success() {
                        return Ok(response);
                    }

                    let retry_after = response
                        .headers()
                        .get(header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.trim().parse::<u64>().ok());

                    if attempts < retry_config.max_retries
                        && retry_config.should_retry_status(status)
                    {
                        let backoff = retry_config.delay(attempts, retry_after);
                        warn!(
                            status = status,
                            attempt = attempts + 1,
                            backoff_ms = backoff.as_millis(),
                            "Jira request failed, retrying"
                        );
                        tokio::time::sleep(backoff).await;
                        attempts += 1;
                        continue;
                    }

                    let body = response.text().await.unwrap_or_default();
                    return Err(JiraError::from_response(status, &body, retry_after));
                }
                Err(e) if e.is_timeout() => {
                    if attempts < retry_config.max_retries {
                        let backoff = retry_config.backoff_for_attempt(attempts);
                        warn!(
                            attempt = attempts + 1,
                            backoff_ms = backoff.as_millis(),
                            "Jira request timed out, retrying"
                        );
                        tokio::time::sleep(backoff).await;
                        attempts += 1;
                        continue;
                    }
                    return Err(JiraError::Timeout);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Decode a JSON body; an empty body (204) decodes as `null`.
    async fn read_json<T: DeserializeOwned>(response: Response) -> JiraResult<T> {
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(serde_json::from_str("null")?);
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Execute a GET request.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> JiraResult<T> {
        let url = self.build_url(path)?;
        debug!(url = %url, "GET request");

        let response = self.execute_with_retry(self.client.get(url)).await?;
        Self::read_json(response).await
    }

    /// Execute a GET request with query parameters.
    pub async fn get_with_query<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> JiraResult<T> {
        let url = self.build_url(path)?;
        debug!(url = %url, "GET request with query");

        let response = self
            .execute_with_retry(self.client.get(url).query(query))
            .await?;
        Self::read_json(response).await
    }

    /// Execute a POST request.
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> JiraResult<T> {
        let url = self.build_url(path)?;
        debug!(url = %url, "POST request");

        let response = self
            .execute_with_retry(self.client.post(url).json(body))
            .await?;
        Self::read_json(response).await
    }

    /// Execute a POST request whose success response carries no body.
    pub async fn post_no_response<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> JiraResult<()> {
        let url = self.build_url(path)?;
        debug!(url = %url, "POST request (no response)");

        self.execute_with_retry(self.client.post(url).json(body))
            .await?;
        Ok(())
    }

    /// Execute a PUT request whose success response carries no body.
    pub async fn put_no_response<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> JiraResult<()> {
        let url = self.build_url(path)?;
        debug!(url = %url, "PUT request (no response)");

        self.execute_with_retry(self.client.put(url).json(body))
            .await?;
        Ok(())
    }

    /// Execute a DELETE request without a response body.
    pub async fn delete_no_response(&self, path: &str) -> JiraResult<()> {
        let url = self.build_url(path)?;
        debug!(url = %url, "DELETE request (no response)");

        self.execute_with_retry(self.client.delete(url)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct TestResponse {
        message: String,
        value: i32,
    }

    #[derive(Debug, Serialize)]
    struct TestRequest {
        name: String,
    }

    fn create_config(base_url: &str) -> Arc<ClientConfig> {
        create_config_with_auth(base_url, JiraAuth::Bearer("test-pat".to_string()))
    }

    fn create_config_with_auth(base_url: &str, auth: JiraAuth) -> Arc<ClientConfig> {
        Arc::new(ClientConfig {
            base_url: url::Url::parse(base_url).unwrap(),
            auth,
            timeout: Duration::from_secs(30),
            retry_config: RetryConfig::no_retry(),
        })
    }

    #[tokio::test]
    async fn test_get_request() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/2/test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(TestResponse {
                message: "success".to_string(),
                value: 42,
            }))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(create_config(&server.uri())).unwrap();

        let result: TestResponse = transport.get("/rest/api/2/test").await.unwrap();
        assert_eq!(result.message, "success");
        assert_eq!(result.value, 42);
    }

    #[tokio::test]
    async fn test_get_with_query() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/2/items"))
            .and(query_param("startAt", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(TestResponse {
                message: "page".to_string(),
                value: 10,
            }))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(create_config(&server.uri())).unwrap();
        let result: TestResponse = transport
            .get_with_query("rest/api/2/items", &[("startAt", "10")])
            .await
            .unwrap();
        assert_eq!(result.value, 10);
    }

    #[tokio::test]
    async fn test_post_request() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/api/2/create"))
            .and(body_json(serde_json::json!({"name": "test"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(TestResponse {
                message: "created".to_string(),
                value: 1,
            }))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(create_config(&server.uri())).unwrap();

        let request = TestRequest {
            name: "test".to_string(),
        };
        let result: TestResponse = transport.post("/rest/api/2/create", &request).await.unwrap();
        assert_eq!(result.message, "created");
    }

    #[tokio::test]
    async fn test_basic_auth_header() {
        let server = MockServer::start().await;

        // base64("dev@example.com:token")
        Mock::given(method("GET"))
            .and(path("/rest/api/2/myself"))
            .and(header(
                "Authorization",
                "Basic ZGV2QGV4YW1wbGUuY29tOnRva2Vu",
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(TestResponse {
                message: "authorized".to_string(),
                value: 100,
            }))
            .mount(&server)
            .await;

        let config = create_config_with_auth(
            &server.uri(),
            JiraAuth::Basic {
                email: "dev@example.com".to_string(),
                api_token: "token".to_string(),
            },
        );
        let transport = HttpTransport::new(config).unwrap();

        let result: TestResponse = transport.get("/rest/api/2/myself").await.unwrap();
        assert_eq!(result.message, "authorized");
    }

    #[tokio::test]
    async fn test_bearer_auth_header() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/2/myself"))
            .and(header("Authorization", "Bearer test-pat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(TestResponse {
                message: "pat".to_string(),
                value: 1,
            }))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(create_config(&server.uri())).unwrap();
        let result: TestResponse = transport.get("/rest/api/2/myself").await.unwrap();
        assert_eq!(result.message, "pat");
    }

    #[tokio::test]
    async fn test_context_path_preserved() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/jira/rest/api/2/test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(TestResponse {
                message: "context".to_string(),
                value: 7,
            }))
            .mount(&server)
            .await;

        let transport =
            HttpTransport::new(create_config(&format!("{}/jira/", server.uri()))).unwrap();
        let result: TestResponse = transport.get("/rest/api/2/test").await.unwrap();
        assert_eq!(result.value, 7);
    }

    #[tokio::test]
    async fn test_validation_error_on_400() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/api/2/issue"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "errorMessages": [],
                "errors": {"summary": "required"}
            })))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(create_config(&server.uri())).unwrap();
        let result: JiraResult<TestResponse> = transport
            .post("/rest/api/2/issue", &serde_json::json!({}))
            .await;
        match result {
            Err(JiraError::Validation { field_errors, .. }) => {
                assert_eq!(field_errors["summary"], "required")
            }
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_not_found_on_404() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/2/issue/NOPE-1"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "errorMessages": ["Issue does not exist or you do not have permission to see it."],
                "errors": {}
            })))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(create_config(&server.uri())).unwrap();
        let result: JiraResult<TestResponse> = transport.get("/rest/api/2/issue/NOPE-1").await;
        assert!(matches!(result, Err(JiraError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_rate_limit_exhausts_retries() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/2/busy"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
            .expect(2)
            .mount(&server)
            .await;

        let config = Arc::new(ClientConfig {
            base_url: url::Url::parse(&server.uri()).unwrap(),
            auth: JiraAuth::Bearer("t".to_string()),
            timeout: Duration::from_secs(30),
            retry_config: RetryConfig {
                max_retries: 1,
                ..Default::default()
            },
        });
        let transport = HttpTransport::new(config).unwrap();

        let result: JiraResult<TestResponse> = transport.get("/rest/api/2/busy").await;
        assert!(matches!(
            result,
            Err(JiraError::RateLimited {
                retry_after_secs: Some(0)
            })
        ));
    }

    #[tokio::test]
    async fn test_retry_then_success() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rest/api/2/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/api/2/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_json(TestResponse {
                message: "recovered".to_string(),
                value: 2,
            }))
            .mount(&server)
            .await;

        let config = Arc::new(ClientConfig {
            base_url: url::Url::parse(&server.uri()).unwrap(),
            auth: JiraAuth::Bearer("t".to_string()),
            timeout: Duration::from_secs(30),
            retry_config: RetryConfig {
                max_retries: 2,
                initial_backoff: Duration::from_millis(10),
                ..Default::default()
            },
        });
        let transport = HttpTransport::new(config).unwrap();

        let result: TestResponse = transport.get("/rest/api/2/flaky").await.unwrap();
        assert_eq!(result.message, "recovered");
    }

    #[tokio::test]
    async fn test_no_content_responses() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/rest/api/2/issue/ABC-1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/rest/api/2/issue/ABC-1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(create_config(&server.uri())).unwrap();
        transport
            .put_no_response("/rest/api/2/issue/ABC-1", &serde_json::json!({"fields": {}}))
            .await
            .unwrap();
        transport
            .delete_no_response("/rest/api/2/issue/ABC-1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_build_url() {
        let transport = HttpTransport::new(create_config("http://localhost:8080/")).unwrap();

        let url = transport.build_url("/rest/api/2/issue/ABC-1").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/rest/api/2/issue/ABC-1");
    }
}
