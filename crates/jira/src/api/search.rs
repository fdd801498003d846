//! JQL search.

use super::API_PREFIX;
use crate::client::JiraClient;
use crate::error::{JiraError, JiraResult};
use crate::types::{SearchRequest, SearchResults};

pub struct SearchApi<'a> {
    client: &'a JiraClient,
}

impl<'a> SearchApi<'a> {
    pub(crate) fn new(client: &'a JiraClient) -> Self {
        Self { client }
    }

    pub async fn jql(&self, request: &SearchRequest) -> JiraResult<SearchResults> {
        if request.jql.trim().is_empty() {
            return Err(JiraError::validation("JQL query must not be empty"));
        }
        self.client
            .http
            .post(&format!("{}/search", API_PREFIX), request)
            .await
    }
}

#[cfg(test)]
mod tests {
    use crate::client::JiraClient;
    use crate::types::SearchRequest;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_search() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/api/2/search"))
            .and(body_partial_json(json!({"jql": "assignee = currentUser()", "maxResults": 10})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "startAt": 0,
                "maxResults": 10,
                "total": 1,
                "issues": [{"id": "1", "key": "PROJ-1", "fields": {"summary": "Mine"}}]
            })))
            .mount(&server)
            .await;

        let client = JiraClient::builder()
            .base_url(server.uri())
            .basic_auth("dev@example.com", "token")
            .build()
            .unwrap();
        let results = client
            .search()
            .jql(&SearchRequest::new("assignee = currentUser()").page(0, 10))
            .await
            .unwrap();
        assert_eq!(results.total, 1);
        assert_eq!(results.issues[0].key, "PROJ-1");
    }

    #[tokio::test]
    async fn test_empty_jql_rejected() {
        let client = JiraClient::builder()
            .base_url("http://localhost:1")
            .bearer_token("pat")
            .build()
            .unwrap();
        assert!(client.search().jql(&SearchRequest::new("  ")).await.is_err());
    }
}
