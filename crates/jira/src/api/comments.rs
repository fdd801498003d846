//! Issue comments.

use super::API_PREFIX;
use crate::client::JiraClient;
use crate::error::{JiraError, JiraResult};
use crate::types::{validate_issue_key, Comment, CommentPage};
use serde_json::json;

pub struct CommentsApi<'a> {
    client: &'a JiraClient,
}

impl<'a> CommentsApi<'a> {
    pub(crate) fn new(client: &'a JiraClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, key: &str, start_at: u32, max_results: u32) -> JiraResult<CommentPage> {
        validate_issue_key(key)?;
        self.client
            .http
            .get_with_query(
                &format!("{}/issue/{}/comment", API_PREFIX, key),
                &[("startAt", start_at), ("maxResults", max_results)],
            )
            .await
    }

    pub async fn add(&self, key: &str, body: &str) -> JiraResult<Comment> {
        validate_issue_key(key)?;
        if body.trim().is_empty() {
            return Err(JiraError::validation("Comment body must not be empty"));
        }
        self.client
            .http
            .post(
                &format!("{}/issue/{}/comment", API_PREFIX, key),
                &json!({ "body": body }),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use crate::client::JiraClient;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_add_and_list_comments() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/api/2/issue/PROJ-1/comment"))
            .and(body_json(json!({"body": "Looks good"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "100", "body": "Looks good", "author": {"displayName": "Dev"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/api/2/issue/PROJ-1/comment"))
            .and(query_param("maxResults", "20"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "startAt": 0, "maxResults": 20, "total": 1,
                "comments": [{"id": "100", "body": "Looks good"}]
            })))
            .mount(&server)
            .await;

        let client = JiraClient::builder()
            .base_url(server.uri())
            .bearer_token("pat")
            .build()
            .unwrap();
        let comment = client.comments().add("PROJ-1", "Looks good").await.unwrap();
        assert_eq!(comment.id, "100");
        assert_eq!(
            comment.author.and_then(|a| a.display_name).as_deref(),
            Some("Dev")
        );

        let page = client.comments().list("PROJ-1", 0, 20).await.unwrap();
        assert_eq!(page.total, 1);
        assert!(client.comments().add("PROJ-1", " ").await.is_err());
    }
}
