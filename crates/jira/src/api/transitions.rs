//! Workflow transitions of an issue.

use super::API_PREFIX;
use crate::client::JiraClient;
use crate::error::JiraResult;
use crate::types::{validate_issue_key, Transition};
use serde::Deserialize;
use serde_json::json;

pub struct TransitionsApi<'a> {
    client: &'a JiraClient,
}

impl<'a> TransitionsApi<'a> {
    pub(crate) fn new(client: &'a JiraClient) -> Self {
        Self { client }
    }

    /// Transitions available from the issue's current status.
    pub async fn list(&self, key: &str) -> JiraResult<Vec<Transition>> {
        validate_issue_key(key)?;
        let response: TransitionsResponse = self
            .client
            .http
            .get(&format!("{}/issue/{}/transitions", API_PREFIX, key))
            .await?;
        Ok(response.transitions)
    }

    /// Perform a transition, optionally leaving a comment.
    pub async fn perform(
        &self,
        key: &str,
        transition_id: &str,
        comment: Option<&str>,
    ) -> JiraResult<()> {
        validate_issue_key(key)?;
        let mut body = json!({ "transition": { "id": transition_id } });
        if let Some(comment) = comment {
            body["update"] = json!({ "comment": [{ "add": { "body": comment } }] });
        }
        self.client
            .http
            .post_no_response(&format!("{}/issue/{}/transitions", API_PREFIX, key), &body)
            .await
    }
}

#[derive(Debug, Deserialize)]
struct TransitionsResponse {
    #[serde(default)]
    transitions: Vec<Transition>,
}
