//! Issue CRUD and assignment.

use super::API_PREFIX;
use crate::client::JiraClient;
use crate::error::{JiraError, JiraResult};
use crate::types::{validate_issue_key, CreateIssueRequest, CreatedIssue, Issue, UpdateIssueRequest};
use serde_json::json;

pub struct IssuesApi<'a> {
    client: &'a JiraClient,
}

impl<'a> IssuesApi<'a> {
    pub(crate) fn new(client: &'a JiraClient) -> Self {
        Self { client }
    }

    /// Fetch an issue; `fields` limits the returned fields when non-empty.
    pub async fn get(&self, key: &str, fields: &[String]) -> JiraResult<Issue> {
        validate_issue_key(key)?;
        let path = format!("{}/issue/{}", API_PREFIX, key);
        if fields.is_empty() {
            self.client.http.get(&path).await
        } else {
            self.client
                .http
                .get_with_query(&path, &[("fields", fields.join(","))])
                .await
        }
    }

    pub async fn create(&self, request: &CreateIssueRequest) -> JiraResult<CreatedIssue> {
        request.validate()?;
        self.client
            .http
            .post(&format!("{}/issue", API_PREFIX), &request.to_payload())
            .await
    }

    pub async fn update(&self, key: &str, request: &UpdateIssueRequest) -> JiraResult<()> {
        validate_issue_key(key)?;
        if request.is_empty() {
            return Err(JiraError::validation("Nothing to update"));
        }
        self.client
            .http
            .put_no_response(&format!("{}/issue/{}", API_PREFIX, key), &request.to_payload())
            .await
    }

    pub async fn delete(&self, key: &str, delete_subtasks: bool) -> JiraResult<()> {
        validate_issue_key(key)?;
        let path = format!(
            "{}/issue/{}?deleteSubtasks={}",
            API_PREFIX, key, delete_subtasks
        );
        self.client.http.delete_no_response(&path).await
    }

    /// Assign to an account, or unassign with `None`.
    pub async fn assign(&self, key: &str, account_id: Option<&str>) -> JiraResult<()> {
        validate_issue_key(key)?;
        self.client
            .http
            .put_no_response(
                &format!("{}/issue/{}/assignee", API_PREFIX, key),
                &json!({ "accountId": account_id }),
            )
            .await
    }
}
