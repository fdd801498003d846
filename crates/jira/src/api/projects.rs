//! Projects and their workflow statuses.

use super::API_PREFIX;
use crate::client::JiraClient;
use crate::error::{JiraError, JiraResult};
use crate::types::{IssueTypeStatuses, Project};

pub struct ProjectsApi<'a> {
    client: &'a JiraClient,
}

impl<'a> ProjectsApi<'a> {
    pub(crate) fn new(client: &'a JiraClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> JiraResult<Vec<Project>> {
        self.client
            .http
            .get(&format!("{}/project", API_PREFIX))
            .await
    }

    pub async fn get(&self, key: &str) -> JiraResult<Project> {
        validate_project_key(key)?;
        self.client
            .http
            .get(&format!("{}/project/{}", API_PREFIX, key))
            .await
    }

    /// Statuses per issue type.
    pub async fn statuses(&self, key: &str) -> JiraResult<Vec<IssueTypeStatuses>> {
        validate_project_key(key)?;
        self.client
            .http
            .get(&format!("{}/project/{}/statuses", API_PREFIX, key))
            .await
    }
}

fn validate_project_key(key: &str) -> JiraResult<()> {
    if !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(JiraError::validation(format!("Invalid project key '{}'", key)))
    }
}
