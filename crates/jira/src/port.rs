//! Issue tracker port; `JiraClient` is the production adapter.

use crate::client::JiraClient;
use crate::error::JiraResult;
use crate::types::{
    Comment, CommentPage, CreateIssueRequest, CreatedIssue, Issue, IssueTypeStatuses, Project,
    SearchRequest, SearchResults, Transition, UpdateIssueRequest, User,
};
use async_trait::async_trait;

/// Operations the MCP tools and use cases need from an issue tracker.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn myself(&self) -> JiraResult<User>;

    async fn get_issue(&self, key: &str, fields: &[String]) -> JiraResult<Issue>;

    async fn search(&self, request: &SearchRequest) -> JiraResult<SearchResults>;

    async fn create_issue(&self, request: &CreateIssueRequest) -> JiraResult<CreatedIssue>;

    async fn update_issue(&self, key: &str, request: &UpdateIssueRequest) -> JiraResult<()>;

    async fn delete_issue(&self, key: &str, delete_subtasks: bool) -> JiraResult<()>;

    async fn list_transitions(&self, key: &str) -> JiraResult<Vec<Transition>>;

    async fn transition_issue(
        &self,
        key: &str,
        transition_id: &str,
        comment: Option<&str>,
    ) -> JiraResult<()>;

    async fn add_comment(&self, key: &str, body: &str) -> JiraResult<Comment>;

    async fn list_comments(&self, key: &str, start_at: u32, max_results: u32)
        -> JiraResult<CommentPage>;

    async fn assign_issue(&self, key: &str, account_id: Option<&str>) -> JiraResult<()>;

    async fn list_projects(&self) -> JiraResult<Vec<Project>>;

    async fn get_project(&self, key: &str) -> JiraResult<Project>;

    async fn project_statuses(&self, key: &str) -> JiraResult<Vec<IssueTypeStatuses>>;
}

#[async_trait]
impl IssueTracker for JiraClient {
    async fn myself(&self) -> JiraResult<User> {
        self.users().myself().await
    }

    async fn get_issue(&self, key: &str, fields: &[String]) -> JiraResult<Issue> {
        self.issues().get(key, fields).await
    }

    async fn search(&self, request: &SearchRequest) -> JiraResult<SearchResults> {
        JiraClient::search(self).jql(request).await
    }

    async fn create_issue(&self, request: &CreateIssueRequest) -> JiraResult<CreatedIssue> {
        self.issues().create(request).await
    }

    async fn update_issue(&self, key: &str, request: &UpdateIssueRequest) -> JiraResult<()> {
        self.issues().update(key, request).await
    }

    async fn delete_issue(&self, key: &str, delete_subtasks: bool) -> JiraResult<()> {
        self.issues().delete(key, delete_subtasks).await
    }

    async fn list_transitions(&self, key: &str) -> JiraResult<Vec<Transition>> {
        self.transitions().list(key).await
    }

    async fn transition_issue(
        &self,
        key: &str,
        transition_id: &str,
        comment: Option<&str>,
    ) -> JiraResult<()> {
        self.transitions().perform(key, transition_id, comment).await
    }

    async fn add_comment(&self, key: &str, body: &str) -> JiraResult<Comment> {
        self.comments().add(key, body).await
    }

    async fn list_comments(
        &self,
        key: &str,
        start_at: u32,
        max_results: u32,
    ) -> JiraResult<CommentPage> {
        self.comments().list(key, start_at, max_results).await
    }

    async fn assign_issue(&self, key: &str, account_id: Option<&str>) -> JiraResult<()> {
        self.issues().assign(key, account_id).await
    }

    async fn list_projects(&self) -> JiraResult<Vec<Project>> {
        self.projects().list().await
    }

    async fn get_project(&self, key: &str) -> JiraResult<Project> {
        self.projects().get(key).await
    }

    async fn project_statuses(&self, key: &str) -> JiraResult<Vec<IssueTypeStatuses>> {
        self.projects().statuses(key).await
    }
}
