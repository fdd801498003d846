//! Jira REST v2 data types.

use crate::error::{JiraError, JiraResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;

static ISSUE_KEY: OnceLock<Regex> = OnceLock::new();

/// Reject anything that is not a `PROJ-123` style key before it reaches a URL.
pub fn validate_issue_key(key: &str) -> JiraResult<()> {
    let re = ISSUE_KEY.get_or_init(|| {
        Regex::new(r"^[A-Z][A-Z0-9_]*-\d+$").expect("valid regex")
    });
    if re.is_match(key) {
        Ok(())
    } else {
        Err(JiraError::validation(format!(
            "Invalid issue key '{}': expected PROJECT-123",
            key
        )))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    /// Username on Server / Data Center.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCategory {
    pub key: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_category: Option<StatusCategory>,
}

impl Status {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            status_category: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub subtask: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Priority {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub key: String,
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_url: Option<String>,
    #[serde(default)]
    pub fields: IssueFields,
}

impl Issue {
    pub fn status_name(&self) -> Option<&str> {
        self.fields.status.as_ref().map(|s| s.name.as_str())
    }
}

/// Well-known fields; custom fields land in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueFields {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub issuetype: Option<IssueType>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub assignee: Option<User>,
    #[serde(default)]
    pub reporter: Option<User>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
    #[serde(default)]
    pub project: Option<ProjectRef>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub jql: String,
    pub start_at: u32,
    pub max_results: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<String>,
}

impl SearchRequest {
    pub fn new(jql: impl Into<String>) -> Self {
        Self {
            jql: jql.into(),
            start_at: 0,
            max_results: 50,
            fields: Vec::new(),
        }
    }

    pub fn page(mut self, start_at: u32, max_results: u32) -> Self {
        self.start_at = start_at;
        self.max_results = max_results.clamp(1, 100);
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    #[serde(default)]
    pub start_at: u32,
    #[serde(default)]
    pub max_results: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub issues: Vec<Issue>,
}

/// Fields for a new issue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateIssueRequest {
    pub project_key: String,
    pub summary: String,
    pub issue_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub assignee_account_id: Option<String>,
    /// Raw fields merged into the payload as-is (custom fields).
    #[serde(default)]
    pub extra_fields: Map<String, Value>,
}

impl CreateIssueRequest {
    pub fn new(
        project_key: impl Into<String>,
        summary: impl Into<String>,
        issue_type: impl Into<String>,
    ) -> Self {
        Self {
            project_key: project_key.into(),
            summary: summary.into(),
            issue_type: issue_type.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> JiraResult<()> {
        let mut field_errors = BTreeMap::new();
        for (field, value) in [
            ("project", &self.project_key),
            ("summary", &self.summary),
            ("issuetype", &self.issue_type),
        ] {
            if value.trim().is_empty() {
                field_errors.insert(field.to_string(), "must not be empty".to_string());
            }
        }
        if field_errors.is_empty() {
            Ok(())
        } else {
            Err(JiraError::Validation {
                message: format!(
                    "Missing required fields: {}",
                    field_errors.keys().cloned().collect::<Vec<_>>().join(", ")
                ),
                field_errors,
            })
        }
    }

    pub fn to_payload(&self) -> Value {
        let mut fields = Map::new();
        fields.insert("project".into(), json!({ "key": self.project_key }));
        fields.insert("summary".into(), json!(self.summary));
        fields.insert("issuetype".into(), json!({ "name": self.issue_type }));
        if let Some(description) = &self.description {
            fields.insert("description".into(), json!(description));
        }
        if let Some(priority) = &self.priority {
            fields.insert("priority".into(), json!({ "name": priority }));
        }
        if !self.labels.is_empty() {
            fields.insert("labels".into(), json!(self.labels));
        }
        if let Some(account_id) = &self.assignee_account_id {
            fields.insert("assignee".into(), json!({ "accountId": account_id }));
        }
        for (key, value) in &self.extra_fields {
            fields.insert(key.clone(), value.clone());
        }
        json!({ "fields": fields })
    }
}

/// Partial update; only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateIssueRequest {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub labels: Option<Vec<String>>,
    #[serde(default)]
    pub extra_fields: Map<String, Value>,
}

impl UpdateIssueRequest {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.labels.is_none()
            && self.extra_fields.is_empty()
    }

    pub fn to_payload(&self) -> Value {
        let mut fields = Map::new();
        if let Some(summary) = &self.summary {
            fields.insert("summary".into(), json!(summary));
        }
        if let Some(description) = &self.description {
            fields.insert("description".into(), json!(description));
        }
        if let Some(priority) = &self.priority {
            fields.insert("priority".into(), json!({ "name": priority }));
        }
        if let Some(labels) = &self.labels {
            fields.insert("labels".into(), json!(labels));
        }
        for (key, value) in &self.extra_fields {
            fields.insert(key.clone(), value.clone());
        }
        json!({ "fields": fields })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedIssue {
    pub id: String,
    pub key: String,
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub self_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub id: String,
    pub name: String,
    pub to: Status,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPage {
    #[serde(default)]
    pub start_at: u32,
    #[serde(default)]
    pub max_results: u32,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub key: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_type_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead: Option<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Statuses available to one issue type of a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueTypeStatuses {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub statuses: Vec<Status>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_key_validation() {
        assert!(validate_issue_key("PROJ-1").is_ok());
        assert!(validate_issue_key("AB_2-12345").is_ok());
        assert!(validate_issue_key("proj-1").is_err());
        assert!(validate_issue_key("PROJ1").is_err());
        assert!(validate_issue_key("PROJ-1/../../admin").is_err());
        assert!(validate_issue_key("1PROJ-1").is_err());
    }

    #[test]
    fn test_issue_deserialization_keeps_custom_fields() {
        let raw = json!({
            "id": "10001",
            "key": "PROJ-7",
            "self": "https://example.atlassian.net/rest/api/2/issue/10001",
            "fields": {
                "summary": "Broken login",
                "status": {"id": "3", "name": "In Progress", "statusCategory": {"key": "indeterminate", "name": "In Progress"}},
                "issuetype": {"name": "Bug"},
                "priority": null,
                "labels": ["auth"],
                "customfield_10016": 5
            }
        });
        let issue: Issue = serde_json::from_value(raw).unwrap();
        assert_eq!(issue.status_name(), Some("In Progress"));
        assert_eq!(issue.fields.labels, vec!["auth"]);
        assert!(issue.fields.priority.is_none());
        assert_eq!(issue.fields.extra["customfield_10016"], json!(5));
    }

    #[test]
    fn test_create_request_validation() {
        let request = CreateIssueRequest::new("PROJ", " ", "");
        match request.validate().unwrap_err() {
            JiraError::Validation { field_errors, .. } => {
                assert!(field_errors.contains_key("summary"));
                assert!(field_errors.contains_key("issuetype"));
                assert!(!field_errors.contains_key("project"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_create_payload() {
        let mut request = CreateIssueRequest::new("PROJ", "Add export", "Story");
        request.priority = Some("High".to_string());
        request
            .extra_fields
            .insert("customfield_10016".to_string(), json!(3));

        let payload = request.to_payload();
        assert_eq!(payload["fields"]["project"]["key"], "PROJ");
        assert_eq!(payload["fields"]["issuetype"]["name"], "Story");
        assert_eq!(payload["fields"]["priority"]["name"], "High");
        assert_eq!(payload["fields"]["customfield_10016"], 3);
        assert!(payload["fields"].get("labels").is_none());
    }

    #[test]
    fn test_update_payload_only_sets_fields() {
        let request = UpdateIssueRequest {
            labels: Some(vec![]),
            ..Default::default()
        };
        assert!(!request.is_empty());
        assert_eq!(request.to_payload(), json!({"fields": {"labels": []}}));
        assert!(UpdateIssueRequest::default().is_empty());
    }

    #[test]
    fn test_search_request_serialization() {
        let request = SearchRequest::new("project = PROJ").page(50, 500);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["startAt"], 50);
        assert_eq!(value["maxResults"], 100);
        assert!(value.get("fields").is_none());
    }
}
