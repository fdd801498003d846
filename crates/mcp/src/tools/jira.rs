// Jira tools backed by the IssueTracker port

use crate::protocol::{CallToolResult, ToolSchema};
use crate::tools::{
    json_schema_array, json_schema_boolean, json_schema_integer, json_schema_object,
    json_schema_string, parse_args, tool_failure, tool_success, Tool, ToolTier,
};
use anyhow::Result;
use mcphub_jira::usecases::{self, DEFAULT_MAX_HOPS};
use mcphub_jira::{
    CreateIssueRequest, Issue, IssueTracker, JiraError, SearchRequest, UpdateIssueRequest,
    WorkflowGraph,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Tracker plus the workflow graph learned across calls
#[derive(Clone)]
pub struct JiraHandle {
    tracker: Arc<dyn IssueTracker>,
    workflow: Arc<Mutex<WorkflowGraph>>,
}

impl JiraHandle {
    pub fn new(tracker: Arc<dyn IssueTracker>) -> Self {
        Self {
            tracker,
            workflow: Arc::new(Mutex::new(WorkflowGraph::new())),
        }
    }
}

/// Every Jira tool sharing one handle
pub fn jira_tools(handle: JiraHandle) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(GetIssueTool(handle.clone())),
        Arc::new(SearchIssuesTool(handle.clone())),
        Arc::new(CreateIssueTool(handle.clone())),
        Arc::new(UpdateIssueTool(handle.clone())),
        Arc::new(DeleteIssueTool(handle.clone())),
        Arc::new(AddCommentTool(handle.clone())),
        Arc::new(ListCommentsTool(handle.clone())),
        Arc::new(ListTransitionsTool(handle.clone())),
        Arc::new(TransitionIssueTool(handle.clone())),
        Arc::new(TransitionToStatusTool(handle.clone())),
        Arc::new(AssignIssueTool(handle.clone())),
        Arc::new(ListProjectsTool(handle.clone())),
        Arc::new(GetProjectTool(handle.clone())),
        Arc::new(WhoAmITool(handle)),
    ]
}

fn jira_failure(error: JiraError) -> CallToolResult {
    let message = match &error {
        JiraError::Validation { field_errors, .. } if !field_errors.is_empty() => {
            let fields: Vec<String> = field_errors
                .iter()
                .map(|(field, message)| format!("{}: {}", field, message))
                .collect();
            format!("{} ({})", error, fields.join("; "))
        }
        _ => error.to_string(),
    };
    tool_failure(message, error.error_type())
}

/// Compact view used in search results
fn issue_summary(issue: &Issue) -> Value {
    json!({
        "key": issue.key,
        "summary": issue.fields.summary,
        "status": issue.status_name(),
        "issue_type": issue.fields.issuetype.as_ref().map(|t| &t.name),
        "priority": issue.fields.priority.as_ref().map(|p| &p.name),
        "assignee": issue.fields.assignee.as_ref().and_then(|u| u.display_name.clone()),
        "updated": issue.fields.updated,
    })
}

fn schema(name: &str, description: &str, properties: Value, required: Vec<&str>) -> ToolSchema {
    ToolSchema {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: json_schema_object(properties, required),
    }
}

macro_rules! args_or_return {
    ($arguments:expr) => {
        match parse_args($arguments) {
            Ok(args) => args,
            Err(failure) => return Ok(failure),
        }
    };
}

#[derive(Debug, Deserialize)]
struct KeyArgs {
    key: String,
}

pub struct GetIssueTool(JiraHandle);

#[derive(Debug, Deserialize)]
struct GetIssueArgs {
    key: String,
    #[serde(default)]
    fields: Vec<String>,
}

#[async_trait::async_trait]
impl Tool for GetIssueTool {
    fn schema(&self) -> ToolSchema {
        schema(
            "jira_get_issue",
            "Fetch a Jira issue by key",
            json!({
                "key": json_schema_string("Issue key, e.g. PROJ-123"),
                "fields": json_schema_array(json_schema_string("Field name"), "Restrict returned fields"),
            }),
            vec!["key"],
        )
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: GetIssueArgs = args_or_return!(arguments);
        match self.0.tracker.get_issue(&args.key, &args.fields).await {
            Ok(issue) => Ok(tool_success(json!({
                "key": issue.key,
                "status": issue.status_name(),
                "issue": serde_json::to_value(&issue)?,
            }))),
            Err(e) => Ok(jira_failure(e)),
        }
    }
}

pub struct SearchIssuesTool(JiraHandle);

#[derive(Debug, Deserialize)]
struct SearchArgs {
    jql: String,
    #[serde(default)]
    start_at: u32,
    #[serde(default = "default_page_size")]
    max_results: u32,
    #[serde(default)]
    fields: Vec<String>,
}

fn default_page_size() -> u32 {
    50
}

#[async_trait::async_trait]
impl Tool for SearchIssuesTool {
    fn schema(&self) -> ToolSchema {
        schema(
            "jira_search",
            "Search issues with JQL",
            json!({
                "jql": json_schema_string("JQL query, e.g. project = PROJ AND status = \"In Progress\""),
                "start_at": json_schema_integer("Index of the first result"),
                "max_results": json_schema_integer("Page size, 1-100 (default 50)"),
                "fields": json_schema_array(json_schema_string("Field name"), "Fields to fetch"),
            }),
            vec!["jql"],
        )
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: SearchArgs = args_or_return!(arguments);
        let request = SearchRequest::new(args.jql)
            .page(args.start_at, args.max_results)
            .fields(args.fields);

        match self.0.tracker.search(&request).await {
            Ok(results) => {
                let issues: Vec<Value> = results.issues.iter().map(issue_summary).collect();
                Ok(tool_success(json!({
                    "total": results.total,
                    "start_at": results.start_at,
                    "max_results": results.max_results,
                    "count": issues.len(),
                    "issues": issues,
                })))
            }
            Err(e) => Ok(jira_failure(e)),
        }
    }
}

pub struct CreateIssueTool(JiraHandle);

#[derive(Debug, Deserialize)]
struct CreateIssueArgs {
    project_key: String,
    summary: String,
    #[serde(default = "default_issue_type")]
    issue_type: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    assignee_account_id: Option<String>,
    #[serde(default)]
    extra_fields: Map<String, Value>,
}

fn default_issue_type() -> String {
    "Task".to_string()
}

#[async_trait::async_trait]
impl Tool for CreateIssueTool {
    fn schema(&self) -> ToolSchema {
        schema(
            "jira_create_issue",
            "Create a Jira issue",
            json!({
                "project_key": json_schema_string("Project key"),
                "summary": json_schema_string("Issue summary"),
                "issue_type": json_schema_string("Issue type name (default Task)"),
                "description": json_schema_string("Issue description"),
                "priority": json_schema_string("Priority name"),
                "labels": json_schema_array(json_schema_string("Label"), "Labels"),
                "assignee_account_id": json_schema_string("Account id of the assignee"),
                "extra_fields": {
                    "type": "object",
                    "description": "Additional raw Jira fields, passed through unchanged"
                },
            }),
            vec!["project_key", "summary"],
        )
    }

    fn tier(&self) -> ToolTier {
        ToolTier::Write
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: CreateIssueArgs = args_or_return!(arguments);
        let request = CreateIssueRequest {
            description: args.description,
            priority: args.priority,
            labels: args.labels,
            assignee_account_id: args.assignee_account_id,
            extra_fields: args.extra_fields,
            ..CreateIssueRequest::new(args.project_key, args.summary, args.issue_type)
        };

        match self.0.tracker.create_issue(&request).await {
            Ok(created) => Ok(tool_success(json!({
                "key": created.key,
                "id": created.id,
                "url": created.self_url,
            }))),
            Err(e) => Ok(jira_failure(e)),
        }
    }
}

pub struct UpdateIssueTool(JiraHandle);

#[derive(Debug, Deserialize)]
struct UpdateIssueArgs {
    key: String,
    #[serde(flatten)]
    update: UpdateIssueRequest,
}

#[async_trait::async_trait]
impl Tool for UpdateIssueTool {
    fn schema(&self) -> ToolSchema {
        schema(
            "jira_update_issue",
            "Update fields of a Jira issue; only given fields change",
            json!({
                "key": json_schema_string("Issue key"),
                "summary": json_schema_string("New summary"),
                "description": json_schema_string("New description"),
                "priority": json_schema_string("Priority name"),
                "labels": json_schema_array(json_schema_string("Label"), "Replaces all labels"),
                "extra_fields": {
                    "type": "object",
                    "description": "Additional raw Jira fields"
                },
            }),
            vec!["key"],
        )
    }

    fn tier(&self) -> ToolTier {
        ToolTier::Write
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: UpdateIssueArgs = args_or_return!(arguments);
        match self.0.tracker.update_issue(&args.key, &args.update).await {
            Ok(()) => Ok(tool_success(json!({ "key": args.key, "updated": true }))),
            Err(e) => Ok(jira_failure(e)),
        }
    }
}

pub struct DeleteIssueTool(JiraHandle);

#[derive(Debug, Deserialize)]
struct DeleteIssueArgs {
    key: String,
    #[serde(default)]
    delete_subtasks: bool,
}

#[async_trait::async_trait]
impl Tool for DeleteIssueTool {
    fn schema(&self) -> ToolSchema {
        schema(
            "jira_delete_issue",
            "Permanently delete a Jira issue",
            json!({
                "key": json_schema_string("Issue key"),
                "delete_subtasks": json_schema_boolean("Also delete subtasks (required if any exist)"),
            }),
            vec!["key"],
        )
    }

    fn tier(&self) -> ToolTier {
        ToolTier::Dangerous
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: DeleteIssueArgs = args_or_return!(arguments);
        match self
            .0
            .tracker
            .delete_issue(&args.key, args.delete_subtasks)
            .await
        {
            Ok(()) => Ok(tool_success(json!({ "key": args.key, "deleted": true }))),
            Err(e) => Ok(jira_failure(e)),
        }
    }
}

pub struct AddCommentTool(JiraHandle);

#[derive(Debug, Deserialize)]
struct AddCommentArgs {
    key: String,
    body: String,
}

#[async_trait::async_trait]
impl Tool for AddCommentTool {
    fn schema(&self) -> ToolSchema {
        schema(
            "jira_add_comment",
            "Add a comment to a Jira issue",
            json!({
                "key": json_schema_string("Issue key"),
                "body": json_schema_string("Comment text (Jira wiki markup)"),
            }),
            vec!["key", "body"],
        )
    }

    fn tier(&self) -> ToolTier {
        ToolTier::Write
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: AddCommentArgs = args_or_return!(arguments);
        match self.0.tracker.add_comment(&args.key, &args.body).await {
            Ok(comment) => Ok(tool_success(json!({
                "key": args.key,
                "comment": serde_json::to_value(&comment)?,
            }))),
            Err(e) => Ok(jira_failure(e)),
        }
    }
}

pub struct ListCommentsTool(JiraHandle);

#[derive(Debug, Deserialize)]
struct ListCommentsArgs {
    key: String,
    #[serde(default)]
    start_at: u32,
    #[serde(default = "default_page_size")]
    max_results: u32,
}

#[async_trait::async_trait]
impl Tool for ListCommentsTool {
    fn schema(&self) -> ToolSchema {
        schema(
            "jira_list_comments",
            "List comments on a Jira issue",
            json!({
                "key": json_schema_string("Issue key"),
                "start_at": json_schema_integer("Index of the first comment"),
                "max_results": json_schema_integer("Page size (default 50)"),
            }),
            vec!["key"],
        )
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: ListCommentsArgs = args_or_return!(arguments);
        match self
            .0
            .tracker
            .list_comments(&args.key, args.start_at, args.max_results.clamp(1, 100))
            .await
        {
            Ok(page) => Ok(tool_success(json!({
                "key": args.key,
                "total": page.total,
                "comments": serde_json::to_value(&page.comments)?,
            }))),
            Err(e) => Ok(jira_failure(e)),
        }
    }
}

pub struct ListTransitionsTool(JiraHandle);

#[async_trait::async_trait]
impl Tool for ListTransitionsTool {
    fn schema(&self) -> ToolSchema {
        schema(
            "jira_list_transitions",
            "Current status of an issue and the transitions available from it",
            json!({ "key": json_schema_string("Issue key") }),
            vec!["key"],
        )
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: KeyArgs = args_or_return!(arguments);
        let mut graph = self.0.workflow.lock().await;
        match usecases::describe_workflow(self.0.tracker.as_ref(), &mut graph, &args.key).await {
            Ok(snapshot) => Ok(tool_success(serde_json::to_value(&snapshot)?)),
            Err(e) => Ok(jira_failure(e)),
        }
    }
}

pub struct TransitionIssueTool(JiraHandle);

#[derive(Debug, Deserialize)]
struct TransitionIssueArgs {
    key: String,
    /// Transition id or name
    transition: String,
    #[serde(default)]
    comment: Option<String>,
}

#[async_trait::async_trait]
impl Tool for TransitionIssueTool {
    fn schema(&self) -> ToolSchema {
        schema(
            "jira_transition_issue",
            "Apply one workflow transition to an issue",
            json!({
                "key": json_schema_string("Issue key"),
                "transition": json_schema_string("Transition id or name, as listed by jira_list_transitions"),
                "comment": json_schema_string("Comment added with the transition"),
            }),
            vec!["key", "transition"],
        )
    }

    fn tier(&self) -> ToolTier {
        ToolTier::Write
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: TransitionIssueArgs = args_or_return!(arguments);
        let available = match self.0.tracker.list_transitions(&args.key).await {
            Ok(transitions) => transitions,
            Err(e) => return Ok(jira_failure(e)),
        };

        let wanted = args.transition.trim();
        let Some(transition) = available
            .iter()
            .find(|t| t.id == wanted)
            .or_else(|| available.iter().find(|t| t.name.eq_ignore_ascii_case(wanted)))
        else {
            let names: Vec<String> = available
                .iter()
                .map(|t| format!("{} ({})", t.name, t.id))
                .collect();
            return Ok(tool_failure(
                format!(
                    "Transition '{}' is not available for {}. Available: [{}]",
                    wanted,
                    args.key,
                    names.join(", ")
                ),
                "validation",
            ));
        };

        match self
            .0
            .tracker
            .transition_issue(&args.key, &transition.id, args.comment.as_deref())
            .await
        {
            Ok(()) => Ok(tool_success(json!({
                "key": args.key,
                "transition": transition.name,
                "status": transition.to.name,
            }))),
            Err(e) => Ok(jira_failure(e)),
        }
    }
}

pub struct TransitionToStatusTool(JiraHandle);

#[derive(Debug, Deserialize)]
struct TransitionToStatusArgs {
    key: String,
    status: String,
    #[serde(default = "default_max_hops")]
    max_hops: usize,
}

fn default_max_hops() -> usize {
    DEFAULT_MAX_HOPS
}

#[async_trait::async_trait]
impl Tool for TransitionToStatusTool {
    fn schema(&self) -> ToolSchema {
        schema(
            "jira_transition_to_status",
            "Move an issue to a target status, applying intermediate transitions when needed",
            json!({
                "key": json_schema_string("Issue key"),
                "status": json_schema_string("Target status name"),
                "max_hops": json_schema_integer("Maximum transitions to apply (default 5)"),
            }),
            vec!["key", "status"],
        )
    }

    fn tier(&self) -> ToolTier {
        ToolTier::Write
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: TransitionToStatusArgs = args_or_return!(arguments);
        let mut graph = self.0.workflow.lock().await;
        match usecases::transition_to_status(
            self.0.tracker.as_ref(),
            &mut graph,
            &args.key,
            &args.status,
            args.max_hops,
        )
        .await
        {
            Ok(outcome) => Ok(tool_success(serde_json::to_value(&outcome)?)),
            Err(e) => Ok(jira_failure(e)),
        }
    }
}

pub struct AssignIssueTool(JiraHandle);

#[derive(Debug, Deserialize)]
struct AssignIssueArgs {
    key: String,
    /// Omit to unassign
    #[serde(default)]
    account_id: Option<String>,
}

#[async_trait::async_trait]
impl Tool for AssignIssueTool {
    fn schema(&self) -> ToolSchema {
        schema(
            "jira_assign_issue",
            "Assign an issue to a user, or unassign it when account_id is omitted",
            json!({
                "key": json_schema_string("Issue key"),
                "account_id": json_schema_string("Account id of the new assignee"),
            }),
            vec!["key"],
        )
    }

    fn tier(&self) -> ToolTier {
        ToolTier::Write
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: AssignIssueArgs = args_or_return!(arguments);
        match self
            .0
            .tracker
            .assign_issue(&args.key, args.account_id.as_deref())
            .await
        {
            Ok(()) => Ok(tool_success(json!({
                "key": args.key,
                "assignee": args.account_id,
            }))),
            Err(e) => Ok(jira_failure(e)),
        }
    }
}

pub struct ListProjectsTool(JiraHandle);

#[async_trait::async_trait]
impl Tool for ListProjectsTool {
    fn schema(&self) -> ToolSchema {
        schema("jira_list_projects", "List visible Jira projects", json!({}), vec![])
    }

    async fn execute(&self, _arguments: Value) -> Result<CallToolResult> {
        match self.0.tracker.list_projects().await {
            Ok(projects) => {
                let projects: Vec<Value> = projects
                    .iter()
                    .map(|p| json!({ "key": p.key, "name": p.name, "type": p.project_type_key }))
                    .collect();
                Ok(tool_success(json!({
                    "count": projects.len(),
                    "projects": projects,
                })))
            }
            Err(e) => Ok(jira_failure(e)),
        }
    }
}

pub struct GetProjectTool(JiraHandle);

#[async_trait::async_trait]
impl Tool for GetProjectTool {
    fn schema(&self) -> ToolSchema {
        schema(
            "jira_get_project",
            "Project details with the statuses of each issue type",
            json!({ "key": json_schema_string("Project key") }),
            vec!["key"],
        )
    }

    async fn execute(&self, arguments: Value) -> Result<CallToolResult> {
        let args: KeyArgs = args_or_return!(arguments);
        let project = match self.0.tracker.get_project(&args.key).await {
            Ok(project) => project,
            Err(e) => return Ok(jira_failure(e)),
        };
        let statuses = match self.0.tracker.project_statuses(&args.key).await {
            Ok(statuses) => statuses,
            Err(e) => return Ok(jira_failure(e)),
        };

        let issue_types: Vec<Value> = statuses
            .iter()
            .map(|t| {
                let names: Vec<&str> = t.statuses.iter().map(|s| s.name.as_str()).collect();
                json!({ "issue_type": t.name, "statuses": names })
            })
            .collect();

        Ok(tool_success(json!({
            "project": serde_json::to_value(&project)?,
            "issue_types": issue_types,
        })))
    }
}

pub struct WhoAmITool(JiraHandle);

#[async_trait::async_trait]
impl Tool for WhoAmITool {
    fn schema(&self) -> ToolSchema {
        schema(
            "jira_whoami",
            "The authenticated Jira user; useful to verify credentials",
            json!({}),
            vec![],
        )
    }

    async fn execute(&self, _arguments: Value) -> Result<CallToolResult> {
        match self.0.tracker.myself().await {
            Ok(user) => Ok(tool_success(json!({ "user": serde_json::to_value(&user)? }))),
            Err(e) => Ok(jira_failure(e)),
        }
    }
}
