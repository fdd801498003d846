//! Multi-step operations composed from the `IssueTracker` port.

use crate::error::{JiraError, JiraResult};
use crate::port::IssueTracker;
use crate::types::{validate_issue_key, Transition};
use crate::workflow::WorkflowGraph;
use serde::Serialize;
use tracing::{debug, info};

pub const DEFAULT_MAX_HOPS: usize = 5;

/// Result of moving an issue to a target status.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionOutcome {
    pub key: String,
    pub from_status: String,
    pub final_status: String,
    pub applied: Vec<Transition>,
}

/// Current status plus outgoing transitions of an issue.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowSnapshot {
    pub key: String,
    pub status: String,
    pub transitions: Vec<Transition>,
    pub known_statuses: Vec<String>,
}

fn same_status(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

async fn current_status(tracker: &dyn IssueTracker, key: &str) -> JiraResult<String> {
    let issue = tracker.get_issue(key, &["status".to_string()]).await?;
    issue
        .status_name()
        .map(str::to_string)
        .ok_or_else(|| JiraError::Api {
            status: 200,
            message: format!("Issue {} has no status field", key),
        })
}

/// Walk transitions until `key` reaches `target`.
///
/// Every status visited and every transition offered is recorded in `graph`.
/// A direct transition to the target wins; otherwise the first hop of the
/// shortest known path is taken.
pub async fn transition_to_status(
    tracker: &dyn IssueTracker,
    graph: &mut WorkflowGraph,
    key: &str,
    target: &str,
    max_hops: usize,
) -> JiraResult<TransitionOutcome> {
    validate_issue_key(key)?;
    if target.trim().is_empty() {
        return Err(JiraError::validation("Target status must not be empty"));
    }

    let from_status = current_status(tracker, key).await?;
    let mut current = from_status.clone();
    let mut applied = Vec::new();

    while !same_status(&current, target) {
        if applied.len() >= max_hops {
            return Err(JiraError::validation(format!(
                "{} did not reach '{}' within {} transitions (stopped at '{}')",
                key, target, max_hops, current
            )));
        }

        let available = tracker.list_transitions(key).await?;
        graph.add_status(&current);
        for transition in &available {
            graph.add_transition(&current, transition);
        }

        let next = available
            .iter()
            .find(|t| same_status(&t.to.name, target))
            .or_else(|| {
                let path = graph.shortest_path(&current, target)?;
                let first = path.first()?;
                available
                    .iter()
                    .find(|t| t.id == first.id || same_status(&t.to.name, &first.to.name))
            })
            .cloned()
            .ok_or_else(|| {
                let reachable = graph.reachable_from(&current);
                let unseen = if graph.contains(target) {
                    ""
                } else {
                    " (status not seen yet)"
                };
                JiraError::validation(format!(
                    "No known path from '{}' to '{}'{} for {}; reachable statuses: [{}]",
                    current,
                    target,
                    unseen,
                    key,
                    reachable.join(", ")
                ))
            })?;

        debug!(key, transition = %next.name, to = %next.to.name, "Applying transition");
        tracker.transition_issue(key, &next.id, None).await?;
        current = next.to.name.clone();
        applied.push(next);
    }

    info!(key, from = %from_status, to = %current, hops = applied.len(), "Issue transitioned");

    Ok(TransitionOutcome {
        key: key.to_string(),
        from_status,
        final_status: current,
        applied,
    })
}

/// Current status and outgoing transitions, recorded into `graph`.
pub async fn describe_workflow(
    tracker: &dyn IssueTracker,
    graph: &mut WorkflowGraph,
    key: &str,
) -> JiraResult<WorkflowSnapshot> {
    validate_issue_key(key)?;
    let status = current_status(tracker, key).await?;
    let transitions = tracker.list_transitions(key).await?;

    graph.add_status(&status);
    for transition in &transitions {
        graph.add_transition(&status, transition);
    }

    Ok(WorkflowSnapshot {
        key: key.to_string(),
        status,
        transitions,
        known_statuses: graph.statuses(),
    })
}
