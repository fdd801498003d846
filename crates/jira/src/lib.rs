//! # mcphub-jira
//!
//! Jira REST v2 client behind an [`IssueTracker`] port, plus a learned
//! [`WorkflowGraph`] and use cases built on top of it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mcphub_jira::{JiraClient, JiraResult, IssueTracker, SearchRequest};
//!
//! #[tokio::main]
//! async fn main() -> JiraResult<()> {
//!     let client = JiraClient::builder()
//!         .base_url("https://acme.atlassian.net")
//!         .basic_auth("dev@acme.com", "api-token")
//!         .build()?;
//!
//!     let me = client.myself().await?;
//!     println!("Authenticated as {:?}", me.display_name);
//!
//!     let results = client
//!         .search()
//!         .jql(&SearchRequest::new("assignee = currentUser()"))
//!         .await?;
//!     println!("{} issues assigned", results.total);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Moving an issue through its workflow
//!
//! ```rust,no_run
//! use mcphub_jira::{usecases, JiraClient, WorkflowGraph};
//!
//! # async fn example(client: JiraClient) -> mcphub_jira::JiraResult<()> {
//! let mut graph = WorkflowGraph::new();
//! let outcome = usecases::transition_to_status(&client, &mut graph, "PROJ-42", "Done", 5).await?;
//! println!("{} -> {}", outcome.from_status, outcome.final_status);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod port;
pub mod transport;
pub mod types;
pub mod usecases;
pub mod workflow;

pub use client::{JiraClient, JiraClientBuilder};
pub use config::{ClientConfig, JiraAuth, RetryConfig};
pub use error::{JiraError, JiraResult};
pub use port::IssueTracker;
pub use types::*;
pub use workflow::WorkflowGraph;
