//! Typed Jira REST v2 endpoints.

mod comments;
mod issues;
mod projects;
mod search;
mod transitions;
mod users;

pub use comments::CommentsApi;
pub use issues::IssuesApi;
pub use projects::ProjectsApi;
pub use search::SearchApi;
pub use transitions::TransitionsApi;
pub use users::UsersApi;

pub(crate) const API_PREFIX: &str = "rest/api/2";
