//! Transport layer for the Jira client.

pub mod http;

pub use http::HttpTransport;
