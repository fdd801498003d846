// MCP (Model Context Protocol) servers exposing mcphub's adapters as tools
// Served over stdio for desktop clients or HTTP for remote ones

pub mod profiles;
pub mod protocol;
pub mod server;
pub mod tools;

pub use profiles::Profile;
pub use server::McpServer;
