pub mod context;
pub mod document;
pub mod dynamic;
pub mod generator;
pub mod jira;
mod registry;

pub use registry::{
    json_schema_array, json_schema_boolean, json_schema_enum, json_schema_integer,
    json_schema_number, json_schema_object, json_schema_string, parse_args, tool_failure,
    tool_success, Tool, ToolOutcome, ToolRegistry, ToolTier,
};
