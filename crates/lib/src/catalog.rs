//! Fixed catalog of tools offered to the assistant, and per-call selection.
//!
//! The catalog is static: six tools the assistant may call while discussing a
//! job's waiting-time analysis. Callers can enable/disable tools per
//! conversation and override tool descriptions; the SQL query tool and the
//! resource-calendar tool are always included regardless of the enabled set.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

pub const QUERY_DATABASE: &str = "query_database";
pub const DISCOVER_BATCHING_STRATEGIES: &str = "discover_batching_strategies";
pub const DISCOVER_PRIORITIZATION_STRATEGIES: &str = "discover_prioritization_strategies";
pub const DISCOVER_CASE_ATTRIBUTES: &str = "discover_case_attributes";
/// Catalog spelling is canonical; the assistant calls this exact name.
pub const DISCOVER_RESOURCE_CALENDARS: &str = "discover_resourse_calendars";
pub const GET_REDESIGN_PATTERN_INFO: &str = "get_redesign_pattern_info";

/// Tool definition submitted with a run (function-calling).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub typ: String,
    pub function: ToolFunctionDefinition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolFunctionDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: serde_json::Value,
}

fn function_tool(name: &str, description: &str, parameters: serde_json::Value) -> ToolDefinition {
    ToolDefinition {
        typ: "function".to_string(),
        function: ToolFunctionDefinition {
            name: name.to_string(),
            description: Some(description.to_string()),
            parameters,
        },
    }
}

/// The full catalog, in a stable order.
pub fn catalog() -> Vec<ToolDefinition> {
    vec![
        function_tool(
            QUERY_DATABASE,
            "Run a read-only SQL query against the job's transitions report table. \
             Reference the table as {table_name}; it is replaced with the per-job \
             results table before execution. Each row is one transition execution \
             with case_id, source_activity, source_resource, destination_activity, \
             destination_resource, start_time, end_time, wt_total, wt_contention, \
             wt_batching, wt_prioritization, wt_unavailability and wt_extraneous \
             (waiting times in seconds).",
            json!({
                "type": "object",
                "required": ["query"],
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "SQL SELECT statement. Use {table_name} as the table identifier."
                    }
                }
            }),
        ),
        function_tool(
            DISCOVER_BATCHING_STRATEGIES,
            "Discover the batching strategies observed in the job's event log: which \
             activities are processed in batches, the batch sizes, and the waiting \
             time attributed to batch accumulation.",
            json!({ "type": "object", "properties": {} }),
        ),
        function_tool(
            DISCOVER_PRIORITIZATION_STRATEGIES,
            "Discover the prioritization rules observed in the job's event log: which \
             case attributes make a case likely to be processed ahead of others that \
             arrived earlier.",
            json!({ "type": "object", "properties": {} }),
        ),
        function_tool(
            DISCOVER_CASE_ATTRIBUTES,
            "Discover the case attributes present in the job's event log and their \
             value distributions.",
            json!({ "type": "object", "properties": {} }),
        ),
        function_tool(
            DISCOVER_RESOURCE_CALENDARS,
            "Discover the working calendars of the resources in the job's event log: \
             the weekly time intervals during which each resource is on duty.",
            json!({ "type": "object", "properties": {} }),
        ),
        function_tool(
            GET_REDESIGN_PATTERN_INFO,
            "Look up reference descriptions of process redesign patterns by name \
             (e.g. Triage, Resequencing, Parallelism). Returns the description of \
             each requested pattern, or the list of valid names when a requested \
             pattern is unknown.",
            json!({
                "type": "object",
                "required": ["pattern_names"],
                "properties": {
                    "pattern_names": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Names of the redesign patterns to look up."
                    }
                }
            }),
        ),
    ]
}

/// True when the tool is always offered, regardless of the caller's enabled set.
fn force_included(name: &str) -> bool {
    name == QUERY_DATABASE || name == DISCOVER_RESOURCE_CALENDARS
}

/// Select the tools for one run: filter the catalog by the enabled map (absent
/// map or absent entry means enabled) and apply description overrides. The SQL
/// query tool and the resource-calendar tool are always included.
pub fn select_tools(
    enabled: Option<&HashMap<String, bool>>,
    descriptions: Option<&HashMap<String, String>>,
) -> Vec<ToolDefinition> {
    catalog()
        .into_iter()
        .filter(|t| {
            force_included(&t.function.name)
                || enabled
                    .and_then(|m| m.get(&t.function.name))
                    .copied()
                    .unwrap_or(true)
        })
        .map(|mut t| {
            if let Some(desc) = descriptions.and_then(|m| m.get(&t.function.name)) {
                t.function.description = Some(desc.clone());
            }
            t
        })
        .collect()
}
