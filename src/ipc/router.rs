//! Method router: maps a wire method onto the tool server.

use crate::tools::{RepoContextServer, ToolRequest};
use crate::types::{Error, Result};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

pub const METHOD_TOOLS_LIST: &str = "tools/list";
pub const METHOD_TOOLS_CALL: &str = "tools/call";
pub const METHOD_SERVER_INFO: &str = "server/info";
pub const METHOD_RECOVERY_STATS: &str = "recovery/stats";

/// Route one request. Tool failures come back inside the tool envelope;
/// `Err` is reserved for requests the server could not run at all.
pub async fn route_request(
    server: &RepoContextServer,
    method: &str,
    params: Value,
    cancel: &CancellationToken,
) -> Result<Value> {
    match method {
        METHOD_TOOLS_LIST => {
            let tools: Vec<Value> = server
                .list_tools()
                .iter()
                .map(|decl| {
                    serde_json::json!({
                        "name": decl.name,
                        "description": decl.description,
                        "inputSchema": decl.input_schema(),
                    })
                })
                .collect();
            Ok(serde_json::json!({
                "count": tools.len(),
                "tools": tools,
                "prompt": server.catalog().prompt(),
            }))
        }

        METHOD_TOOLS_CALL => {
            let request = ToolRequest {
                name: str_field(&params, "name")?,
                arguments: object_field(&params, "arguments")?,
            };
            let response = server.call_tool(&request, cancel).await?;
            Ok(serde_json::to_value(response)?)
        }

        METHOD_SERVER_INFO => Ok(serde_json::json!({
            "configuration": server.configuration(),
            "capabilities": server.capabilities(),
        })),

        METHOD_RECOVERY_STATS => Ok(serde_json::to_value(server.recovery_stats())?),

        _ => Err(Error::not_found(format!("Unknown method: {}", method))),
    }
}

// =============================================================================
// Field helpers
// =============================================================================

pub fn str_field(body: &Value, key: &str) -> Result<String> {
    body.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| Error::validation(format!("Missing required field: {}", key)))
}

/// Optional object field; absent or null reads as empty.
pub fn object_field(body: &Value, key: &str) -> Result<Map<String, Value>> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(_) => Err(Error::validation(format!("Field '{}' must be an object", key))),
    }
}
