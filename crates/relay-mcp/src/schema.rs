//! Translation between tool-protocol descriptions and chat-completion function schemas.
//!
//! Everything here is pure: no state, no I/O.

use relay_types::{
    EMPTY_RESULT_PLACEHOLDER, ToolCall, ToolContent, ToolDefinition, ToolDescriptor, ToolError,
    ToolInvocationRequest, ToolInvocationResult, truncate_chars,
};
use serde_json::{Map, Value, json};

/// Function names longer than this are truncated.
pub const MAX_TOOL_NAME_CHARS: usize = 64;

/// Function descriptions longer than this are truncated.
pub const MAX_DESCRIPTION_CHARS: usize = 1024;

/// `format` values that survive on string-typed schema nodes.
const ACCEPTED_STRING_FORMATS: &[&str] = &["date-time", "enum"];

/// The name a tool is exposed under.
pub fn exposed_name(tool_name: &str) -> &str {
    truncate_chars(tool_name, MAX_TOOL_NAME_CHARS)
}

/// Build the function schema the model sees for `tool`.
pub fn to_outbound_schema(tool: &ToolDescriptor) -> ToolDefinition {
    let mut parameters = normalize_root(tool.input_schema.clone());
    strip_unsupported_formats(&mut parameters);
    ToolDefinition::function(
        exposed_name(&tool.name),
        truncate_chars(&tool.description, MAX_DESCRIPTION_CHARS),
        parameters,
    )
}

/// Make sure the root of a parameter schema is an object type.
///
/// Non-object roots (a bare string or number parameter, say) are nested under
/// a single required `value` property.
pub fn normalize_root(schema: Value) -> Value {
    let Value::Object(mut map) = schema else {
        return json!({"type": "object", "properties": {}});
    };

    match map.get("type") {
        Some(Value::String(t)) if t == "object" => Value::Object(map),
        None if map.contains_key("properties") => {
            map.insert("type".to_string(), json!("object"));
            Value::Object(map)
        }
        _ => json!({
            "type": "object",
            "properties": {"value": Value::Object(map)},
            "required": ["value"],
        }),
    }
}

/// Recursively drop `format` hints from string nodes unless the format is accepted.
pub fn strip_unsupported_formats(node: &mut Value) {
    let Value::Object(map) = node else {
        return;
    };

    if is_string_typed(map) {
        let keep = map
            .get("format")
            .and_then(Value::as_str)
            .is_some_and(|f| ACCEPTED_STRING_FORMATS.contains(&f));
        if !keep {
            map.remove("format");
        }
    }

    for key in ["properties", "$defs", "definitions"] {
        if let Some(Value::Object(children)) = map.get_mut(key) {
            children.values_mut().for_each(strip_unsupported_formats);
        }
    }
    for key in ["items", "additionalProperties"] {
        match map.get_mut(key) {
            Some(Value::Array(children)) => children.iter_mut().for_each(strip_unsupported_formats),
            Some(child) => strip_unsupported_formats(child),
            None => {}
        }
    }
    for key in ["anyOf", "oneOf", "allOf", "prefixItems"] {
        if let Some(Value::Array(children)) = map.get_mut(key) {
            children.iter_mut().for_each(strip_unsupported_formats);
        }
    }
}

fn is_string_typed(map: &Map<String, Value>) -> bool {
    match map.get("type") {
        Some(Value::String(t)) => t == "string",
        Some(Value::Array(types)) => types.iter().any(|t| t == "string"),
        _ => false,
    }
}

/// Turn a model tool call into an invocation request.
///
/// An empty payload means "no arguments". Anything else must be a JSON object.
pub fn to_invocation_request(call: &ToolCall) -> Result<ToolInvocationRequest, ToolError> {
    let name = call.function.name.clone();
    let raw = call.function.arguments.trim();

    let arguments = if raw.is_empty() {
        Map::new()
    } else {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return Err(ToolError::MalformedArguments {
                    tool: name,
                    message: format!("expected a JSON object, got {}", json_kind(&other)),
                });
            }
            Err(e) => {
                return Err(ToolError::MalformedArguments {
                    tool: name,
                    message: e.to_string(),
                });
            }
        }
    };

    Ok(ToolInvocationRequest { name, arguments })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Flatten a tool result into the text of a tool turn. Never empty.
pub fn from_invocation_result(result: &ToolInvocationResult) -> String {
    let text = result
        .content
        .iter()
        .filter_map(|part| match part {
            ToolContent::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" ");

    if text.is_empty() {
        EMPTY_RESULT_PLACEHOLDER.to_string()
    } else {
        text
    }
}
