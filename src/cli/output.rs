//! Output formatting for CLI commands

use serde::Serialize;

/// Format output as JSON or plain `key: value` lines based on --json flag
pub fn format_output<T: Serialize>(data: &T, json: bool) -> String {
    if json {
        return serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string());
    }

    match serde_json::to_value(data) {
        Ok(serde_json::Value::Object(map)) => map
            .iter()
            .map(|(key, value)| match value {
                serde_json::Value::String(s) => format!("{}: {}", key, s),
                serde_json::Value::Null => format!("{}: -", key),
                other => format!("{}: {}", key, other),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        _ => serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string()),
    }
}
