//! Output formatting for configuration values.

use clap::ValueEnum;
use serde_json::Value;

/// Output format for printed values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// One `dotted.key = value` line per leaf
    Text,
}

/// Render `value` in the requested format.
pub fn format_value(value: &Value, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        OutputFormat::Text => {
            let mut lines = Vec::new();
            flatten("", value, &mut lines);
            lines.join("\n")
        }
    }
}

fn flatten(prefix: &str, value: &Value, lines: &mut Vec<String>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten(&path, child, lines);
            }
        }
        _ if prefix.is_empty() => lines.push(scalar(value)),
        _ => lines.push(format!("{} = {}", prefix, scalar(value))),
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_flattens_nested_objects() {
        let value = json!({
            "builder": {"platform": "web", "options": {"debug": true}},
            "empty": {}
        });
        assert_eq!(
            format_value(&value, OutputFormat::Text),
            "builder.options.debug = true\nbuilder.platform = web\nempty = {}"
        );
    }

    #[test]
    fn test_text_scalar_at_root() {
        assert_eq!(format_value(&json!("web"), OutputFormat::Text), "web");
        assert_eq!(format_value(&json!([1, 2]), OutputFormat::Text), "[1,2]");
    }

    #[test]
    fn test_json_is_pretty() {
        assert_eq!(
            format_value(&json!({"a": 1}), OutputFormat::Json),
            "{\n  \"a\": 1\n}"
        );
    }
}
