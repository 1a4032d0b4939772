//! Minimal HTML templating for emails and reports
//!
//! `[[name.html]]` markers are replaced by the contents of a part file, one
//! level deep. `{{ dotted.path }}` placeholders are looked up in a JSON
//! context and HTML-escaped.

use std::path::Path;

use serde_json::Value;
use tracing::error;

use crate::shared::utils::value_at;
use crate::shared::AppResult;

/// Reads a template file
pub fn load(path: &Path) -> AppResult<String> {
    std::fs::read_to_string(path).map_err(|e| {
        error!("❌ failed to read template {}: {}", path.display(), e);
        crate::internal_error!("template {} unavailable", path.display())
    })
}

/// Replaces every `[[part.html]]` marker with `parts_dir/part.html`
pub fn substitute_parts(template: &str, parts_dir: &Path) -> AppResult<String> {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("[[") {
        let Some(len) = rest[start + 2..].find("]]") else {
            break;
        };
        let name = &rest[start + 2..start + 2 + len];
        output.push_str(&rest[..start]);

        if is_part_name(name) {
            output.push_str(&load(&parts_dir.join(name))?);
        } else {
            output.push_str(&rest[start..start + 4 + len]);
        }
        rest = &rest[start + 4 + len..];
    }

    output.push_str(rest);
    Ok(output)
}

fn is_part_name(name: &str) -> bool {
    name.ends_with(".html") && !name.contains("..") && !name.contains(char::is_whitespace)
}

/// Fills `{{ path }}` placeholders from `context`; missing values render empty
pub fn render(template: &str, context: &Value) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        output.push_str(&rest[..start]);
        let path = rest[start + 2..start + 2 + len].trim();
        if let Some(value) = value_at(context, path) {
            output.push_str(&escape_html(&display(value)));
        }
        rest = &rest[start + 4 + len..];
    }

    output.push_str(rest);
    output
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
