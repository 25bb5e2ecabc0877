//! Decoding model output into a [`Plan`].
//!
//! Small models rarely return clean JSON. They wrap it in code fences, add a
//! sentence before or after, or answer in plain prose. [`parse`] accepts all
//! of that: prose without an object becomes a `Finish` carrying the text, and
//! only a decodable object with an unusable shape is reported as an error.

use serde_json::{Map, Value};

use crate::error::{pretty, PlanShapeError};
use crate::mcp::sanitize_args;

/// The next step the model asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    CallTool {
        server: String,
        tool: String,
        args: Map<String, Value>,
    },
    Finish {
        answer: String,
    },
}

/// Parses raw model text. Never panics; every input maps to a plan or a
/// [`PlanShapeError`].
pub fn parse(raw: &str) -> Result<Plan, PlanShapeError> {
    let text = strip_fences(raw);
    let value = match serde_json::from_str::<Value>(text) {
        Ok(v) => v,
        Err(_) => match first_object(text).and_then(|s| serde_json::from_str(s).ok()) {
            Some(v) => v,
            None => {
                return Ok(Plan::Finish {
                    answer: raw.to_string(),
                })
            }
        },
    };

    let Some(obj) = value.as_object() else {
        return Ok(Plan::Finish {
            answer: pretty(&value),
        });
    };
    let Some(action) = obj.get("action") else {
        return Ok(Plan::Finish {
            answer: pretty(&value),
        });
    };

    match action.as_str() {
        Some("finish") => Ok(Plan::Finish {
            answer: match obj.get("answer") {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            },
        }),
        Some("call_tool") => {
            let server = non_empty_str(obj.get("server"));
            let tool = non_empty_str(obj.get("tool"));
            let args = match obj.get("args") {
                None | Some(Value::Null) => Some(Map::new()),
                Some(Value::Object(map)) => Some(sanitize_args(map)),
                Some(_) => None,
            };
            match (server, tool, args) {
                (Some(server), Some(tool), Some(args)) => Ok(Plan::CallTool {
                    server: server.to_string(),
                    tool: tool.to_string(),
                    args,
                }),
                _ => Err(PlanShapeError::InvalidToolCall(value.clone())),
            }
        }
        _ => Err(PlanShapeError::UnknownAction(value.clone())),
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Trims whitespace and removes a surrounding Markdown code fence. A
/// language tag on the opening fence line (```` ```json ````) goes with it.
fn strip_fences(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("```") {
        s = match rest.split_once('\n') {
            Some((tag, body))
                if tag
                    .trim()
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') =>
            {
                body
            }
            _ => rest,
        };
    }
    let s = s.trim_end();
    s.strip_suffix("```").unwrap_or(s).trim()
}

/// Returns the first balanced `{...}` in `text`. Braces inside JSON string
/// literals do not count.
fn first_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
