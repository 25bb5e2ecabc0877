//! Prompt assembly for planning and summarizing.

use std::collections::BTreeMap;

use super::step::StepRecord;
use crate::config::{builtin_description, ServerConfig};
use crate::constants::{
    DEFAULT_HISTORY_WINDOW, EMPTY_HISTORY, HISTORY_SNIPPET_CHARS, MUST_CALL_TOOL_PROMPT,
    PLANNER_PROMPT,
};
use crate::message::ChatMessage;
use crate::workflow::WorkflowStage;

/// Renders the configured servers and their tool docs for the planner.
pub fn server_catalog(servers: &BTreeMap<String, ServerConfig>) -> String {
    let mut out = String::from("AVAILABLE SERVERS\n");
    for (name, server) in servers {
        let docs = server
            .description
            .as_deref()
            .or_else(|| builtin_description(name))
            .unwrap_or("(no tool documentation configured)");
        out.push_str(&format!("\nServer \"{name}\"\n{docs}\n"));
    }
    out
}

/// The most recent `window` steps (at most [`DEFAULT_HISTORY_WINDOW`]), one
/// line each.
pub fn history_summary(logs: &[StepRecord], window: usize) -> String {
    if logs.is_empty() {
        return EMPTY_HISTORY.to_string();
    }
    let window = window.clamp(1, DEFAULT_HISTORY_WINDOW);
    let start = logs.len().saturating_sub(window);
    logs[start..]
        .iter()
        .map(|log| {
            let status = if log.success {
                "ok".to_string()
            } else {
                format!("error: {}", log.error.as_deref().unwrap_or("unknown"))
            };
            let flat = log.output_snippet.replace('\n', " ");
            format!(
                "Step {}: {}.{}, status={}, output={}",
                log.step,
                log.server,
                log.tool,
                status,
                ellipsize(&flat, HISTORY_SNIPPET_CHARS)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds the two planning messages for one step.
///
/// `must_call_tool` forbids `finish` for this step. `next_stage` is only set
/// when the workflow is enforced.
pub fn planner_messages(
    catalog: &str,
    goal: &str,
    history: &str,
    must_call_tool: bool,
    next_stage: Option<WorkflowStage>,
) -> Vec<ChatMessage> {
    let mut system = format!("{PLANNER_PROMPT}\n\n{catalog}");
    if let Some(stage) = next_stage {
        system.push_str(&format!(
            "\nThe host enforces the workflow order. The next allowed action is: {stage}."
        ));
    }
    if must_call_tool {
        system.push_str("\n\n");
        system.push_str(MUST_CALL_TOOL_PROMPT);
    }

    let user = format!(
        "User goal:\n{goal}\n\nRecent tool history:\n{history}\n\n\
         Respond ONLY with ONE JSON object following the schema above."
    );
    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// First `max` characters of `text`.
pub(crate) fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// First `max` characters of `text`, with `...` appended when cut.
pub(crate) fn ellipsize(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", truncate_chars(text, max))
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn record(step: usize, success: bool, output: &str) -> StepRecord {
        StepRecord {
            step,
            server: "fetch".into(),
            tool: "fetch".into(),
            args: Map::new(),
            success,
            error: (!success).then(|| "connection refused".to_string()),
            output_snippet: output.into(),
            attempts: 1,
            elapsed_ms: 5,
        }
    }

    #[test]
    fn empty_history_placeholder() {
        assert_eq!(history_summary(&[], 5), "(no tool calls yet)");
    }

    #[test]
    fn history_lines_are_flattened_and_cut() {
        let long = format!("line one\nline two {}", "x".repeat(300));
        let summary = history_summary(&[record(1, true, &long), record(2, false, "")], 5);
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Step 1: fetch.fetch, status=ok, output=line one line two "));
        assert!(lines[0].ends_with("..."));
        assert_eq!(
            lines[0].len(),
            "Step 1: fetch.fetch, status=ok, output=".len() + 150 + 3
        );
        assert_eq!(
            lines[1],
            "Step 2: fetch.fetch, status=error: connection refused, output="
        );
    }

    #[test]
    fn history_keeps_only_the_window() {
        let logs: Vec<_> = (1..=7).map(|i| record(i, true, "ok")).collect();
        let summary = history_summary(&logs, 5);
        assert_eq!(summary.lines().count(), 5);
        assert!(summary.starts_with("Step 3:"));
    }

    #[test]
    fn out_of_range_windows_are_clamped() {
        let logs: Vec<_> = (1..=8).map(|i| record(i, true, "ok")).collect();

        let zero = history_summary(&logs, 0);
        assert_eq!(zero.lines().count(), 1);
        assert!(zero.starts_with("Step 8:"));

        let wide = history_summary(&logs, 50);
        assert_eq!(wide.lines().count(), 5);
        assert!(wide.starts_with("Step 4:"));
    }

    #[test]
    fn must_call_tool_is_appended_only_when_asked() {
        let with = planner_messages("CAT", "goal", "(no tool calls yet)", true, None);
        assert!(with[0].content.ends_with(MUST_CALL_TOOL_PROMPT));
        assert!(with[1].content.starts_with("User goal:\ngoal\n\nRecent tool history:"));

        let without = planner_messages("CAT", "goal", "h", false, Some(WorkflowStage::AwaitingWrite));
        assert!(!without[0].content.contains(MUST_CALL_TOOL_PROMPT));
        assert!(without[0].content.contains("filesystem.write_file"));
    }

    #[test]
    fn catalog_prefers_configured_description() {
        let mut servers = BTreeMap::new();
        servers.insert("fetch".to_string(), ServerConfig::from_command_line("uvx mcp-server-fetch"));
        let mut custom = ServerConfig::from_command_line("wiki-mcp");
        custom.description = Some("Tool \"search\": search the wiki.".into());
        servers.insert("wiki".to_string(), custom);

        let catalog = server_catalog(&servers);
        assert!(catalog.contains("Server \"fetch\"\nTool \"fetch\""));
        assert!(catalog.contains("Server \"wiki\"\nTool \"search\""));
    }
}
