//! Last-resort answer when the step budget runs out.
//!
//! One tool-free request asks the backend to summarize what the tools found.
//! If even that fails, a markdown digest of the step log is built locally so
//! the caller always gets something structured back.

use super::prompt::{ellipsize, history_summary};
use super::step::StepRecord;
use crate::backend::ChatBackend;
use crate::constants::SUMMARIZER_PROMPT;
use crate::message::ChatMessage;

/// Characters of each step's output shown in the local digest.
const DIGEST_SNIPPET_CHARS: usize = 200;

pub async fn summarize(
    backend: &dyn ChatBackend,
    goal: &str,
    logs: &[StepRecord],
    window: usize,
) -> String {
    let user = format!(
        "User goal:\n{goal}\n\nTool history:\n{}\n\nSummarize the findings in markdown.",
        history_summary(logs, window)
    );
    let messages = [ChatMessage::system(SUMMARIZER_PROMPT), ChatMessage::user(user)];

    match backend.complete(&messages).await {
        Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
        Ok(_) => {
            tracing::warn!("summarizer returned an empty answer, using local digest");
            local_digest(goal, logs)
        }
        Err(e) => {
            tracing::warn!(error = %e, "summarizer request failed, using local digest");
            local_digest(goal, logs)
        }
    }
}

/// Markdown digest of the step log, built without a model.
pub fn local_digest(goal: &str, logs: &[StepRecord]) -> String {
    let mut out = format!(
        "## {goal}\n\nNo final answer was produced within the step budget.\n"
    );
    if logs.is_empty() {
        out.push_str("\nNo tool calls were made.\n");
        return out;
    }

    out.push_str("\n### Tool calls\n\n");
    for log in logs {
        let status = if log.success {
            "ok".to_string()
        } else {
            format!("failed: {}", log.error.as_deref().unwrap_or("unknown error"))
        };
        out.push_str(&format!(
            "- Step {}: `{}.{}` {}\n",
            log.step, log.server, log.tool, status
        ));
        if log.success && !log.output_snippet.is_empty() {
            let flat = log.output_snippet.replace('\n', " ");
            out.push_str(&format!("  > {}\n", ellipsize(flat.trim(), DIGEST_SNIPPET_CHARS)));
        }
    }
    out
}
