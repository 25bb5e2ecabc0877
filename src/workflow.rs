//! Strict ordering for the research workflow.
//!
//! The planner prompt asks for fetch → write_file → add_metadata → finish.
//! With `agent.strict_workflow = true` the agent also enforces it: calls out
//! of order are refused before reaching a server and show up in the step log
//! as failures, so the model sees why.

use serde_json::{Map, Value};
use std::fmt;

/// Fetches allowed before the note must be written.
const MAX_FETCHES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStage {
    AwaitingFetch,
    AwaitingWrite,
    AwaitingMetadata,
    AwaitingFinish,
}

impl fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let expected = match self {
            Self::AwaitingFetch => "fetch.fetch",
            Self::AwaitingWrite => "filesystem.write_file",
            Self::AwaitingMetadata => "kb_metadata.add_metadata",
            Self::AwaitingFinish => "finish",
        };
        f.write_str(expected)
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowGuard {
    stage: WorkflowStage,
    fetches: usize,
    note_path: Option<String>,
}

impl Default for WorkflowGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowGuard {
    pub fn new() -> Self {
        Self {
            stage: WorkflowStage::AwaitingFetch,
            fetches: 0,
            note_path: None,
        }
    }

    pub fn stage(&self) -> WorkflowStage {
        self.stage
    }

    pub fn allows_finish(&self) -> bool {
        self.stage == WorkflowStage::AwaitingFinish
    }

    /// Checks a proposed call against the current stage. The error is the
    /// rejection text recorded in the step log.
    pub fn check(&self, server: &str, tool: &str, args: &Map<String, Value>) -> Result<(), String> {
        let call = (server, tool);
        let allowed = match self.stage {
            WorkflowStage::AwaitingFetch => call == ("fetch", "fetch"),
            WorkflowStage::AwaitingWrite => {
                call == ("filesystem", "write_file")
                    || (call == ("fetch", "fetch") && self.fetches < MAX_FETCHES)
            }
            WorkflowStage::AwaitingMetadata => {
                if call == ("kb_metadata", "add_metadata") {
                    return self.check_metadata_path(args);
                }
                false
            }
            WorkflowStage::AwaitingFinish => false,
        };
        if allowed {
            Ok(())
        } else {
            Err(format!(
                "workflow violation: expected {} next, got {server}.{tool}",
                self.expected()
            ))
        }
    }

    /// Advances the stage after a call succeeded.
    pub fn record_success(&mut self, server: &str, tool: &str, args: &Map<String, Value>) {
        match ((server, tool), self.stage) {
            (("fetch", "fetch"), WorkflowStage::AwaitingFetch | WorkflowStage::AwaitingWrite) => {
                self.fetches += 1;
                self.stage = WorkflowStage::AwaitingWrite;
            }
            (("filesystem", "write_file"), WorkflowStage::AwaitingWrite) => {
                self.note_path = args.get("path").and_then(Value::as_str).map(normalize_path);
                self.stage = WorkflowStage::AwaitingMetadata;
            }
            (("kb_metadata", "add_metadata"), WorkflowStage::AwaitingMetadata) => {
                self.stage = WorkflowStage::AwaitingFinish;
            }
            _ => {}
        }
        tracing::debug!(stage = %self.stage, "workflow advanced");
    }

    fn expected(&self) -> String {
        match self.stage {
            WorkflowStage::AwaitingWrite if self.fetches < MAX_FETCHES => {
                format!("{} (or another fetch.fetch)", self.stage)
            }
            stage => stage.to_string(),
        }
    }

    fn check_metadata_path(&self, args: &Map<String, Value>) -> Result<(), String> {
        let given = args.get("file_path").and_then(Value::as_str).map(normalize_path);
        match (&self.note_path, given) {
            (Some(written), Some(given)) if *written != given => Err(format!(
                "workflow violation: file_path '{given}' does not match the note written at '{written}'"
            )),
            _ => Ok(()),
        }
    }
}

fn normalize_path(path: &str) -> String {
    path.trim()
        .trim_start_matches("./")
        .trim_start_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn happy_path_reaches_finish() {
        let mut guard = WorkflowGuard::new();
        let none = Map::new();
        assert!(!guard.allows_finish());

        assert!(guard.check("fetch", "fetch", &none).is_ok());
        guard.record_success("fetch", "fetch", &none);
        assert!(guard.check("fetch", "fetch", &none).is_ok());
        guard.record_success("fetch", "fetch", &none);

        let write = args(json!({"path": "notes/rust.md", "content": "# Rust"}));
        assert!(guard.check("filesystem", "write_file", &write).is_ok());
        guard.record_success("filesystem", "write_file", &write);
        assert_eq!(guard.stage(), WorkflowStage::AwaitingMetadata);

        let meta = args(json!({"topic": "rust", "file_path": "./notes/rust.md", "summary": "s"}));
        assert!(guard.check("kb_metadata", "add_metadata", &meta).is_ok());
        guard.record_success("kb_metadata", "add_metadata", &meta);
        assert!(guard.allows_finish());
    }

    #[test]
    fn out_of_order_calls_are_rejected() {
        let guard = WorkflowGuard::new();
        let err = guard
            .check("filesystem", "write_file", &Map::new())
            .unwrap_err();
        assert_eq!(
            err,
            "workflow violation: expected fetch.fetch next, got filesystem.write_file"
        );
    }

    #[test]
    fn third_fetch_is_rejected() {
        let mut guard = WorkflowGuard::new();
        let none = Map::new();
        guard.record_success("fetch", "fetch", &none);
        guard.record_success("fetch", "fetch", &none);
        let err = guard.check("fetch", "fetch", &none).unwrap_err();
        assert!(err.contains("expected filesystem.write_file next"));
    }

    #[test]
    fn metadata_must_name_the_written_note() {
        let mut guard = WorkflowGuard::new();
        let none = Map::new();
        guard.record_success("fetch", "fetch", &none);
        guard.record_success(
            "filesystem",
            "write_file",
            &args(json!({"path": "notes/a.md", "content": "x"})),
        );
        let err = guard
            .check(
                "kb_metadata",
                "add_metadata",
                &args(json!({"file_path": "notes/b.md"})),
            )
            .unwrap_err();
        assert!(err.contains("does not match"));
    }
}
