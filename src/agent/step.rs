use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// One executed tool call, as the planner and the archive see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: usize,
    pub server: String,
    pub tool: String,
    pub args: Map<String, Value>,
    pub success: bool,
    pub error: Option<String>,
    /// First characters of the tool's text output. Empty on failure.
    pub output_snippet: String,
    /// Attempts the retry policy made. Zero when the call was refused
    /// before reaching a server.
    pub attempts: usize,
    pub elapsed_ms: u64,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// The model finished after at least one successful tool call.
    Finished,
    /// The model produced a plan that could not be executed.
    Aborted,
    /// The step budget ran out and the summarizer wrote the answer.
    Summarized,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Finished => write!(f, "finished"),
            RunState::Aborted => write!(f, "aborted"),
            RunState::Summarized => write!(f, "summarized"),
        }
    }
}

/// Everything a caller gets back from [`Agent::run`](super::Agent::run).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_id: String,
    pub goal: String,
    pub backend: String,
    pub state: RunState,
    pub final_answer: String,
    pub logs: Vec<StepRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunOutcome {
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    pub fn successful_calls(&self) -> usize {
        self.logs.iter().filter(|l| l.success).count()
    }
}
