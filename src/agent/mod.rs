//! The planning loop.
//!
//! Each step asks the backend for the next action, parses it into a
//! [`Plan`] and either executes one tool call or stops. The model may not
//! finish before a tool call has succeeded. When the step budget runs out the
//! [`summarizer`] writes the answer from whatever the tools returned.
//!
//! Steps are strictly sequential and a run owns its step log; nothing is
//! shared between runs except the backend and tool clients, which are
//! stateless.

pub mod prompt;
pub mod step;
pub mod summarizer;

#[cfg(test)]
pub(crate) mod tests;

pub use step::{RunOutcome, RunState, StepRecord};

use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::backend::ChatBackend;
use crate::config::Config;
use crate::constants::{EMPTY_ANSWER, OUTPUT_SNIPPET_CHARS};
use crate::error::PlanShapeError;
use crate::mcp::{sanitize_args, ToolInvoker};
use crate::output::{NullRenderer, Renderer};
use crate::plan::{self, Plan};
use crate::workflow::{WorkflowGuard, WorkflowStage};
use prompt::{history_summary, planner_messages, server_catalog, truncate_chars};

pub struct Agent {
    backend: Arc<dyn ChatBackend>,
    tools: Arc<dyn ToolInvoker>,
    catalog: String,
    history_window: usize,
    strict_workflow: bool,
}

impl Agent {
    pub fn new(config: &Config, backend: Arc<dyn ChatBackend>, tools: Arc<dyn ToolInvoker>) -> Self {
        Self {
            backend,
            tools,
            catalog: server_catalog(&config.servers),
            history_window: config.agent.history_window(),
            strict_workflow: config.agent.strict_workflow(),
        }
    }

    pub fn backend_label(&self) -> String {
        self.backend.describe()
    }

    /// Runs `goal` to completion without progress output.
    pub async fn run(&self, goal: &str, max_steps: usize) -> RunOutcome {
        self.run_with(goal, max_steps, &mut NullRenderer).await
    }

    /// Runs `goal` to completion, reporting each step to `renderer`.
    pub async fn run_with(
        &self,
        goal: &str,
        max_steps: usize,
        renderer: &mut dyn Renderer,
    ) -> RunOutcome {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let span = tracing::info_span!("run", run_id = %run_id);

        let (state, final_answer, logs) = self
            .drive(goal, max_steps, renderer)
            .instrument(span)
            .await;

        RunOutcome {
            run_id,
            goal: goal.to_string(),
            backend: self.backend.describe(),
            state,
            final_answer,
            logs,
            started_at,
            finished_at: Utc::now(),
        }
    }

    async fn drive(
        &self,
        goal: &str,
        max_steps: usize,
        renderer: &mut dyn Renderer,
    ) -> (RunState, String, Vec<StepRecord>) {
        let mut logs: Vec<StepRecord> = Vec::new();
        let mut used_tool = false;
        let mut guard = self.strict_workflow.then(WorkflowGuard::new);
        tracing::info!(
            goal,
            max_steps,
            backend = %self.backend.describe(),
            strict = self.strict_workflow,
            "run started"
        );

        for step in 1..=max_steps {
            let finish_allowed =
                used_tool && guard.as_ref().map_or(true, WorkflowGuard::allows_finish);
            let stage = guard.as_ref().map(WorkflowGuard::stage);

            match self.next_plan(goal, &logs, !finish_allowed, stage).await {
                Err(shape) => {
                    tracing::warn!(step, error = %shape, "aborting on unusable plan");
                    return (RunState::Aborted, shape.to_string(), logs);
                }
                Ok(Plan::Finish { .. }) if !finish_allowed => {
                    let reason = if used_tool {
                        "before the workflow completed"
                    } else {
                        "before any successful tool call"
                    };
                    tracing::warn!(step, "model tried to finish {reason}, ignoring");
                    renderer.render_notice(&format!(
                        "step {step}: model tried to finish {reason}, asking again"
                    ));
                }
                Ok(Plan::Finish { answer }) => {
                    let answer = answer.trim();
                    let answer = if answer.is_empty() { EMPTY_ANSWER } else { answer };
                    tracing::info!(step, steps = logs.len(), "model finished");
                    return (RunState::Finished, answer.to_string(), logs);
                }
                Ok(Plan::CallTool { server, tool, args }) => {
                    renderer.render_call(step, &server, &tool, &args);
                    let record = self.execute(step, server, tool, args, guard.as_mut()).await;
                    used_tool |= record.success;
                    renderer.render_step(&record);
                    logs.push(record);
                }
            }
        }

        tracing::info!(max_steps, "step budget exhausted, summarizing");
        renderer.render_notice("step budget exhausted, summarizing");
        let answer =
            summarizer::summarize(self.backend.as_ref(), goal, &logs, self.history_window).await;
        (RunState::Summarized, answer, logs)
    }

    /// Asks the backend for the next plan. A failed request is treated like
    /// a prose answer: it becomes `Finish` with the error text.
    async fn next_plan(
        &self,
        goal: &str,
        logs: &[StepRecord],
        must_call_tool: bool,
        stage: Option<WorkflowStage>,
    ) -> Result<Plan, PlanShapeError> {
        let history = history_summary(logs, self.history_window);
        let messages = planner_messages(&self.catalog, goal, &history, must_call_tool, stage);
        tracing::debug!(history = %history, must_call_tool, "requesting plan");

        let raw = match self.backend.complete(&messages).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, "plan request failed");
                return Ok(Plan::Finish {
                    answer: e.to_string(),
                });
            }
        };
        tracing::debug!(raw = %raw, "model output");
        let plan = plan::parse(&raw);
        if let Ok(Plan::CallTool { server, tool, .. }) = &plan {
            tracing::info!(server = %server, tool = %tool, "model chose tool");
        }
        plan
    }

    async fn execute(
        &self,
        step: usize,
        server: String,
        tool: String,
        args: Map<String, Value>,
        guard: Option<&mut WorkflowGuard>,
    ) -> StepRecord {
        let args = sanitize_args(&args);

        if let Some(g) = &guard {
            if let Err(reason) = g.check(&server, &tool, &args) {
                tracing::warn!(step, %server, %tool, %reason, "call refused by workflow guard");
                return StepRecord {
                    step,
                    server,
                    tool,
                    args,
                    success: false,
                    error: Some(reason),
                    output_snippet: String::new(),
                    attempts: 0,
                    elapsed_ms: 0,
                };
            }
        }

        let started = Instant::now();
        let call = self.tools.invoke_with_retry(&server, &tool, &args).await;
        if call.result.success {
            if let Some(g) = guard {
                g.record_success(&server, &tool, &args);
            }
        }

        StepRecord {
            step,
            output_snippet: call
                .result
                .text
                .as_deref()
                .map(|t| truncate_chars(t, OUTPUT_SNIPPET_CHARS))
                .unwrap_or_default(),
            server,
            tool,
            args,
            success: call.result.success,
            error: call.result.error,
            attempts: call.attempts,
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }
}
