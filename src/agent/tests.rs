use super::*;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::BackendError;
use crate::mcp::{McpClient, RetryPolicy, ToolCallResult};
use crate::message::ChatMessage;

/// Backend that replays canned answers and records every request.
pub(crate) struct ScriptedBackend {
    answers: Mutex<VecDeque<Result<String, BackendError>>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedBackend {
    pub(crate) fn new(answers: Vec<Result<String, BackendError>>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, BackendError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(r#"{"action":"finish","answer":"script exhausted"}"#.into()))
    }

    fn describe(&self) -> String {
        "scripted/test".into()
    }
}

/// Tool client that replays canned results and records every attempt.
pub(crate) struct FakeTools {
    results: Mutex<VecDeque<ToolCallResult>>,
    calls: Mutex<Vec<(String, String, Map<String, Value>)>>,
    max_attempts: usize,
}

impl FakeTools {
    pub(crate) fn new(results: Vec<ToolCallResult>, max_attempts: usize) -> Self {
        Self {
            results: Mutex::new(results.into()),
            calls: Mutex::new(Vec::new()),
            max_attempts,
        }
    }

    pub(crate) fn calls(&self) -> Vec<(String, String, Map<String, Value>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolInvoker for FakeTools {
    async fn invoke(&self, server: &str, tool: &str, args: &Map<String, Value>) -> ToolCallResult {
        self.calls
            .lock()
            .unwrap()
            .push((server.to_string(), tool.to_string(), args.clone()));
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ToolCallResult::ok(Some("default output".into())))
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            backoff: std::time::Duration::ZERO,
        }
    }
}

fn agent(config: &Config, backend: &Arc<ScriptedBackend>, tools: Arc<dyn ToolInvoker>) -> Agent {
    Agent::new(config, backend.clone() as Arc<dyn ChatBackend>, tools)
}

fn answers(texts: &[&str]) -> Vec<Result<String, BackendError>> {
    texts.iter().map(|t| Ok(t.to_string())).collect()
}

const FETCH: &str =
    r#"{"action":"call_tool","server":"fetch","tool":"fetch","args":{"url":"https://example.com","max_length":null}}"#;
const DONE: &str = r#"{"action":"finish","answer":"done"}"#;

#[tokio::test]
async fn early_finish_is_discarded_then_honored_after_a_tool_call() {
    let backend = Arc::new(ScriptedBackend::new(answers(&[DONE, FETCH, DONE])));
    let tools = Arc::new(FakeTools::new(vec![ToolCallResult::ok(Some("page".into()))], 2));
    let outcome = agent(&Config::default(), &backend, tools.clone())
        .run("fetch X and finish", 3)
        .await;

    assert_eq!(outcome.state, RunState::Finished);
    assert_eq!(outcome.final_answer, "done");
    assert_eq!(outcome.logs.len(), 1);
    assert_eq!(outcome.logs[0].step, 2);
    assert_eq!(outcome.logs[0].output_snippet, "page");

    let requests = backend.requests();
    assert_eq!(requests.len(), 3);
    // finish is forbidden until a tool call has succeeded
    assert!(requests[0][0].content.contains(crate::constants::MUST_CALL_TOOL_PROMPT));
    assert!(requests[1][0].content.contains(crate::constants::MUST_CALL_TOOL_PROMPT));
    assert!(!requests[2][0].content.contains(crate::constants::MUST_CALL_TOOL_PROMPT));
    assert!(requests[2][1].content.contains("Step 2: fetch.fetch, status=ok, output=page"));
}

#[tokio::test]
async fn failing_call_is_logged_once_and_summarized() {
    let timeout = "timed out after 60s during tools/call";
    let backend = Arc::new(ScriptedBackend::new(answers(&[FETCH, "## Summary\nNothing found."])));
    let tools = Arc::new(FakeTools::new(
        vec![
            ToolCallResult::failure("connection reset"),
            ToolCallResult::failure(timeout),
        ],
        2,
    ));
    let outcome = agent(&Config::default(), &backend, tools.clone())
        .run("fetch X", 1)
        .await;

    assert_eq!(outcome.state, RunState::Summarized);
    assert_eq!(outcome.final_answer, "## Summary\nNothing found.");
    assert_eq!(outcome.logs.len(), 1);
    let log = &outcome.logs[0];
    assert!(!log.success);
    assert_eq!(log.attempts, 2);
    assert_eq!(log.error.as_deref(), Some(timeout));
    assert_eq!(tools.calls().len(), 2);

    let requests = backend.requests();
    assert_eq!(requests[1][0].content, crate::constants::SUMMARIZER_PROMPT);
    assert!(requests[1][1].content.contains(&format!("status=error: {timeout}")));
}

#[tokio::test]
async fn unknown_server_is_logged_and_the_run_continues() {
    let ghost = r#"{"action":"call_tool","server":"ghost","tool":"x","args":{}}"#;
    let backend = Arc::new(ScriptedBackend::new(answers(&[ghost, DONE, "summary"])));
    let config = Config::default();
    let tools = Arc::new(McpClient::new(&config));
    let outcome = agent(&config, &backend, tools).run("use ghost", 2).await;

    assert_eq!(outcome.logs.len(), 1);
    let log = &outcome.logs[0];
    assert!(!log.success);
    assert!(log.error.as_deref().unwrap().contains("ghost"));
    // no tool succeeded, so the finish at step 2 is discarded too
    assert_eq!(outcome.state, RunState::Summarized);
    assert_eq!(outcome.final_answer, "summary");
}

#[tokio::test]
async fn null_arguments_never_reach_the_tool_client() {
    let backend = Arc::new(ScriptedBackend::new(answers(&[FETCH, DONE])));
    let tools = Arc::new(FakeTools::new(vec![], 1));
    let outcome = agent(&Config::default(), &backend, tools.clone())
        .run("g", 2)
        .await;

    assert_eq!(outcome.state, RunState::Finished);
    for (_, _, args) in tools.calls() {
        assert!(args.values().all(|v| !v.is_null()));
    }
    assert!(!outcome.logs[0].args.contains_key("max_length"));
}

#[tokio::test]
async fn malformed_plans_abort_with_diagnostic() {
    let backend = Arc::new(ScriptedBackend::new(answers(&[r#"{"action":"search","q":"x"}"#])));
    let tools = Arc::new(FakeTools::new(vec![], 1));
    let outcome = agent(&Config::default(), &backend, tools.clone()).run("g", 5).await;
    assert_eq!(outcome.state, RunState::Aborted);
    assert!(outcome.final_answer.starts_with("Unknown action from model: {"));
    assert!(tools.calls().is_empty());

    let backend = Arc::new(ScriptedBackend::new(answers(&[r#"{"action":"call_tool","tool":"fetch"}"#])));
    let outcome = agent(&Config::default(), &backend, tools).run("g", 5).await;
    assert_eq!(outcome.state, RunState::Aborted);
    assert!(outcome.final_answer.starts_with("Invalid tool call plan:"));
}

#[tokio::test]
async fn blank_answer_gets_placeholder() {
    let backend = Arc::new(ScriptedBackend::new(answers(&[
        FETCH,
        r#"{"action":"finish","answer":"   "}"#,
    ])));
    let tools = Arc::new(FakeTools::new(vec![], 1));
    let outcome = agent(&Config::default(), &backend, tools).run("g", 3).await;
    assert_eq!(outcome.state, RunState::Finished);
    assert_eq!(outcome.final_answer, "(model returned empty answer)");
}

#[tokio::test]
async fn backend_error_degrades_to_finish_text() {
    let backend = Arc::new(ScriptedBackend::new(vec![
        Ok(FETCH.to_string()),
        Err(BackendError::Status {
            backend: "groq",
            status: 503,
            body: "over capacity".into(),
        }),
    ]));
    let tools = Arc::new(FakeTools::new(vec![], 1));
    let outcome = agent(&Config::default(), &backend, tools).run("g", 3).await;
    assert_eq!(outcome.state, RunState::Finished);
    assert_eq!(outcome.final_answer, "groq returned HTTP 503: over capacity");
}

#[tokio::test]
async fn strict_workflow_refuses_out_of_order_calls() {
    let mut config = Config::default();
    config.agent.strict_workflow = Some(true);

    let write = r#"{"action":"call_tool","server":"filesystem","tool":"write_file","args":{"path":"notes/x.md","content":"x"}}"#;
    let meta = r#"{"action":"call_tool","server":"kb_metadata","tool":"add_metadata","args":{"topic":"x","file_path":"notes/x.md","summary":"s"}}"#;
    let backend = Arc::new(ScriptedBackend::new(answers(&[
        write, FETCH, DONE, write, meta, DONE,
    ])));
    let tools = Arc::new(FakeTools::new(vec![], 1));
    let outcome = agent(&config, &backend, tools.clone()).run("g", 6).await;

    assert_eq!(outcome.state, RunState::Finished);
    let steps: Vec<(usize, bool, usize)> = outcome
        .logs
        .iter()
        .map(|l| (l.step, l.success, l.attempts))
        .collect();
    assert_eq!(steps, vec![(1, false, 0), (2, true, 1), (4, true, 1), (5, true, 1)]);
    assert!(outcome.logs[0]
        .error
        .as_deref()
        .unwrap()
        .starts_with("workflow violation"));
    // the refused call never reached the tool client
    assert_eq!(tools.calls().len(), 3);
}

#[tokio::test]
async fn outcome_carries_identity_and_timing() {
    let backend = Arc::new(ScriptedBackend::new(answers(&[FETCH, DONE])));
    let tools = Arc::new(FakeTools::new(vec![], 1));
    let outcome = agent(&Config::default(), &backend, tools).run("goal text", 2).await;
    assert_eq!(outcome.goal, "goal text");
    assert_eq!(outcome.backend, "scripted/test");
    assert_eq!(outcome.run_id.len(), 36);
    assert!(outcome.finished_at >= outcome.started_at);
}
