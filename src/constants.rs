//! Centralized constants for ferret.
//!
//! All magic numbers, default strings, and prompt texts live here
//! so they can be changed in one place.

/// Application name used in CLI output and directory paths.
pub const APP_NAME: &str = "ferret";

/// Configuration filename.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Per-project configuration filename.
pub const PROJECT_CONFIG_FILENAME: &str = "ferret.toml";

/// Readline history filename.
pub const HISTORY_FILENAME: &str = "shell_history.txt";

/// Default tracing filter when `FERRET_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "ferret=warn";

// --- Backend defaults ---

/// Default backend when none is configured.
pub const DEFAULT_BACKEND: &str = "ollama";

/// Default base URL for local Ollama server.
pub const OLLAMA_DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Default Ollama model.
pub const OLLAMA_DEFAULT_MODEL: &str = "llama3.2:3b";

/// Default OpenAI model.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1";

/// Default Anthropic model.
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-6";

/// Maximum tokens for rig-core completions.
pub const MAX_TOKENS: u64 = 4096;

/// Maximum characters of an upstream error body kept in a `BackendError`.
pub const ERROR_BODY_MAX_CHARS: usize = 1000;

// --- Agent defaults ---

/// Default planning step budget.
pub const DEFAULT_MAX_STEPS: usize = 5;

/// Default number of attempts per tool call.
pub const DEFAULT_MAX_TOOL_RETRIES: usize = 2;

/// Default pause between tool call attempts.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;

/// Default timeout for each MCP request phase.
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 60;

/// Default timeout for a backend completion request.
pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 120;

/// Number of recent steps rendered into the planning prompt.
pub const DEFAULT_HISTORY_WINDOW: usize = 5;

/// Characters of tool output kept in each step record.
pub const OUTPUT_SNIPPET_CHARS: usize = 300;

/// Characters of each step's output shown to the planner.
pub const HISTORY_SNIPPET_CHARS: usize = 150;

/// History text used before any tool has been called.
pub const EMPTY_HISTORY: &str = "(no tool calls yet)";

/// Answer used when the model finishes with a blank string.
pub const EMPTY_ANSWER: &str = "(model returned empty answer)";

// --- MCP ---

/// MCP protocol revision announced during `initialize`.
pub const MCP_PROTOCOL_VERSION: &str = "2025-06-18";

/// Client name announced during `initialize`.
pub const MCP_CLIENT_NAME: &str = "ferret";

// --- Prompts ---

/// Planning instructions shared by every step. The server catalog and the
/// per-step constraints are appended by the agent.
pub const PLANNER_PROMPT: &str = r#"You are an MCP planning agent.

Your ONLY job is to decide the NEXT ACTION in a multi-step tool workflow.
You do NOT execute tools yourself. You only emit JSON instructions that the
host program will follow exactly.

You MUST always respond with EXACTLY ONE JSON object, and NOTHING else.
No natural language, no explanations, no code fences, no comments.

VALID RESPONSE SCHEMAS

1) To CALL A TOOL:
{"action": "call_tool", "server": "<server_name>", "tool": "<tool_name>", "args": { ... }}

2) To FINISH:
{"action": "finish", "answer": "<final_markdown_answer>"}

NO other top-level keys are allowed.

WORKFLOW YOU MUST FOLLOW

1) Use "fetch.fetch" one or two times to gather information from the web.
2) Then use "filesystem.write_file" EXACTLY ONCE to save a markdown note.
   "path" is RELATIVE to the knowledge base root, e.g. "notes/topic.md".
   Do NOT start paths with "./" or "/".
3) Then use "kb_metadata.add_metadata" EXACTLY ONCE to register the note.
   "file_path" MUST match the path used for write_file.
4) Then use "finish" with a short markdown answer for the user.

ARGUMENT RULES

- For optional arguments, OMIT the field if you do not want to set it.
  DO NOT set them to null, None, or an empty string.

PLANNING RULES

- Never repeat the exact same tool call with the exact same arguments.
- Only use "finish" AFTER at least one successful tool call.
- If earlier tool calls failed, use the error information from history to
  choose better arguments in the next tool call."#;

/// Appended to the planning prompt while no tool call has succeeded yet.
pub const MUST_CALL_TOOL_PROMPT: &str =
    "For THIS step you are NOT allowed to use action 'finish'. You MUST use action 'call_tool'.";

/// System prompt for the fallback summarizer.
pub const SUMMARIZER_PROMPT: &str =
    "You are a summarizer. Do NOT call tools. Only write a short markdown answer.";
