//! Terminal rendering for ferret.
//!
//! The agent reports progress through the [`Renderer`] trait so the loop
//! stays independent of the display. [`StdoutRenderer`] draws step lines on
//! stderr and leaves stdout for the final answer, which keeps
//! `ferret run ... > answer.md` useful.

use colored::Colorize;
use serde_json::{Map, Value};

use crate::agent::{RunOutcome, RunState, StepRecord};

/// Characters of tool arguments shown on a step line.
const ARGS_PREVIEW_CHARS: usize = 80;

/// Receives progress events from a run.
pub trait Renderer: Send {
    /// A tool call is about to be executed.
    fn render_call(&mut self, step: usize, server: &str, tool: &str, args: &Map<String, Value>);

    /// A tool call finished (after retries).
    fn render_step(&mut self, record: &StepRecord);

    /// Something the user should know that is not a step.
    fn render_notice(&mut self, message: &str);
}

/// Discards every event.
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render_call(&mut self, _: usize, _: &str, _: &str, _: &Map<String, Value>) {}
    fn render_step(&mut self, _: &StepRecord) {}
    fn render_notice(&mut self, _: &str) {}
}

/// Colored progress lines on stderr.
pub struct StdoutRenderer {
    max_steps: usize,
}

impl StdoutRenderer {
    pub fn new(max_steps: usize) -> Self {
        Self { max_steps }
    }
}

impl Renderer for StdoutRenderer {
    fn render_call(&mut self, step: usize, server: &str, tool: &str, args: &Map<String, Value>) {
        let args = Value::Object(args.clone()).to_string();
        eprintln!(
            "{} {} {}",
            format!("[{step}/{}]", self.max_steps).dimmed(),
            format!("{server}.{tool}").cyan().bold(),
            crate::agent::prompt::ellipsize(&args, ARGS_PREVIEW_CHARS).dimmed()
        );
    }

    fn render_step(&mut self, record: &StepRecord) {
        let retries = if record.attempts > 1 {
            format!(" after {} attempts", record.attempts)
        } else {
            String::new()
        };
        match &record.error {
            None => eprintln!(
                "      {} {}{}",
                "ok".green(),
                format!("{} chars, {}ms", record.output_snippet.chars().count(), record.elapsed_ms)
                    .dimmed(),
                retries.dimmed()
            ),
            Some(error) => eprintln!("      {} {}{}", "error:".red(), error, retries.dimmed()),
        }
    }

    fn render_notice(&mut self, message: &str) {
        eprintln!("{} {}", "note:".yellow(), message);
    }
}

/// Prints the final answer to stdout with a one-line footer on stderr.
pub fn print_outcome(outcome: &RunOutcome) {
    eprintln!();
    match outcome.state {
        RunState::Finished => {}
        RunState::Aborted => eprintln!("{}", "run aborted:".red().bold()),
        RunState::Summarized => eprintln!("{}", "(summarized from tool history)".yellow()),
    }
    println!("{}", outcome.final_answer);
    eprintln!();
    eprintln!(
        "{}",
        format!(
            "[{} | {} steps, {} ok | {:.1}s | run {}]",
            outcome.state,
            outcome.logs.len(),
            outcome.successful_calls(),
            outcome.elapsed().num_milliseconds() as f64 / 1000.0,
            short_id(&outcome.run_id)
        )
        .dimmed()
    );
}

/// Prints a plain error line to stderr.
pub fn print_error(err: &str) {
    eprintln!("{} {}", "error:".red().bold(), err);
}

/// First eight characters of a run id.
pub fn short_id(id: &str) -> &str {
    id.char_indices().nth(8).map_or(id, |(end, _)| &id[..end])
}
