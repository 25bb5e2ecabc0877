//! Interactive shell for ferret.
//!
//! Each line typed is a goal, run to completion with live step output.
//! Uses [`rustyline`] for line editing with history persisted under the cache
//! directory.
//!
//! - **Ctrl+C** at the prompt clears the line; during a run it abandons the
//!   run (live MCP servers are killed when the run future is dropped)
//! - **Ctrl+D** exits

use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::agent::{Agent, RunOutcome};
use crate::config::Config;
use crate::format::render_markdown_lite;
use crate::output::{print_error, short_id, StdoutRenderer};

/// Action returned by slash command handling.
enum CommandAction {
    Continue,
    Quit,
    Unknown(String),
}

struct ShellState {
    max_steps: usize,
    save: bool,
    last: Option<RunOutcome>,
}

pub(crate) async fn run_shell(config: &Config, agent: Agent) -> Result<()> {
    let mut state = ShellState {
        max_steps: config.agent.max_steps(),
        save: true,
        last: None,
    };

    println!(
        "{} [backend: {}] [steps: {}] (/help for commands, Ctrl+D to exit)",
        "ferret shell".bold().cyan(),
        agent.backend_label().yellow(),
        state.max_steps
    );
    println!();

    let mut rl = DefaultEditor::new()?;
    let history_path = Config::cache_dir()?.join(crate::constants::HISTORY_FILENAME);
    if history_path.exists() {
        let _ = rl.load_history(&history_path);
    }

    loop {
        match rl.readline(&format!("{} ", "goal>".green().bold())) {
            Ok(line) => {
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                if line.starts_with('/') {
                    match handle_command(&line, &mut state) {
                        CommandAction::Continue => continue,
                        CommandAction::Quit => break,
                        CommandAction::Unknown(cmd) => {
                            println!("{} Unknown command: {}", "?".yellow(), cmd);
                            continue;
                        }
                    }
                }

                println!();
                let mut renderer = StdoutRenderer::new(state.max_steps);
                let outcome = tokio::select! {
                    outcome = agent.run_with(&line, state.max_steps, &mut renderer) => Some(outcome),
                    _ = tokio::signal::ctrl_c() => None,
                };
                match outcome {
                    Some(outcome) => {
                        println!();
                        println!("{}", render_markdown_lite(&outcome.final_answer));
                        println!();
                        println!(
                            "{}",
                            format!(
                                "[{} | {} steps | run {}]",
                                outcome.state,
                                outcome.logs.len(),
                                short_id(&outcome.run_id)
                            )
                            .dimmed()
                        );
                        if state.save {
                            super::archive_outcome(&outcome);
                        }
                        state.last = Some(outcome);
                    }
                    None => print_error("run interrupted"),
                }
                println!();
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".dimmed());
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "goodbye.".dimmed());
                break;
            }
            Err(e) => {
                print_error(&e.to_string());
                break;
            }
        }
    }

    // Save readline history
    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = rl.save_history(&history_path);

    Ok(())
}

fn handle_command(line: &str, state: &mut ShellState) -> CommandAction {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default();
    match command {
        "/help" => {
            println!("  {}       show this help", "/help".cyan());
            println!("  {}  set the step budget", "/steps <n>".cyan());
            println!("  {}       show the last run's tool calls", "/last".cyan());
            println!("  {}   toggle archiving of runs", "/save on|off".cyan());
            println!("  {}       exit", "/quit".cyan());
            CommandAction::Continue
        }
        "/steps" => {
            match parts.next().map(str::parse::<usize>) {
                Some(Ok(n)) if n > 0 => {
                    state.max_steps = n;
                    println!("{} {}", "step budget:".dimmed(), n);
                }
                _ => println!("{} usage: /steps <n> (n > 0)", "?".yellow()),
            }
            CommandAction::Continue
        }
        "/save" => {
            match parts.next() {
                Some("on") => state.save = true,
                Some("off") => state.save = false,
                _ => println!("{} usage: /save on|off", "?".yellow()),
            }
            println!(
                "{} {}",
                "archiving:".dimmed(),
                if state.save { "on" } else { "off" }
            );
            CommandAction::Continue
        }
        "/last" => {
            match &state.last {
                None => println!("{}", "No run yet.".dimmed()),
                Some(outcome) => {
                    for log in &outcome.logs {
                        let status = log
                            .error
                            .as_deref()
                            .map_or_else(|| "ok".green().to_string(), |e| e.red().to_string());
                        println!(
                            "  {} {} {}",
                            format!("{}.", log.step).dimmed(),
                            format!("{}.{}", log.server, log.tool).cyan(),
                            status
                        );
                    }
                    if outcome.logs.is_empty() {
                        println!("{}", "(no tool calls)".dimmed());
                    }
                }
            }
            CommandAction::Continue
        }
        "/quit" | "/exit" => CommandAction::Quit,
        other => CommandAction::Unknown(other.to_string()),
    }
}
