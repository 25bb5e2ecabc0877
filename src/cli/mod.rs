//! Command-line interface definition and dispatch for ferret.
//!
//! Uses [`clap`] for argument parsing with derive macros. Each subcommand is
//! routed to its handler; archive browsing lives in [`runs`], the REPL in
//! [`shell`] and server discovery in [`tools`].

mod runs;
mod shell;
mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::sync::Arc;

use crate::agent::{Agent, RunOutcome};
use crate::archive::RunArchive;
use crate::backend::{resolve_backend, Backend, ChatBackend};
use crate::config::Config;
use crate::mcp::{McpClient, ToolInvoker};
use crate::output::{self, StdoutRenderer};

/// Top-level CLI structure for ferret.
#[derive(Parser)]
#[command(
    name = "ferret",
    version,
    about = "A research agent that plans MCP tool calls with an LLM"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the ferret CLI.
///
/// The `///` doc comments on variants double as `--help` text rendered by clap.
#[derive(Subcommand)]
pub enum Commands {
    /// Run one goal to completion
    Run {
        /// What you want researched
        goal: Vec<String>,
        /// Planning step budget (overrides config)
        #[arg(long)]
        max_steps: Option<usize>,
        /// Backend to use (ollama, groq, openai, anthropic)
        #[arg(short, long)]
        backend: Option<String>,
        /// Model to use; `backend/model` shorthand is accepted
        #[arg(short, long)]
        model: Option<String>,
        /// Print the full run outcome as JSON (no progress output)
        #[arg(long)]
        json: bool,
        /// Do not store the run in the archive
        #[arg(long)]
        no_save: bool,
    },
    /// Interactive shell: each line is a goal
    Shell {
        /// Backend to use (ollama, groq, openai, anthropic)
        #[arg(short, long)]
        backend: Option<String>,
        /// Model to use; `backend/model` shorthand is accepted
        #[arg(short, long)]
        model: Option<String>,
    },
    /// List configured MCP servers, or the tools one of them offers
    Tools {
        /// Server to start and query
        server: Option<String>,
    },
    /// Browse archived runs
    Runs {
        #[command(subcommand)]
        action: RunsAction,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Subcommands for the `runs` command.
#[derive(Subcommand)]
pub enum RunsAction {
    /// List archived runs
    List,
    /// Show a run by ID (supports partial IDs)
    Show {
        id: String,
        /// Print the stored JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Delete a run by ID (supports partial IDs)
    Delete { id: String },
}

/// Subcommands for the `config` command.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective config (files plus environment)
    Show,
    /// Print the global config file path
    Path,
}

/// Parses command-line arguments into a [`Cli`] struct.
pub fn parse() -> Cli {
    Cli::parse()
}

/// Dispatches the parsed CLI command to its handler.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run {
            goal,
            max_steps,
            backend,
            model,
            json,
            no_save,
        } => {
            let goal = goal.join(" ");
            if goal.trim().is_empty() {
                anyhow::bail!("No goal provided. Usage: ferret run \"your goal here\"");
            }
            let config = Config::load()?;
            let agent = build_agent(&config, backend.as_deref(), model.as_deref())?;
            let max_steps = max_steps.unwrap_or_else(|| config.agent.max_steps());

            // JSON mode keeps stderr quiet apart from logs.
            let outcome = if json {
                tokio::select! {
                    outcome = agent.run(&goal, max_steps) => outcome,
                    _ = tokio::signal::ctrl_c() => anyhow::bail!("interrupted"),
                }
            } else {
                eprintln!(
                    "{} [backend: {}] [steps: {}]",
                    "ferret".bold().cyan(),
                    agent.backend_label().yellow(),
                    max_steps
                );
                eprintln!("{} {}", ">".green().bold(), goal);
                eprintln!();

                let mut renderer = StdoutRenderer::new(max_steps);
                tokio::select! {
                    outcome = agent.run_with(&goal, max_steps, &mut renderer) => outcome,
                    _ = tokio::signal::ctrl_c() => anyhow::bail!("interrupted"),
                }
            };

            if !no_save {
                archive_outcome(&outcome);
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                output::print_outcome(&outcome);
            }
            Ok(())
        }
        Commands::Shell { backend, model } => {
            let config = Config::load()?;
            let agent = build_agent(&config, backend.as_deref(), model.as_deref())?;
            shell::run_shell(&config, agent).await
        }
        Commands::Tools { server } => {
            let config = Config::load()?;
            tools::handle_tools(&config, server.as_deref()).await
        }
        Commands::Runs { action } => runs::handle_runs(action),
        Commands::Config { action } => {
            match action {
                ConfigAction::Show => {
                    let config = Config::load()?;
                    let path = Config::config_path()?;
                    println!("{} {}", "Config path:".bold(), path.display());
                    println!();
                    let mut shown = config.clone();
                    redact_keys(&mut shown);
                    println!("{}", toml::to_string_pretty(&shown)?);
                }
                ConfigAction::Path => println!("{}", Config::config_path()?.display()),
            }
            Ok(())
        }
    }
}

/// Wires the backend, the MCP client and the agent from one config value.
pub(crate) fn build_agent(
    config: &Config,
    backend: Option<&str>,
    model: Option<&str>,
) -> Result<Agent> {
    let selection = resolve_backend(backend, model, config)?;
    let backend: Arc<dyn ChatBackend> = Arc::new(Backend::from_config(config, &selection)?);
    let tools: Arc<dyn ToolInvoker> = Arc::new(McpClient::new(config));
    Ok(Agent::new(config, backend, tools))
}

/// Stores a run, reporting but not failing on archive errors.
pub(crate) fn archive_outcome(outcome: &RunOutcome) {
    let saved = RunArchive::open_default().and_then(|archive| archive.save(outcome));
    if let Err(e) = saved {
        tracing::warn!(error = %e, "failed to archive run");
        output::print_error(&format!("could not archive run: {e:#}"));
    }
}

fn redact_keys(config: &mut Config) {
    let backends = &mut config.backends;
    for entry in [
        &mut backends.ollama,
        &mut backends.groq,
        &mut backends.openai,
        &mut backends.anthropic,
    ]
    .into_iter()
    .flatten()
    {
        if let Some(key) = entry.api_key.as_mut().filter(|k| !k.is_empty()) {
            *key = "********".to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_accepts_multi_word_goal_and_flags() {
        let cli = Cli::try_parse_from([
            "ferret", "run", "--max-steps", "3", "-m", "groq/llama", "--no-save", "research", "rust",
        ])
        .unwrap();
        match cli.command {
            Commands::Run {
                goal,
                max_steps,
                model,
                no_save,
                json,
                ..
            } => {
                assert_eq!(goal.join(" "), "research rust");
                assert_eq!(max_steps, Some(3));
                assert_eq!(model.as_deref(), Some("groq/llama"));
                assert!(no_save);
                assert!(!json);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn runs_show_takes_partial_id() {
        let cli = Cli::try_parse_from(["ferret", "runs", "show", "abc1"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Runs {
                action: RunsAction::Show { ref id, json: false }
            } if id == "abc1"
        ));
    }

    #[test]
    fn redaction_hides_api_keys() {
        let mut config = Config::from_toml_str(
            r#"
[backends.groq]
api_key = "gsk-secret"
"#,
        )
        .unwrap();
        redact_keys(&mut config);
        let groq = config.backends.groq.unwrap();
        assert_eq!(groq.api_key.as_deref(), Some("********"));
    }
}
