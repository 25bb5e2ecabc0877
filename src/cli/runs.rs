//! Archive browsing for the `ferret runs` subcommand family.
//!
//! Table-formatted listing sized to the terminal, plus git-style partial run
//! IDs for `show` and `delete`.

use anyhow::Result;
use colored::Colorize;

use super::RunsAction;
use crate::agent::{RunOutcome, RunState};
use crate::archive::{RunArchive, RunMeta};
use crate::format::render_markdown_lite;
use crate::output::short_id;

/// Dispatches a runs subcommand to its handler.
pub(crate) fn handle_runs(action: RunsAction) -> Result<()> {
    let archive = RunArchive::open_default()?;
    match action {
        RunsAction::List => runs_list(&archive),
        RunsAction::Show { id, json } => {
            let meta = archive.resolve_id(&id)?;
            let outcome = archive.load(&meta.id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_run(&outcome);
            }
            Ok(())
        }
        RunsAction::Delete { id } => {
            let meta = archive.resolve_id(&id)?;
            println!(
                "Deleting run {} (\"{}\")",
                short_id(&meta.id).cyan(),
                meta.goal
            );
            archive.delete(&meta.id)?;
            println!("{}", "Deleted.".green());
            Ok(())
        }
    }
}

fn state_colored(state: RunState, width: usize) -> String {
    let text = format!("{:<width$}", state.to_string());
    match state {
        RunState::Finished => text.green().to_string(),
        RunState::Aborted => text.red().to_string(),
        RunState::Summarized => text.yellow().to_string(),
    }
}

/// Lists archived runs in a table that adapts to the terminal width.
fn runs_list(archive: &RunArchive) -> Result<()> {
    let runs = archive.list()?;
    if runs.is_empty() {
        println!("{}", "No runs found.".dimmed());
        println!("Start one with: {}", "ferret run \"<goal>\"".cyan());
        return Ok(());
    }

    let term_width = terminal_size::terminal_size()
        .map(|(w, _)| w.0 as usize)
        .unwrap_or(80);

    // ID=10, STATE=12, STEPS=6, CREATED=18
    let fixed_cols = 10 + 12 + 6 + 18;
    let max_goal_len = runs
        .iter()
        .map(|r| r.goal.chars().count())
        .max()
        .unwrap_or(4);
    let max_from_terminal = term_width.saturating_sub(fixed_cols + 2).min(60);
    let goal_width = max_goal_len.max(4).min(max_from_terminal.max(4));
    let header_width = fixed_cols + goal_width + 2;

    println!(
        "{} {} {} {} {}",
        format!("{:<10}", "ID").bold(),
        format!("{:<12}", "STATE").bold(),
        format!("{:<6}", "STEPS").bold(),
        format!("{:<18}", "CREATED").bold(),
        "GOAL".bold(),
    );
    println!("{}", "-".repeat(term_width.min(header_width)));

    for run in &runs {
        print_row(run, goal_width);
    }
    println!();
    println!(
        "{} {} runs. Show one with: {}",
        "total:".dimmed(),
        runs.len(),
        "ferret runs show <id>".cyan()
    );
    Ok(())
}

fn print_row(run: &RunMeta, goal_width: usize) {
    let goal = if run.goal.chars().count() > goal_width {
        let truncated: String = run.goal.chars().take(goal_width.saturating_sub(3)).collect();
        format!("{}...", truncated)
    } else {
        run.goal.clone()
    };

    // Format timestamp: parse RFC3339 -> "YYYY-MM-DD HH:MM"
    let created = chrono::DateTime::parse_from_rfc3339(&run.created_at)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| run.created_at.chars().take(16).collect());

    // Pad first, then colorize to avoid ANSI escape code width issues
    println!(
        "{} {} {} {} {}",
        format!("{:<10}", short_id(&run.id)).cyan(),
        state_colored(run.state, 12),
        format!("{:<6}", run.steps).yellow(),
        format!("{:<18}", created).dimmed(),
        goal,
    );
}

/// Prints a stored run: header, step table and the answer.
fn print_run(outcome: &RunOutcome) {
    println!("{} {}", "run".bold(), outcome.run_id.cyan());
    println!("{} {}", "goal:".bold(), outcome.goal);
    println!(
        "{} {}  {} {}  {} {}",
        "state:".bold(),
        state_colored(outcome.state, 0),
        "backend:".bold(),
        outcome.backend.dimmed(),
        "started:".bold(),
        outcome.started_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
    );
    println!();

    if outcome.logs.is_empty() {
        println!("{}", "(no tool calls)".dimmed());
    }
    for log in &outcome.logs {
        let status = match &log.error {
            None => "ok".green().to_string(),
            Some(e) => format!("{} {}", "error:".red(), e),
        };
        println!(
            "{} {} {} {}",
            format!("{:>2}.", log.step).dimmed(),
            format!("{}.{}", log.server, log.tool).cyan(),
            status,
            format!("({} attempts, {}ms)", log.attempts, log.elapsed_ms).dimmed()
        );
    }
    println!();
    println!("{}", render_markdown_lite(&outcome.final_answer));
}
