//! Run persistence for ferret.
//!
//! Each finished run is stored as pretty JSON under
//! `~/.local/share/ferret/runs/<id>.json`. A `runs/index.json` file keeps a
//! short summary of every run so listing does not parse every file.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::agent::{RunOutcome, RunState};
use crate::config::Config;
use crate::output::short_id;

/// Index entry for a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub id: String,
    pub goal: String,
    pub state: RunState,
    pub steps: usize,
    pub backend: String,
    pub created_at: String,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct RunIndex {
    runs: Vec<RunMeta>,
}

/// Directory of archived runs.
pub struct RunArchive {
    dir: PathBuf,
}

impl RunArchive {
    /// The archive under the user's data directory.
    pub fn open_default() -> Result<Self> {
        Ok(Self::at(Config::data_dir()?.join("runs")))
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Writes the run file and adds (or replaces) its index entry.
    pub fn save(&self, outcome: &RunOutcome) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).context("Failed to create runs directory")?;
        let path = self.run_path(&outcome.run_id);
        let json = serde_json::to_string_pretty(outcome)?;
        fs::write(&path, json).with_context(|| format!("Failed to write run file {:?}", path))?;

        let mut index = self.load_index()?;
        index.runs.retain(|r| r.id != outcome.run_id);
        index.runs.push(RunMeta {
            id: outcome.run_id.clone(),
            goal: outcome.goal.clone(),
            state: outcome.state,
            steps: outcome.logs.len(),
            backend: outcome.backend.clone(),
            created_at: outcome.started_at.to_rfc3339(),
        });
        self.write_index(&index)?;

        tracing::debug!(run_id = %outcome.run_id, path = %path.display(), "run archived");
        Ok(path)
    }

    pub fn load(&self, id: &str) -> Result<RunOutcome> {
        let path = self.run_path(id);
        anyhow::ensure!(path.exists(), "Run {} not found", short_id(id));
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read run file {:?}", path))?;
        serde_json::from_str(&contents).with_context(|| "Failed to parse run file")
    }

    /// All index entries, newest first.
    pub fn list(&self) -> Result<Vec<RunMeta>> {
        let mut runs = self.load_index()?.runs;
        runs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(runs)
    }

    /// Removes the run file and its index entry.
    pub fn delete(&self, id: &str) -> Result<()> {
        let path = self.run_path(id);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to delete run file {:?}", path))?;
        }
        let mut index = self.load_index()?;
        index.runs.retain(|r| r.id != id);
        if self.dir.exists() {
            self.write_index(&index)?;
        }
        Ok(())
    }

    /// Resolves a git-style id prefix to the single matching run.
    pub fn resolve_id(&self, partial: &str) -> Result<RunMeta> {
        let runs = self.list()?;
        let matches: Vec<_> = runs.into_iter().filter(|r| r.id.starts_with(partial)).collect();
        match matches.len() {
            0 => anyhow::bail!("No run found matching '{}'", partial),
            1 => Ok(matches.into_iter().next().context("match vanished")?),
            n => anyhow::bail!(
                "{} runs match '{}'; provide more characters to disambiguate",
                n,
                partial
            ),
        }
    }

    fn load_index(&self) -> Result<RunIndex> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(RunIndex::default());
        }
        let contents = fs::read_to_string(&path).with_context(|| "Failed to read run index")?;
        serde_json::from_str(&contents).with_context(|| "Failed to parse run index")
    }

    fn write_index(&self, index: &RunIndex) -> Result<()> {
        let json = serde_json::to_string_pretty(index)?;
        fs::write(self.index_path(), json).with_context(|| "Failed to write run index")
    }

    fn run_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    fn index_path(&self) -> PathBuf {
        self.dir.join("index.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::StepRecord;
    use chrono::{Duration, Utc};
    use serde_json::Map;

    fn outcome(id: &str, minutes_ago: i64) -> RunOutcome {
        let started = Utc::now() - Duration::minutes(minutes_ago);
        RunOutcome {
            run_id: id.to_string(),
            goal: format!("goal {id}"),
            backend: "ollama/llama3.2:3b".into(),
            state: RunState::Finished,
            final_answer: "done".into(),
            logs: vec![StepRecord {
                step: 1,
                server: "fetch".into(),
                tool: "fetch".into(),
                args: Map::new(),
                success: true,
                error: None,
                output_snippet: "page".into(),
                attempts: 1,
                elapsed_ms: 12,
            }],
            started_at: started,
            finished_at: started + Duration::seconds(3),
        }
    }

    #[test]
    fn save_load_and_list_newest_first() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = RunArchive::at(tmp.path().join("runs"));
        archive.save(&outcome("aaaa1111-old", 10)).unwrap();
        archive.save(&outcome("bbbb2222-new", 1)).unwrap();

        let runs = archive.list().unwrap();
        let ids: Vec<_> = runs.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["bbbb2222-new", "aaaa1111-old"]);
        assert_eq!(runs[0].steps, 1);

        let loaded = archive.load("aaaa1111-old").unwrap();
        assert_eq!(loaded.goal, "goal aaaa1111-old");
        assert_eq!(loaded.logs[0].output_snippet, "page");
        assert_eq!(loaded.state, RunState::Finished);
    }

    #[test]
    fn saving_twice_keeps_one_index_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = RunArchive::at(tmp.path());
        let run = outcome("cccc3333", 0);
        archive.save(&run).unwrap();
        archive.save(&run).unwrap();
        assert_eq!(archive.list().unwrap().len(), 1);
    }

    #[test]
    fn partial_ids_resolve_or_complain() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = RunArchive::at(tmp.path());
        archive.save(&outcome("abc-1", 2)).unwrap();
        archive.save(&outcome("abd-2", 1)).unwrap();

        assert_eq!(archive.resolve_id("abc").unwrap().id, "abc-1");
        assert!(archive.resolve_id("ab").is_err());
        assert!(archive.resolve_id("zzz").is_err());
    }

    #[test]
    fn delete_removes_file_and_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = RunArchive::at(tmp.path());
        archive.save(&outcome("dddd4444", 0)).unwrap();
        archive.delete("dddd4444").unwrap();
        assert!(archive.list().unwrap().is_empty());
        assert!(archive.load("dddd4444").is_err());
    }

    #[test]
    fn missing_non_ascii_id_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = RunArchive::at(tmp.path());
        let err = archive.load("ééééééééé").unwrap_err();
        assert_eq!(err.to_string(), "Run éééééééé not found");
    }

    #[test]
    fn missing_archive_lists_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let archive = RunArchive::at(tmp.path().join("never-created"));
        assert!(archive.list().unwrap().is_empty());
    }
}
