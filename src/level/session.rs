use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    models::{CompletionStats, Task},
    remote::LevelCompletionRequest,
};

/// One attempt at a level. `results.len() <= tasks.len()` and
/// `current_index` only ever moves forward by one.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelSession {
    pub id: Uuid,
    pub level_id: u32,
    pub language: String,
    tasks: Vec<Task>,
    current_index: usize,
    results: Vec<bool>,
    letters_learned: Vec<String>,
    correct_versions: Vec<u8>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl LevelSession {
    pub fn new(level_id: u32, language: impl Into<String>, tasks: Vec<Task>) -> Self {
        Self {
            id: Uuid::new_v4(),
            level_id,
            language: language.into(),
            tasks,
            current_index: 0,
            results: Vec::new(),
            letters_learned: Vec::new(),
            correct_versions: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_task(&self) -> Option<&Task> {
        self.tasks.get(self.current_index)
    }

    pub fn is_last_task(&self) -> bool {
        self.current_index + 1 >= self.tasks.len()
    }

    pub fn results(&self) -> &[bool] {
        &self.results
    }

    pub fn letters_learned(&self) -> &[String] {
        &self.letters_learned
    }

    pub fn correct_versions(&self) -> &[u8] {
        &self.correct_versions
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Result for the current task. Each task is recorded exactly once.
    pub fn record_result(&mut self, is_correct: bool) -> Result<()> {
        if self.results.len() >= self.tasks.len() {
            bail!("all {} tasks already have a result", self.tasks.len());
        }
        if self.results.len() != self.current_index {
            bail!(
                "task {} already has a result",
                self.current_index
            );
        }

        if is_correct {
            if let Some(task) = self.tasks.get(self.current_index) {
                let letter = task.learned_letter();
                if !self.letters_learned.contains(&letter) {
                    self.letters_learned.push(letter);
                }
                self.correct_versions.push(task.version());
            }
        }
        self.results.push(is_correct);
        Ok(())
    }

    /// Moves to the next task once the current one has a result. Returns
    /// `false` on the last task.
    pub fn advance(&mut self) -> Result<bool> {
        if self.results.len() != self.current_index + 1 {
            bail!("task {} has no result yet", self.current_index);
        }
        if self.is_last_task() {
            return Ok(false);
        }
        self.current_index += 1;
        Ok(true)
    }

    pub fn stats(&self) -> CompletionStats {
        CompletionStats::from_results(&self.results, self.tasks.len())
    }

    /// Stamps `finished_at` the first time; later calls keep the original.
    pub fn finish(&mut self) -> DateTime<Utc> {
        *self.finished_at.get_or_insert_with(Utc::now)
    }

    pub fn completion_request(&self) -> Option<LevelCompletionRequest> {
        Some(LevelCompletionRequest {
            correct_answers_versions: self.correct_versions.clone(),
            letters_learned: self.letters_learned.clone(),
            language_id: self.language.clone(),
            started_at: self.started_at,
            finished_at: self.finished_at?,
        })
    }
}
