use serde::Serialize;

use crate::models::{Achievement, CompletionStats, HeartsState, Task};

/// User-visible notices the shell shows as a blocking dialog or toast.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum Notice {
    OutOfHearts,
    /// Sign detection cannot run; multiple-choice tasks still work.
    ModelUnavailable(String),
}

/// Server-authoritative result of a finished level.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionSummary {
    pub level_id: u32,
    pub message: String,
    pub xp: f64,
    pub coins: f64,
    pub percentage: f64,
    pub achievements_unlocked: usize,
    /// What the client counted locally while the level ran.
    pub local: CompletionStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum LevelEvent {
    TaskAdvanced { index: usize, total: usize, task: Task },
    StatsUpdated(CompletionStats),
    HeartsUpdated(HeartsState),
    HeartsSyncFailed(String),
    NavigateHome,
    Notify(Notice),
    LevelCompleted(CompletionSummary),
    CompletionFailed(String),
    AchievementShown { index: usize, total: usize, achievement: Achievement },
    AchievementsClosed,
}
