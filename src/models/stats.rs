use serde::{Deserialize, Serialize};

pub const XP_PER_CORRECT: u32 = 10;
pub const COINS_PER_CORRECT: u32 = 5;

/// Client-side estimate shown while a level runs; the completion response
/// carries the authoritative numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionStats {
    pub xp_earned: u32,
    pub coins_earned: u32,
    pub percentage_correct: u32,
    pub total_tasks: u32,
    pub correct_tasks: u32,
}

impl CompletionStats {
    pub fn compute(correct_tasks: u32, total_tasks: u32) -> Self {
        let percentage_correct = if total_tasks > 0 {
            (correct_tasks as f64 / total_tasks as f64 * 100.0).round() as u32
        } else {
            0
        };

        Self {
            xp_earned: correct_tasks * XP_PER_CORRECT,
            coins_earned: correct_tasks * COINS_PER_CORRECT,
            percentage_correct,
            total_tasks,
            correct_tasks,
        }
    }

    pub fn from_results(results: &[bool], total_tasks: usize) -> Self {
        let correct = results.iter().filter(|ok| **ok).count();
        Self::compute(correct as u32, total_tasks as u32)
    }
}
