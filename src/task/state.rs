use serde::Serialize;
use thiserror::Error;

use crate::capture::Frame;

/// Per-task lifecycle. Moves forward only; a task never returns to
/// `Presented` once it has left it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskPhase {
    Presented,
    Answered,
    ResultShown,
    /// Result dismissed and reported upward.
    Finished,
}

/// What the learner supplied. The variant must match the task kind.
#[derive(Debug, Clone)]
pub enum TaskAnswer {
    /// Chosen letter for a letter-from-sign task.
    Letter(String),
    /// Chosen option index, as the UI hands it over, for a sign-from-letter
    /// task.
    SignIndex(String),
    /// Still captured for a perform-sign task.
    Capture(Frame),
}

impl TaskAnswer {
    pub fn version(&self) -> u8 {
        match self {
            TaskAnswer::Letter(_) => 1,
            TaskAnswer::SignIndex(_) => 2,
            TaskAnswer::Capture(_) => 3,
        }
    }
}

/// Why "continue" is currently disabled. Blocking never fails the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockReason {
    NoAnswer,
    NoFrame,
    ModelNotReady,
    /// The one-shot inference itself failed; the learner may capture again.
    VerificationFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinueOutcome {
    Blocked(BlockReason),
    ResultShown { is_correct: bool },
    /// The owning level went away while verification was suspended.
    Cancelled,
}

/// Reported upward when a shown result is dismissed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TaskOutcome {
    Next { is_correct: bool },
    Completed { is_correct: bool },
}

impl TaskOutcome {
    pub fn is_correct(&self) -> bool {
        match *self {
            TaskOutcome::Next { is_correct } | TaskOutcome::Completed { is_correct } => is_correct,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("cannot {action} while task is {phase:?}")]
    WrongPhase {
        action: &'static str,
        phase: TaskPhase,
    },
    #[error("version {task_version} task cannot take a version {answer_version} answer")]
    AnswerKindMismatch { task_version: u8, answer_version: u8 },
}
