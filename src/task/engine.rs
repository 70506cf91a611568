use tokio_util::sync::CancellationToken;

use crate::{
    detection::AcceptedSign,
    models::{Task, TaskKind},
};

use super::{
    state::{BlockReason, ContinueOutcome, TaskAnswer, TaskError, TaskOutcome, TaskPhase},
    verify::{SignVerifier, Verification},
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Drives one task from presentation to a reported outcome.
pub struct TaskEngine {
    index: usize,
    task: Task,
    is_last: bool,
    phase: TaskPhase,
    answer: Option<TaskAnswer>,
    result: Option<bool>,
    verification: Option<Verification>,
    live_sign: Option<AcceptedSign>,
    liveness: CancellationToken,
}

impl TaskEngine {
    /// `liveness` is cancelled by the owner when the level goes away; the
    /// engine checks it after its one suspension point.
    pub fn new(index: usize, task: Task, is_last: bool, liveness: CancellationToken) -> Self {
        Self {
            index,
            task,
            is_last,
            phase: TaskPhase::Presented,
            answer: None,
            result: None,
            verification: None,
            live_sign: None,
            liveness,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn is_last(&self) -> bool {
        self.is_last
    }

    pub fn phase(&self) -> TaskPhase {
        self.phase
    }

    pub fn answer(&self) -> Option<&TaskAnswer> {
        self.answer.as_ref()
    }

    /// Set once the result is shown.
    pub fn result(&self) -> Option<bool> {
        self.result
    }

    pub fn verification(&self) -> Option<&Verification> {
        self.verification.as_ref()
    }

    pub fn live_sign(&self) -> Option<&AcceptedSign> {
        self.live_sign.as_ref()
    }

    /// The answer shown to the learner next to their own.
    pub fn correct_answer(&self) -> String {
        match &self.task.kind {
            TaskKind::LetterFromSign {
                letters,
                correct_index,
                ..
            } => letters.get(*correct_index).cloned().unwrap_or_default(),
            TaskKind::SignFromLetter { correct_index, .. } => correct_index.to_string(),
            TaskKind::PerformSign { target, .. } => target.clone(),
        }
    }

    /// Records or replaces the answer. Allowed until "continue" succeeds.
    pub fn select_answer(&mut self, answer: TaskAnswer) -> Result<(), TaskError> {
        if !matches!(self.phase, TaskPhase::Presented | TaskPhase::Answered) {
            return Err(TaskError::WrongPhase {
                action: "select an answer",
                phase: self.phase,
            });
        }
        if answer.version() != self.task.version() {
            return Err(TaskError::AnswerKindMismatch {
                task_version: self.task.version(),
                answer_version: answer.version(),
            });
        }

        self.answer = Some(answer);
        self.phase = TaskPhase::Answered;
        Ok(())
    }

    /// Whether "continue" is enabled right now.
    pub fn can_continue(&self, verifier: Option<&dyn SignVerifier>) -> Result<(), BlockReason> {
        match (&self.task.kind, &self.answer) {
            (TaskKind::PerformSign { .. }, answer) => {
                if !verifier.map(|v| v.is_ready()).unwrap_or(false) {
                    return Err(BlockReason::ModelNotReady);
                }
                match answer {
                    Some(TaskAnswer::Capture(_)) => Ok(()),
                    _ => Err(BlockReason::NoFrame),
                }
            }
            (_, None) => Err(BlockReason::NoAnswer),
            (_, Some(_)) => Ok(()),
        }
    }

    /// `Answered → ResultShown`. Perform-sign tasks run the one-shot
    /// verification here; everything else is judged synchronously.
    pub async fn continue_task(
        &mut self,
        verifier: Option<&dyn SignVerifier>,
    ) -> Result<ContinueOutcome, TaskError> {
        match self.phase {
            TaskPhase::Presented => return Ok(self.blocked_outcome(verifier)),
            TaskPhase::Answered => {}
            phase => {
                return Err(TaskError::WrongPhase {
                    action: "continue",
                    phase,
                })
            }
        }

        if let Err(reason) = self.can_continue(verifier) {
            return Ok(ContinueOutcome::Blocked(reason));
        }

        let is_correct = match (&self.task.kind, &self.answer, verifier) {
            (
                TaskKind::LetterFromSign {
                    letters,
                    correct_index,
                    ..
                },
                Some(TaskAnswer::Letter(chosen)),
                _,
            ) => letters.get(*correct_index) == Some(chosen),
            (
                TaskKind::SignFromLetter { correct_index, .. },
                Some(TaskAnswer::SignIndex(chosen)),
                _,
            ) => chosen.trim().parse::<usize>().ok() == Some(*correct_index),
            (TaskKind::PerformSign { target, .. }, Some(TaskAnswer::Capture(frame)), Some(verifier)) => {
                let verdict = verifier.verify(frame, target).await;
                if self.liveness.is_cancelled() {
                    log_debug!("task {} torn down during verification", self.task.id);
                    return Ok(ContinueOutcome::Cancelled);
                }
                match verdict {
                    Ok(verification) => {
                        let is_correct = verification.is_correct;
                        self.verification = Some(verification);
                        is_correct
                    }
                    Err(err) => {
                        log_warn!("verification for task {} failed: {err:?}", self.task.id);
                        return Ok(ContinueOutcome::Blocked(BlockReason::VerificationFailed));
                    }
                }
            }
            _ => return Ok(self.blocked_outcome(verifier)),
        };

        self.result = Some(is_correct);
        self.phase = TaskPhase::ResultShown;
        log_info!(
            "task {} (v{}) answered {}",
            self.task.id,
            self.task.version(),
            if is_correct { "correctly" } else { "incorrectly" }
        );
        Ok(ContinueOutcome::ResultShown { is_correct })
    }

    /// `ResultShown → Finished`, reporting the outcome upward.
    pub fn dismiss(&mut self) -> Result<TaskOutcome, TaskError> {
        let is_correct = match (self.phase, self.result) {
            (TaskPhase::ResultShown, Some(is_correct)) => is_correct,
            (phase, _) => {
                return Err(TaskError::WrongPhase {
                    action: "dismiss the result",
                    phase,
                })
            }
        };

        self.phase = TaskPhase::Finished;
        Ok(if self.is_last {
            TaskOutcome::Completed { is_correct }
        } else {
            TaskOutcome::Next { is_correct }
        })
    }

    /// Live feedback while a perform-sign task is on screen. Returns whether
    /// the sign matches the target; never affects the result.
    pub fn observe_live_sign(&mut self, sign: &AcceptedSign) -> Option<bool> {
        let TaskKind::PerformSign { target, .. } = &self.task.kind else {
            return None;
        };
        if self.phase == TaskPhase::Finished {
            return None;
        }
        let matches = sign.label.eq_ignore_ascii_case(target);
        self.live_sign = Some(sign.clone());
        Some(matches)
    }

    fn blocked_outcome(&self, verifier: Option<&dyn SignVerifier>) -> ContinueOutcome {
        ContinueOutcome::Blocked(self.can_continue(verifier).err().unwrap_or(BlockReason::NoAnswer))
    }
}
