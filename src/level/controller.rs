use std::sync::Arc;

use anyhow::{bail, Result};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    detection::{AcceptedSign, DetectionController, StopReason},
    inference::{labels, ModelLoadError},
    models::{HeartsState, Task},
    remote::{RemoteError, RemoteSync},
    task::{ContinueOutcome, SignVerifier, TaskAnswer, TaskEngine, TaskOutcome},
};

use super::{
    achievements::AchievementQueue,
    events::{CompletionSummary, LevelEvent, Notice},
    hearts::HeartsCache,
    session::LevelSession,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("could not load tasks for level {level_id}: {source}")]
    TasksUnavailable {
        level_id: u32,
        #[source]
        source: RemoteError,
    },
    #[error("level {level_id} has no runnable tasks")]
    NoTasks { level_id: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum LevelStatus {
    Running,
    /// Hearts ran out; the shell is sending the learner home.
    OutOfHearts,
    Submitting,
    Completed(CompletionSummary),
    CompletionFailed,
    Abandoned,
}

/// Owns one [`LevelSession`] and turns task outcomes into hearts, stats and
/// completion effects.
pub struct LevelController {
    session: LevelSession,
    engine: TaskEngine,
    remote: Arc<dyn RemoteSync>,
    hearts: HeartsCache,
    events: mpsc::UnboundedSender<LevelEvent>,
    achievements: AchievementQueue,
    status: LevelStatus,
    submitted: bool,
    pending_notice: Option<Notice>,
    model_notice_sent: bool,
    liveness: CancellationToken,
}

impl LevelController {
    /// Fetches and decodes the level's tasks and presents the first one.
    /// Tasks that fail to decode are skipped.
    pub async fn enter(
        level_id: u32,
        language: &str,
        remote: Arc<dyn RemoteSync>,
        hearts: HeartsCache,
        events: mpsc::UnboundedSender<LevelEvent>,
    ) -> Result<Self, LevelError> {
        let api_tasks = remote
            .fetch_tasks(level_id, language)
            .await
            .map_err(|source| LevelError::TasksUnavailable { level_id, source })?;

        let tasks: Vec<Task> = api_tasks
            .into_iter()
            .filter_map(|api| match Task::try_from(api) {
                Ok(task) => Some(task),
                Err(err) => {
                    log_warn!("skipping task in level {}: {}", level_id, err);
                    None
                }
            })
            .collect();

        if tasks.is_empty() {
            return Err(LevelError::NoTasks { level_id });
        }

        let liveness = CancellationToken::new();
        let session = LevelSession::new(level_id, language, tasks);
        let engine = Self::engine_for(&session, &liveness)?;

        log_info!(
            "level {} session {} started with {} tasks",
            level_id,
            session.id,
            session.tasks().len()
        );

        let controller = Self {
            session,
            engine,
            remote,
            hearts,
            events,
            achievements: AchievementQueue::default(),
            status: LevelStatus::Running,
            submitted: false,
            pending_notice: None,
            model_notice_sent: false,
            liveness,
        };
        controller.emit_task_advanced();
        controller.emit(LevelEvent::StatsUpdated(controller.session.stats()));
        Ok(controller)
    }

    fn engine_for(session: &LevelSession, liveness: &CancellationToken) -> Result<TaskEngine, LevelError> {
        let task = session.current_task().cloned().ok_or(LevelError::NoTasks {
            level_id: session.level_id,
        })?;
        Ok(TaskEngine::new(
            session.current_index(),
            task,
            session.is_last_task(),
            liveness.child_token(),
        ))
    }

    pub fn session(&self) -> &LevelSession {
        &self.session
    }

    pub fn engine(&self) -> &TaskEngine {
        &self.engine
    }

    pub fn status(&self) -> &LevelStatus {
        &self.status
    }

    pub fn hearts(&self) -> Option<HeartsState> {
        self.hearts.snapshot()
    }

    pub fn achievements(&self) -> &AchievementQueue {
        &self.achievements
    }

    /// Cancelled when the level is abandoned or dropped.
    pub fn liveness(&self) -> CancellationToken {
        self.liveness.clone()
    }

    pub fn select_answer(&mut self, answer: TaskAnswer) -> Result<()> {
        self.ensure_running()?;
        self.engine.select_answer(answer)?;
        Ok(())
    }

    /// The "continue" action. For a perform-sign task the live loop is
    /// stopped first so the one-shot verification can take the model.
    pub async fn continue_task(
        &mut self,
        verifier: Option<&dyn SignVerifier>,
        live: Option<&mut DetectionController>,
    ) -> Result<ContinueOutcome> {
        self.ensure_running()?;

        if self.engine.task().is_verification() {
            if let Some(live) = live {
                live.stop(StopReason::Verification).await?;
            }
            if self.liveness.is_cancelled() {
                return Ok(ContinueOutcome::Cancelled);
            }
        }

        Ok(self.engine.continue_task(verifier).await?)
    }

    /// Background classes (`NOTHING`, unknown indices) are dropped here
    /// rather than shown as live feedback.
    pub fn forward_live_sign(&mut self, sign: &AcceptedSign) -> Option<bool> {
        if self.status != LevelStatus::Running || !labels::is_sign(&sign.label) {
            return None;
        }
        self.engine.observe_live_sign(sign)
    }

    /// Dismisses the shown result and applies its effects: stats, learned
    /// letters, hearts, then either the next task or completion.
    pub async fn dismiss_result(&mut self) -> Result<TaskOutcome> {
        self.ensure_running()?;
        let outcome = self.engine.dismiss()?;
        let is_correct = outcome.is_correct();

        self.session.record_result(is_correct)?;
        self.emit(LevelEvent::StatsUpdated(self.session.stats()));

        if !is_correct {
            self.consume_heart().await;
            if self.liveness.is_cancelled() {
                log_info!("level {} left while consuming a heart", self.session.level_id);
                return Ok(outcome);
            }
            if self.status == LevelStatus::OutOfHearts {
                return Ok(outcome);
            }
        }

        match outcome {
            TaskOutcome::Next { .. } => {
                if self.session.advance()? {
                    self.engine = Self::engine_for(&self.session, &self.liveness)?;
                    self.emit_task_advanced();
                }
            }
            TaskOutcome::Completed { .. } => {
                self.submit_completion().await?;
            }
        }

        Ok(outcome)
    }

    async fn consume_heart(&mut self) {
        let result = self.remote.consume_heart().await;
        if self.liveness.is_cancelled() {
            return;
        }

        match result {
            Ok(state) => {
                let exhausted = state.is_exhausted();
                self.hearts.replace(state.clone());
                self.emit(LevelEvent::HeartsUpdated(state));
                if exhausted {
                    self.abort_out_of_hearts();
                }
            }
            Err(RemoteError::NoHearts) => {
                let next_refill_at = self.hearts.snapshot().and_then(|s| s.next_refill_at);
                let state = HeartsState {
                    hearts: 0,
                    next_refill_at,
                };
                self.hearts.replace(state.clone());
                self.emit(LevelEvent::HeartsUpdated(state));
                self.abort_out_of_hearts();
            }
            Err(err) => {
                log_warn!("heart consume failed, keeping cached balance: {}", err);
                self.hearts.mark_stale();
                self.emit(LevelEvent::HeartsSyncFailed(err.to_string()));
            }
        }
    }

    fn abort_out_of_hearts(&mut self) {
        if self.status == LevelStatus::OutOfHearts {
            return;
        }
        log_info!("level {} aborted: out of hearts", self.session.level_id);
        self.status = LevelStatus::OutOfHearts;
        self.pending_notice = Some(Notice::OutOfHearts);
        self.emit(LevelEvent::NavigateHome);
    }

    /// The shell finished the transition started by `NavigateHome`.
    pub fn navigation_completed(&mut self) {
        if let Some(notice) = self.pending_notice.take() {
            self.emit(LevelEvent::Notify(notice));
        }
    }

    /// Submits the completion payload. Runs at most once per session;
    /// returns `false` when a submission already happened.
    pub async fn submit_completion(&mut self) -> Result<bool> {
        if self.submitted || self.status == LevelStatus::OutOfHearts {
            return Ok(false);
        }
        if self.session.results().len() != self.session.tasks().len() {
            bail!("level {} still has unanswered tasks", self.session.level_id);
        }

        self.submitted = true;
        self.status = LevelStatus::Submitting;
        self.session.finish();

        let Some(request) = self.session.completion_request() else {
            bail!("level {} has no finish time", self.session.level_id);
        };

        log_info!(
            "submitting level {} ({} correct, {} letters)",
            self.session.level_id,
            request.correct_answers_versions.len(),
            request.letters_learned.len()
        );

        let response = self.remote.complete_level(&request).await;
        if self.liveness.is_cancelled() {
            return Ok(true);
        }

        match response {
            Ok(response) => {
                let summary = CompletionSummary {
                    level_id: self.session.level_id,
                    message: response.message,
                    xp: response.xp,
                    coins: response.coins,
                    percentage: response.percentage,
                    achievements_unlocked: 0,
                    local: self.session.stats(),
                };
                self.achievements.load(response.new_achievements);
                let summary = CompletionSummary {
                    achievements_unlocked: self.achievements.len(),
                    ..summary
                };

                self.status = LevelStatus::Completed(summary.clone());
                self.emit(LevelEvent::LevelCompleted(summary));
                self.emit_current_achievement();
                self.reconcile_hearts().await;
            }
            Err(err) => {
                log_error!("level {} completion failed: {}", self.session.level_id, err);
                self.status = LevelStatus::CompletionFailed;
                self.emit(LevelEvent::CompletionFailed(err.to_string()));
            }
        }

        Ok(true)
    }

    async fn reconcile_hearts(&mut self) {
        if !self.hearts.is_stale() {
            return;
        }
        match self.hearts.refresh(self.remote.as_ref()).await {
            Ok(state) => self.emit(LevelEvent::HeartsUpdated(state)),
            Err(err) => log_warn!("hearts refresh after completion failed: {}", err),
        }
    }

    pub fn dismiss_achievement(&mut self) {
        if !self.achievements.is_open() {
            return;
        }
        if self.achievements.dismiss().is_some() {
            self.emit_current_achievement();
        } else {
            self.emit(LevelEvent::AchievementsClosed);
        }
    }

    /// Surfaces a model load failure once per level.
    pub fn report_model_unavailable(&mut self, err: &ModelLoadError) {
        if self.model_notice_sent {
            return;
        }
        self.model_notice_sent = true;
        log_error!("sign detection unavailable: {}", err);
        self.emit(LevelEvent::Notify(Notice::ModelUnavailable(err.to_string())));
    }

    /// Leaves the level. In-flight work finishes without effects.
    pub fn abandon(&mut self) {
        self.liveness.cancel();
        if self.status == LevelStatus::Running {
            self.status = LevelStatus::Abandoned;
        }
    }

    fn ensure_running(&self) -> Result<()> {
        if self.liveness.is_cancelled() {
            bail!("level {} was left", self.session.level_id);
        }
        if self.status != LevelStatus::Running {
            bail!("level {} is no longer running ({:?})", self.session.level_id, self.status);
        }
        Ok(())
    }

    fn emit_task_advanced(&self) {
        self.emit(LevelEvent::TaskAdvanced {
            index: self.session.current_index(),
            total: self.session.tasks().len(),
            task: self.engine.task().clone(),
        });
    }

    fn emit_current_achievement(&self) {
        if let Some(achievement) = self.achievements.current() {
            self.emit(LevelEvent::AchievementShown {
                index: self.achievements.index(),
                total: self.achievements.len(),
                achievement: achievement.clone(),
            });
        }
    }

    fn emit(&self, event: LevelEvent) {
        if self.events.send(event).is_err() {
            log_debug!("level event receiver dropped");
        }
    }
}

impl Drop for LevelController {
    fn drop(&mut self) {
        self.liveness.cancel();
    }
}
