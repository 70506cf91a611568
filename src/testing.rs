//! In-process stand-ins for the runtime, camera and backend used by unit
//! tests across the crate.

use std::{
    collections::VecDeque,
    io::Cursor,
    path::Path,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::{bail, Result};
use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};

use crate::{
    capture::{CaptureSource, Frame},
    inference::{labels::ASL_LABELS, InferenceRuntime, LoadedModel, ModelLoadError, Tensor},
    models::{Achievement, ApiTask, HeartsState},
    remote::{LevelCompletionRequest, LevelCompletionResponse, RemoteError, RemoteResult, RemoteSync},
};

pub fn solid_png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb(rgb));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

/// Probability vector over the ASL classes with `probability` on `label`
/// and the remainder spread evenly.
pub fn scores_for(label: &str, probability: f32) -> Vec<f32> {
    let others = (1.0 - probability) / (ASL_LABELS.len() - 1) as f32;
    ASL_LABELS
        .iter()
        .map(|candidate| if *candidate == label { probability } else { others })
        .collect()
}

// -- inference ----------------------------------------------------------

#[derive(Default)]
struct RuntimeCounters {
    loads: AtomicUsize,
    releases: AtomicUsize,
    runs: AtomicUsize,
    running: AtomicUsize,
    max_running: AtomicUsize,
    released_mid_run: AtomicBool,
}

pub struct FakeRuntime {
    scores: Arc<Mutex<Vec<f32>>>,
    reject_with: Option<String>,
    run_delay: Duration,
    counters: Arc<RuntimeCounters>,
}

impl FakeRuntime {
    pub fn new(scores: Vec<f32>) -> Arc<Self> {
        Self::slow(scores, Duration::ZERO)
    }

    /// Each forward pass blocks its pool thread for `run_delay` of wall time.
    pub fn slow(scores: Vec<f32>, run_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            scores: Arc::new(Mutex::new(scores)),
            reject_with: None,
            run_delay,
            counters: Arc::default(),
        })
    }

    pub fn rejecting(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            scores: Arc::default(),
            reject_with: Some(reason.to_string()),
            run_delay: Duration::ZERO,
            counters: Arc::default(),
        })
    }

    pub fn set_scores(&self, scores: Vec<f32>) {
        *self.scores.lock().unwrap() = scores;
    }

    pub fn loads(&self) -> usize {
        self.counters.loads.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.counters.releases.load(Ordering::SeqCst)
    }

    pub fn runs(&self) -> usize {
        self.counters.runs.load(Ordering::SeqCst)
    }

    pub fn max_concurrent_runs(&self) -> usize {
        self.counters.max_running.load(Ordering::SeqCst)
    }

    pub fn released_mid_run(&self) -> bool {
        self.counters.released_mid_run.load(Ordering::SeqCst)
    }
}

impl InferenceRuntime for FakeRuntime {
    fn load(&self, _artifact: &Path) -> Result<Arc<dyn LoadedModel>, ModelLoadError> {
        if let Some(reason) = &self.reject_with {
            return Err(ModelLoadError::Rejected(reason.clone()));
        }
        self.counters.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FakeModel {
            scores: Arc::clone(&self.scores),
            run_delay: self.run_delay,
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct FakeModel {
    scores: Arc<Mutex<Vec<f32>>>,
    run_delay: Duration,
    counters: Arc<RuntimeCounters>,
}

impl LoadedModel for FakeModel {
    fn run(&self, _input: &Tensor) -> Result<Vec<f32>> {
        self.counters.runs.fetch_add(1, Ordering::SeqCst);
        let now = self.counters.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_running.fetch_max(now, Ordering::SeqCst);
        let _running = RunGuard(&self.counters.running);

        if !self.run_delay.is_zero() {
            std::thread::sleep(self.run_delay);
        }
        Ok(self.scores.lock().unwrap().clone())
    }

    fn release(&self) {
        if self.counters.running.load(Ordering::SeqCst) > 0 {
            self.counters.released_mid_run.store(true, Ordering::SeqCst);
        }
        self.counters.releases.fetch_add(1, Ordering::SeqCst);
    }
}

struct RunGuard<'a>(&'a AtomicUsize);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

// -- capture ------------------------------------------------------------

pub struct FakeCapture {
    delay: Duration,
    ready: AtomicBool,
    failing: AtomicBool,
    calls: AtomicUsize,
    current: Arc<AtomicUsize>,
    max_concurrent: AtomicUsize,
}

impl FakeCapture {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            ready: AtomicBool::new(true),
            failing: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            current: Arc::new(AtomicUsize::new(0)),
            max_concurrent: AtomicUsize::new(0),
        })
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent.load(Ordering::SeqCst)
    }
}

struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CaptureSource for FakeCapture {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn capture(&self) -> Result<Frame> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(now, Ordering::SeqCst);
        let _in_flight = InFlight(Arc::clone(&self.current));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            bail!("camera busy");
        }
        Ok(Frame::new("mem://still.png", solid_png(8, 8, [90, 60, 30])))
    }
}

// -- remote -------------------------------------------------------------

pub fn api_task(id: &str, version: u8, question: &str, answers: &[&str], correct: usize) -> ApiTask {
    ApiTask {
        task_id: id.to_string(),
        section: 1,
        section_name: "Alphabet".into(),
        version,
        question: question.to_string(),
        possible_answers: answers.iter().map(|a| a.to_string()).collect(),
        correct_answer_index: correct,
    }
}

pub fn achievement(id: &str) -> Achievement {
    Achievement {
        id: id.to_string(),
        title: format!("Achievement {id}"),
        description: String::new(),
        image_ref: format!("https://cdn.test/{id}.png"),
        requires: 1.0,
        kind: "words".into(),
    }
}

#[derive(Default)]
struct RemoteCounters {
    fetches: AtomicUsize,
    hearts: AtomicUsize,
    consumes: AtomicUsize,
    completions: AtomicUsize,
}

/// Scripted backend. Consume calls pop scripted results first and then
/// fall back to decrementing the stored balance.
pub struct FakeRemote {
    tasks: RemoteResult<Vec<ApiTask>>,
    hearts: Mutex<HeartsState>,
    consume_script: Mutex<VecDeque<RemoteResult<HeartsState>>>,
    completion: RemoteResult<LevelCompletionResponse>,
    completion_delay: Duration,
    requests: Mutex<Vec<LevelCompletionRequest>>,
    counters: RemoteCounters,
}

impl FakeRemote {
    pub fn new(tasks: Vec<ApiTask>) -> Self {
        Self {
            tasks: Ok(tasks),
            hearts: Mutex::new(HeartsState {
                hearts: 5,
                next_refill_at: None,
            }),
            consume_script: Mutex::default(),
            completion: Ok(LevelCompletionResponse {
                message: "Level completed".into(),
                percentage: 100.0,
                coins: 0.0,
                xp: 0.0,
                new_achievements: Vec::new(),
            }),
            completion_delay: Duration::ZERO,
            requests: Mutex::default(),
            counters: RemoteCounters::default(),
        }
    }

    pub fn failing_tasks(mut self, err: RemoteError) -> Self {
        self.tasks = Err(err);
        self
    }

    pub fn with_hearts(self, hearts: u32) -> Self {
        self.hearts.lock().unwrap().hearts = hearts;
        self
    }

    pub fn with_consume_results(self, results: Vec<RemoteResult<HeartsState>>) -> Self {
        *self.consume_script.lock().unwrap() = results.into();
        self
    }

    pub fn with_completion(mut self, completion: RemoteResult<LevelCompletionResponse>) -> Self {
        self.completion = completion;
        self
    }

    pub fn with_completion_delay(mut self, delay: Duration) -> Self {
        self.completion_delay = delay;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn fetches(&self) -> usize {
        self.counters.fetches.load(Ordering::SeqCst)
    }

    pub fn hearts_calls(&self) -> usize {
        self.counters.hearts.load(Ordering::SeqCst)
    }

    pub fn consumes(&self) -> usize {
        self.counters.consumes.load(Ordering::SeqCst)
    }

    pub fn completions(&self) -> usize {
        self.counters.completions.load(Ordering::SeqCst)
    }

    pub fn completion_requests(&self) -> Vec<LevelCompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteSync for FakeRemote {
    async fn fetch_tasks(&self, _level_id: u32, _language: &str) -> RemoteResult<Vec<ApiTask>> {
        self.counters.fetches.fetch_add(1, Ordering::SeqCst);
        self.tasks.clone()
    }

    async fn get_hearts(&self) -> RemoteResult<HeartsState> {
        self.counters.hearts.fetch_add(1, Ordering::SeqCst);
        Ok(self.hearts.lock().unwrap().clone())
    }

    async fn consume_heart(&self) -> RemoteResult<HeartsState> {
        self.counters.consumes.fetch_add(1, Ordering::SeqCst);
        if let Some(scripted) = self.consume_script.lock().unwrap().pop_front() {
            return scripted;
        }
        let mut hearts = self.hearts.lock().unwrap();
        if hearts.hearts == 0 {
            return Err(RemoteError::NoHearts);
        }
        hearts.hearts -= 1;
        Ok(hearts.clone())
    }

    async fn complete_level(
        &self,
        request: &LevelCompletionRequest,
    ) -> RemoteResult<LevelCompletionResponse> {
        self.counters.completions.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        if !self.completion_delay.is_zero() {
            tokio::time::sleep(self.completion_delay).await;
        }
        self.completion.clone()
    }
}
