use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
    time::{Duration, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    capture::CaptureSource,
    inference::{ModelHandle, SignClassifier},
    models::Prediction,
};

use super::{
    filter::{FilterDecision, PredictionFilter},
    stats::DetectionStats,
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

const SLOW_TICK_MS: u64 = 2_000;

/// A sign that passed the prediction filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedSign {
    pub label: String,
    pub probability: f32,
    pub accepted_at: DateTime<Utc>,
}

/// Everything one run of the loop owns.
pub struct DetectionLoop {
    pub capture: Arc<dyn CaptureSource>,
    pub classifier: SignClassifier,
    pub model: Arc<ModelHandle>,
    pub filter: PredictionFilter,
    pub signs_tx: mpsc::Sender<AcceptedSign>,
    pub stats: DetectionStats,
    pub interval: Duration,
}

/// The running tick. It is never dropped while unfinished: the forward pass
/// runs on the blocking pool and only finishes when the pool thread does.
struct InFlightTick {
    handle: JoinHandle<Result<Option<Prediction>>>,
    started: Instant,
}

/// Fixed-interval capture → inference → filter. At most one tick is in
/// flight; ticks that land while one is running are skipped, not queued.
/// On cancel the loop waits for an in-flight forward pass before returning,
/// so the caller can release the model without contending with it.
pub async fn detection_loop(ctx: DetectionLoop, cancel_token: CancellationToken) {
    let DetectionLoop {
        capture,
        classifier,
        model,
        mut filter,
        signs_tx,
        stats,
        interval,
    } = ctx;

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut in_flight: Option<InFlightTick> = None;

    log_info!(
        "detection loop started (model {}, every {:?})",
        model.id(),
        interval
    );

    loop {
        tokio::select! {
            biased;

            _ = cancel_token.cancelled() => {
                log_info!("detection loop shutting down");
                break;
            }

            result = wait_in_flight(&mut in_flight), if in_flight.is_some() => {
                if let Some(tick) = in_flight.take() {
                    let elapsed = tick.started.elapsed();
                    if elapsed > Duration::from_millis(SLOW_TICK_MS) {
                        log_warn!("detection tick took {:?}", elapsed);
                    }
                }
                // Teardown may have raced the inference; drop the result.
                if cancel_token.is_cancelled() {
                    break;
                }
                if !handle_result(result, &mut filter, &signs_tx, &stats) {
                    log_info!("sign consumer closed, detection loop exiting");
                    break;
                }
            }

            _ = ticker.tick() => {
                stats.record_tick();

                if signs_tx.is_closed() {
                    log_info!("sign consumer closed, detection loop exiting");
                    break;
                }
                if in_flight.is_some() {
                    stats.record_skip();
                    continue;
                }
                if model.is_released() {
                    log_warn!("model {} released under a running loop", model.id());
                    break;
                }
                if !capture.is_ready() {
                    log_debug!("capture source not ready, skipping tick");
                    continue;
                }

                in_flight = Some(InFlightTick {
                    handle: tokio::spawn(run_tick(
                        Arc::clone(&capture),
                        classifier.clone(),
                        Arc::clone(&model),
                        cancel_token.clone(),
                    )),
                    started: Instant::now(),
                });
            }
        }
    }

    if let Some(tick) = in_flight.take() {
        log_debug!("waiting for in-flight tick before exit");
        let _ = tick.handle.await;
    }
}

async fn wait_in_flight(slot: &mut Option<InFlightTick>) -> Result<Option<Prediction>> {
    match slot.as_mut() {
        Some(tick) => (&mut tick.handle)
            .await
            .context("detection tick task failed")?,
        None => std::future::pending().await,
    }
}

/// Capture is abandoned on cancel. Once the frame is handed to the
/// classifier the tick runs to completion.
async fn run_tick(
    capture: Arc<dyn CaptureSource>,
    classifier: SignClassifier,
    model: Arc<ModelHandle>,
    cancel_token: CancellationToken,
) -> Result<Option<Prediction>> {
    let frame = tokio::select! {
        biased;
        _ = cancel_token.cancelled() => return Ok(None),
        frame = capture.capture() => frame.context("capture failed")?,
    };
    classifier.classify(model, &frame).await
}

/// Returns `false` once the consumer is gone.
fn handle_result(
    result: Result<Option<Prediction>>,
    filter: &mut PredictionFilter,
    signs_tx: &mpsc::Sender<AcceptedSign>,
    stats: &DetectionStats,
) -> bool {
    let prediction = match result {
        Ok(Some(prediction)) => {
            stats.record_inference();
            prediction
        }
        Ok(None) => {
            stats.record_inference();
            log_debug!("inference produced no prediction");
            return true;
        }
        Err(err) => {
            stats.record_failure();
            log_warn!("detection tick failed: {err:?}");
            return true;
        }
    };

    match filter.offer(&prediction, Instant::now().into_std()) {
        FilterDecision::Accepted(label) => {
            stats.record_accepted();
            log_debug!("accepted {} ({:.2})", label, prediction.probability);
            let sign = AcceptedSign {
                label,
                probability: prediction.probability,
                accepted_at: Utc::now(),
            };
            match signs_tx.try_send(sign) {
                Ok(()) => true,
                Err(TrySendError::Full(sign)) => {
                    log_warn!("sign consumer lagging, dropped {}", sign.label);
                    true
                }
                Err(TrySendError::Closed(_)) => false,
            }
        }
        decision => {
            log_debug!(
                "rejected {} ({:.2}): {:?}",
                prediction.label,
                prediction.probability,
                decision
            );
            true
        }
    }
}
