use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use crate::{models::Prediction, settings::DetectionSettings};

/// Most recently accepted labels plus the time of the last acceptance. Only
/// used to suppress duplicates, never for scoring.
#[derive(Debug, Clone)]
pub struct AcceptedLetterBuffer {
    labels: VecDeque<String>,
    capacity: usize,
    last_accepted_at: Option<Instant>,
}

impl AcceptedLetterBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            labels: VecDeque::with_capacity(capacity + 1),
            capacity,
            last_accepted_at: None,
        }
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|seen| seen == label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn last_accepted_at(&self) -> Option<Instant> {
        self.last_accepted_at
    }

    fn push(&mut self, label: String, now: Instant) {
        self.labels.push_back(label);
        while self.labels.len() > self.capacity {
            self.labels.pop_front();
        }
        self.last_accepted_at = Some(now);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterDecision {
    Accepted(String),
    BelowThreshold,
    /// Same label accepted recently and the cooldown has not elapsed.
    Debounced,
}

/// Turns raw top-1 predictions into a stable stream of signs.
#[derive(Debug, Clone)]
pub struct PredictionFilter {
    threshold: f32,
    cooldown: Duration,
    buffer: AcceptedLetterBuffer,
}

impl PredictionFilter {
    pub fn new(threshold: f32, cooldown: Duration, capacity: usize) -> Self {
        Self {
            threshold,
            cooldown,
            buffer: AcceptedLetterBuffer::new(capacity),
        }
    }

    pub fn from_settings(settings: &DetectionSettings) -> Self {
        Self::new(
            settings.threshold,
            settings.cooldown(),
            settings.buffer_capacity,
        )
    }

    pub fn buffer(&self) -> &AcceptedLetterBuffer {
        &self.buffer
    }

    /// Label-agnostic: background classes pass like any other label.
    /// Rejections leave the buffer untouched.
    pub fn offer(&mut self, prediction: &Prediction, now: Instant) -> FilterDecision {
        if prediction.probability <= self.threshold {
            return FilterDecision::BelowThreshold;
        }

        let seen_recently = self.buffer.contains(&prediction.label);
        let too_soon = self
            .buffer
            .last_accepted_at
            .map(|last| now.saturating_duration_since(last) < self.cooldown)
            .unwrap_or(false);

        if seen_recently && too_soon {
            return FilterDecision::Debounced;
        }

        self.buffer.push(prediction.label.clone(), now);
        FilterDecision::Accepted(prediction.label.clone())
    }
}

impl Default for PredictionFilter {
    fn default() -> Self {
        Self::from_settings(&DetectionSettings::default())
    }
}
