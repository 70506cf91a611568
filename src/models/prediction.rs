use serde::{Deserialize, Serialize};

/// Top-1 output of one forward pass. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub probability: f32,
}

impl Prediction {
    pub fn new(label: impl Into<String>, probability: f32) -> Self {
        Self {
            label: label.into(),
            probability: probability.clamp(0.0, 1.0),
        }
    }

    /// Case-insensitive comparison against an expected sign.
    pub fn matches(&self, target: &str) -> bool {
        self.label.to_uppercase() == target.to_uppercase()
    }
}
