use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::Achievement;

/// Body of `POST /levels/complete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelCompletionRequest {
    /// Version of every correctly answered task, in answer order.
    pub correct_answers_versions: Vec<u8>,
    pub letters_learned: Vec<String>,
    pub language_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelCompletionResponse {
    #[serde(default)]
    pub message: String,
    #[serde(deserialize_with = "number_or_zero", default)]
    pub percentage: f64,
    #[serde(deserialize_with = "number_or_zero", default)]
    pub coins: f64,
    #[serde(deserialize_with = "number_or_zero", default)]
    pub xp: f64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub new_achievements: Vec<Achievement>,
}

fn number_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Achievement>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Achievement>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Error body shape shared by the learning and users services.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    pub(crate) fn into_message(self) -> Option<String> {
        self.message.or(self.error)
    }
}
