use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "image_url", alias = "imageRef", alias = "image")]
    pub image_ref: String,
    /// Threshold the server compared against (seconds played, xp, or words).
    #[serde(default)]
    pub requires: f64,
    #[serde(default, rename = "type")]
    pub kind: String,
}
