use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

pub const ENV_API_BASE_URL: &str = "SIGNLINGO_API_BASE_URL";
pub const ENV_LANGUAGE: &str = "SIGNLINGO_LANGUAGE";
pub const ENV_MODEL_PATH: &str = "SIGNLINGO_MODEL_PATH";
pub const ENV_DEBUG: &str = "SIGNLINGO_DEBUG";

/// Tuning for the continuous detection loop and its prediction filter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectionSettings {
    /// Tick period; the default is roughly one camera frame.
    pub interval_ms: f64,
    /// A prediction must be strictly above this to be accepted.
    pub threshold: f32,
    /// Minimum gap before a recently accepted label may be accepted again.
    pub cooldown_ms: u64,
    pub buffer_capacity: usize,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            interval_ms: 16.7,
            threshold: 0.7,
            cooldown_ms: 1000,
            buffer_capacity: 3,
        }
    }
}

impl DetectionSettings {
    pub fn interval(&self) -> Duration {
        // tokio's interval panics on a zero period
        Duration::from_secs_f64(self.interval_ms.max(1.0) / 1000.0)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RemoteSettings {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub language: String,
    pub model_path: PathBuf,
    /// Model input as `[width, height]`.
    pub input_size: [u32; 2],
    /// Set when the model emits raw logits instead of probabilities.
    pub apply_softmax: bool,
    pub verify_threshold: f32,
    pub detection: DetectionSettings,
    pub remote: RemoteSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            language: "usa".into(),
            model_path: PathBuf::from("assets/models/asl.onnx"),
            input_size: [224, 224],
            apply_softmax: true,
            verify_threshold: 0.5,
            detection: DetectionSettings::default(),
            remote: RemoteSettings::default(),
        }
    }
}

impl AppSettings {
    /// Applies `SIGNLINGO_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(ENV_API_BASE_URL).filter(|v| !v.is_empty()) {
            self.remote.api_base_url = url;
        }
        if let Some(language) = lookup(ENV_LANGUAGE).filter(|v| !v.is_empty()) {
            self.language = language;
        }
        if let Some(path) = lookup(ENV_MODEL_PATH).filter(|v| !v.is_empty()) {
            self.model_path = PathBuf::from(path);
        }
        self
    }
}

/// True when `SIGNLINGO_DEBUG` is `1` or `true`.
pub fn debug_mode() -> bool {
    std::env::var(ENV_DEBUG)
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<AppSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            AppSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Effective settings: the stored file plus environment overrides.
    pub fn current(&self) -> AppSettings {
        self.read().clone().with_env_overrides()
    }

    /// Settings exactly as stored, without environment overrides.
    pub fn stored(&self) -> AppSettings {
        self.read().clone()
    }

    pub fn update(&self, settings: AppSettings) -> Result<()> {
        let mut guard = self.write();
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    pub fn update_detection(&self, detection: DetectionSettings) -> Result<()> {
        let mut guard = self.write();
        let mut next = guard.clone();
        next.detection = detection;
        self.persist(&next)?;
        *guard = next;
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: AppSettings = serde_json::from_str(&contents)?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &AppSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, AppSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, AppSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
