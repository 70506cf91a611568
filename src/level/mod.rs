pub mod achievements;
pub mod controller;
pub mod events;
pub mod hearts;
pub mod session;

pub use achievements::AchievementQueue;
pub use controller::{LevelController, LevelError, LevelStatus};
pub use events::{CompletionSummary, LevelEvent, Notice};
pub use hearts::HeartsCache;
pub use session::LevelSession;
