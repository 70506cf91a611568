pub mod achievement;
pub mod hearts;
pub mod prediction;
pub mod stats;
pub mod task;

pub use achievement::Achievement;
pub use hearts::{HeartsEnvelope, HeartsState};
pub use prediction::Prediction;
pub use stats::CompletionStats;
pub use task::{extract_letter, ApiTask, Task, TaskDecodeError, TaskKind, TasksResponse};
