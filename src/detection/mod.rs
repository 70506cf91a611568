pub mod controller;
pub mod filter;
pub mod loop_worker;
pub mod stats;

pub use controller::{DetectionController, StopReason};
pub use filter::{AcceptedLetterBuffer, FilterDecision, PredictionFilter};
pub use loop_worker::AcceptedSign;
pub use stats::{DetectionSnapshot, DetectionStats};
