pub mod engine;
pub mod state;
pub mod verify;

pub use engine::TaskEngine;
pub use state::{BlockReason, ContinueOutcome, TaskAnswer, TaskError, TaskOutcome, TaskPhase};
pub use verify::{OneShotVerifier, SignVerifier, Verification};
