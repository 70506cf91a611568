pub mod classifier;
pub mod labels;
pub mod preprocess;
pub mod runtime;
pub mod session;

pub use classifier::SignClassifier;
pub use runtime::{InferenceRuntime, LoadedModel, ModelLoadError, Tensor};
pub use session::{ModelHandle, ModelLease, ModelSessionManager};
