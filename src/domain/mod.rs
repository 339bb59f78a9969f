pub mod message;
pub mod types;

pub use message::{InvalidReason, Validation, validate};
pub use types::{ClassificationResult, Label, LogRecord};
