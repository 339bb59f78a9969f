pub mod state;
pub mod submission;

pub use state::{LogNotice, Notice, SubmissionState, SubmitOutcome};
pub use submission::SubmissionController;
