use thiserror::Error;

use crate::{
    ai::ClassifyError,
    domain::{ClassificationResult, InvalidReason},
};

const RETRY_LATER: &str = "Failed to classify message. Please try again later.";
const GENERIC_FAILURE: &str = "Something went wrong.";

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SubmissionState {
    #[default]
    Idle,
    Validating,
    AwaitingClassification,
    Classified(ClassificationResult),
    Failed(SubmissionError),
}

impl SubmissionState {
    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            SubmissionState::Validating | SubmissionState::AwaitingClassification
        )
    }

    pub fn result(&self) -> Option<&ClassificationResult> {
        match self {
            SubmissionState::Classified(result) => Some(result),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmissionError {
    #[error("message rejected: {}", .reason.as_str())]
    Validation { reason: InvalidReason },
    #[error("classifier unreachable")]
    Network,
    #[error("classifier error (status {code})")]
    Service { code: u16, message: Option<String> },
    #[error("classifier response malformed")]
    MalformedResponse,
}

impl SubmissionError {
    pub fn user_message(&self) -> String {
        match self {
            SubmissionError::Validation { reason } => reason.user_message(),
            SubmissionError::Network | SubmissionError::MalformedResponse => RETRY_LATER.to_string(),
            SubmissionError::Service { message, .. } => message
                .clone()
                .unwrap_or_else(|| GENERIC_FAILURE.to_string()),
        }
    }
}

impl From<&ClassifyError> for SubmissionError {
    fn from(err: &ClassifyError) -> Self {
        match err {
            ClassifyError::Network(_) => SubmissionError::Network,
            ClassifyError::Service { code, message } => SubmissionError::Service {
                code: *code,
                message: message.clone(),
            },
            ClassifyError::MalformedResponse(_) => SubmissionError::MalformedResponse,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Applied(SubmissionState),
    // a newer submit or a reset happened first
    Superseded,
}

/// Events delivered in the order they happened for the latest submission.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Resolved {
        generation: u64,
        state: SubmissionState,
    },
    Logging(LogNotice),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogNotice {
    pub generation: u64,
    pub outcome: LogOutcome,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogOutcome {
    Logged,
    Failed(String),
}

impl LogOutcome {
    pub fn user_message(&self) -> &'static str {
        match self {
            LogOutcome::Logged => "Message classified and logged successfully!",
            LogOutcome::Failed(_) => "Failed to log the prediction.",
        }
    }
}
