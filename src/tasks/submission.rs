use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::{
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
    task::JoinSet,
    time::timeout,
};

use crate::{
    ai::Classify,
    db::OutcomeLog,
    domain::{LogRecord, Validation, validate},
};

use super::state::{
    LogNotice, LogOutcome, Notice, SubmissionError, SubmissionState, SubmitOutcome,
};

#[derive(Debug, Default)]
struct Current {
    generation: u64,
    state: SubmissionState,
    message: Option<String>,
    threshold: Option<f64>,
}

#[derive(Default)]
struct LogTasks {
    running: JoinSet<()>,
    closed: bool,
}

/// Drives validate → classify → log. Every `submit` and `reset` bumps the
/// generation; a result is applied only while its generation is the latest.
pub struct SubmissionController {
    classifier: Arc<dyn Classify>,
    logger: Arc<dyn OutcomeLog>,
    current: Arc<Mutex<Current>>,
    log_tasks: Mutex<LogTasks>,
    notices: UnboundedSender<Notice>,
}

impl SubmissionController {
    pub fn new(
        classifier: Arc<dyn Classify>,
        logger: Arc<dyn OutcomeLog>,
    ) -> (Self, UnboundedReceiver<Notice>) {
        let (notices, receiver) = mpsc::unbounded_channel();
        let controller = Self {
            classifier,
            logger,
            current: Arc::new(Mutex::new(Current::default())),
            log_tasks: Mutex::new(LogTasks::default()),
            notices,
        };
        (controller, receiver)
    }

    pub fn state(&self) -> SubmissionState {
        self.current.lock().state.clone()
    }

    pub fn message(&self) -> Option<String> {
        self.current.lock().message.clone()
    }

    pub fn threshold(&self) -> Option<f64> {
        self.current.lock().threshold
    }

    pub async fn submit(&self, message: &str, threshold: f64) -> SubmitOutcome {
        let generation = {
            let mut current = self.current.lock();
            current.generation += 1;
            current.state = SubmissionState::Validating;
            current.message = Some(message.to_string());
            current.threshold = Some(threshold);
            current.generation
        };

        if let Validation::Invalid(reason) = validate(message) {
            tracing::debug!(
                target: "submission",
                generation,
                reason = reason.as_str(),
                "message rejected"
            );
            let error = SubmissionError::Validation { reason };
            return self.finish(generation, SubmissionState::Failed(error));
        }

        if !self.apply(generation, SubmissionState::AwaitingClassification) {
            return SubmitOutcome::Superseded;
        }
        tracing::info!(target: "submission", generation, threshold, "classification requested");

        match self.classifier.classify(message, threshold).await {
            Ok(result) => {
                let record = LogRecord::from_result(message, &result, threshold);
                let outcome = self.finish(generation, SubmissionState::Classified(result));
                if outcome != SubmitOutcome::Superseded {
                    self.spawn_log(generation, record);
                }
                outcome
            }
            Err(err) => {
                tracing::warn!(
                    target: "submission",
                    generation,
                    error = %err,
                    "classification failed"
                );
                self.finish(generation, SubmissionState::Failed(SubmissionError::from(&err)))
            }
        }
    }

    pub fn reset(&self) {
        let mut current = self.current.lock();
        current.generation += 1;
        current.state = SubmissionState::Idle;
        current.message = None;
        current.threshold = None;
        tracing::debug!(target: "submission", generation = current.generation, "reset");
    }

    /// Stops accepting log writes and waits for the outstanding ones. Returns
    /// false if `limit` elapsed first.
    pub async fn drain_logging(&self, limit: Duration) -> bool {
        let mut tasks = {
            let mut log_tasks = self.log_tasks.lock();
            log_tasks.closed = true;
            std::mem::take(&mut log_tasks.running)
        };
        let drain = async {
            while let Some(joined) = tasks.join_next().await {
                if let Err(err) = joined {
                    if err.is_panic() {
                        tracing::error!(target: "submission", "logging task panicked");
                    }
                }
            }
        };
        if timeout(limit, drain).await.is_err() {
            tracing::warn!(
                target: "submission",
                pending = tasks.len(),
                "logging tasks did not finish within {:?}",
                limit
            );
            return false;
        }
        true
    }

    fn apply(&self, generation: u64, state: SubmissionState) -> bool {
        let mut current = self.current.lock();
        if current.generation != generation {
            return false;
        }
        current.state = state;
        true
    }

    fn finish(&self, generation: u64, state: SubmissionState) -> SubmitOutcome {
        let mut current = self.current.lock();
        if current.generation == generation {
            current.state = state.clone();
            let _ = self.notices.send(Notice::Resolved {
                generation,
                state: state.clone(),
            });
            SubmitOutcome::Applied(state)
        } else {
            tracing::debug!(target: "submission", generation, "discarding superseded result");
            SubmitOutcome::Superseded
        }
    }

    fn spawn_log(&self, generation: u64, record: LogRecord) {
        let logger = self.logger.clone();
        let current = self.current.clone();
        let notices = self.notices.clone();

        let mut tasks = self.log_tasks.lock();
        if tasks.closed {
            tracing::warn!(target: "submission", generation, "shutting down; prediction not logged");
            return;
        }
        while tasks.running.try_join_next().is_some() {}
        tasks.running.spawn(async move {
            let outcome = match logger.log_outcome(record).await {
                Ok(()) => LogOutcome::Logged,
                Err(err) => {
                    tracing::warn!(target: "submission", generation, error = %err, "prediction not logged");
                    LogOutcome::Failed(err.to_string())
                }
            };

            let current = current.lock();
            if current.generation != generation {
                tracing::debug!(target: "submission", generation, "dropping log notice for superseded submission");
                return;
            }
            let _ = notices.send(Notice::Logging(LogNotice {
                generation,
                outcome,
            }));
        });
    }
}
