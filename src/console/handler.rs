use std::{
    io::{self, BufRead},
    sync::Arc,
    thread,
};

use anyhow::Result;
use chrono_tz::Tz;
use tokio::{
    sync::mpsc::{self, UnboundedReceiver},
    task::JoinSet,
};

use crate::{
    db::predictions::PredictionRepository,
    domain::{Validation, validate},
    infrastructure::shutdown::ShutdownListener,
    tasks::{LogNotice, Notice, SubmissionController, SubmitOutcome, state::LogOutcome},
};

use super::utils::{
    ConsoleInput, HELP_TEXT, format_counter, format_history, format_state, parse_input,
};

pub struct ConsoleSession {
    controller: Arc<SubmissionController>,
    predictions: Arc<PredictionRepository>,
    threshold: f64,
    timezone: Tz,
    submissions: JoinSet<()>,
}

impl ConsoleSession {
    pub fn new(
        controller: Arc<SubmissionController>,
        predictions: Arc<PredictionRepository>,
        threshold: f64,
        timezone: Tz,
    ) -> Self {
        Self {
            controller,
            predictions,
            threshold,
            timezone,
            submissions: JoinSet::new(),
        }
    }

    pub async fn run(
        mut self,
        mut shutdown: ShutdownListener,
        mut notices: UnboundedReceiver<Notice>,
    ) -> Result<()> {
        let mut lines = spawn_stdin_reader();
        println!("InboxIQ spam/ham classifier (threshold {:.2})", self.threshold);
        println!("{HELP_TEXT}");

        loop {
            tokio::select! {
                _ = shutdown.notified() => break,
                Some(notice) = notices.recv() => render_notice(&notice),
                line = lines.recv() => match line {
                    Some(line) => {
                        if !self.handle_line(&line).await {
                            break;
                        }
                    }
                    None => {
                        tracing::info!(target: "console", "stdin closed");
                        break;
                    }
                },
            }
        }
        self.abandon_submissions().await;
        Ok(())
    }

    async fn abandon_submissions(&mut self) {
        if !self.submissions.is_empty() {
            tracing::info!(
                target: "console",
                pending = self.submissions.len(),
                "abandoning in-flight submissions"
            );
        }
        self.submissions.shutdown().await;
    }

    // false ends the session
    async fn handle_line(&mut self, line: &str) -> bool {
        match parse_input(line) {
            ConsoleInput::Submit(text) => self.submit(text),
            ConsoleInput::SetThreshold(value) => {
                self.threshold = value;
                println!("Spam threshold set to {value:.2}");
            }
            ConsoleInput::BadThreshold(reason) => println!("{reason}"),
            ConsoleInput::Reset => {
                self.controller.reset();
                println!("Cleared.");
            }
            ConsoleInput::Status => self.print_status(),
            ConsoleInput::History(limit) => match self.predictions.recent(limit).await {
                Ok(rows) => println!("{}", format_history(&rows, self.timezone)),
                Err(err) => {
                    tracing::error!(target: "console", error = %err, "failed to load history");
                    println!("Could not load prediction history.");
                }
            },
            ConsoleInput::Help => println!("{HELP_TEXT}"),
            ConsoleInput::Quit => return false,
            ConsoleInput::Empty => {}
            ConsoleInput::Unknown(command) => {
                println!("Unknown command {command}. Type /help for the list.")
            }
        }
        true
    }

    fn submit(&mut self, text: String) {
        if validate(&text) == Validation::Valid {
            println!("Checking... ({})", format_counter(&text));
        }
        let controller = self.controller.clone();
        let threshold = self.threshold;
        while self.submissions.try_join_next().is_some() {}
        self.submissions.spawn(async move {
            if controller.submit(&text, threshold).await == SubmitOutcome::Superseded {
                tracing::debug!(target: "console", "submission superseded before it resolved");
            }
        });
    }

    fn print_status(&self) {
        let state = self.controller.state();
        println!("{}", format_state(&state));
        if state.is_loading() {
            println!("A newer message will replace the one being checked.");
        }
        if let Some(message) = self.controller.message() {
            println!("Message length: {}", format_counter(&message));
        }
        match self.controller.threshold() {
            Some(used) if used != self.threshold => println!(
                "Spam threshold: {:.2} (last submission used {used:.2})",
                self.threshold
            ),
            _ => println!("Spam threshold: {:.2}", self.threshold),
        }
    }
}

fn render_notice(notice: &Notice) {
    match notice {
        Notice::Resolved { generation, state } => {
            if let Some(result) = state.result() {
                tracing::info!(
                    target: "console",
                    generation = *generation,
                    label = %result.label,
                    confidence = result.confidence,
                    "showing classification"
                );
            }
            println!("{}", format_state(state));
        }
        Notice::Logging(log) => render_log_notice(log),
    }
}

fn render_log_notice(notice: &LogNotice) {
    match &notice.outcome {
        LogOutcome::Logged => println!("{}", notice.outcome.user_message()),
        LogOutcome::Failed(detail) => {
            tracing::debug!(
                target: "console",
                generation = notice.generation,
                detail = %detail,
                "showing logging failure notice"
            );
            println!("Warning: {}", notice.outcome.user_message());
        }
    }
}

// blocking stdin gets its own thread so it never holds up runtime shutdown
fn spawn_stdin_reader() -> UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(err) => {
                    tracing::warn!(target: "console", error = %err, "stdin read failed");
                    break;
                }
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use reqwest::{Client, Url};
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    use super::*;
    use crate::{
        ai::ClassifierClient, config::ClassifierConfig, db::init_memory_pool, domain::Label,
        tasks::SubmissionState,
    };

    async fn session_against(server: &MockServer) -> (ConsoleSession, Arc<PredictionRepository>) {
        let base_url = Url::parse(&format!("{}/", server.uri())).unwrap();
        let classifier = ClassifierClient::new(
            Client::new(),
            ClassifierConfig {
                base_url,
                timeout: Duration::from_secs(5),
            },
        )
        .unwrap();
        let predictions = Arc::new(PredictionRepository::new(init_memory_pool().await.unwrap()));
        let (controller, _notices) =
            SubmissionController::new(Arc::new(classifier), predictions.clone());
        let session = ConsoleSession::new(
            Arc::new(controller),
            predictions.clone(),
            0.6,
            chrono_tz::UTC,
        );
        (session, predictions)
    }

    #[tokio::test]
    async fn submission_uses_current_threshold_and_is_logged() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict"))
            .and(query_param("threshold", "0.8"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": "spam",
                "confidence": 0.91,
                "threshold_used": 0.8
            })))
            .expect(1)
            .mount(&server)
            .await;

        let (mut session, predictions) = session_against(&server).await;
        assert!(session.handle_line("/threshold 0.8").await);
        assert!(session.handle_line("Congratulations, you won a gift card!").await);

        tokio::time::timeout(Duration::from_secs(5), async {
            while session.controller.state().result().is_none() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(
            session.controller.state().result().map(|r| r.label),
            Some(Label::Spam)
        );

        assert!(
            session
                .controller
                .drain_logging(Duration::from_secs(5))
                .await
        );
        let rows = predictions.recent(5).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].threshold_used, 0.8);

        assert!(session.handle_line("/reset").await);
        assert_eq!(session.controller.state(), SubmissionState::Idle);
        assert!(!session.handle_line("/quit").await);
    }

    #[tokio::test]
    async fn rejected_threshold_keeps_previous_value() {
        let server = MockServer::start().await;
        let (mut session, _) = session_against(&server).await;

        assert!(session.handle_line("/threshold 2").await);
        assert_eq!(session.threshold, 0.6);
        assert!(session.handle_line("/history 3").await);
    }

    #[tokio::test]
    async fn ending_session_abandons_in_flight_submissions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "result": "ham", "confidence": 0.1 }))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let (mut session, predictions) = session_against(&server).await;
        assert!(session.handle_line("See you at the station at six").await);
        tokio::time::timeout(Duration::from_secs(5), async {
            while session.controller.state() != SubmissionState::AwaitingClassification {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        session.abandon_submissions().await;
        assert!(session.submissions.is_empty());
        assert!(
            session
                .controller
                .drain_logging(Duration::from_secs(1))
                .await
        );
        assert!(predictions.recent(5).await.unwrap().is_empty());
        assert_eq!(
            session.controller.state(),
            SubmissionState::AwaitingClassification
        );
    }
}
