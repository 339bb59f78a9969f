use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use chrono_tz::Tz;
use reqwest::Client;
use tokio::{sync::mpsc::UnboundedReceiver, time::timeout};

use crate::{
    ai::ClassifierClient,
    config::AppConfig,
    console::ConsoleSession,
    db::{self, predictions::PredictionRepository},
    infrastructure::{directories::ResolvedPaths, shutdown::Shutdown},
    tasks::{Notice, SubmissionController},
};

pub struct InboxIqApp {
    controller: Arc<SubmissionController>,
    notices: UnboundedReceiver<Notice>,
    predictions: Arc<PredictionRepository>,
    shutdown: Shutdown,
    config: Arc<AppConfig>,
}

impl InboxIqApp {
    pub async fn initialize(
        config: AppConfig,
        paths: ResolvedPaths,
        shutdown: Shutdown,
    ) -> Result<Self> {
        let config = Arc::new(config);
        let pool = db::init_pool(&paths.db_path)
            .await
            .with_context(|| format!("failed to open {}", paths.db_path.display()))?;
        let predictions = Arc::new(PredictionRepository::new(pool));

        let http_client = Client::builder()
            .user_agent(format!("inboxiq-rust/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        let classifier = Arc::new(ClassifierClient::new(
            http_client,
            config.classifier.clone(),
        )?);

        match classifier.health().await {
            Ok(status) => {
                tracing::info!(target: "classifier", status = %status, "classifier reachable")
            }
            Err(err) => tracing::warn!(
                target: "classifier",
                error = %err,
                url = %config.classifier.base_url,
                "classifier health check failed; submissions may fail"
            ),
        }

        let (controller, notices) = SubmissionController::new(classifier, predictions.clone());

        Ok(Self {
            controller: Arc::new(controller),
            notices,
            predictions,
            shutdown,
            config,
        })
    }

    pub async fn run(self) -> Result<()> {
        let InboxIqApp {
            controller,
            notices,
            predictions,
            shutdown,
            config,
        } = self;

        tracing::info!(
            classifier = %config.classifier.base_url,
            threshold = config.default_threshold,
            "InboxIQ session started"
        );

        let timezone: Tz = config.timezone.parse().unwrap_or(chrono_tz::UTC);
        let session = ConsoleSession::new(
            controller.clone(),
            predictions.clone(),
            config.default_threshold,
            timezone,
        );

        if let Err(err) = session.run(shutdown.subscribe(), notices).await {
            tracing::error!(?err, "console session ended with error");
        }
        shutdown.trigger();

        let shutdown_timeout = Duration::from_secs(5);
        if !controller.drain_logging(shutdown_timeout).await {
            tracing::warn!(
                target: "submission",
                "pending prediction logs were dropped at shutdown"
            );
        }

        if timeout(shutdown_timeout, predictions.close()).await.is_err() {
            tracing::warn!(
                target: "db",
                "database pool did not close within {:?}",
                shutdown_timeout
            );
        }

        tracing::info!("InboxIQ session finished");
        Ok(())
    }
}
