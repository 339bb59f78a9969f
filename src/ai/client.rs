use anyhow::{Context, Result};
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::{config::ClassifierConfig, domain::ClassificationResult};

use super::inference::{ClassifyError, PREDICT_PATH, PredictRequest, parse_response};

#[derive(Clone)]
pub struct ClassifierClient {
    http: Client,
    config: ClassifierConfig,
    predict_url: Url,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    #[serde(default)]
    message: Option<String>,
}

impl ClassifierClient {
    pub fn new(http: Client, config: ClassifierConfig) -> Result<Self> {
        let predict_url = config
            .base_url
            .join(PREDICT_PATH)
            .with_context(|| format!("invalid classifier base url {}", config.base_url))?;
        Ok(Self {
            http,
            config,
            predict_url,
        })
    }

    pub async fn predict(
        &self,
        message: &str,
        threshold: f64,
    ) -> Result<ClassificationResult, ClassifyError> {
        let response = self
            .http
            .post(self.predict_url.clone())
            .query(&[("threshold", threshold)])
            .timeout(self.config.timeout)
            .json(&PredictRequest { message })
            .send()
            .await
            .map_err(ClassifyError::Network)?;

        let result = parse_response(response).await?;
        tracing::debug!(
            target: "classifier",
            label = %result.label,
            confidence = result.confidence,
            threshold,
            "classification received"
        );
        Ok(result)
    }

    pub async fn health(&self) -> Result<String> {
        let response = self
            .http
            .get(self.config.base_url.clone())
            .timeout(self.config.timeout)
            .send()
            .await
            .with_context(|| format!("failed to reach classifier at {}", self.config.base_url))?
            .error_for_status()?;

        let body: HealthResponse = response.json().await?;
        Ok(body.message.unwrap_or_else(|| "ok".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, method, path, query_param},
    };

    use super::*;
    use crate::domain::Label;

    fn client_for(base: &str, timeout: Duration) -> ClassifierClient {
        let mut base_url = Url::parse(base).unwrap();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        ClassifierClient::new(Client::new(), ClassifierConfig { base_url, timeout }).unwrap()
    }

    #[tokio::test]
    async fn posts_message_with_threshold_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict"))
            .and(query_param("threshold", "0.7"))
            .and(body_json(json!({ "message": "Claim your free cruise today!" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": "spam",
                "confidence": 0.92,
                "threshold_used": 0.7
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), Duration::from_secs(5));
        let result = client
            .predict("Claim your free cruise today!", 0.7)
            .await
            .unwrap();

        assert_eq!(result.label, Label::Spam);
        assert_eq!(result.confidence, 0.92);
        assert_eq!(result.threshold_used, Some(0.7));
    }

    #[tokio::test]
    async fn out_of_range_threshold_is_forwarded_unchanged() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict"))
            .and(query_param("threshold", "1.5"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "detail": [{ "loc": ["query", "threshold"], "msg": "too large" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), Duration::from_secs(5));
        let err = client.predict("hello there friend", 1.5).await.unwrap_err();
        assert!(matches!(
            err,
            ClassifyError::Service { code: 422, message: None }
        ));
    }

    #[tokio::test]
    async fn server_error_message_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict"))
            .respond_with(
                ResponseTemplate::new(503).set_body_json(json!({ "message": "Model warming up" })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), Duration::from_secs(5));
        match client.predict("is this message spam?", 0.5).await {
            Err(ClassifyError::Service { code, message }) => {
                assert_eq!(code, 503);
                assert_eq!(message.as_deref(), Some("Model warming up"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_confidence_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/predict"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "ham" })))
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), Duration::from_secs(5));
        let err = client.predict("see you at lunch", 0.5).await.unwrap_err();
        assert!(matches!(err, ClassifyError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn slow_service_times_out_as_network_error() {
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

        let client = client_for(&server.uri(), Duration::from_millis(100));
        let err = client.predict("see you at lunch", 0.5).await.unwrap_err();
        assert!(matches!(err, ClassifyError::Network(_)));
    }

    #[tokio::test]
    async fn base_path_is_preserved() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/predict"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "result": "ham", "confidence": 0.03 })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&format!("{}/api", server.uri()), Duration::from_secs(5));
        let result = client.predict("see you at lunch", 0.5).await.unwrap();
        assert_eq!(result.label, Label::Ham);
    }

    #[tokio::test]
    async fn health_returns_service_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": "InboxIQ Spam Classifier API is running"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server.uri(), Duration::from_secs(5));
        assert_eq!(
            client.health().await.unwrap(),
            "InboxIQ Spam Classifier API is running"
        );
    }
}
