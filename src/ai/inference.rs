use reqwest::Response;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::{ClassificationResult, Label};

pub const PREDICT_PATH: &str = "predict";

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("classifier unreachable: {0}")]
    Network(#[source] reqwest::Error),
    #[error("classifier responded with status {code}")]
    Service { code: u16, message: Option<String> },
    #[error("classifier response was malformed: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Serialize)]
pub struct PredictRequest<'a> {
    pub message: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct PredictResponse {
    pub result: Label,
    pub confidence: f64,
    #[serde(default)]
    pub threshold_used: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<Value>,
    #[serde(default)]
    detail: Option<Value>,
}

pub async fn parse_response(response: Response) -> Result<ClassificationResult, ClassifyError> {
    let status = response.status();
    let body = response.bytes().await.map_err(ClassifyError::Network)?;

    if !status.is_success() {
        return Err(ClassifyError::Service {
            code: status.as_u16(),
            message: extract_error_message(&body),
        });
    }

    parse_prediction(&body)
}

pub fn parse_prediction(body: &[u8]) -> Result<ClassificationResult, ClassifyError> {
    let parsed: PredictResponse = serde_json::from_slice(body)
        .map_err(|err| ClassifyError::MalformedResponse(err.to_string()))?;

    if !parsed.confidence.is_finite() || !(0.0..=1.0).contains(&parsed.confidence) {
        return Err(ClassifyError::MalformedResponse(format!(
            "confidence {} is outside 0.0..=1.0",
            parsed.confidence
        )));
    }

    Ok(ClassificationResult::new(parsed.result, parsed.confidence)
        .with_threshold_used(parsed.threshold_used))
}

fn extract_error_message(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    let text = |field: Option<Value>| match field {
        Some(Value::String(text)) if !text.trim().is_empty() => Some(text),
        _ => None,
    };
    text(parsed.message).or_else(|| text(parsed.detail))
}
