use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Spam,
    Ham,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Spam => "spam",
            Label::Ham => "ham",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub label: Label,
    pub confidence: f64,
    pub threshold_used: Option<f64>,
}

impl ClassificationResult {
    pub fn new(label: Label, confidence: f64) -> Self {
        Self {
            label,
            confidence,
            threshold_used: None,
        }
    }

    pub fn with_threshold_used(mut self, threshold_used: Option<f64>) -> Self {
        self.threshold_used = threshold_used;
        self
    }
}

// only built from a classification result
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    content: String,
    prediction: Label,
    confidence: f64,
    threshold_used: f64,
}

impl LogRecord {
    pub fn from_result(content: &str, result: &ClassificationResult, threshold: f64) -> Self {
        Self {
            content: content.to_string(),
            prediction: result.label,
            confidence: result.confidence,
            threshold_used: threshold,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn prediction(&self) -> Label {
        self.prediction
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn threshold_used(&self) -> f64 {
        self.threshold_used
    }
}
