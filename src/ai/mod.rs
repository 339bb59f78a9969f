mod client;
mod inference;

use futures::future::BoxFuture;

use crate::domain::ClassificationResult;

pub use client::ClassifierClient;
pub use inference::ClassifyError;

pub trait Classify: Send + Sync {
    fn classify<'a>(
        &'a self,
        message: &'a str,
        threshold: f64,
    ) -> BoxFuture<'a, Result<ClassificationResult, ClassifyError>>;
}

impl Classify for ClassifierClient {
    fn classify<'a>(
        &'a self,
        message: &'a str,
        threshold: f64,
    ) -> BoxFuture<'a, Result<ClassificationResult, ClassifyError>> {
        Box::pin(self.predict(message, threshold))
    }
}
