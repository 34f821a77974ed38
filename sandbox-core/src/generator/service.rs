//! The text-generation seam.

use async_trait::async_trait;
use thiserror::Error;

/// Errors a text service can report.
///
/// The variant decides what the generator does next: try another model,
/// stop using the service for good, or just fall back for this request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("not authorized: {0}")]
    Auth(String),

    #[error("request timed out")]
    Timeout,

    #[error("service error: {0}")]
    Other(String),
}

impl ServiceError {
    /// Classify a raw provider message.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        match textgen::classify_message(&message) {
            textgen::ErrorClass::ModelNotFound => ServiceError::ModelNotFound(message),
            textgen::ErrorClass::Auth => ServiceError::Auth(message),
            textgen::ErrorClass::Other => ServiceError::Other(message),
        }
    }
}

impl From<textgen::Error> for ServiceError {
    fn from(err: textgen::Error) -> Self {
        let message = err.to_string();
        match err.class() {
            textgen::ErrorClass::ModelNotFound => ServiceError::ModelNotFound(message),
            textgen::ErrorClass::Auth => ServiceError::Auth(message),
            textgen::ErrorClass::Other => ServiceError::Other(message),
        }
    }
}

/// Something that turns a prompt into text using a named model.
#[async_trait]
pub trait TextService: Send + Sync {
    async fn generate_text(
        &self,
        model: &str,
        prompt: &str,
        temperature: f32,
    ) -> Result<String, ServiceError>;
}

#[async_trait]
impl TextService for textgen::Client {
    async fn generate_text(
        &self,
        model: &str,
        prompt: &str,
        temperature: f32,
    ) -> Result<String, ServiceError> {
        Ok(self.complete(model, prompt, temperature).await?)
    }
}
