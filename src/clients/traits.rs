use async_trait::async_trait;
use thiserror::Error;

use crate::classification::ClassifierOutput;
use crate::upload::ImageUpload;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("quota exceeded: {0}")]
    Quota(String),
    #[error("content blocked by safety filters: {0}")]
    Blocked(String),
    #[error("image rejected by provider: {0}")]
    InvalidImage(String),
    #[error("no configured model is available (tried {tried})")]
    ModelUnavailable { tried: String },
    #[error("provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("classifier timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("parse error: {0}")]
    ParseError(String),
}

impl ClassifierError {
    /// Non-technical follow-up advice for the failure, if there is any worth giving.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ClassifierError::Quota(_) => {
                Some("The classification service is busy. Please wait a few minutes and try again.")
            }
            ClassifierError::Blocked(_) => {
                Some("This image could not be analysed. Please try a different photo.")
            }
            ClassifierError::InvalidImage(_) => Some(
                "The image might be corrupted or in an unsupported format. Please try a different image.",
            ),
            ClassifierError::Timeout { .. } | ClassifierError::Network(_) => {
                Some("Please check your connection and try again.")
            }
            _ => None,
        }
    }
}

/// Image bytes in, raw provider text out.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, image: &ImageUpload) -> Result<ClassifierOutput, ClassifierError>;

    /// Models this classifier will try, in order.
    fn models(&self) -> Vec<String>;
}
