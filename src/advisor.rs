//! One upload in, one advisory report out.
//!
//! The classifier is called once. If it fails, the error is handed back as
//! `ClassifierUnavailable` and neither the normalizer nor the advice table runs.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::advice::{self, DisposalAdvice};
use crate::classification::{Classification, ClassifierOutput, normalize};
use crate::clients::Classifier;
use crate::error::{Result, WasteAdvisorError};
use crate::upload::ImageUpload;

#[derive(Debug, Clone, Serialize)]
pub struct AdvisoryReport {
    pub request_id: Uuid,
    pub model: String,
    pub classified_at: DateTime<Utc>,
    pub classification: Classification,
    pub advice: DisposalAdvice,
}

impl AdvisoryReport {
    /// Normalize then map. Pure apart from the id and timestamp.
    pub fn from_output(request_id: Uuid, output: &ClassifierOutput) -> Self {
        let classification = normalize(output);
        let advice = advice::advise(&classification);
        Self {
            request_id,
            model: output.model.clone(),
            classified_at: Utc::now(),
            classification,
            advice,
        }
    }
}

#[derive(Clone)]
pub struct WasteAdvisor {
    classifier: Arc<dyn Classifier>,
}

impl WasteAdvisor {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }

    pub fn models(&self) -> Vec<String> {
        self.classifier.models()
    }

    pub async fn advise(&self, upload: &ImageUpload) -> Result<AdvisoryReport> {
        let request_id = Uuid::new_v4();
        tracing::info!(
            %request_id,
            "Classifying upload ({} bytes, {}x{}, {})",
            upload.len(),
            upload.width,
            upload.height,
            upload.mime_type()
        );

        let output = self.classifier.classify(upload).await.map_err(|source| {
            tracing::warn!(%request_id, "Classifier failed: {}", source);
            WasteAdvisorError::ClassifierUnavailable { source }
        })?;

        if output.is_empty() {
            tracing::warn!(%request_id, "Classifier returned empty output");
        }

        let report = AdvisoryReport::from_output(request_id, &output);
        tracing::info!(
            %request_id,
            model = %report.model,
            biodegradable = report.classification.biodegradable.as_str(),
            moisture = report.classification.moisture.as_str(),
            "Classification complete: {}",
            report.advice.title
        );
        Ok(report)
    }
}
