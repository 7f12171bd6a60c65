//! MRI upload handling.
//!
//! Classification is a stand-in: `StaticClassifier` returns a configured
//! label for any valid image.

use std::path::Path;

use neurochat_schema::PredictionLabel;
use thiserror::Error;

use crate::explanation::record_prediction;
use crate::session::SessionState;

pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error("unsupported image type '{0}', expected jpg, jpeg or png")]
    UnsupportedType(String),
    #[error("uploaded file is empty")]
    Empty,
}

/// An image received from the user.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedImage {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
    }

    pub fn validate(&self) -> Result<(), UploadError> {
        let ext = self.extension().unwrap_or_default();
        if !ACCEPTED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(UploadError::UnsupportedType(ext));
        }
        if self.bytes.is_empty() {
            return Err(UploadError::Empty);
        }
        Ok(())
    }
}

pub trait MriClassifier: Send + Sync {
    fn classify(&self, image: &UploadedImage) -> PredictionLabel;
}

/// Returns the same label for every image.
#[derive(Debug, Clone)]
pub struct StaticClassifier {
    label: PredictionLabel,
}

impl StaticClassifier {
    pub fn new(label: PredictionLabel) -> Self {
        Self { label }
    }
}

impl Default for StaticClassifier {
    fn default() -> Self {
        Self::new(PredictionLabel::VeryMildDemented)
    }
}

impl MriClassifier for StaticClassifier {
    fn classify(&self, _image: &UploadedImage) -> PredictionLabel {
        self.label.clone()
    }
}

/// Validates and classifies an upload, then records the prediction.
pub fn handle_upload(
    session: &mut SessionState,
    classifier: &dyn MriClassifier,
    image: &UploadedImage,
) -> Result<PredictionLabel, UploadError> {
    image.validate()?;
    let label = classifier.classify(image);
    let appended = record_prediction(session, label.clone());
    tracing::info!(
        session_id = %session.id(),
        file = %image.file_name,
        bytes = image.bytes.len(),
        prediction = %label,
        appended,
        "mri image classified"
    );
    Ok(label)
}
