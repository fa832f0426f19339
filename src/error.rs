//! Error types for the inference service and the document bridge.

use thiserror::Error;

/// Failures inside the token-classification pipeline.
#[derive(Debug, Error)]
pub enum NerError {
    #[error("Failed to fetch model files: {0}")]
    Download(String),

    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    #[error("Tokenization failed: {0}")]
    Tokenization(String),

    #[error("Inference failed: {0}")]
    Inference(#[from] candle_core::Error),

    #[error("Unknown label id {0} in model output")]
    UnknownLabel(usize),
}

/// Failures a bridge operation can run into before it has a result.
///
/// The `Display` output of each variant is exactly the `error` string placed in
/// a failed envelope.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Invalid base64 PDF content: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Failed to extract text from PDF: {0}")]
    Extraction(String),

    #[error("No text could be extracted from the PDF")]
    EmptyText,

    #[error("Failed to call NER API: {0}")]
    Api(String),
}

impl From<reqwest::Error> for BridgeError {
    fn from(e: reqwest::Error) -> Self {
        BridgeError::Api(e.to_string())
    }
}
