//! Document bridge operations.
//!
//! Each operation is total: every failure along the way (decode, extraction,
//! empty text, network, upstream status) ends up in the returned envelope and
//! never escapes to the caller.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize, Serializer};

use crate::config::BridgeConfig;
use crate::entity::EntityAnnotation;
use crate::error::BridgeError;
use crate::pdf::extract_text_from_pdf;

// ============================================================================
// Envelopes
// ============================================================================

/// Payload of a successful analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Only present for PDF analysis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    /// Length of the analyzed text in characters.
    pub text_length: usize,
    pub ner_results: Vec<EntityAnnotation>,
    pub entity_count: usize,
}

impl AnalysisReport {
    fn for_pdf(extracted_text: String, ner_results: Vec<EntityAnnotation>) -> Self {
        Self {
            text_length: extracted_text.chars().count(),
            extracted_text: Some(extracted_text),
            entity_count: ner_results.len(),
            ner_results,
        }
    }

    fn for_text(text: &str, ner_results: Vec<EntityAnnotation>) -> Self {
        Self {
            extracted_text: None,
            text_length: text.chars().count(),
            entity_count: ner_results.len(),
            ner_results,
        }
    }
}

/// Result of `analyze_pdf_ner` / `analyze_text_ner`.
///
/// Serializes flat: `{"success": true, ...report}` or
/// `{"success": false, "error": "..."}`.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisEnvelope {
    Success(AnalysisReport),
    Failure { error: String },
}

impl AnalysisEnvelope {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

impl From<Result<AnalysisReport, BridgeError>> for AnalysisEnvelope {
    fn from(result: Result<AnalysisReport, BridgeError>) -> Self {
        match result {
            Ok(report) => Self::Success(report),
            Err(e) => Self::Failure {
                error: e.to_string(),
            },
        }
    }
}

impl Serialize for AnalysisEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Tagged<'a, T> {
            success: bool,
            #[serde(flatten)]
            body: &'a T,
        }

        #[derive(Serialize)]
        struct Failure<'a> {
            error: &'a str,
        }

        match self {
            Self::Success(report) => Tagged {
                success: true,
                body: report,
            }
            .serialize(serializer),
            Self::Failure { error } => Tagged {
                success: false,
                body: &Failure { error },
            }
            .serialize(serializer),
        }
    }
}

/// Result of `check_api_status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiStatus {
    pub success: bool,
    pub message: String,
    pub url: String,
}

// ============================================================================
// HTTP client
// ============================================================================

/// Client for the inference service. Cheap to clone; clones share one
/// connection pool.
#[derive(Clone)]
pub struct NerApiClient {
    http: reqwest::Client,
    config: BridgeConfig,
}

impl NerApiClient {
    pub fn new(config: BridgeConfig) -> Result<Self, reqwest::Error> {
        // redirects are reported as their status, not followed
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self::with_client(http, config))
    }

    pub fn with_client(http: reqwest::Client, config: BridgeConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// `POST /ner`. Network errors, non-2xx statuses and undecodable bodies
    /// all come back as [`BridgeError::Api`].
    pub async fn recognize(&self, text: &str) -> Result<Vec<EntityAnnotation>, BridgeError> {
        let response = self
            .http
            .post(self.config.ner_endpoint())
            .timeout(self.config.analyze_timeout)
            .json(&serde_json::json!({ "query": text }))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    /// `GET /docs`, returning whatever status the service answers with.
    pub async fn probe(&self) -> Result<reqwest::StatusCode, reqwest::Error> {
        let response = self
            .http
            .get(self.config.docs_endpoint())
            .timeout(self.config.status_timeout)
            .send()
            .await?;
        Ok(response.status())
    }
}

// ============================================================================
// Operations
// ============================================================================

/// Decode base64 PDF content. ASCII whitespace (line wrapping) is ignored.
pub fn decode_pdf_base64(pdf_base64: &str) -> Result<Vec<u8>, BridgeError> {
    let compact: String = pdf_base64
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    Ok(STANDARD.decode(compact)?)
}

#[derive(Clone)]
pub struct NerBridge {
    client: NerApiClient,
}

impl NerBridge {
    pub fn new(client: NerApiClient) -> Self {
        Self { client }
    }

    pub fn from_config(config: BridgeConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(NerApiClient::new(config)?))
    }

    pub fn config(&self) -> &BridgeConfig {
        self.client.config()
    }

    /// Decode, extract every page, then run NER over the extracted text.
    pub async fn analyze_pdf(&self, pdf_base64: &str) -> AnalysisEnvelope {
        let envelope = AnalysisEnvelope::from(self.try_analyze_pdf(pdf_base64).await);
        log_outcome("analyze_pdf_ner", &envelope);
        envelope
    }

    async fn try_analyze_pdf(&self, pdf_base64: &str) -> Result<AnalysisReport, BridgeError> {
        let pdf_bytes = decode_pdf_base64(pdf_base64)?;

        let extracted_text = tokio::task::spawn_blocking(move || extract_text_from_pdf(&pdf_bytes))
            .await
            .map_err(|e| BridgeError::Extraction(e.to_string()))??;

        if extracted_text.is_empty() {
            return Err(BridgeError::EmptyText);
        }

        let ner_results = self.client.recognize(&extracted_text).await?;
        Ok(AnalysisReport::for_pdf(extracted_text, ner_results))
    }

    /// Run NER over raw text. Empty text is forwarded as-is.
    pub async fn analyze_text(&self, text: &str) -> AnalysisEnvelope {
        let result = self
            .client
            .recognize(text)
            .await
            .map(|ner_results| AnalysisReport::for_text(text, ner_results));
        let envelope = AnalysisEnvelope::from(result);
        log_outcome("analyze_text_ner", &envelope);
        envelope
    }

    /// Probe the inference service's docs page.
    pub async fn check_status(&self) -> ApiStatus {
        let url = self.config().base_url.clone();
        match self.client.probe().await {
            Ok(status) if status == reqwest::StatusCode::OK => ApiStatus {
                success: true,
                message: "NER API is running and accessible".to_string(),
                url,
            },
            Ok(status) => ApiStatus {
                success: false,
                message: format!("API returned status code: {}", status.as_u16()),
                url,
            },
            Err(e) => {
                tracing::warn!(url = %url, "NER API unreachable: {}", e);
                ApiStatus {
                    success: false,
                    message: format!("Cannot connect to API: {}", e),
                    url,
                }
            }
        }
    }
}

fn log_outcome(tool: &str, envelope: &AnalysisEnvelope) {
    match envelope {
        AnalysisEnvelope::Success(report) => {
            tracing::info!(tool, entities = report.entity_count, chars = report.text_length, "analysis done")
        }
        AnalysisEnvelope::Failure { error } => tracing::warn!(tool, "analysis failed: {}", error),
    }
}
