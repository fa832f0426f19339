pub mod bridge;
pub mod config;
pub mod entity;
pub mod error;
pub mod inference;
pub mod logging;
pub mod mcp;
pub mod pdf;
pub mod pipeline;

pub use bridge::{AnalysisEnvelope, AnalysisReport, ApiStatus, NerApiClient, NerBridge};
pub use config::{BridgeConfig, ServerConfig};
pub use entity::{EntityAnnotation, NerRequest, TokenEntity};
pub use error::{BridgeError, NerError};
pub use pipeline::{BertNerPipeline, TokenClassifier};
