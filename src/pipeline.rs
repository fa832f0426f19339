//! Token-classification NER pipeline using a BERT checkpoint via candle.
//!
//! Produces one record per non-`O` token, in token order, with the same shape as
//! an ungrouped Hugging Face "ner" pipeline.

use std::collections::HashMap;

use candle_core::{Device, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use hf_hub::{api::sync::Api, Repo, RepoType};
use serde::Deserialize;
use tokenizers::{Tokenizer, TruncationParams};

use crate::entity::TokenEntity;
use crate::error::NerError;

pub const DEFAULT_MODEL_ID: &str = "dslim/bert-base-NER";
pub const DEFAULT_REVISION: &str = "main";

const MAX_TOKENS: usize = 512;
const OUTSIDE_LABEL: &str = "O";

/// Anything that can turn text into per-token entity records.
///
/// Implementations must be reentrant: the service calls `classify` from many
/// blocking workers at once without locking.
pub trait TokenClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Result<Vec<TokenEntity>, NerError>;

    /// Identifier reported by the health endpoint.
    fn model_id(&self) -> &str;
}

/// Fields of `config.json` the classifier head needs beyond candle's `Config`.
#[derive(Deserialize)]
struct HeadConfig {
    hidden_size: usize,
    id2label: HashMap<String, String>,
}

/// BERT encoder with a linear token-classification head
pub struct BertNerPipeline {
    model: BertModel,
    classifier: Linear,
    tokenizer: Tokenizer,
    labels: Vec<String>,
    device: Device,
    model_id: String,
}

impl BertNerPipeline {
    /// Load model from Hugging Face Hub (downloads on first use)
    pub fn load(model_id: &str, revision: &str) -> Result<Self, NerError> {
        #[cfg(feature = "cuda")]
        let device = if candle_core::utils::cuda_is_available() {
            match Device::new_cuda(0) {
                Ok(dev) => {
                    tracing::info!("Using CUDA device (GPU)");
                    dev
                }
                Err(e) => {
                    tracing::warn!("CUDA device creation failed: {}, falling back to CPU", e);
                    Device::Cpu
                }
            }
        } else {
            tracing::info!("CUDA not available, using CPU");
            Device::Cpu
        };

        #[cfg(not(feature = "cuda"))]
        let device = {
            tracing::info!("Using CPU (cuda feature not enabled)");
            Device::Cpu
        };

        let api = Api::new().map_err(|e| NerError::Download(e.to_string()))?;
        let repo = api.repo(Repo::with_revision(
            model_id.to_string(),
            RepoType::Model,
            revision.to_string(),
        ));

        let config_path = repo
            .get("config.json")
            .map_err(|e| NerError::Download(format!("config.json: {}", e)))?;
        let tokenizer_path = repo
            .get("tokenizer.json")
            .map_err(|e| NerError::Download(format!("tokenizer.json: {}", e)))?;
        let weights_path = repo
            .get("model.safetensors")
            .map_err(|e| NerError::Download(format!("model.safetensors: {}", e)))?;

        let config_str = std::fs::read_to_string(&config_path)
            .map_err(|e| NerError::ModelLoad(format!("Failed to read config: {}", e)))?;
        let config: Config = serde_json::from_str(&config_str)
            .map_err(|e| NerError::ModelLoad(format!("Failed to parse config: {}", e)))?;
        let head: HeadConfig = serde_json::from_str(&config_str)
            .map_err(|e| NerError::ModelLoad(format!("Failed to parse label map: {}", e)))?;
        let labels = labels_from_id_map(&head.id2label)?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| NerError::ModelLoad(format!("Failed to load tokenizer: {}", e)))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| NerError::ModelLoad(format!("Failed to set truncation: {}", e)))?;
        tokenizer.with_padding(None);

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)
                .map_err(|e| NerError::ModelLoad(format!("Failed to load weights: {}", e)))?
        };
        let model = BertModel::load(vb.pp("bert"), &config)
            .map_err(|e| NerError::ModelLoad(format!("Failed to build encoder: {}", e)))?;
        let classifier = candle_nn::linear(head.hidden_size, labels.len(), vb.pp("classifier"))
            .map_err(|e| NerError::ModelLoad(format!("Failed to build classifier: {}", e)))?;

        tracing::info!(model = model_id, labels = labels.len(), "NER model loaded");

        Ok(Self {
            model,
            classifier,
            tokenizer,
            labels,
            device,
            model_id: model_id.to_string(),
        })
    }
}

impl TokenClassifier for BertNerPipeline {
    fn classify(&self, text: &str) -> Result<Vec<TokenEntity>, NerError> {
        let encoding = self
            .tokenizer
            .encode_char_offsets(text, true)
            .map_err(|e| NerError::Tokenization(e.to_string()))?;

        let input_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(encoding.get_type_ids(), &self.device)?.unsqueeze(0)?;
        let attention_mask =
            Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;

        let hidden_states = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let logits = self.classifier.forward(&hidden_states)?;
        let probs: Vec<Vec<f32>> = candle_nn::ops::softmax_last_dim(&logits)?
            .squeeze(0)?
            .to_vec2()?;

        decode_entities(
            encoding.get_tokens(),
            encoding.get_offsets(),
            encoding.get_special_tokens_mask(),
            &probs,
            &self.labels,
        )
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Order `id2label` by numeric id. Gaps in the ids are a malformed config.
fn labels_from_id_map(id2label: &HashMap<String, String>) -> Result<Vec<String>, NerError> {
    let mut labels = vec![None; id2label.len()];
    for (id, label) in id2label {
        let idx: usize = id
            .parse()
            .map_err(|_| NerError::ModelLoad(format!("Non-numeric label id '{}'", id)))?;
        let slot = labels
            .get_mut(idx)
            .ok_or_else(|| NerError::ModelLoad(format!("Label id {} out of range", idx)))?;
        *slot = Some(label.clone());
    }
    labels
        .into_iter()
        .enumerate()
        .map(|(i, l)| l.ok_or_else(|| NerError::ModelLoad(format!("Missing label id {}", i))))
        .collect()
}

/// Turn per-token label distributions into entity records.
///
/// Special tokens and tokens whose best label is `O` are dropped. `index` is the
/// token's position in the encoded sequence, so the leading `[CLS]` makes the
/// first word token index 1.
pub(crate) fn decode_entities(
    tokens: &[String],
    offsets: &[(usize, usize)],
    special_tokens_mask: &[u32],
    probs: &[Vec<f32>],
    labels: &[String],
) -> Result<Vec<TokenEntity>, NerError> {
    let mut entities = Vec::new();

    for (idx, dist) in probs.iter().enumerate() {
        if special_tokens_mask.get(idx).copied().unwrap_or(0) == 1 {
            continue;
        }
        let Some((best, score)) = dist
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
        else {
            continue;
        };
        let label = labels.get(best).ok_or(NerError::UnknownLabel(best))?;
        if label == OUTSIDE_LABEL {
            continue;
        }

        let (start, end) = offsets.get(idx).copied().unzip();
        entities.push(TokenEntity {
            entity: label.clone(),
            score,
            word: tokens.get(idx).cloned().unwrap_or_default(),
            index: Some(idx),
            start,
            end,
        });
    }

    Ok(entities)
}

/// Deterministic classifiers for exercising the service without a model.
#[cfg(test)]
pub(crate) mod stub {
    use super::*;

    /// Tags every capitalized word as `B-MISC`.
    pub(crate) struct CapitalizedWords;

    impl TokenClassifier for CapitalizedWords {
        fn classify(&self, text: &str) -> Result<Vec<TokenEntity>, NerError> {
            let chars: Vec<char> = text.chars().collect();
            let mut entities = Vec::new();
            let mut token_index = 0;
            let mut i = 0;
            while i < chars.len() {
                if chars[i].is_whitespace() {
                    i += 1;
                    continue;
                }
                let start = i;
                while i < chars.len() && !chars[i].is_whitespace() {
                    i += 1;
                }
                token_index += 1;
                if chars[start].is_uppercase() {
                    entities.push(TokenEntity {
                        entity: "B-MISC".to_string(),
                        score: 0.9,
                        word: chars[start..i].iter().collect(),
                        index: Some(token_index),
                        start: Some(start),
                        end: Some(i),
                    });
                }
            }
            Ok(entities)
        }

        fn model_id(&self) -> &str {
            "stub/capitalized-words"
        }
    }

    pub(crate) struct Failing;

    impl TokenClassifier for Failing {
        fn classify(&self, _text: &str) -> Result<Vec<TokenEntity>, NerError> {
            Err(NerError::Tokenization("secret internal detail".to_string()))
        }

        fn model_id(&self) -> &str {
            "stub/failing"
        }
    }

    pub(crate) struct Panicking;

    impl TokenClassifier for Panicking {
        fn classify(&self, _text: &str) -> Result<Vec<TokenEntity>, NerError> {
            panic!("classifier blew up")
        }

        fn model_id(&self) -> &str {
            "stub/panicking"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        ["O", "B-PER", "I-PER", "B-LOC"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_decode_skips_special_and_outside_tokens() {
        let tokens: Vec<String> = ["[CLS]", "Barack", "was", "Hawaii", "[SEP]"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let offsets = vec![(0, 0), (0, 6), (7, 10), (11, 17), (0, 0)];
        let special = vec![1, 0, 0, 0, 1];
        let probs = vec![
            vec![0.1, 0.8, 0.05, 0.05],
            vec![0.02, 0.95, 0.02, 0.01],
            vec![0.97, 0.01, 0.01, 0.01],
            vec![0.1, 0.0, 0.0, 0.9],
            vec![0.1, 0.8, 0.05, 0.05],
        ];

        let entities = decode_entities(&tokens, &offsets, &special, &probs, &labels()).unwrap();

        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].entity, "B-PER");
        assert_eq!(entities[0].word, "Barack");
        assert_eq!(entities[0].index, Some(1));
        assert_eq!((entities[0].start, entities[0].end), (Some(0), Some(6)));
        assert!((entities[0].score - 0.95).abs() < 1e-6);
        assert_eq!(entities[1].entity, "B-LOC");
        assert_eq!(entities[1].index, Some(3));
    }

    #[test]
    fn test_decode_rejects_unknown_label() {
        let tokens = vec!["x".to_string()];
        let probs = vec![vec![0.0, 0.0, 0.0, 0.0, 1.0]];
        let err = decode_entities(&tokens, &[(0, 1)], &[0], &probs, &labels()).unwrap_err();
        assert!(matches!(err, NerError::UnknownLabel(4)));
    }

    #[test]
    fn test_labels_ordered_by_id() {
        let map: HashMap<String, String> = [("1", "B-PER"), ("0", "O"), ("2", "I-PER")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert_eq!(labels_from_id_map(&map).unwrap(), vec!["O", "B-PER", "I-PER"]);
    }

    #[test]
    fn test_labels_with_gap_rejected() {
        let map: HashMap<String, String> = [("0", "O"), ("2", "B-PER")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert!(labels_from_id_map(&map).is_err());
    }

    #[test]
    fn test_stub_offsets_are_ordered() {
        let entities = stub::CapitalizedWords
            .classify("Ada Lovelace met Babbage")
            .unwrap();
        assert_eq!(entities.len(), 3);
        for e in &entities {
            assert!(e.start.unwrap() <= e.end.unwrap());
        }
    }

    #[test]
    #[ignore = "downloads dslim/bert-base-NER from the Hugging Face Hub"]
    fn test_real_model_finds_person_and_location() {
        let pipeline = BertNerPipeline::load(DEFAULT_MODEL_ID, DEFAULT_REVISION).unwrap();
        let entities = pipeline.classify("Barack Obama was born in Hawaii").unwrap();
        assert!(!entities.is_empty());
        assert!(entities.iter().any(|e| e.entity.ends_with("PER")));
        assert!(entities.iter().any(|e| e.entity.ends_with("LOC")));
        for e in &entities {
            assert!(e.score.is_finite());
            assert!(e.start <= e.end);
        }

        let again = pipeline.classify("Barack Obama was born in Hawaii").unwrap();
        assert_eq!(entities, again);
    }
}
