//! Wire types shared by the inference service and the bridge.

use serde::{Deserialize, Serialize};

/// Body of `POST /ner`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NerRequest {
    pub query: String,
}

/// One record as produced by a [`crate::pipeline::TokenClassifier`].
///
/// Positional fields are optional because a classifier is free to omit them.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenEntity {
    pub entity: String,
    pub score: f32,
    pub word: String,
    pub index: Option<usize>,
    pub start: Option<usize>,
    pub end: Option<usize>,
}

/// One recognized span as returned over HTTP.
///
/// `index`, `start` and `end` are always present in JSON, as `null` when the
/// pipeline did not report them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityAnnotation {
    pub entity: String,
    pub score: f64,
    pub index: Option<i64>,
    pub word: String,
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl From<TokenEntity> for EntityAnnotation {
    fn from(t: TokenEntity) -> Self {
        Self {
            entity: t.entity,
            score: f64::from(t.score),
            index: t.index.map(|i| i as i64),
            word: t.word,
            start: t.start.map(|s| s as i64),
            end: t.end.map(|e| e as i64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_positions_serialize_as_null() {
        let annotation = EntityAnnotation::from(TokenEntity {
            entity: "B-PER".to_string(),
            score: 0.5,
            word: "Ada".to_string(),
            index: None,
            start: Some(0),
            end: None,
        });
        let json = serde_json::to_value(&annotation).unwrap();
        assert_eq!(json["index"], serde_json::Value::Null);
        assert_eq!(json["start"], 0);
        assert_eq!(json["end"], serde_json::Value::Null);
        assert_eq!(json["score"], 0.5);
    }

    #[test]
    fn test_request_requires_query() {
        assert!(serde_json::from_str::<NerRequest>(r#"{"text":"x"}"#).is_err());
        assert!(serde_json::from_str::<NerRequest>(r#"{"query":42}"#).is_err());
        let req: NerRequest = serde_json::from_str(r#"{"query":""}"#).unwrap();
        assert_eq!(req.query, "");
    }
}
