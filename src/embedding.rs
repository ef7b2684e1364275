use crate::{chat::Usage, EmbeddingModel, Error};

/// Embeddings request structure.
///
/// ```rust
/// let request = inference_client::Embeddings::new("mistral-embed", "Hello");
/// assert_eq!(request.input, "Hello");
/// ```
#[derive(Debug, Clone, serde::Serialize)]
pub struct Embeddings {
    pub input: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl Embeddings {
    pub fn new(model: impl Into<EmbeddingModel>, input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            model: model.into().to_string(),
            user: None,
        }
    }
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct EmbeddingsResponse {
    pub data: Vec<EmbeddingData>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub usage: Option<Usage>, // Not all implementations may return this
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct EmbeddingData {
    #[serde(default)]
    pub index: u64,
    pub embedding: Vec<f32>,
}

impl EmbeddingsResponse {
    /// Takes the first vector and checks it against the registered dimension.
    pub(crate) fn into_vector(self, dimension: usize) -> Result<EmbeddingVector, Error> {
        let data = self
            .data
            .into_iter()
            .next()
            .ok_or_else(|| Error::EncodingError("the backend returned no vector".into()))?;

        if data.embedding.len() != dimension {
            return Err(Error::EncodingError(format!(
                "expected {dimension} dimensions, the backend returned {}",
                data.embedding.len()
            )));
        }

        Ok(EmbeddingVector(data.embedding))
    }
}

/// A fixed-length vector encoding the meaning of a text.
///
/// Serializes as a plain JSON array of numbers.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(transparent)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    pub(crate) fn zeros(dimension: usize) -> Self {
        Self(vec![0.0; dimension])
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }

    /// Cosine similarity between two vectors.
    ///
    /// Returns `None` if the dimensions differ or either vector has zero norm.
    pub fn cosine_similarity(&self, other: &EmbeddingVector) -> Option<f32> {
        if self.dimension() != other.dimension() {
            return None;
        }

        let dot: f32 = self.0.iter().zip(&other.0).map(|(a, b)| a * b).sum();
        let norm_a = norm(&self.0);
        let norm_b = norm(&other.0);

        if norm_a == 0.0 || norm_b == 0.0 {
            return None;
        }

        Some(dot / (norm_a * norm_b))
    }
}

impl AsRef<[f32]> for EmbeddingVector {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

fn norm(values: &[f32]) -> f32 {
    values.iter().map(|x| x * x).sum::<f32>().sqrt()
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

const TRIGRAM_WEIGHT: f32 = 0.5;
const BIGRAM_WEIGHT: f32 = 0.75;

/// In-process sentence encoder based on signed feature hashing.
///
/// Every token, every pair of adjacent tokens and the character trigrams of
/// longer words are hashed into one of `dimension` buckets, with a sign taken
/// from the hash. The sum is L2-normalized. The hash is seeded with the model
/// identifier, so two models with the same dimension disagree.
///
/// Encoding is deterministic and the empty text maps to the zero vector.
#[derive(Debug, Clone)]
pub struct LocalEncoder {
    model: EmbeddingModel,
    dimension: usize,
    seed: u64,
}

impl LocalEncoder {
    pub fn load(model: &EmbeddingModel, dimension: usize) -> Result<Self, Error> {
        if dimension == 0 {
            return Err(Error::ModelUnavailableError {
                model: model.to_string(),
                reason: "a local encoder needs a non-zero dimension".into(),
            });
        }

        Ok(Self {
            model: model.clone(),
            dimension,
            seed: fnv1a(FNV_OFFSET, model.as_str().as_bytes()),
        })
    }

    pub fn model(&self) -> &EmbeddingModel {
        &self.model
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn encode(&self, text: &str) -> Result<EmbeddingVector, Error> {
        let mut values = vec![0.0f32; self.dimension];
        let tokens = tokenize(text);

        for (i, token) in tokens.iter().enumerate() {
            self.accumulate(&mut values, token.as_bytes(), 1.0);

            if let Some(next) = tokens.get(i + 1) {
                let bigram = format!("{token} {next}");
                self.accumulate(&mut values, bigram.as_bytes(), BIGRAM_WEIGHT);
            }

            let chars: Vec<char> = token.chars().collect();
            if chars.len() > 3 {
                for window in chars.windows(3) {
                    let trigram: String = window.iter().collect();
                    self.accumulate(&mut values, trigram.as_bytes(), TRIGRAM_WEIGHT);
                }
            }
        }

        let length = norm(&values);
        if !length.is_finite() {
            return Err(Error::EncodingError(format!(
                "non-finite vector norm for model '{}'",
                self.model
            )));
        }

        if length > 0.0 {
            values.iter_mut().for_each(|x| *x /= length);
        }

        Ok(EmbeddingVector(values))
    }

    fn accumulate(&self, values: &mut [f32], feature: &[u8], weight: f32) {
        let hash = fnv1a(self.seed, feature);
        let bucket = (hash % self.dimension as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };

        values[bucket] += sign * weight;
    }
}

fn fnv1a(seed: u64, bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(seed, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME))
}

/// Lower-cased alphanumeric runs, with each CJK ideograph as its own token.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for c in text.chars().flat_map(char::to_lowercase) {
        if is_cjk(c) {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            tokens.push(c.to_string());
        } else if c.is_alphanumeric() || c == '_' {
            current.push(c);
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

fn is_cjk(c: char) -> bool {
    matches!(c, '\u{3400}'..='\u{4dbf}' | '\u{4e00}'..='\u{9fff}' | '\u{f900}'..='\u{faff}')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn encoder() -> LocalEncoder {
        LocalEncoder::load(&"embed-model-y".into(), 384).unwrap()
    }

    #[test]
    fn tokenizer_splits_words_and_ideographs() {
        assert_eq!(
            tokenize("Hello, World_2! 你會說中文嗎？"),
            vec!["hello", "world_2", "你", "會", "說", "中", "文", "嗎"]
        );
        assert!(tokenize("  ...  ").is_empty());
    }

    #[test]
    fn empty_text_is_the_zero_vector() {
        let vector = encoder().encode("").unwrap();

        assert_eq!(vector.dimension(), 384);
        assert!(vector.as_slice().iter().all(|x| *x == 0.0));
    }

    #[test]
    fn text_is_unit_length_and_deterministic() {
        let a = encoder().encode("hello world").unwrap();
        let b = encoder().encode("hello world").unwrap();

        assert_eq!(a, b);
        assert_eq!(a.dimension(), 384);
        assert!((norm(a.as_slice()) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn related_texts_are_closer() {
        let encoder = encoder();
        let query = encoder.encode("can I keep a pet in the building").unwrap();
        let close = encoder.encode("pets are not allowed in the building").unwrap();
        let far = encoder.encode("garbage collection is at nine").unwrap();

        let close = query.cosine_similarity(&close).unwrap();
        let far = query.cosine_similarity(&far).unwrap();
        assert!(close > far, "{close} <= {far}");
    }

    #[test]
    fn model_identifier_seeds_the_hash() {
        let other = LocalEncoder::load(&"embed-model-z".into(), 384).unwrap();

        assert_ne!(
            encoder().encode("hello world").unwrap(),
            other.encode("hello world").unwrap()
        );
    }

    #[test]
    fn zero_dimension_cannot_load() {
        assert!(matches!(
            LocalEncoder::load(&"broken".into(), 0),
            Err(Error::ModelUnavailableError { .. })
        ));
    }

    #[test]
    fn cosine_similarity_edge_cases() {
        let a = EmbeddingVector(vec![1.0, 0.0]);
        let b = EmbeddingVector(vec![0.0, 1.0]);

        assert_eq!(a.cosine_similarity(&a), Some(1.0));
        assert_eq!(a.cosine_similarity(&b), Some(0.0));
        assert_eq!(a.cosine_similarity(&EmbeddingVector::zeros(2)), None);
        assert_eq!(a.cosine_similarity(&EmbeddingVector(vec![1.0])), None);
    }

    #[test]
    fn vectors_serialize_as_arrays() {
        let vector = EmbeddingVector(vec![0.5, -0.25]);
        assert_eq!(serde_json::to_string(&vector).unwrap(), "[0.5,-0.25]");
    }

    #[test]
    fn response_dimension_is_checked() {
        let response: EmbeddingsResponse = serde_json::from_value(json!({
            "object": "list",
            "data": [{ "object": "embedding", "index": 0, "embedding": [0.1, 0.2, 0.3] }],
            "model": "mistral-embed"
        }))
        .unwrap();

        assert_eq!(response.clone().into_vector(3).unwrap().dimension(), 3);
        assert!(matches!(
            response.into_vector(4),
            Err(Error::EncodingError(_))
        ));
    }

    #[test]
    fn response_without_data_is_an_encoding_error() {
        let response: EmbeddingsResponse =
            serde_json::from_value(json!({ "data": [] })).unwrap();

        assert!(matches!(
            response.into_vector(3),
            Err(Error::EncodingError(_))
        ));
    }
}
