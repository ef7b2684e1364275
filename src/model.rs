use std::{collections::HashMap, fmt};

use crate::Error;

/// Identifier of the in-process hashed n-gram encoder.
///
/// It needs no server and no weights but only captures lexical overlap. Use
/// [`SENTENCE_EMBEDDING_MODEL`] when similarity has to follow meaning.
pub const FALLBACK_EMBEDDING_MODEL: &str = "hashed-ngram-384";

/// The pre-trained MiniLM sentence transformer, served by an
/// OpenAI-compatible embedding server such as text-embeddings-inference.
pub const SENTENCE_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";

macro_rules! model_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub(crate) fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

model_id! {
    /// Names a chat completion model, e.g. `open-mistral-7b`.
    ChatModel
}

model_id! {
    /// Names an embedding model, e.g. `mistral-embed`.
    EmbeddingModel
}

/// Where the vectors of an embedding model are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingBackend {
    /// The `/embeddings` endpoint of the embedding base URI.
    Remote,
    /// A [`LocalEncoder`](crate::LocalEncoder) running in this process.
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddingModelInfo {
    pub dimension: usize,
    pub backend: EmbeddingBackend,
}

impl EmbeddingModelInfo {
    pub fn remote(dimension: usize) -> Self {
        Self {
            dimension,
            backend: EmbeddingBackend::Remote,
        }
    }

    pub fn local(dimension: usize) -> Self {
        Self {
            dimension,
            backend: EmbeddingBackend::Local,
        }
    }
}

/// Maps embedding model identifiers to their dimension and backend.
///
/// The dimension of a vector is a property of the model, so every embedding
/// model has to be registered here before it can be used.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    embeddings: HashMap<String, EmbeddingModelInfo>,
}

impl ModelCatalog {
    /// A catalog without any registered model.
    pub fn empty() -> Self {
        Self {
            embeddings: HashMap::new(),
        }
    }

    pub fn register(
        &mut self,
        model: impl Into<EmbeddingModel>,
        info: EmbeddingModelInfo,
    ) -> Result<(), Error> {
        let model = model.into();

        if model.is_empty() {
            return Err(Error::ConfigurationError(
                "Embedding model identifier is empty".into(),
            ));
        }

        if info.dimension == 0 {
            return Err(Error::ConfigurationError(format!(
                "Embedding model '{model}' must have a non-zero dimension"
            )));
        }

        self.embeddings.insert(model.0, info);
        Ok(())
    }

    pub fn lookup(&self, model: &EmbeddingModel) -> Result<EmbeddingModelInfo, Error> {
        self.embeddings
            .get(model.as_str())
            .copied()
            .ok_or_else(|| Error::ModelUnavailableError {
                model: model.to_string(),
                reason: "not registered in the model catalog".into(),
            })
    }

    pub fn contains(&self, model: &EmbeddingModel) -> bool {
        self.embeddings.contains_key(model.as_str())
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        let builtin = [
            ("text-embedding-ada-002", EmbeddingModelInfo::remote(1536)),
            ("text-embedding-3-small", EmbeddingModelInfo::remote(1536)),
            ("text-embedding-3-large", EmbeddingModelInfo::remote(3072)),
            ("mistral-embed", EmbeddingModelInfo::remote(1024)),
            ("embed-multilingual-v3.0", EmbeddingModelInfo::remote(1024)),
            (SENTENCE_EMBEDDING_MODEL, EmbeddingModelInfo::remote(384)),
            (FALLBACK_EMBEDDING_MODEL, EmbeddingModelInfo::local(384)),
        ];

        Self {
            embeddings: builtin
                .into_iter()
                .map(|(id, info)| (id.to_string(), info))
                .collect(),
        }
    }
}
