use std::{env, time::Duration};

use crate::{
    client::Client, transport::ClientImpl, ChatModel, CompletionOptions, Credential,
    CredentialProvider, EmbeddingModel, EmbeddingModelInfo, Error, ModelCatalog, Stop,
    FALLBACK_EMBEDDING_MODEL,
};

pub const INFERENCE_API_KEY: &str = "INFERENCE_API_KEY";
pub const INFERENCE_API_BASE: &str = "INFERENCE_API_BASE";
pub const INFERENCE_CHAT_MODEL: &str = "INFERENCE_CHAT_MODEL";
pub const INFERENCE_EMBEDDING_BASE: &str = "INFERENCE_EMBEDDING_BASE";
pub const INFERENCE_EMBEDDING_MODEL: &str = "INFERENCE_EMBEDDING_MODEL";
pub const INFERENCE_TIMEOUT_SECS: &str = "INFERENCE_TIMEOUT_SECS";

pub const DEFAULT_API_BASE: &str = "https://api.mistral.ai/v1";
pub const DEFAULT_CHAT_MODEL: &str = "open-mistral-7b";
pub const DEFAULT_EMBEDDING_MODEL: &str = FALLBACK_EMBEDDING_MODEL;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Configures and builds a [`Client`].
///
/// Nothing is validated until [`build`](ClientBuilder::build), which never
/// touches the network.
#[derive(Debug)]
pub struct ClientBuilder {
    credential: Option<Result<Credential, Error>>,
    base_uri: String,
    embedding_base_uri: Option<String>,
    chat_model: ChatModel,
    embedding_model: EmbeddingModel,
    catalog: ModelCatalog,
    registrations: Vec<(EmbeddingModel, EmbeddingModelInfo)>,
    options: CompletionOptions,
    timeout: Duration,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            credential: None,
            base_uri: DEFAULT_API_BASE.to_string(),
            embedding_base_uri: None,
            chat_model: DEFAULT_CHAT_MODEL.into(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.into(),
            catalog: ModelCatalog::default(),
            registrations: Vec::new(),
            options: CompletionOptions::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the configuration from the process environment.
    ///
    /// See [`from_lookup`](ClientBuilder::from_lookup) for the variables.
    pub fn from_environment() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// | variable                    | default                   |
    /// |-----------------------------|---------------------------|
    /// | `INFERENCE_API_KEY`         | required                  |
    /// | `INFERENCE_API_BASE`        | [`DEFAULT_API_BASE`]      |
    /// | `INFERENCE_EMBEDDING_BASE`  | `INFERENCE_API_BASE`      |
    /// | `INFERENCE_CHAT_MODEL`      | [`DEFAULT_CHAT_MODEL`]    |
    /// | `INFERENCE_EMBEDDING_MODEL` | [`DEFAULT_EMBEDDING_MODEL`] |
    /// | `INFERENCE_TIMEOUT_SECS`    | 60                        |
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut builder = Self::new();

        builder.credential = Some(match get(INFERENCE_API_KEY) {
            Some(token) => Credential::new(token),
            None => Err(Error::ConfigurationError(format!(
                "{INFERENCE_API_KEY} is not set"
            ))),
        });

        if let Some(base_uri) = get(INFERENCE_API_BASE) {
            builder = builder.base_uri(base_uri);
        }

        if let Some(base_uri) = get(INFERENCE_EMBEDDING_BASE) {
            builder = builder.embedding_base_uri(base_uri);
        }

        if let Some(model) = get(INFERENCE_CHAT_MODEL) {
            builder = builder.chat_model(model);
        }

        if let Some(model) = get(INFERENCE_EMBEDDING_MODEL) {
            builder = builder.embedding_model(model);
        }

        if let Some(secs) = get(INFERENCE_TIMEOUT_SECS) {
            let secs = secs.trim().parse::<u64>().map_err(|e| {
                Error::ConfigurationError(format!("{INFERENCE_TIMEOUT_SECS}: {e}"))
            })?;
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(builder)
    }

    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = Some(Ok(credential));
        self
    }

    /// Same as [`credential`](ClientBuilder::credential), validated on build.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.credential = Some(Credential::new(token));
        self
    }

    pub fn credential_provider(mut self, provider: &dyn CredentialProvider) -> Self {
        self.credential = Some(provider.credential());
        self
    }

    pub fn base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = base_uri.into();
        self
    }

    /// Sends remote embedding requests to `base_uri` instead of the chat
    /// backend, e.g. a text-embeddings-inference server hosting
    /// [`SENTENCE_EMBEDDING_MODEL`](crate::SENTENCE_EMBEDDING_MODEL).
    pub fn embedding_base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.embedding_base_uri = Some(base_uri.into());
        self
    }

    pub fn chat_model(mut self, model: impl Into<ChatModel>) -> Self {
        self.chat_model = model.into();
        self
    }

    pub fn embedding_model(mut self, model: impl Into<EmbeddingModel>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Replaces the built-in [`ModelCatalog`].
    pub fn catalog(mut self, catalog: ModelCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Registers one more embedding model on top of the catalog.
    pub fn register_embedding_model(
        mut self,
        model: impl Into<EmbeddingModel>,
        info: EmbeddingModelInfo,
    ) -> Self {
        self.registrations.push((model.into(), info));
        self
    }

    pub fn options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.options.max_tokens = Some(max_tokens);
        self
    }

    pub fn stop(mut self, stop: Stop) -> Self {
        self.options.stop = Some(stop);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Client, Error> {
        let credential = self
            .credential
            .unwrap_or_else(|| Err(Error::ConfigurationError("Missing api token".into())))?;

        let base_uri = normalize_base_uri(&self.base_uri)?;
        let embedding_base_uri = match &self.embedding_base_uri {
            Some(uri) => normalize_base_uri(uri)?,
            None => base_uri.clone(),
        };

        if self.chat_model.is_empty() {
            return Err(Error::ConfigurationError(
                "Chat model identifier is empty".into(),
            ));
        }

        if self.timeout.is_zero() {
            return Err(Error::ConfigurationError(
                "The request timeout must be greater than zero".into(),
            ));
        }

        let mut catalog = self.catalog;
        for (model, info) in self.registrations {
            catalog.register(model, info)?;
        }

        if !catalog.contains(&self.embedding_model) {
            return Err(Error::ConfigurationError(format!(
                "Embedding model '{}' is not registered in the model catalog",
                self.embedding_model
            )));
        }

        let inner = ClientImpl::new(credential, self.timeout)?;

        Ok(Client::from_parts(
            inner,
            base_uri,
            embedding_base_uri,
            self.chat_model,
            self.embedding_model,
            catalog,
            self.options,
        ))
    }
}

fn normalize_base_uri(uri: &str) -> Result<String, Error> {
    let uri = uri.trim().trim_end_matches('/');
    if uri.is_empty() {
        return Err(Error::ConfigurationError("No base URI given".into()));
    }

    Ok(uri.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_credential_fails_before_any_call() {
        let result = ClientBuilder::new()
            .token("")
            .chat_model("chat-model-x")
            .build();

        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn absent_credential_fails() {
        let result = ClientBuilder::new().chat_model("chat-model-x").build();
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn empty_identifiers_fail() {
        let result = ClientBuilder::new().token("t").chat_model("").build();
        assert!(matches!(result, Err(Error::ConfigurationError(_))));

        let result = ClientBuilder::new().token("t").base_uri(" / ").build();
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn unregistered_default_embedding_model_fails() {
        let result = ClientBuilder::new()
            .token("t")
            .embedding_model("embed-model-y")
            .build();
        assert!(matches!(result, Err(Error::ConfigurationError(_))));

        let client = ClientBuilder::new()
            .token("t")
            .embedding_model("embed-model-y")
            .register_embedding_model("embed-model-y", EmbeddingModelInfo::local(384))
            .build()
            .unwrap();
        assert_eq!(client.embedding_model().as_str(), "embed-model-y");
    }

    #[test]
    fn environment_defaults() {
        let client = ClientBuilder::from_lookup(lookup(&[(INFERENCE_API_KEY, "valid-token")]))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(client.chat_model().as_str(), DEFAULT_CHAT_MODEL);
        assert_eq!(client.embedding_model().as_str(), DEFAULT_EMBEDDING_MODEL);
        assert_eq!(client.base_uri(), DEFAULT_API_BASE);
        assert_eq!(client.embedding_base_uri(), DEFAULT_API_BASE);
    }

    #[test]
    fn environment_overrides() {
        let client = ClientBuilder::from_lookup(lookup(&[
            (INFERENCE_API_KEY, "valid-token"),
            (INFERENCE_API_BASE, "https://api.groq.com/openai/v1/"),
            (INFERENCE_EMBEDDING_BASE, "http://127.0.0.1:8080/v1/"),
            (INFERENCE_CHAT_MODEL, "llama3-8b-8192"),
            (INFERENCE_EMBEDDING_MODEL, "all-MiniLM-L6-v2"),
            (INFERENCE_TIMEOUT_SECS, "5"),
        ]))
        .unwrap()
        .build()
        .unwrap();

        assert_eq!(client.base_uri(), "https://api.groq.com/openai/v1");
        assert_eq!(client.chat_model().as_str(), "llama3-8b-8192");
        assert_eq!(client.embedding_base_uri(), "http://127.0.0.1:8080/v1");
        assert_eq!(client.embedding_model().as_str(), "all-MiniLM-L6-v2");
    }

    #[test]
    fn environment_without_key() {
        let result = ClientBuilder::from_lookup(lookup(&[(INFERENCE_API_KEY, "  ")]))
            .unwrap()
            .build();

        match result {
            Err(Error::ConfigurationError(message)) => {
                assert!(message.contains(INFERENCE_API_KEY))
            }
            other => panic!("unexpected result: {:?}", other.err()),
        }
    }

    #[test]
    fn malformed_timeout() {
        let result = ClientBuilder::from_lookup(lookup(&[
            (INFERENCE_API_KEY, "valid-token"),
            (INFERENCE_TIMEOUT_SECS, "soon"),
        ]));

        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let result = ClientBuilder::new()
            .token("valid-token")
            .timeout(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(Error::ConfigurationError(_))));

        let result = ClientBuilder::from_lookup(lookup(&[
            (INFERENCE_API_KEY, "valid-token"),
            (INFERENCE_TIMEOUT_SECS, "0"),
        ]))
        .unwrap()
        .build();
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn credential_provider_is_consulted() {
        let credential = Credential::new("valid-token").unwrap();
        let client = ClientBuilder::new()
            .credential_provider(&credential)
            .build();

        assert!(client.is_ok());
    }
}
