use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::{
    transport::ClientImpl, ChatCompletions, ChatCompletionsResponse, ChatModel, ClientBuilder,
    CompletionOptions, EmbeddingBackend, EmbeddingModel, EmbeddingVector, Embeddings,
    EmbeddingsResponse, Error, LocalEncoder, Message, ModelCatalog,
};

/// Client for one chat completion and embedding backend.
///
/// A `Client` is `Send + Sync` and meant to be shared. Local encoders are
/// loaded on first use and cached per model identifier for the lifetime of
/// the client; nothing else is kept between calls.
pub struct Client {
    inner: ClientImpl,
    base_uri: String,
    embedding_base_uri: String,
    chat_model: ChatModel,
    embedding_model: EmbeddingModel,
    catalog: ModelCatalog,
    options: CompletionOptions,
    encoders: Mutex<HashMap<EmbeddingModel, Arc<LocalEncoder>>>,
}

impl Client {
    /// Creates a new `Client` with the default base URI and embedding model.
    ///
    /// Fails with [`Error::ConfigurationError`] if `token` is empty. No request
    /// is sent.
    pub fn new(token: impl Into<String>, chat_model: impl Into<ChatModel>) -> Result<Client, Error> {
        ClientBuilder::new()
            .token(token)
            .chat_model(chat_model)
            .build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a new `Client` from the `INFERENCE_*` environment variables.
    pub fn from_environment() -> Result<Client, Error> {
        ClientBuilder::from_environment()?.build()
    }

    pub(crate) fn from_parts(
        inner: ClientImpl,
        base_uri: String,
        embedding_base_uri: String,
        chat_model: ChatModel,
        embedding_model: EmbeddingModel,
        catalog: ModelCatalog,
        options: CompletionOptions,
    ) -> Self {
        Self {
            inner,
            base_uri,
            embedding_base_uri,
            chat_model,
            embedding_model,
            catalog,
            options,
            encoders: Mutex::new(HashMap::new()),
        }
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    pub fn embedding_base_uri(&self) -> &str {
        &self.embedding_base_uri
    }

    pub fn chat_model(&self) -> &ChatModel {
        &self.chat_model
    }

    pub fn embedding_model(&self) -> &EmbeddingModel {
        &self.embedding_model
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// Sends a chat completion request as-is and returns the whole response.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use inference_client::{ChatCompletions, Client, Message};
    ///
    /// # async fn run() -> Result<(), inference_client::Error> {
    /// let client = Client::new("my-token", "open-mistral-7b")?;
    /// let request = ChatCompletions::new("open-mistral-7b", vec![Message::user("Hello!")]);
    ///
    /// let response = client.chat_completions(&request).await?;
    /// for choice in &response.choices {
    ///     println!("{}: {:?}", choice.index, choice.message.content);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    #[cfg(feature = "reqwest")]
    pub async fn chat_completions(
        &self,
        request: &ChatCompletions,
    ) -> Result<ChatCompletionsResponse, Error> {
        let (url, body) = self.prepare_chat(request)?;
        let response = self.inner.do_request(&url, &request.model, body).await?;

        finish_chat(&response)
    }

    /// Sends a chat completion request as-is and returns the whole response.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use inference_client::{ChatCompletions, Client, Message};
    ///
    /// let client = Client::new("my-token", "open-mistral-7b").unwrap();
    /// let request = ChatCompletions::new("open-mistral-7b", vec![Message::user("Hello!")]);
    ///
    /// let response = client.chat_completions(&request).unwrap();
    /// for choice in &response.choices {
    ///     println!("{}: {:?}", choice.index, choice.message.content);
    /// }
    /// ```
    #[cfg(feature = "ureq")]
    pub fn chat_completions(
        &self,
        request: &ChatCompletions,
    ) -> Result<ChatCompletionsResponse, Error> {
        let (url, body) = self.prepare_chat(request)?;
        let response = self.inner.do_request(&url, &request.model, body)?;

        finish_chat(&response)
    }

    /// Sends `conversation` to the default chat model and returns the content
    /// of the first choice.
    ///
    /// Fails with [`Error::InvalidRequestError`] if the conversation is empty
    /// and with [`Error::EmptyResponseError`] if the backend returns no choice.
    #[cfg(feature = "reqwest")]
    pub async fn complete(&self, conversation: &[Message]) -> Result<String, Error> {
        self.complete_with_model(conversation, &self.chat_model)
            .await
    }

    /// Sends `conversation` to the default chat model and returns the content
    /// of the first choice.
    ///
    /// Fails with [`Error::InvalidRequestError`] if the conversation is empty
    /// and with [`Error::EmptyResponseError`] if the backend returns no choice.
    #[cfg(feature = "ureq")]
    pub fn complete(&self, conversation: &[Message]) -> Result<String, Error> {
        self.complete_with_model(conversation, &self.chat_model)
    }

    /// Like [`complete`](Client::complete), using `model` instead of the default.
    #[cfg(feature = "reqwest")]
    pub async fn complete_with_model(
        &self,
        conversation: &[Message],
        model: &ChatModel,
    ) -> Result<String, Error> {
        let request = self.completion_request(conversation, model)?;
        self.chat_completions(&request).await?.into_first_content()
    }

    /// Like [`complete`](Client::complete), using `model` instead of the default.
    #[cfg(feature = "ureq")]
    pub fn complete_with_model(
        &self,
        conversation: &[Message],
        model: &ChatModel,
    ) -> Result<String, Error> {
        let request = self.completion_request(conversation, model)?;
        self.chat_completions(&request)?.into_first_content()
    }

    /// Encodes `text` with the default embedding model.
    ///
    /// The empty string is valid input and yields the zero vector. The length
    /// of the result is always the dimension registered for the model.
    #[cfg(feature = "reqwest")]
    pub async fn embed(&self, text: &str) -> Result<EmbeddingVector, Error> {
        self.embed_with_model(text, &self.embedding_model).await
    }

    /// Encodes `text` with the default embedding model.
    ///
    /// The empty string is valid input and yields the zero vector. The length
    /// of the result is always the dimension registered for the model.
    #[cfg(feature = "ureq")]
    pub fn embed(&self, text: &str) -> Result<EmbeddingVector, Error> {
        self.embed_with_model(text, &self.embedding_model)
    }

    /// Like [`embed`](Client::embed), using `model` instead of the default.
    #[cfg(feature = "reqwest")]
    pub async fn embed_with_model(
        &self,
        text: &str,
        model: &EmbeddingModel,
    ) -> Result<EmbeddingVector, Error> {
        let info = self.catalog.lookup(model)?;

        match info.backend {
            EmbeddingBackend::Local => self.encoder(model, info.dimension)?.encode(text),
            EmbeddingBackend::Remote if text.is_empty() => Ok(EmbeddingVector::zeros(info.dimension)),
            EmbeddingBackend::Remote => self
                .embeddings(&Embeddings::new(model.clone(), text))
                .await?
                .into_vector(info.dimension),
        }
    }

    /// Like [`embed`](Client::embed), using `model` instead of the default.
    #[cfg(feature = "ureq")]
    pub fn embed_with_model(
        &self,
        text: &str,
        model: &EmbeddingModel,
    ) -> Result<EmbeddingVector, Error> {
        let info = self.catalog.lookup(model)?;

        match info.backend {
            EmbeddingBackend::Local => self.encoder(model, info.dimension)?.encode(text),
            EmbeddingBackend::Remote if text.is_empty() => Ok(EmbeddingVector::zeros(info.dimension)),
            EmbeddingBackend::Remote => self
                .embeddings(&Embeddings::new(model.clone(), text))?
                .into_vector(info.dimension),
        }
    }

    /// Sends an embeddings request to the backend.
    #[cfg(feature = "reqwest")]
    pub async fn embeddings(&self, request: &Embeddings) -> Result<EmbeddingsResponse, Error> {
        let url = format!("{}/embeddings", self.embedding_base_uri);
        let body = serde_json::to_string(request).map_err(Error::SerializationError)?;

        tracing::debug!(model = %request.model, %url, "sending embeddings request");
        let response = self.inner.do_request(&url, &request.model, body).await?;

        serde_json::from_str(&response).map_err(Error::DeserializationError)
    }

    /// Sends an embeddings request to the backend.
    #[cfg(feature = "ureq")]
    pub fn embeddings(&self, request: &Embeddings) -> Result<EmbeddingsResponse, Error> {
        let url = format!("{}/embeddings", self.embedding_base_uri);
        let body = serde_json::to_string(request).map_err(Error::SerializationError)?;

        tracing::debug!(model = %request.model, %url, "sending embeddings request");
        let response = self.inner.do_request(&url, &request.model, body)?;

        serde_json::from_str(&response).map_err(Error::DeserializationError)
    }

    fn completion_request(
        &self,
        conversation: &[Message],
        model: &ChatModel,
    ) -> Result<ChatCompletions, Error> {
        if conversation.is_empty() {
            return Err(Error::InvalidRequestError(
                "A conversation needs at least one message".into(),
            ));
        }

        Ok(ChatCompletions::new(model.clone(), conversation.to_vec()).with_options(&self.options))
    }

    fn prepare_chat(&self, request: &ChatCompletions) -> Result<(String, String), Error> {
        let url = format!("{}/chat/completions", self.base_uri);
        let body = serde_json::to_string(request).map_err(Error::SerializationError)?;

        tracing::debug!(
            model = %request.model,
            %url,
            messages = request.messages.len(),
            "sending chat completion request"
        );

        Ok((url, body))
    }

    /// Returns the encoder for `model`, loading it on first use.
    ///
    /// The lock is held while loading so each model is loaded at most once.
    fn encoder(&self, model: &EmbeddingModel, dimension: usize) -> Result<Arc<LocalEncoder>, Error> {
        let mut encoders = self
            .encoders
            .lock()
            .map_err(|_| Error::EncodingError("encoder cache lock poisoned".into()))?;

        if let Some(encoder) = encoders.get(model) {
            return Ok(Arc::clone(encoder));
        }

        let encoder = Arc::new(LocalEncoder::load(model, dimension)?);
        tracing::debug!(%model, dimension, "loaded local embedding model");
        encoders.insert(model.clone(), Arc::clone(&encoder));

        Ok(encoder)
    }

    #[cfg(test)]
    pub(crate) fn loaded_encoders(&self) -> usize {
        self.encoders.lock().map(|e| e.len()).unwrap_or_default()
    }
}

fn finish_chat(response: &str) -> Result<ChatCompletionsResponse, Error> {
    let response: ChatCompletionsResponse =
        serde_json::from_str(response).map_err(Error::DeserializationError)?;

    tracing::debug!(
        id = response.id.as_deref().unwrap_or_default(),
        choices = response.choices.len(),
        finish_reason = response
            .first()
            .and_then(|c| c.finish_reason.as_deref())
            .unwrap_or_default(),
        total_tokens = response.usage.map(|u| u.total_tokens).unwrap_or_default(),
        "received chat completion"
    );

    Ok(response)
}
