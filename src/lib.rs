//! A small client for hosted chat completion and text embedding backends.
//!
//! The [`Client`] wraps one OpenAI-compatible endpoint (Mistral, Groq, OpenAI
//! and friends) behind two narrow operations:
//!
//! * [`Client::complete`] sends a conversation and returns the text of the
//!   first choice.
//! * [`Client::embed`] turns one text into a fixed-dimension vector, either
//!   remotely or with an in-process encoder, depending on how the model is
//!   registered in the [`ModelCatalog`].
//!
//! With the `reqwest` feature (the default) both operations are `async`. With
//! the `ureq` feature they block instead.
//!
//! ```rust,no_run
//! # #[cfg(feature = "reqwest")]
//! # async fn run() -> Result<(), inference_client::Error> {
//! use inference_client::{Client, Message};
//!
//! let client = Client::new("my-token", "open-mistral-7b")?;
//! let reply = client.complete(&[Message::user("Do you speak Chinese?")]).await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

#[cfg(all(feature = "reqwest", feature = "ureq"))]
compile_error!("Features 'reqwest' and 'ureq' are mutually exclusive.");

#[cfg(not(any(feature = "reqwest", feature = "ureq")))]
compile_error!("One of the features 'reqwest' and 'ureq' must be enabled.");

mod chat;
mod client;
mod config;
mod credential;
mod embedding;
mod error;
mod model;
mod transport;

pub use chat::{
    ChatCompletions, ChatCompletionsResponse, Choice, CompletionOptions, Message,
    ResponseMessage, Role, Stop, Usage,
};
pub use client::Client;
pub use config::{
    ClientBuilder, DEFAULT_API_BASE, DEFAULT_CHAT_MODEL, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_TIMEOUT, INFERENCE_API_BASE, INFERENCE_API_KEY, INFERENCE_CHAT_MODEL,
    INFERENCE_EMBEDDING_BASE, INFERENCE_EMBEDDING_MODEL, INFERENCE_TIMEOUT_SECS,
};
pub use credential::{Credential, CredentialProvider, EnvCredential};
pub use embedding::{
    EmbeddingData, EmbeddingVector, Embeddings, EmbeddingsResponse, LocalEncoder,
};
pub use error::Error;
pub use model::{
    ChatModel, EmbeddingBackend, EmbeddingModel, EmbeddingModelInfo, ModelCatalog,
    FALLBACK_EMBEDDING_MODEL, SENTENCE_EMBEDDING_MODEL,
};
