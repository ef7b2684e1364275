use serde::ser::SerializeSeq;

use crate::{ChatModel, Error};

/// Message role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stop {
    String(String),
    Array(Vec<String>),
}

impl serde::Serialize for Stop {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Stop::String(string) => serializer.serialize_str(string),
            Stop::Array(strings) => {
                let mut array = serializer.serialize_seq(Some(strings.len()))?;

                for string in strings {
                    array.serialize_element(string)?;
                }

                array.end()
            }
        }
    }
}

/// Sampling settings applied to every [`Client::complete`](crate::Client::complete) call.
///
/// Unset options are not sent at all: some OpenAI-compatible servers reject
/// options they don't know, even when they are `null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<usize>,
    pub seed: Option<u32>,
    pub stop: Option<Stop>,
    pub user: Option<String>,
}

/// Chat completions request.
///
/// For reference, see: https://platform.openai.com/docs/api-reference/chat
///
/// ```rust
/// let request = inference_client::ChatCompletions::new(
///     "open-mistral-7b",
///     vec![inference_client::Message::user("Who are you?")],
/// );
/// assert!(!request.stream);
/// ```
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChatCompletions {
    pub messages: Vec<Message>,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Stop>,
    /// Must be 'false': Only non-streaming is supported.
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl ChatCompletions {
    pub fn new(model: impl Into<ChatModel>, messages: Vec<Message>) -> Self {
        Self {
            messages,
            model: model.into().to_string(),
            temperature: None,
            top_p: None,
            max_tokens: None,
            seed: None,
            stop: None,
            stream: false,
            user: None,
        }
    }

    pub fn with_options(mut self, options: &CompletionOptions) -> Self {
        self.temperature = options.temperature;
        self.top_p = options.top_p;
        self.max_tokens = options.max_tokens;
        self.seed = options.seed;
        self.stop = options.stop.clone();
        self.user = options.user.clone();
        self
    }
}

/// The message of a [`Choice`].
///
/// Backends may answer with roles outside [`Role`] (`tool`) and with `null`
/// content when a choice only carries tool calls.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: usize,
    pub message: ResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: Option<u32>,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct ChatCompletionsResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ChatCompletionsResponse {
    /// Returns the first choice, if any.
    pub fn first(&self) -> Option<&Choice> {
        self.choices.first()
    }

    /// Consumes the response and returns the content of the first choice.
    ///
    /// Fails with [`Error::EmptyResponseError`] if there are no choices or the
    /// first one has no content.
    pub fn into_first_content(self) -> Result<String, Error> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(Error::EmptyResponseError)
    }
}
