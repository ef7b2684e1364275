use serde_json::Value;

use crate::Credential;

const MAX_DETAIL_LEN: usize = 300;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("The configuration contains errors: {0}")]
    ConfigurationError(String),

    #[error("The credential was rejected: {0}")]
    AuthenticationError(String),

    #[error("Model '{model}' is unavailable: {reason}")]
    ModelUnavailableError { model: String, reason: String },

    #[error("Network error: {0}")]
    TransportError(String),

    #[error("The backend returned an empty response")]
    EmptyResponseError,

    #[error("Failed to compute embedding: {0}")]
    EncodingError(String),

    #[error("Invalid request: {0}")]
    InvalidRequestError(String),

    #[error("Failed to serialize request: {0}")]
    SerializationError(serde_json::Error),

    #[error("Failed to deserialize response: {0}")]
    DeserializationError(serde_json::Error),
}

impl Error {
    /// Maps a non-success HTTP status and its body onto the error taxonomy.
    ///
    /// The credential is scrubbed from the raw body and again from the decoded
    /// message, which may have carried it JSON-escaped.
    pub(crate) fn from_status(status: u16, model: &str, body: &str, credential: &Credential) -> Self {
        let mut failure = ApiFailure::parse(&credential.redact(body));
        failure.detail = credential.redact(&failure.detail);

        match status {
            401 | 403 => Error::AuthenticationError(format!("HTTP {status}: {}", failure.detail)),
            404 | 400 | 422 if failure.names_model() => Error::ModelUnavailableError {
                model: model.to_string(),
                reason: failure.detail,
            },
            _ => Error::TransportError(format!("HTTP {status}: {}", failure.detail)),
        }
    }
}

/// The interesting bits of an error body.
///
/// Backends disagree on the shape: OpenAI nests everything under `error`,
/// Mistral puts `message`/`type`/`code` at the top level and FastAPI-style
/// servers answer with `detail`.
#[derive(Debug, PartialEq)]
struct ApiFailure {
    detail: String,
    code: Option<String>,
}

impl ApiFailure {
    fn parse(body: &str) -> Self {
        let Ok(value) = serde_json::from_str::<Value>(body) else {
            return Self {
                detail: truncate(body.trim()),
                code: None,
            };
        };

        let scope = match value.get("error") {
            Some(nested @ Value::Object(_)) => nested,
            _ => &value,
        };

        let detail = ["message", "detail"]
            .iter()
            .find_map(|key| scope.get(*key).or_else(|| value.get(*key)))
            .or_else(|| value.get("error"))
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| body.trim().to_string());

        let code = ["code", "type"]
            .iter()
            .filter_map(|key| scope.get(*key))
            .filter_map(Value::as_str)
            .map(str::to_string)
            .reduce(|a, b| format!("{a} {b}"));

        Self {
            detail: truncate(&detail),
            code,
        }
    }

    fn names_model(&self) -> bool {
        let code = self.code.as_deref().unwrap_or_default();
        let detail = self.detail.to_lowercase();

        code.contains("model_not_found")
            || code.contains("invalid_model")
            || detail.contains("invalid model")
            || (detail.contains("model") && detail.contains("not exist"))
            || (detail.contains("model") && detail.contains("not found"))
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_DETAIL_LEN {
        return text.to_string();
    }

    let mut short: String = text.chars().take(MAX_DETAIL_LEN).collect();
    short.push('…');
    short
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn credential() -> Credential {
        Credential::new("sk-ab/cd").unwrap()
    }

    #[test]
    fn openai_shaped_body() {
        let body = r#"{"error":{"message":"The model `gpt-9` does not exist","type":"invalid_request_error","code":"model_not_found"}}"#;
        let failure = ApiFailure::parse(body);

        assert_eq!(failure.detail, "The model `gpt-9` does not exist");
        assert!(failure.names_model());
    }

    #[test]
    fn mistral_shaped_body() {
        let body = r#"{"object":"error","message":"Invalid model: open-mistral-99","type":"invalid_model","param":null,"code":"1500"}"#;
        let err = Error::from_status(400, "open-mistral-99", body, &credential());

        match err {
            Error::ModelUnavailableError { model, reason } => {
                assert_eq!(model, "open-mistral-99");
                assert_eq!(reason, "Invalid model: open-mistral-99");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn detail_shaped_body() {
        let failure = ApiFailure::parse(r#"{"detail":"Unauthorized"}"#);
        assert_eq!(failure.detail, "Unauthorized");
        assert_eq!(failure.code, None);
    }

    #[test]
    fn plain_text_body() {
        let failure = ApiFailure::parse("  upstream connect error  ");
        assert_eq!(failure.detail, "upstream connect error");
    }

    #[test]
    fn long_bodies_are_truncated() {
        let failure = ApiFailure::parse(&"x".repeat(1000));
        assert_eq!(failure.detail.chars().count(), MAX_DETAIL_LEN + 1);
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(
            Error::from_status(401, "m", "{}", &credential()),
            Error::AuthenticationError(_)
        ));
        assert!(matches!(
            Error::from_status(403, "m", "{}", &credential()),
            Error::AuthenticationError(_)
        ));
        assert!(matches!(
            Error::from_status(404, "m", "{}", &credential()),
            Error::TransportError(_)
        ));
        assert!(matches!(
            Error::from_status(404, "m", r#"{"error":{"message":"The model `m` does not exist"}}"#, &credential()),
            Error::ModelUnavailableError { .. }
        ));
        assert!(matches!(
            Error::from_status(400, "m", r#"{"message":"bad temperature"}"#, &credential()),
            Error::TransportError(_)
        ));
        assert!(matches!(
            Error::from_status(503, "m", "overloaded", &credential()),
            Error::TransportError(_)
        ));
    }

    #[test]
    fn wrong_path_is_not_a_missing_model() {
        let err = Error::from_status(404, "m", r#"{"detail":"Not Found"}"#, &credential());
        assert!(matches!(err, Error::TransportError(_)));
    }

    #[test]
    fn escaped_credential_is_scrubbed_after_decoding() {
        for body in [
            r#"{"error":{"message":"Incorrect API key provided: sk-ab\/cd"}}"#,
            r#"{"error":{"message":"Incorrect API key provided: \u0073k-ab/cd"}}"#,
        ] {
            let message = Error::from_status(401, "m", body, &credential()).to_string();

            assert!(!message.contains("sk-ab/cd"), "{message}");
            assert!(message.contains("[REDACTED]"), "{message}");
        }
    }
}
