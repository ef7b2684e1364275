use std::time::Duration;

use crate::{Credential, Error};

fn rejected(credential: &Credential, status: u16, model: &str, body: &str) -> Error {
    tracing::warn!(status, model, "inference backend rejected the request");

    Error::from_status(status, model, body, credential)
}

#[cfg(feature = "ureq")]
pub(crate) struct ClientImpl {
    agent: ureq::Agent,
    credential: Credential,
}

#[cfg(feature = "ureq")]
impl ClientImpl {
    pub(crate) fn new(credential: Credential, timeout: Duration) -> Result<ClientImpl, Error> {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();

        Ok(Self { agent, credential })
    }

    pub(crate) fn do_request(&self, url: &str, model: &str, body: String) -> Result<String, Error> {
        let result = self
            .agent
            .post(url)
            .set("Content-Type", "application/json")
            .set(
                "Authorization",
                &format!("Bearer {}", self.credential.expose()),
            )
            .send_string(&body);

        match result {
            Ok(response) => response
                .into_string()
                .map_err(|e| Error::TransportError(e.to_string())),
            Err(ureq::Error::Status(status, response)) => {
                let text = response.into_string().map_err(|e| {
                    Error::TransportError(format!("HTTP {status}: failed to read the body: {e}"))
                })?;
                Err(rejected(&self.credential, status, model, &text))
            }
            Err(ureq::Error::Transport(transport)) => {
                Err(Error::TransportError(transport.to_string()))
            }
        }
    }
}

#[cfg(feature = "reqwest")]
pub(crate) struct ClientImpl {
    client: reqwest::Client,
    credential: Credential,
}

#[cfg(feature = "reqwest")]
impl ClientImpl {
    pub(crate) fn new(credential: Credential, timeout: Duration) -> Result<ClientImpl, Error> {
        let mut headers = reqwest::header::HeaderMap::new();

        let mut value =
            reqwest::header::HeaderValue::from_str(&format!("Bearer {}", credential.expose()))
                .map_err(|_| {
                    Error::ConfigurationError(
                        "The api token is not a valid header value".into(),
                    )
                })?;
        value.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, value);

        let client = reqwest::ClientBuilder::new()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::ConfigurationError(e.to_string()))?;

        Ok(Self { client, credential })
    }

    pub(crate) async fn do_request(
        &self,
        url: &str,
        model: &str,
        body: String,
    ) -> Result<String, Error> {
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::TransportError(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::TransportError(e.to_string()))?;

        if !status.is_success() {
            return Err(rejected(&self.credential, status.as_u16(), model, &text));
        }

        Ok(text)
    }
}
