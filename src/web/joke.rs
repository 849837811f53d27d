//! Joke API client.

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

/// Single-joke payload. Only the `joke` field matters.
#[derive(Debug, Deserialize)]
struct JokeResponse {
    joke: Option<String>,
}

#[derive(Clone)]
pub struct JokeClient {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl JokeClient {
    pub fn new(http: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            url: url.into(),
            timeout,
        }
    }

    /// `Ok(None)` when the endpoint answered without a joke.
    pub async fn fetch(&self) -> Result<Option<String>, reqwest::Error> {
        let response: JokeResponse = self
            .http
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        debug!("Joke endpoint answered, joke present: {}", response.joke.is_some());
        Ok(response.joke.filter(|joke| !joke.trim().is_empty()))
    }
}
