use reqwest::blocking::{Client, Response};
use std::time::Duration;
use crate::error::{Result, SnapshotError};

pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SnapshotError::Config(format!("could not build http client: {e}")))?;

        Ok(Self { client })
    }

    // Whole body as text. Non-2xx statuses are errors.
    pub fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self.get(url)?;
        let body = response.text().map_err(|source| fetch_error(url, source))?;
        tracing::info!(url, bytes = body.len(), "fetched");
        Ok(body)
    }

    // The response is a `Read`, so the caller decides how much of the body to pull.
    pub fn open_stream(&self, url: &str) -> Result<Response> {
        self.get(url)
    }

    fn get(&self, url: &str) -> Result<Response> {
        tracing::debug!(url, "GET");
        self.client
            .get(url)
            .send()
            .and_then(Response::error_for_status)
            .map_err(|source| fetch_error(url, source))
    }
}

fn fetch_error(url: &str, source: reqwest::Error) -> SnapshotError {
    SnapshotError::Fetch { url: url.to_string(), source }
}
