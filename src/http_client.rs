use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;

static CLIENT: OnceCell<Client> = OnceCell::new();

/// Shared connection pool. The timeout of the first caller wins.
pub fn http_client(timeout: Duration) -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")
    })
}

/// Capability to talk to the dashboard backend. Fetch code only ever sees this
/// trait, so it never reaches for ambient credentials.
pub trait Transport: Send + Sync {
    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<String>;
    fn post(&self, path: &str, query: &[(&str, String)]) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = http_client(timeout)?.clone();
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn send(&self, req: reqwest::blocking::RequestBuilder) -> Result<String> {
        let mut req = req.header(USER_AGENT, "lotto_terminal");
        if let Some(token) = self.token.as_deref() {
            req = req.bearer_auth(token);
        }
        let resp = req.send().context("request failed")?;
        let status = resp.status();
        let body = resp.text().context("failed reading body")?;
        if !status.is_success() {
            return Err(anyhow::anyhow!("http {}: {}", status, body));
        }
        Ok(body)
    }
}

impl Transport for ApiClient {
    fn get(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        self.send(self.client.get(self.url(path)).query(query))
    }

    fn post(&self, path: &str, query: &[(&str, String)]) -> Result<String> {
        self.send(
            self.client
                .post(self.url(path))
                .query(query)
                .json(&serde_json::json!({})),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slashes() {
        let client = ApiClient::new("http://localhost:8000/api/v1/", None, Duration::from_secs(1))
            .expect("client should build");
        assert_eq!(
            client.url("/crawler/history"),
            "http://localhost:8000/api/v1/crawler/history"
        );
    }
}
