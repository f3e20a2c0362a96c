use std::time::Duration;

use anyhow::Context;
use log::trace;
use reqwest::Client;
use serde_json::Value;
use tokio::runtime::Runtime;

/// Browser like agent, some search pages refuse obvious bots
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Blocking facade over the async client, one request in flight at a time
pub struct HttpClient {
    rt: Runtime,
    client: Client,
}

impl HttpClient {
    pub fn new() -> anyhow::Result<Self> {
        let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { rt, client })
    }

    pub fn get(&self, url: &str, user_agent: &str, timeout: Duration) -> anyhow::Result<HttpResponse> {
        trace!("GET {url}");
        self.rt
            .block_on(self.do_get(url, user_agent, timeout))
            .with_context(|| format!("GET {url} failed"))
    }

    pub fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &Value,
        timeout: Duration,
    ) -> anyhow::Result<HttpResponse> {
        trace!("POST {url}");
        self.rt
            .block_on(self.do_post_json(url, headers, body, timeout))
            .with_context(|| format!("POST {url} failed"))
    }

    async fn do_get(
        &self,
        url: &str,
        user_agent: &str,
        timeout: Duration,
    ) -> anyhow::Result<HttpResponse> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, user_agent)
            .timeout(timeout)
            .send()
            .await
            .context("Request not sent")?;
        let status = response.status().as_u16();
        let body = response.text().await.context("Failed to read body")?;
        Ok(HttpResponse { status, body })
    }

    async fn do_post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &Value,
        timeout: Duration,
    ) -> anyhow::Result<HttpResponse> {
        let mut request = self.client.post(url).json(body).timeout(timeout);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let response = request.send().await.context("Request not sent")?;
        let status = response.status().as_u16();
        let body = response.text().await.context("Failed to read body")?;
        Ok(HttpResponse { status, body })
    }
}
