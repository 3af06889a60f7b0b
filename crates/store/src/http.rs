//! HTTP adapter for the remote tab service.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Url};
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

use concierge_core::{config::TabsConfig, Error, Result, Row, TabContents, TabSource};

const SERVICE: &str = "tabs";

/// Tab service reached over HTTP.
///
/// Routes: `GET /stores/{store}/tabs`, `GET /stores/{store}/tabs/{tab}` and
/// `POST /stores/{store}/tabs/{tab}/rows`.
pub struct HttpTabSource {
    client: Client,
    base_url: Url,
    api_key: Option<Secret<String>>,
}

impl HttpTabSource {
    pub fn new(base_url: &str, api_key: Option<Secret<String>>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Configuration(format!("Invalid tab service URL '{}': {}", base_url, e)))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    pub fn from_config(config: &TabsConfig) -> Result<Self> {
        Self::new(
            &config.base_url,
            config.api_key.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Configuration("Tab service URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key.expose_secret()),
            None => request,
        }
    }

    async fn execute(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::external(SERVICE, Some(status.as_u16()), body));
        }
        Ok(response)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.execute(request).await?;
        let status = response.status();
        response
            .json()
            .await
            .map_err(|e| Error::external(SERVICE, Some(status.as_u16()), format!("Invalid response body: {}", e)))
    }
}

fn transport_error(e: &reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(format!("{} request timed out", SERVICE))
    } else {
        Error::external(SERVICE, e.status().map(|s| s.as_u16()), e.to_string())
    }
}

#[async_trait]
impl TabSource for HttpTabSource {
    async fn list_tabs(&self, store_id: &str) -> Result<Vec<String>> {
        let url = self.url(&["stores", store_id, "tabs"])?;
        self.send(self.client.get(url)).await
    }

    async fn fetch_tab(&self, store_id: &str, tab: &str) -> Result<TabContents> {
        let url = self.url(&["stores", store_id, "tabs", tab])?;
        tracing::debug!(store_id = %store_id, tab = %tab, "Fetching tab");
        self.send(self.client.get(url)).await
    }

    async fn append_row(&self, store_id: &str, tab: &str, row: Row) -> Result<()> {
        let url = self.url(&["stores", store_id, "tabs", tab, "rows"])?;
        self.execute(self.client.post(url).json(&json!({ "row": row }))).await?;
        Ok(())
    }
}
