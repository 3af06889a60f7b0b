//! HTTP adapter for the external scheduling service.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::{Client, RequestBuilder, Url};
use secrecy::{ExposeSecret, Secret};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use concierge_core::{
    config::CalendarConfig, CalendarEvent, CalendarService, Error, NewCalendarEvent, Result,
};

const SERVICE: &str = "calendar";
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Calendar reached over HTTP.
///
/// Routes: `GET /calendars/{id}/events?from&to`, `POST /calendars/{id}/events`
/// and `POST /calendars/{id}/share`.
pub struct HttpCalendarService {
    client: Client,
    base_url: Url,
    api_key: Option<Secret<String>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EventList {
    Bare(Vec<CalendarEvent>),
    Wrapped { events: Vec<CalendarEvent> },
}

impl HttpCalendarService {
    pub fn new(base_url: &str, api_key: Option<Secret<String>>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Configuration(format!("Invalid calendar URL '{}': {}", base_url, e)))?;
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

    pub fn from_config(config: &CalendarConfig) -> Result<Self> {
        Self::new(
            &config.base_url,
            config.api_key.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn url(&self, calendar_id: &str, tail: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Configuration("Calendar URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(["calendars", calendar_id, tail]);
        Ok(url)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        let request = match &self.api_key {
            Some(key) => request.bearer_auth(key.expose_secret()),
            None => request,
        };
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(format!("{} request timed out", SERVICE))
            } else {
                Error::external(SERVICE, None, e.to_string())
            }
        })?;
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

#[async_trait]
impl CalendarService for HttpCalendarService {
    async fn list_events(
        &self,
        calendar_id: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<CalendarEvent>> {
        let mut url = self.url(calendar_id, "events")?;
        url.query_pairs_mut()
            .append_pair("from", &from.format(TIME_FORMAT).to_string())
            .append_pair("to", &to.format(TIME_FORMAT).to_string());
        tracing::debug!(calendar_id = %calendar_id, %from, %to, "Listing calendar events");

        let list: EventList = self.send(self.client.get(url)).await?;
        Ok(match list {
            EventList::Wrapped { events } | EventList::Bare(events) => events,
        })
    }

    async fn create_event(&self, calendar_id: &str, event: NewCalendarEvent) -> Result<CalendarEvent> {
        let url = self.url(calendar_id, "events")?;
        tracing::info!(calendar_id = %calendar_id, start = %event.start, "Creating calendar event");
        self.send(self.client.post(url).json(&event)).await
    }

    async fn share(&self, calendar_id: &str, email: &str) -> Result<()> {
        let url = self.url(calendar_id, "share")?;
        self.execute(self.client.post(url).json(&json!({ "email": email })))
            .await?;
        tracing::info!(calendar_id = %calendar_id, "Calendar shared");
        Ok(())
    }
}
