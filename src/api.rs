use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::models::{Event, EventDetail};

pub const DEFAULT_API_BASE: &str = "https://openapi.izmir.bel.tr/api/ibb/kultursanat/etkinlikler";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("http error: {0}")]
    Http(String),
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("invalid endpoint: {0}")]
    Endpoint(String),
}

/// Anything that can supply event records. The store only talks to this.
pub trait EventSource {
    fn fetch_events(&self) -> impl Future<Output = Result<Vec<Event>, ApiError>> + Send;
    fn fetch_event_detail(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<EventDetail, ApiError>> + Send;
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: Url,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, user_agent: &str) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|err| ApiError::Endpoint(format!("{base_url}: {err}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|err| ApiError::Http(err.to_string()))?;
        Ok(Self { base_url, client })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ApiError> {
        Self::new(
            &config.api_base_url,
            Duration::from_secs(config.timeout_secs),
            &config.user_agent,
        )
    }

    pub fn list_url(&self) -> Url {
        self.base_url.clone()
    }

    pub fn detail_url(&self, id: i64) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Endpoint(self.base_url.to_string()))?
            .pop_if_empty()
            .push(&id.to_string());
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        debug!(%url, "GET");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| ApiError::Http(err.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| ApiError::Http(err.to_string()))?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|err| ApiError::Parse(format!("{url}: {err}")))
    }
}

impl EventSource for ApiClient {
    async fn fetch_events(&self) -> Result<Vec<Event>, ApiError> {
        let events: Vec<Event> = self.get_json(self.list_url()).await?;
        info!(count = events.len(), "fetched events");
        Ok(events)
    }

    async fn fetch_event_detail(&self, id: i64) -> Result<EventDetail, ApiError> {
        let url = self.detail_url(id)?;
        self.get_json(url).await
    }
}
