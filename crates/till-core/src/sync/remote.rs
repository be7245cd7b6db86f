//! Remote proxy client.
//!
//! The narrow request/response surface in front of the authoritative store.
//! Only the sync engine talks to it, always scoped by the store id, and only
//! for collections in the closed [`Collection`] set.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::{Collection, SyncAction};
use crate::util::{compact_text, normalize_text_option};

/// Seam between the sync engine and the remote store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch all rows of a collection scoped to one store
    async fn fetch(&self, collection: Collection, store_id: &str) -> Result<Vec<Value>>;

    /// Apply one mutation. `record_id` is required for update/delete and
    /// carries the client-generated id for creates, making retries
    /// idempotent on the remote side.
    async fn mutate(
        &self,
        action: SyncAction,
        collection: Collection,
        record_id: Option<&str>,
        payload: &Value,
        store_id: &str,
    ) -> Result<()>;
}

/// HTTP implementation against the proxy API.
#[derive(Clone)]
pub struct HttpRemoteStore {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpRemoteStore {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let endpoint = normalize_endpoint(endpoint.into())?;
        Ok(Self {
            endpoint,
            client: reqwest::Client::builder().build()?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct FetchResponse {
    #[serde(default)]
    data: Vec<Value>,
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn fetch(&self, collection: Collection, store_id: &str) -> Result<Vec<Value>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("table", collection.as_str()), ("storeId", store_id)])
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Remote(parse_api_error(status, &body)));
        }

        let payload = response.json::<FetchResponse>().await?;
        Ok(payload.data)
    }

    async fn mutate(
        &self,
        action: SyncAction,
        collection: Collection,
        record_id: Option<&str>,
        payload: &Value,
        store_id: &str,
    ) -> Result<()> {
        let body = serde_json::json!({
            "table": collection.as_str(),
            "action": action.as_str(),
            "id": record_id,
            "data": payload,
            "storeId": store_id,
        });

        let response = self.client.post(&self.endpoint).json(&body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Remote(parse_api_error(status, &body)));
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn normalize_endpoint(raw: String) -> Result<String> {
    let endpoint = normalize_text_option(Some(raw)).ok_or_else(|| {
        Error::InvalidInput("sync endpoint must not be empty".to_string())
    })?;
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Ok(endpoint.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(
            "sync endpoint must include http:// or https://".to_string(),
        ))
    }
}
