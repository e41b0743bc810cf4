//! Thin REST client for the search engine's collection API.
//!
//! All operations map non-2xx responses to [`CoreError::Engine`] carrying the
//! upstream status and body.

use std::time::Duration;

use bytes::Bytes;
use frostgate_core::{CoreError, CoreResult};
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{HeaderValue, CONTENT_TYPE};

const API_KEY_HEADER: &str = "x-api-key";

/// HTTP client for collection lifecycle calls against the search engine.
pub struct EngineClient {
    http: reqwest::Client,
    base_url: String,
    api_key: HeaderValue,
}

impl EngineClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> CoreResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::internal(format!("failed to build engine client: {e}")))?;
        let api_key = HeaderValue::from_str(api_key)
            .map_err(|_| CoreError::config("engine api_key contains invalid header bytes"))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Creates a collection from its schema document.
    pub async fn create_collection(&self, schema: &[u8]) -> CoreResult<()> {
        let resp = self
            .http
            .post(format!("{}/collections", self.base_url))
            .header(API_KEY_HEADER, self.api_key.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(schema.to_vec())
            .send()
            .await
            .map_err(transport_err)?;
        check(resp).await.map(|_| ())
    }

    /// Bulk-imports a line-delimited document export with upsert semantics.
    pub async fn import_documents(&self, name: &str, documents: Vec<u8>) -> CoreResult<()> {
        let resp = self
            .http
            .post(format!(
                "{}/collections/{name}/documents/import?action=upsert",
                self.base_url
            ))
            .header(API_KEY_HEADER, self.api_key.clone())
            .header(CONTENT_TYPE, "text/plain")
            .body(documents)
            .send()
            .await
            .map_err(transport_err)?;
        check(resp).await.map(|_| ())
    }

    /// Fetches the live schema of a collection.
    pub async fn get_schema(&self, name: &str) -> CoreResult<Bytes> {
        let resp = self
            .http
            .get(format!("{}/collections/{name}", self.base_url))
            .header(API_KEY_HEADER, self.api_key.clone())
            .send()
            .await
            .map_err(transport_err)?;
        check(resp)
            .await?
            .bytes()
            .await
            .map_err(transport_err)
    }

    /// Streams the line-delimited document export of a collection.
    pub async fn export_documents(
        &self,
        name: &str,
    ) -> CoreResult<BoxStream<'static, CoreResult<Bytes>>> {
        let resp = self
            .http
            .get(format!(
                "{}/collections/{name}/documents/export",
                self.base_url
            ))
            .header(API_KEY_HEADER, self.api_key.clone())
            .send()
            .await
            .map_err(transport_err)?;
        let resp = check(resp).await?;
        Ok(resp.bytes_stream().map_err(transport_err).boxed())
    }

    /// Deletes a collection, freeing its memory in the engine.
    pub async fn delete_collection(&self, name: &str) -> CoreResult<()> {
        let resp = self
            .http
            .delete(format!("{}/collections/{name}", self.base_url))
            .header(API_KEY_HEADER, self.api_key.clone())
            .send()
            .await
            .map_err(transport_err)?;
        check(resp).await.map(|_| ())
    }
}

fn transport_err(err: reqwest::Error) -> CoreError {
    CoreError::internal(format!("engine request failed: {err}"))
}

async fn check(resp: reqwest::Response) -> CoreResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(CoreError::Engine {
        status: status.as_u16(),
        body,
    })
}
