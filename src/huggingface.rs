//! Hugging Face hub implementation of [`DatasetProvider`].
//!
//! Metadata comes from the hub API (`/api/datasets/<repo>`); rows come from
//! the datasets-server rows endpoint, paginated.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::contract::{DatasetMeta, DatasetProvider, PriceRow};
use crate::errors::MirrorError;

const HUB_API_BASE: &str = "https://huggingface.co";
const ROWS_API_BASE: &str = "https://datasets-server.huggingface.co";
const ROWS_PAGE_SIZE: usize = 100;

pub struct HfProvider {
    client: reqwest::Client,
    token: Option<String>,
    hub_base: String,
    rows_base: String,
}

#[derive(Deserialize)]
struct RepoInfo {
    #[serde(rename = "lastModified")]
    last_modified: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RowsPage {
    rows: Vec<RowEnvelope>,
    num_rows_total: usize,
}

#[derive(Deserialize)]
struct RowEnvelope {
    row: PriceRow,
}

impl HfProvider {
    pub fn new(token: Option<String>) -> Self {
        HfProvider {
            client: reqwest::Client::new(),
            token,
            hub_base: HUB_API_BASE.to_string(),
            rows_base: ROWS_API_BASE.to_string(),
        }
    }

    /// Override the API endpoints, for tests against a local server.
    pub fn with_endpoints(token: Option<String>, hub_base: String, rows_base: String) -> Self {
        HfProvider {
            client: reqwest::Client::new(),
            token,
            hub_base,
            rows_base,
        }
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[async_trait]
impl DatasetProvider for HfProvider {
    async fn fetch_metadata(&self, repo_id: &str) -> Result<DatasetMeta, MirrorError> {
        let url = format!("{}/api/datasets/{}", self.hub_base, repo_id);
        debug!(url = %url, "Fetching dataset metadata");

        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| MirrorError::MetadataUnavailable {
                repo_id: repo_id.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, url = %url, "Hub API returned error: {body}");
            return Err(MirrorError::MetadataUnavailable {
                repo_id: repo_id.to_string(),
                reason: format!("hub API returned {status}"),
            });
        }

        let info: RepoInfo =
            response
                .json()
                .await
                .map_err(|e| MirrorError::MetadataUnavailable {
                    repo_id: repo_id.to_string(),
                    reason: format!("unparsable hub response: {e}"),
                })?;

        Ok(DatasetMeta {
            repo_id: repo_id.to_string(),
            last_modified: info.last_modified,
        })
    }

    async fn fetch_rows(&self, repo_id: &str) -> Result<Vec<PriceRow>, MirrorError> {
        let mut rows: Vec<PriceRow> = Vec::new();
        let mut offset = 0usize;

        loop {
            let url = format!(
                "{}/rows?dataset={}&config=default&split=train&offset={}&length={}",
                self.rows_base, repo_id, offset, ROWS_PAGE_SIZE
            );
            debug!(url = %url, offset, "Fetching dataset rows page");

            let response = self.authorize(self.client.get(&url)).send().await.map_err(
                |e| MirrorError::RowsUnavailable {
                    repo_id: repo_id.to_string(),
                    reason: e.to_string(),
                },
            )?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                error!(status = %status, url = %url, "Rows API returned error: {body}");
                return Err(MirrorError::RowsUnavailable {
                    repo_id: repo_id.to_string(),
                    reason: format!("rows API returned {status}"),
                });
            }

            let page: RowsPage =
                response
                    .json()
                    .await
                    .map_err(|e| MirrorError::RowsUnavailable {
                        repo_id: repo_id.to_string(),
                        reason: format!("unparsable rows response: {e}"),
                    })?;

            let fetched = page.rows.len();
            rows.extend(page.rows.into_iter().map(|env| env.row));
            offset += fetched;

            if fetched == 0 || offset >= page.num_rows_total {
                break;
            }
        }

        info!(repo_id = %repo_id, rows = rows.len(), "Fetched dataset rows");
        Ok(rows)
    }
}
