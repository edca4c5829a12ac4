//! HTTP directory client.
//!
//! Talks JSON to a directory service with reqwest:
//!
//! - `GET {base}/accounts` returns `{"users": [...], "groups": [...]}`
//! - `GET {base}/users/{name}/authorized-keys` returns `{"keys": [...]}`,
//!   and a 404 means the user has no keys.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, de::DeserializeOwned};
use url::Url;

use super::{DirectoryClient, errors::DirectoryError};
use crate::{
    Result,
    accounts::{Group, User},
};

const USER_AGENT: &str = concat!("accountd/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct AccountsResponse {
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    groups: Vec<Group>,
}

#[derive(Debug, Deserialize)]
struct KeysResponse {
    #[serde(default)]
    keys: Vec<String>,
}

/// [`DirectoryClient`] backed by a JSON HTTP API.
#[derive(Debug, Clone)]
pub struct HttpDirectoryClient {
    base: Url,
    client: reqwest::Client,
}

impl HttpDirectoryClient {
    /// Create a client for the directory rooted at `base`.
    ///
    /// `timeout` bounds each HTTP request on its own; the store applies its
    /// own fetch timeout on top.
    pub fn new(base: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base).map_err(|e| DirectoryError::InvalidUrl {
            url: base.to_string(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(DirectoryError::InvalidUrl {
                url: base.to_string(),
                reason: "URL cannot be used as a base".to_string(),
            }
            .into());
        }

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| DirectoryError::Other(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { base, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// GET `url` and decode the body. `Ok(None)` means HTTP 404.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| DirectoryError::RequestFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(DirectoryError::UnexpectedStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let body = response.json().await.map_err(|e| DirectoryError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(body))
    }
}

#[async_trait]
impl DirectoryClient for HttpDirectoryClient {
    async fn fetch_accounts(&self) -> Result<(Vec<User>, Vec<Group>)> {
        let url = self.endpoint(&["accounts"]);
        match self.get_json::<AccountsResponse>(url.clone()).await? {
            Some(body) => Ok((body.users, body.groups)),
            // Unlike keys, the account listing must always exist.
            None => Err(DirectoryError::UnexpectedStatus {
                url: url.to_string(),
                status: StatusCode::NOT_FOUND.as_u16(),
            }
            .into()),
        }
    }

    async fn fetch_authorized_keys(&self, username: &str) -> Result<Vec<String>> {
        let url = self.endpoint(&["users", username, "authorized-keys"]);
        Ok(self
            .get_json::<KeysResponse>(url)
            .await?
            .map(|body| body.keys)
            .unwrap_or_default())
    }
}
