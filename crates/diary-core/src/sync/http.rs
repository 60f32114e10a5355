//! HTTP client for the cloud record service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::error::{DiaryError, Result};
use crate::record::DiaryRecord;
use crate::sync::wire::{PullResponse, PushRequest, PushResponse, WireRecord};
use crate::sync::{CloudRecordService, Credential};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Cloud record service reached over JSON/HTTPS with a bearer token.
#[derive(Debug, Clone)]
pub struct HttpCloudService {
    base_url: String,
    client: reqwest::Client,
}

impl HttpCloudService {
    /// Build a client with the default request timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Build a client with an explicit request timeout. The timeout
    /// bounds the whole call; a timed-out push commits nothing locally.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DiaryError::Sync(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn classify_status(status: StatusCode) -> Option<DiaryError> {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Some(DiaryError::Auth(format!(
                "Cloud rejected credential: {}",
                status
            )));
        }
        if !status.is_success() {
            return Some(DiaryError::Sync(format!("Cloud returned {}", status)));
        }
        None
    }
}

#[async_trait]
impl CloudRecordService for HttpCloudService {
    async fn upload(&self, credential: &Credential, records: &[DiaryRecord]) -> Result<()> {
        let url = format!("{}/api/v1/user/sync", self.base_url);
        let body = PushRequest {
            records: records.iter().map(WireRecord::from).collect(),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(credential.token())
            .json(&body)
            .send()
            .await
            .map_err(|e| DiaryError::Sync(format!("Push request failed: {}", e)))?;

        if let Some(err) = Self::classify_status(response.status()) {
            return Err(err);
        }

        let ack: PushResponse = response
            .json()
            .await
            .map_err(|e| DiaryError::Sync(format!("Invalid push response: {}", e)))?;
        if !ack.success {
            return Err(DiaryError::Sync(
                "Cloud did not acknowledge the batch".to_string(),
            ));
        }
        Ok(())
    }

    async fn download(&self, credential: &Credential) -> Result<Vec<DiaryRecord>> {
        let url = format!("{}/api/v1/user/records", self.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(credential.token())
            .send()
            .await
            .map_err(|e| DiaryError::Sync(format!("Pull request failed: {}", e)))?;

        if let Some(err) = Self::classify_status(response.status()) {
            return Err(err);
        }

        let body: PullResponse = response
            .json()
            .await
            .map_err(|e| DiaryError::Sync(format!("Invalid pull response: {}", e)))?;
        Ok(body.records.into_iter().map(DiaryRecord::from).collect())
    }
}
