use crate::adapters::http::ScanRequest;
use crate::domain::model::{BindResponse, ScanOutcome};
use crate::utils::error::{PairingError, Result};
use crate::utils::validation::validate_url;
use reqwest::{Client, StatusCode};
use url::Url;

/// HTTP client used by reader devices and tooling to talk to the pairing API.
#[derive(Debug, Clone)]
pub struct ReaderClient {
    client: Client,
    base_url: Url,
}

impl ReaderClient {
    pub fn new(base_url: &str) -> Result<Self> {
        validate_url("server", base_url)?;
        let base_url = Url::parse(base_url).map_err(|e| PairingError::ConfigError {
            message: format!("Invalid server URL {}: {}", base_url, e),
        })?;
        Ok(Self {
            client: Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Append `segments` to the base path, percent-encoding each one so an
    /// item id containing `/`, `?` or `#` stays a single path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PairingError::ConfigError {
                message: format!("Server URL {} cannot carry a path", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn report_scan(&self, tag_id: &str) -> Result<ScanOutcome> {
        let url = self.endpoint(&["scan"])?;
        tracing::debug!("POST {} tagId={}", url, tag_id);

        let response = self
            .client
            .post(url)
            .json(&ScanRequest {
                tag_id: tag_id.to_string(),
            })
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<ScanOutcome>().await?)
    }

    /// Long-poll until the server resolves a bind for `item_id`.
    ///
    /// Terminal non-success answers (superseded, cancelled, timeout) come back
    /// as `Ok` with the matching `BindResponse`.
    pub async fn await_bind(&self, item_id: &str) -> Result<BindResponse> {
        let url = self.endpoint(&["bind", item_id])?;
        tracing::debug!("GET {}", url);

        let response = self.client.get(url).send().await?;
        match response.status() {
            StatusCode::OK
            | StatusCode::CONFLICT
            | StatusCode::GONE
            | StatusCode::REQUEST_TIMEOUT => Ok(response.json::<BindResponse>().await?),
            StatusCode::NOT_FOUND => Err(PairingError::ItemNotFound {
                item_id: item_id.to_string(),
            }),
            _ => Err(response.error_for_status().err().map_or_else(
                || PairingError::ConfigError {
                    message: "Unexpected response from pairing server".to_string(),
                },
                PairingError::HttpError,
            )),
        }
    }
}
