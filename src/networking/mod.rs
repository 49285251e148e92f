use std::path::Path;

use futures_util::StreamExt;
use log::{debug, warn};
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::error::SyncError;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Thin wrapper around the HTTP client shared by release lookups and downloads.
#[derive(Clone)]
pub struct NetworkClient {
    client: Client,
}

impl NetworkClient {
    pub fn new() -> Self {
        // No request timeout: a stalled transfer blocks the run.
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|err| {
                warn!("network client: falling back to default HTTP client configuration ({err})");
                Client::new()
            });
        Self { client }
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    /// Stream `url` into `dest`, creating or truncating it.
    ///
    /// Writes go straight to `dest`; a failed transfer can leave a partial
    /// file behind for the caller to deal with.
    pub async fn download_to_path(&self, url: &str, dest: &Path) -> Result<u64, SyncError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(SyncError::DownloadRequest)?;

        let mut file = File::create(dest)
            .await
            .map_err(|source| SyncError::DownloadCreate {
                path: dest.to_path_buf(),
                source,
            })?;

        let write_err = |source: std::io::Error| SyncError::DownloadWrite {
            path: dest.to_path_buf(),
            source,
        };

        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(SyncError::DownloadStream)?;
            file.write_all(&chunk).await.map_err(write_err)?;
            downloaded += chunk.len() as u64;
        }
        file.flush().await.map_err(write_err)?;

        debug!("network: wrote {downloaded} bytes to {}", dest.display());
        Ok(downloaded)
    }
}

impl Default for NetworkClient {
    fn default() -> Self {
        Self::new()
    }
}
