//! Optional upload of completed block files to a remote store.
//!
//! Upload is best-effort: a failed transfer never invalidates a successful
//! download, it only leaves the task's `file_url` unset.

use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Upload timeout. Uploads are bounded, unlike the fetch path.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Errors from a block upload attempt.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("failed to read file for upload: {0}")]
    Io(#[from] std::io::Error),

    #[error("upload request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote store answered {status} for {url}")]
    Status { status: u16, url: String },

    #[error("file name is not valid unicode: {0}")]
    FileName(String),
}

/// Transfers a local file to a remote store and returns its URL.
pub trait Uploader {
    fn upload(&self, path: &Path) -> Result<String, UploadError>;
}

/// HTTP uploader PUTting files under a base URL.
pub struct HttpUploader {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpUploader {
    /// Creates an uploader targeting `base_url` (trailing slash optional).
    pub fn new(base_url: &str) -> Result<Self, UploadError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(UPLOAD_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn target_url(&self, path: &Path) -> Result<String, UploadError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| UploadError::FileName(path.display().to_string()))?;
        Ok(format!("{}/{}", self.base_url, name))
    }
}

impl Uploader for HttpUploader {
    fn upload(&self, path: &Path) -> Result<String, UploadError> {
        let url = self.target_url(path)?;
        // Blocks are large; stream the file instead of buffering it.
        let file = std::fs::File::open(path)?;
        let body = reqwest::blocking::Body::from(file);
        let response = self.client.put(&url).body(body).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Status {
                status: status.as_u16(),
                url,
            });
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_url_joins_base_and_file_name() {
        let uploader = HttpUploader::new("http://store.local/blocks/").unwrap();
        let url = uploader
            .target_url(Path::new("/tmp/out/block_0_4096.tif"))
            .unwrap();
        assert_eq!(url, "http://store.local/blocks/block_0_4096.tif");
    }

    #[test]
    fn test_upload_of_missing_file_is_io_error() {
        let uploader = HttpUploader::new("http://store.local").unwrap();
        let err = uploader.upload(Path::new("/nonexistent/block.tif"));
        assert!(matches!(err, Err(UploadError::Io(_))));
    }
}
