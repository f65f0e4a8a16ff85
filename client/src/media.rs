//! Uploads to the third-party media host.
//!
//! Each file goes up individually as a streamed multipart part so the
//! progress callback sees bytes as they leave; removal of an uploaded asset
//! issues the remote delete first and only then may the caller drop it from
//! local state.

use futures_util::StreamExt;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("upload failed: {0}")]
    Upload(String),
    #[error("delete failed: {0}")]
    Delete(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Asset reference returned by the media host.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaAsset {
    pub public_id: String,
    pub secure_url: String,
}

pub struct MediaClient {
    http: reqwest::Client,
    upload_url: String,
    delete_url: String,
    upload_preset: String,
}

const UPLOAD_CHUNK: usize = 64 * 1024;

impl MediaClient {
    pub fn new(
        upload_url: impl Into<String>,
        delete_url: impl Into<String>,
        upload_preset: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, MediaError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| MediaError::Upload(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            upload_url: upload_url.into(),
            delete_url: delete_url.into(),
            upload_preset: upload_preset.into(),
        })
    }

    /// Upload one file, reporting `(bytes_sent, bytes_total)` as chunks go
    /// out. A failed upload leaves nothing behind; the caller simply drops
    /// the attempt.
    pub async fn upload(
        &self,
        path: &Path,
        progress: impl FnMut(u64, u64) + Send + 'static,
    ) -> Result<MediaAsset, MediaError> {
        let bytes = tokio::fs::read(path).await?;
        let total = bytes.len() as u64;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let mime = guess_mime(path);

        let mut progress = progress;
        progress(0, total);

        let chunks: Vec<Vec<u8>> = bytes.chunks(UPLOAD_CHUNK).map(|c| c.to_vec()).collect();
        let mut sent = 0u64;
        let stream = futures_util::stream::iter(
            chunks.into_iter().map(Ok::<Vec<u8>, std::io::Error>),
        )
        .inspect(move |chunk| {
            if let Ok(chunk) = chunk {
                sent += chunk.len() as u64;
                progress(sent, total);
            }
        });

        let part = reqwest::multipart::Part::stream_with_length(
            reqwest::Body::wrap_stream(stream),
            total,
        )
        .file_name(file_name)
        .mime_str(mime)
        .map_err(|e| MediaError::Upload(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("upload_preset", self.upload_preset.clone())
            .part("file", part);

        let resp = self
            .http
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| MediaError::Upload(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(MediaError::Upload(format!(
                "media host returned HTTP {}",
                resp.status()
            )));
        }
        resp.json::<MediaAsset>()
            .await
            .map_err(|e| MediaError::Upload(format!("invalid host response: {e}")))
    }

    /// Delete an uploaded asset by public id.
    pub async fn delete(&self, public_id: &str) -> Result<(), MediaError> {
        let resp = self
            .http
            .post(&self.delete_url)
            .form(&[("public_id", public_id)])
            .send()
            .await
            .map_err(|e| MediaError::Delete(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(MediaError::Delete(format!(
                "media host returned HTTP {}",
                resp.status()
            )));
        }
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| MediaError::Delete(format!("invalid host response: {e}")))?;
        match body.get("result").and_then(|r| r.as_str()) {
            Some("ok") | None => Ok(()),
            Some(other) => Err(MediaError::Delete(format!("media host said: {other}"))),
        }
    }
}

pub fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_guess_covers_common_types() {
        assert_eq!(guess_mime(Path::new("contract.pdf")), "application/pdf");
        assert_eq!(guess_mime(Path::new("photo.JPG")), "image/jpeg");
        assert_eq!(guess_mime(Path::new("noext")), "application/octet-stream");
    }
}
