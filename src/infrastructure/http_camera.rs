// HTTP snapshot camera source
use crate::application::camera_source::CameraSource;
use crate::infrastructure::frame::decode_frame;
use anyhow::{Context, Result};
use async_trait::async_trait;
use image::RgbImage;
use std::collections::HashMap;

/// Fetches still frames from per-camera snapshot URLs.
#[derive(Debug, Clone)]
pub struct HttpCameraSource {
    client: reqwest::Client,
    urls: HashMap<String, String>,
}

impl HttpCameraSource {
    pub fn new(urls: HashMap<String, String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            urls,
        }
    }
}

#[async_trait]
impl CameraSource for HttpCameraSource {
    async fn fetch_frame(&self, camera: &str) -> Result<RgbImage> {
        let url = self
            .urls
            .get(camera)
            .with_context(|| format!("No snapshot URL configured for camera {}", camera))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to request snapshot from {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            anyhow::bail!("Camera {} returned status {}", camera, status);
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read snapshot body")?;
        if bytes.is_empty() {
            anyhow::bail!("No image data received from camera {}", camera);
        }

        tracing::debug!("Fetched {} bytes from camera {}", bytes.len(), camera);
        Ok(decode_frame(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_camera_is_an_error() {
        let source = HttpCameraSource::new(HashMap::new());

        let err = source.fetch_frame("nowhere").await.unwrap_err();
        assert!(err.to_string().contains("nowhere"));
    }
}
