// Camera source trait for frame acquisition
use async_trait::async_trait;
use image::RgbImage;

#[async_trait]
pub trait CameraSource: Send + Sync {
    /// Fetch and decode the latest frame of `camera`.
    /// Any error means the camera is unavailable for this cycle.
    async fn fetch_frame(&self, camera: &str) -> anyhow::Result<RgbImage>;
}
