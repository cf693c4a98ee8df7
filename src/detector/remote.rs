//! HTTP inference-service detectors.
//!
//! Frames are PNG-encoded, base64-wrapped, and posted to a face or pose
//! endpoint of an external model server. The server's models are black
//! boxes; only the wire shapes below are assumed.

use std::time::Duration;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::capture::Frame;

use super::{Detector, FaceObservation, PoseObservation};

const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Serialize)]
struct DetectRequest {
    image: String,
    width: u32,
    height: u32,
}

#[derive(Deserialize)]
struct FaceDetectResponse {
    detections: Vec<FaceObservation>,
}

#[derive(Deserialize)]
struct PoseDetectResponse {
    detections: Vec<PoseObservation>,
}

/// Shared plumbing for both endpoints.
#[derive(Clone)]
struct InferenceClient {
    client: Client,
    base_url: String,
}

impl InferenceClient {
    fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to create inference HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    async fn post_frame<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        frame: &Frame,
    ) -> Result<T> {
        let request = DetectRequest {
            image: encode_frame(frame)?,
            width: frame.width,
            height: frame.height,
        };

        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("detect request to {url} failed"))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("detect request failed ({status}): {body}");
        }

        response
            .json::<T>()
            .await
            .context("failed to decode detect response")
    }
}

fn encode_frame(frame: &Frame) -> Result<String> {
    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(
            &frame.data,
            frame.width,
            frame.height,
            ExtendedColorType::Rgb8,
        )
        .context("failed to encode frame as PNG")?;
    Ok(BASE64.encode(&png))
}

/// Face analysis via `POST {base}/detect/face`.
pub struct RemoteFaceDetector {
    inner: InferenceClient,
}

impl RemoteFaceDetector {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            inner: InferenceClient::new(base_url)?,
        })
    }
}

impl Detector for RemoteFaceDetector {
    type Obs = FaceObservation;

    async fn detect_once(&mut self, frame: &Frame) -> Result<Vec<FaceObservation>> {
        let response: FaceDetectResponse = self.inner.post_frame("/detect/face", frame).await?;
        Ok(response.detections)
    }
}

/// Pose estimation via `POST {base}/detect/pose`.
pub struct RemotePoseDetector {
    inner: InferenceClient,
}

impl RemotePoseDetector {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            inner: InferenceClient::new(base_url)?,
        })
    }
}

impl Detector for RemotePoseDetector {
    type Obs = PoseObservation;

    async fn detect_once(&mut self, frame: &Frame) -> Result<Vec<PoseObservation>> {
        let response: PoseDetectResponse = self.inner.post_frame("/detect/pose", frame).await?;
        Ok(response.detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_response_parses() {
        let raw = r#"{
            "detections": [
                {"expressions": {"happy": 0.82, "neutral": 0.1}, "age": 31.5}
            ]
        }"#;
        let parsed: FaceDetectResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.detections.len(), 1);
        assert_eq!(parsed.detections[0].age, 31.5);
        assert_eq!(parsed.detections[0].expressions.happy, 0.82);
        assert_eq!(parsed.detections[0].expressions.sad, 0.0);
    }

    #[test]
    fn pose_response_parses() {
        let raw = r#"{
            "detections": [
                {"landmarks": [{"x": 0.5, "y": 0.25}, {"x": 0.1, "y": 0.9, "z": 0.01, "visibility": 0.98}]}
            ]
        }"#;
        let parsed: PoseDetectResponse = serde_json::from_str(raw).unwrap();
        let landmarks = &parsed.detections[0].landmarks;
        assert_eq!(landmarks.len(), 2);
        assert_eq!(landmarks[0].visibility, 0.0);
        assert_eq!(landmarks[1].visibility, 0.98);
    }

    #[test]
    fn frame_encoding_is_valid_base64_png() {
        let frame = Frame::new(2, 2, vec![0xff; 12]);
        let encoded = encode_frame(&frame).unwrap();
        let decoded = BASE64.decode(encoded).unwrap();
        // PNG magic bytes survive the round trip.
        assert_eq!(&decoded[..4], &[0x89, b'P', b'N', b'G']);
    }
}
