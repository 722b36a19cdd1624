//! Export paths for a flattened raster: POST it to the persistence API as a
//! self-contained data URL, or write it to a local file.

use std::io::Cursor;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::{ImageFormat, RgbaImage};
use log::info;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::RestageError;

/// Outcome of a successful [`ImageStore::send`].
#[derive(Debug)]
pub struct StoreReceipt {
    pub status: u16,
    /// Server-assigned id, when the response body carries one.
    pub id: Option<String>,
}

/// One stored image as returned by `GET /images`.
#[derive(Debug, Deserialize)]
pub struct StoredImage {
    #[serde(rename = "_id")]
    pub id: String,
    /// The data URL the image was uploaded as.
    pub image: String,
    #[serde(rename = "createdAt", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Serialize)]
struct UploadBody<'a> {
    image: &'a str,
}

/// Client for the REST persistence collaborator. Every call carries the
/// opaque session credential as an `x-auth-token` header; auth failures
/// surface as plain persistence errors.
pub struct ImageStore {
    client: reqwest::Client,
    base_url: String,
    auth_token: String,
}

impl ImageStore {
    pub fn new(base_url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
            auth_token: auth_token.into(),
        }
    }

    /// POST the flattened raster. The local scene is never touched, so a
    /// failed send can simply be retried.
    pub async fn send(&self, raster: &RgbaImage) -> Result<StoreReceipt, RestageError> {
        let data_url = to_data_url(raster)?;
        let response = self
            .client
            .post(format!("{}/images", self.base_url))
            .header("x-auth-token", &self.auth_token)
            .json(&UploadBody { image: &data_url })
            .send()
            .await
            .map_err(|e| RestageError::Persistence(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RestageError::Persistence(format!(
                "server responded with {status}"
            )));
        }
        let id = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|body| body.get("_id").and_then(|v| v.as_str()).map(str::to_string));
        info!("stored image ({})", id.as_deref().unwrap_or("no id returned"));
        Ok(StoreReceipt {
            status: status.as_u16(),
            id,
        })
    }

    pub async fn list(&self) -> Result<Vec<StoredImage>, RestageError> {
        let response = self
            .client
            .get(format!("{}/images", self.base_url))
            .header("x-auth-token", &self.auth_token)
            .send()
            .await
            .map_err(|e| RestageError::Persistence(e.to_string()))?;
        if !response.status().is_success() {
            return Err(RestageError::Persistence(format!(
                "server responded with {}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| RestageError::Persistence(e.to_string()))
    }

    pub async fn delete(&self, id: &str) -> Result<(), RestageError> {
        let response = self
            .client
            .delete(format!("{}/images/{id}", self.base_url))
            .header("x-auth-token", &self.auth_token)
            .send()
            .await
            .map_err(|e| RestageError::Persistence(e.to_string()))?;
        if !response.status().is_success() {
            return Err(RestageError::Persistence(format!(
                "server responded with {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Encode the raster as PNG bytes.
pub fn encode_png(raster: &RgbaImage) -> Result<Vec<u8>, RestageError> {
    let mut bytes = Vec::new();
    raster
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| RestageError::Encode(e.to_string()))?;
    Ok(bytes)
}

/// Self-contained encoding the persistence API stores verbatim.
pub fn to_data_url(raster: &RgbaImage) -> Result<String, RestageError> {
    Ok(format!(
        "data:image/png;base64,{}",
        STANDARD.encode(encode_png(raster)?)
    ))
}

/// Local export path: write the PNG to a caller-chosen destination, no
/// network involved.
pub fn save_locally(raster: &RgbaImage, path: &Path) -> Result<(), RestageError> {
    raster
        .save_with_format(path, ImageFormat::Png)
        .map_err(|e| RestageError::Encode(e.to_string()))
}
