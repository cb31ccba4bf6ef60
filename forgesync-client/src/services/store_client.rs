use std::time::Duration;

use forgesync_api::models::{Deletion, DeviceRecord, NewDevice};
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::debug;

use crate::errors::StoreError;

/// The backend answers a collection GET with a bare object when it holds a
/// single record; normalize both shapes to a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<DeviceRecord>),
    One(Box<DeviceRecord>),
}

impl From<OneOrMany> for Vec<DeviceRecord> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::Many(devices) => devices,
            OneOrMany::One(device) => vec![*device],
        }
    }
}

/// HTTP wrapper around the remote CRUD device registry.
///
/// This layer is a pure I/O boundary: any non-success status or transport
/// failure surfaces as a [`StoreError`] and fallback policy stays with the
/// caller.
#[derive(Debug, Clone)]
pub struct StoreClient {
    http: reqwest::Client,
    base_url: String,
}

impl StoreClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn list(&self) -> Result<Vec<DeviceRecord>, StoreError> {
        let body = self.fetch(self.http.get(&self.base_url)).await?;
        let devices: Vec<DeviceRecord> = serde_json::from_str::<OneOrMany>(&body)?.into();
        debug!(count = devices.len(), "fetched device list");
        Ok(devices)
    }

    pub async fn get(&self, id: &str) -> Result<DeviceRecord, StoreError> {
        let body = self.fetch(self.http.get(self.device_url(id))).await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn create(&self, mut device: NewDevice) -> Result<DeviceRecord, StoreError> {
        device
            .last_update
            .get_or_insert_with(OffsetDateTime::now_utc);
        let body = self
            .fetch(self.http.post(&self.base_url).json(&device))
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Full-record merge-write. The record is re-stamped with the current
    /// time before it goes out; the store schema expects every field on
    /// every write, so partial PATCH bodies are never sent.
    pub async fn update(&self, id: &str, device: &DeviceRecord) -> Result<DeviceRecord, StoreError> {
        let mut stamped = device.clone();
        stamped.last_update = OffsetDateTime::now_utc();
        let body = self
            .fetch(self.http.put(self.device_url(id)).json(&stamped))
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn remove(&self, id: &str) -> Result<Deletion, StoreError> {
        let body = self.fetch(self.http.delete(self.device_url(id))).await?;
        Ok(serde_json::from_str(&body)?)
    }

    fn device_url(&self, id: &str) -> String {
        format!("{}/{}", self.base_url, id)
    }

    async fn fetch(&self, request: reqwest::RequestBuilder) -> Result<String, StoreError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use forgesync_api::models::DeviceType;

    use super::*;

    #[test]
    fn test_list_normalization_accepts_array() {
        let json = r#"[
            {"id": "1", "name": "Primary welding arm", "type": "robot_arm",
             "status": "off", "last_update": "2024-03-01T12:00:00Z"},
            {"id": "2", "name": "Extraction fan", "type": "fan",
             "status": "idle", "last_update": "2024-03-01T12:00:00Z"}
        ]"#;

        let devices: Vec<DeviceRecord> = serde_json::from_str::<OneOrMany>(json).unwrap().into();
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].device_type, DeviceType::RobotArm);
    }

    #[test]
    fn test_list_normalization_accepts_bare_object() {
        let json = r#"{"id": "1", "name": "Primary welding arm", "type": "robot_arm",
                       "status": "off", "last_update": "2024-03-01T12:00:00Z"}"#;

        let devices: Vec<DeviceRecord> = serde_json::from_str::<OneOrMany>(json).unwrap().into();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].id, "1");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = StoreClient::new(
            "http://127.0.0.1:4010/api/v1/devices/",
            Duration::from_secs(1),
        );
        assert_eq!(client.base_url(), "http://127.0.0.1:4010/api/v1/devices");
        assert_eq!(
            client.device_url("7"),
            "http://127.0.0.1:4010/api/v1/devices/7"
        );
    }
}
