use std::sync::Arc;

use forgesync_api::models::{DeviceRecord, DeviceType};
use tokio::sync::RwLock;
use tracing::debug;

use crate::errors::StoreError;

use super::StoreClient;

/// Last-known snapshot of the device fleet.
///
/// The snapshot is replaced wholesale on every successful refresh, so
/// readers never observe a half-updated fleet. List order is preserved from
/// the store response; type lookups take the first match in that order.
pub struct DeviceCache {
    store: Arc<StoreClient>,
    devices: RwLock<Vec<DeviceRecord>>,
}

impl DeviceCache {
    pub fn new(store: Arc<StoreClient>) -> Self {
        Self {
            store,
            devices: RwLock::new(Vec::new()),
        }
    }

    /// Re-fetch the fleet from the store. On failure the previous snapshot
    /// stays in place and the error surfaces to the caller; a valid cache
    /// is never wiped by a bad poll.
    pub async fn refresh(&self) -> Result<Vec<DeviceRecord>, StoreError> {
        let fresh = self.store.list().await?;
        self.replace(fresh.clone()).await;
        debug!(count = fresh.len(), "device cache refreshed");
        Ok(fresh)
    }

    pub async fn get(&self, id: &str) -> Option<DeviceRecord> {
        self.devices
            .read()
            .await
            .iter()
            .find(|device| device.id == id)
            .cloned()
    }

    /// First device of the given type in list order. The cell is expected to
    /// hold one device per type; duplicates silently resolve to the first.
    pub async fn find_by_type(&self, device_type: DeviceType) -> Option<DeviceRecord> {
        self.devices
            .read()
            .await
            .iter()
            .find(|device| device.device_type == device_type)
            .cloned()
    }

    pub async fn all(&self) -> Vec<DeviceRecord> {
        self.devices.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.devices.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.devices.read().await.is_empty()
    }

    /// Most recently written records first, truncated to `limit`. Backs the
    /// activity table on the monitoring page.
    pub async fn history(&self, limit: usize) -> Vec<DeviceRecord> {
        let mut devices = self.all().await;
        devices.sort_by(|a, b| b.last_update.cmp(&a.last_update));
        devices.truncate(limit);
        devices
    }

    /// Whether any device in the snapshot has its emergency flag latched.
    pub async fn any_emergency(&self) -> bool {
        self.devices
            .read()
            .await
            .iter()
            .any(|device| device.emergency_stop)
    }

    async fn replace(&self, fresh: Vec<DeviceRecord>) {
        let mut devices = self.devices.write().await;
        *devices = fresh;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use forgesync_api::models::DeviceStatus;
    use time::OffsetDateTime;

    use super::*;

    fn record(id: &str, name: &str, device_type: DeviceType, age_secs: i64) -> DeviceRecord {
        DeviceRecord {
            id: id.to_string(),
            name: name.to_string(),
            device_type,
            status: DeviceStatus::Off,
            position_x: 0,
            position_y: 0,
            position_z: 0,
            emergency_stop: false,
            welding_active: false,
            weld_points: None,
            last_update: OffsetDateTime::now_utc() - time::Duration::seconds(age_secs),
        }
    }

    fn cache() -> DeviceCache {
        // Unreachable endpoint; these tests only exercise snapshot reads.
        let store = Arc::new(StoreClient::new(
            "http://127.0.0.1:9/api/v1/devices",
            Duration::from_millis(100),
        ));
        DeviceCache::new(store)
    }

    #[tokio::test]
    async fn test_find_by_type_takes_first_in_list_order() {
        let cache = cache();
        cache
            .replace(vec![
                record("1", "Fan A", DeviceType::Fan, 0),
                record("2", "Fan B", DeviceType::Fan, 0),
            ])
            .await;

        let found = cache.find_by_type(DeviceType::Fan).await.unwrap();
        assert_eq!(found.name, "Fan A");
    }

    #[tokio::test]
    async fn test_history_sorted_newest_first_and_truncated() {
        let cache = cache();
        cache
            .replace(vec![
                record("1", "arm", DeviceType::RobotArm, 30),
                record("2", "fan", DeviceType::Fan, 10),
                record("3", "conveyor", DeviceType::Conveyor, 20),
            ])
            .await;

        let history = cache.history(2).await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, "2");
        assert_eq!(history[1].id, "3");
    }

    #[tokio::test]
    async fn test_any_emergency_reflects_snapshot() {
        let cache = cache();
        let mut fan = record("2", "fan", DeviceType::Fan, 0);
        assert!(!cache.any_emergency().await);

        fan.emergency_stop = true;
        cache.replace(vec![fan]).await;
        assert!(cache.any_emergency().await);
    }

    #[tokio::test]
    async fn test_refresh_failure_preserves_snapshot() {
        let cache = cache();
        cache
            .replace(vec![record("1", "arm", DeviceType::RobotArm, 0)])
            .await;

        let result = cache.refresh().await;
        assert!(result.is_err());
        assert_eq!(cache.len().await, 1);
        assert!(cache.get("1").await.is_some());
    }
}
