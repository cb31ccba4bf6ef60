use std::sync::Arc;
use std::time::Duration;

use forgesync_api::models::{DeviceRecord, DeviceStatus, DeviceType};
use forgesync_client::services::{CommandDispatcher, DeviceCache, StatusPoller, StoreClient};
use forgesync_mock::MockStore;
use time::OffsetDateTime;

/// A full welding cell wired against an in-process mock registry.
pub struct MockCell {
    pub store: Arc<MockStore>,
    pub client: Arc<StoreClient>,
    pub cache: Arc<DeviceCache>,
    pub dispatcher: CommandDispatcher,
    pub poller: StatusPoller,
}

impl MockCell {
    /// Cell seeded with one arm ("1"), one fan ("2") and one conveyor ("3").
    pub async fn seeded() -> Self {
        Self::with_devices(fleet()).await
    }

    pub async fn empty() -> Self {
        Self::with_devices(Vec::new()).await
    }

    pub async fn with_devices(devices: Vec<DeviceRecord>) -> Self {
        let store = MockStore::with_seed(devices).await;
        let (base_url, _server) = store.spawn().await;

        let client = Arc::new(StoreClient::new(base_url, Duration::from_secs(2)));
        let cache = Arc::new(DeviceCache::new(client.clone()));
        let dispatcher = CommandDispatcher::new(client.clone(), cache.clone());
        let poller = StatusPoller::new(cache.clone(), Duration::from_millis(20));

        Self {
            store,
            client,
            cache,
            dispatcher,
            poller,
        }
    }

    /// Read a device straight out of the mock store, bypassing the client.
    pub async fn stored(&self, id: &str) -> DeviceRecord {
        self.store
            .snapshot()
            .await
            .into_iter()
            .find(|device| device.id == id)
            .expect("device missing from mock store")
    }
}

pub fn fleet() -> Vec<DeviceRecord> {
    vec![
        device("1", "Primary welding arm", DeviceType::RobotArm),
        device("2", "Extraction fan", DeviceType::Fan),
        device("3", "Line conveyor", DeviceType::Conveyor),
    ]
}

pub fn device(id: &str, name: &str, device_type: DeviceType) -> DeviceRecord {
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
        last_update: OffsetDateTime::now_utc(),
    }
}
