use std::sync::Arc;

use forgesync_api::models::{DeviceRecord, DeviceStatus, DeviceType, NewDevice, WeldPoint};
use tracing::{info, warn};

use crate::errors::{CommandError, StoreError};

use super::{DeviceCache, StoreClient};

/// Result of a fleet-wide command. The per-device writes are independent,
/// so some can land while others fail; the caller decides whether to retry
/// the failed subset.
#[derive(Debug, Default)]
pub struct FleetOutcome {
    pub updated: Vec<DeviceRecord>,
    pub failed: Vec<FleetFailure>,
}

impl FleetOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug)]
pub struct FleetFailure {
    pub id: String,
    pub name: String,
    pub error: StoreError,
}

/// Translates operator intents into full-record merge-writes against the
/// store.
///
/// Every command resolves its target from the cache, merges the intent's
/// field changes onto that record and PUTs the whole thing back. The
/// read-merge-write sequence is not locked: two call sites commanding the
/// same device concurrently can lose the earlier write. Acceptable for a
/// single-operator console.
#[derive(Clone)]
pub struct CommandDispatcher {
    store: Arc<StoreClient>,
    cache: Arc<DeviceCache>,
}

impl CommandDispatcher {
    pub fn new(store: Arc<StoreClient>, cache: Arc<DeviceCache>) -> Self {
        Self { store, cache }
    }

    pub async fn power_on(&self, device_type: DeviceType) -> Result<DeviceRecord, CommandError> {
        let mut device = self.resolve(device_type).await?;
        device.status = DeviceStatus::Idle;
        info!(name = %device.name, "powering on");
        self.commit(device).await
    }

    pub async fn power_off(&self, device_type: DeviceType) -> Result<DeviceRecord, CommandError> {
        let mut device = self.resolve(device_type).await?;
        device.status = DeviceStatus::Off;
        info!(name = %device.name, "powering off");
        self.commit(device).await
    }

    /// Send the arm towards an absolute position. Motion only requires the
    /// absence of a latched emergency, not `idle` status.
    pub async fn move_to(&self, x: i64, y: i64, z: i64) -> Result<DeviceRecord, CommandError> {
        let device = self.resolve(DeviceType::RobotArm).await?;
        guard_emergency(&device)?;
        info!(x, y, z, "moving arm to position");
        self.commit(arm_motion(device, x, y, z)).await
    }

    pub async fn go_home(&self) -> Result<DeviceRecord, CommandError> {
        let device = self.resolve(DeviceType::RobotArm).await?;
        guard_emergency(&device)?;
        info!("returning arm to home position");
        self.commit(arm_motion(device, 0, 0, 0)).await
    }

    pub async fn start_welding(
        &self,
        points: Vec<WeldPoint>,
    ) -> Result<DeviceRecord, CommandError> {
        if points.is_empty() {
            return Err(CommandError::InvalidArgument(
                "weld trajectory is empty".to_string(),
            ));
        }
        if points.iter().flatten().any(|c| !c.is_finite()) {
            return Err(CommandError::InvalidArgument(
                "weld trajectory contains a non-finite coordinate".to_string(),
            ));
        }

        let mut device = self.resolve(DeviceType::RobotArm).await?;
        guard_emergency(&device)?;

        info!(points = points.len(), "starting weld");
        device.status = DeviceStatus::Welding;
        device.welding_active = true;
        device.weld_points = Some(points);
        self.commit(device).await
    }

    /// Always allowed, emergency or not; repeating it is a harmless rewrite
    /// of the same idle state.
    pub async fn stop_welding(&self) -> Result<DeviceRecord, CommandError> {
        let mut device = self.resolve(DeviceType::RobotArm).await?;
        info!(name = %device.name, "stopping weld");
        device.status = DeviceStatus::Idle;
        device.welding_active = false;
        self.commit(device).await
    }

    /// Latch the emergency flag and force every known device off. Devices
    /// update independently; see [`FleetOutcome`].
    pub async fn emergency_stop_all(&self) -> Result<FleetOutcome, CommandError> {
        warn!("EMERGENCY STOP engaged");
        self.update_fleet(|device| {
            device.status = DeviceStatus::Off;
            device.emergency_stop = true;
        })
        .await
    }

    /// Clear the emergency flag fleet-wide. Status is left untouched: a
    /// reset never powers devices back on, an explicit power-on must follow.
    pub async fn reset_emergency_all(&self) -> Result<FleetOutcome, CommandError> {
        info!("resetting emergency across the fleet");
        self.update_fleet(|device| {
            device.emergency_stop = false;
        })
        .await
    }

    /// First-run provisioning: return the registered arm, creating the
    /// default record when the registry holds none.
    pub async fn ensure_robot_arm(&self) -> Result<DeviceRecord, CommandError> {
        self.cache.refresh().await?;
        if let Some(arm) = self.cache.find_by_type(DeviceType::RobotArm).await {
            return Ok(arm);
        }

        let created = self.store.create(NewDevice::robot_arm()).await?;
        info!(id = %created.id, "provisioned welding arm");
        self.refresh_after_write().await;
        Ok(created)
    }

    /// Cache lookup with one refresh-and-retry before giving up; the cache
    /// may simply be cold.
    async fn resolve(&self, device_type: DeviceType) -> Result<DeviceRecord, CommandError> {
        if let Some(device) = self.cache.find_by_type(device_type).await {
            return Ok(device);
        }

        self.cache.refresh().await?;
        self.cache
            .find_by_type(device_type)
            .await
            .ok_or(CommandError::DeviceNotFound(device_type))
    }

    async fn commit(&self, device: DeviceRecord) -> Result<DeviceRecord, CommandError> {
        let updated = self.store.update(&device.id, &device).await?;
        self.refresh_after_write().await;
        Ok(updated)
    }

    async fn update_fleet(
        &self,
        patch: impl Fn(&mut DeviceRecord),
    ) -> Result<FleetOutcome, CommandError> {
        let devices = self.fleet().await?;
        let mut outcome = FleetOutcome::default();

        for mut device in devices {
            patch(&mut device);
            match self.store.update(&device.id, &device).await {
                Ok(updated) => outcome.updated.push(updated),
                Err(error) => {
                    warn!(id = %device.id, name = %device.name, %error, "fleet update failed for device");
                    outcome.failed.push(FleetFailure {
                        id: device.id,
                        name: device.name,
                        error,
                    });
                }
            }
        }

        self.refresh_after_write().await;
        Ok(outcome)
    }

    async fn fleet(&self) -> Result<Vec<DeviceRecord>, CommandError> {
        let devices = self.cache.all().await;
        if !devices.is_empty() {
            return Ok(devices);
        }
        Ok(self.cache.refresh().await?)
    }

    async fn refresh_after_write(&self) {
        // The write already landed; a failed readback only delays the
        // display until the next poll.
        if let Err(error) = self.cache.refresh().await {
            warn!(%error, "post-command refresh failed");
        }
    }
}

fn guard_emergency(device: &DeviceRecord) -> Result<(), CommandError> {
    if device.emergency_stop {
        return Err(CommandError::EmergencyActive {
            id: device.id.clone(),
            name: device.name.clone(),
        });
    }
    Ok(())
}

fn arm_motion(mut device: DeviceRecord, x: i64, y: i64, z: i64) -> DeviceRecord {
    device.status = DeviceStatus::Moving;
    device.position_x = x;
    device.position_y = y;
    device.position_z = z;
    device.welding_active = false;
    device
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use time::OffsetDateTime;

    use super::*;

    fn arm() -> DeviceRecord {
        DeviceRecord {
            id: "1".to_string(),
            name: "Primary welding arm".to_string(),
            device_type: DeviceType::RobotArm,
            status: DeviceStatus::Welding,
            position_x: 4,
            position_y: 5,
            position_z: 6,
            emergency_stop: false,
            welding_active: true,
            weld_points: None,
            last_update: OffsetDateTime::now_utc(),
        }
    }

    fn dispatcher() -> CommandDispatcher {
        let store = Arc::new(StoreClient::new(
            "http://127.0.0.1:9/api/v1/devices",
            Duration::from_millis(100),
        ));
        let cache = Arc::new(DeviceCache::new(store.clone()));
        CommandDispatcher::new(store, cache)
    }

    #[test]
    fn test_arm_motion_overrides_weld_state() {
        let moved = arm_motion(arm(), 10, 20, 30);
        assert_eq!(moved.status, DeviceStatus::Moving);
        assert_eq!(
            (moved.position_x, moved.position_y, moved.position_z),
            (10, 20, 30)
        );
        assert!(!moved.welding_active);
    }

    #[test]
    fn test_guard_emergency_blocks_latched_device() {
        let mut device = arm();
        assert!(guard_emergency(&device).is_ok());

        device.emergency_stop = true;
        let err = guard_emergency(&device).unwrap_err();
        assert!(matches!(err, CommandError::EmergencyActive { .. }));
    }

    #[tokio::test]
    async fn test_empty_trajectory_rejected_before_any_store_call() {
        // The store endpoint is unreachable; an InvalidArgument proves the
        // validation fired before any network round trip.
        let err = dispatcher().start_welding(Vec::new()).await.unwrap_err();
        assert!(matches!(err, CommandError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_non_finite_trajectory_rejected() {
        let err = dispatcher()
            .start_welding(vec![[0.0, f64::NAN, 1.0]])
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::InvalidArgument(_)));
    }
}
