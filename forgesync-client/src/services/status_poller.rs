use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use forgesync_api::models::{DeviceRecord, DeviceType};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::errors::StoreError;

use super::DeviceCache;

/// Coordinate values bound to the display's X/Y/Z inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PositionReadout {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl From<&DeviceRecord> for PositionReadout {
    fn from(device: &DeviceRecord) -> Self {
        Self {
            x: device.position_x,
            y: device.position_y,
            z: device.position_z,
        }
    }
}

/// Fixed-interval reconciler between the remote store and the local cache.
///
/// A transient refresh failure is logged and the timer keeps running.
/// While the operator has a coordinate input focused (`begin_edit` /
/// `end_edit`), the position readout is left alone so a poll never
/// clobbers in-flight keystrokes; the cache itself still refreshes.
pub struct StatusPoller {
    inner: Arc<PollerInner>,
    task: Mutex<Option<JoinHandle<()>>>,
}

struct PollerInner {
    cache: Arc<DeviceCache>,
    interval: Duration,
    editing: AtomicBool,
    readout: RwLock<PositionReadout>,
}

impl StatusPoller {
    pub fn new(cache: Arc<DeviceCache>, interval: Duration) -> Self {
        Self {
            inner: Arc::new(PollerInner {
                cache,
                interval,
                editing: AtomicBool::new(false),
                readout: RwLock::new(PositionReadout::default()),
            }),
            task: Mutex::new(None),
        }
    }

    /// Start the poll timer. A no-op when already running, so repeated
    /// start clicks never stack duplicate timers.
    pub async fn start(&self) {
        let mut task = self.task.lock().await;
        if task.is_some() {
            debug!("poller already running");
            return;
        }

        let inner = Arc::clone(&self.inner);
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(inner.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(error) = inner.tick().await {
                    warn!(%error, "poll refresh failed; keeping the timer alive");
                }
            }
        }));
    }

    /// Stop the poll timer. A no-op when already stopped. An in-flight
    /// response that lands afterwards just replaces the cache snapshot,
    /// which is harmless.
    pub async fn stop(&self) {
        if let Some(task) = self.task.lock().await.take() {
            task.abort();
        }
    }

    pub async fn is_running(&self) -> bool {
        self.task.lock().await.is_some()
    }

    /// One reconciliation pass, directly callable by tests instead of
    /// waiting on real time.
    pub async fn tick(&self) -> Result<(), StoreError> {
        self.inner.tick().await
    }

    /// Called by the display layer when a coordinate input gains focus.
    pub fn begin_edit(&self) {
        self.inner.editing.store(true, Ordering::Release);
    }

    /// Called on blur; the next tick resynchronizes the readout.
    pub fn end_edit(&self) {
        self.inner.editing.store(false, Ordering::Release);
    }

    pub fn is_editing(&self) -> bool {
        self.inner.editing.load(Ordering::Acquire)
    }

    pub async fn position_readout(&self) -> PositionReadout {
        *self.inner.readout.read().await
    }
}

impl PollerInner {
    async fn tick(&self) -> Result<(), StoreError> {
        self.cache.refresh().await?;

        if self.editing.load(Ordering::Acquire) {
            debug!("coordinate inputs focused; readout left untouched");
            return Ok(());
        }

        if let Some(arm) = self.cache.find_by_type(DeviceType::RobotArm).await {
            *self.readout.write().await = PositionReadout::from(&arm);
        }

        Ok(())
    }
}
