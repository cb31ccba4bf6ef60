//! Control core for a small welding cell (arm, fan, conveyor) backed by a
//! remote REST-like device registry.
//!
//! The display layer is an external collaborator: it reads snapshots from
//! the [`services::DeviceCache`], issues intents through the
//! [`services::CommandDispatcher`] and owns the edit flag consumed by the
//! [`services::StatusPoller`].

use std::sync::Arc;

use forgesync_api::models::DeviceRecord;
use tracing::{error, info, warn};

use crate::configs::Settings;
use crate::services::{CommandDispatcher, DeviceCache, StatusPoller, StoreClient};

pub mod configs;
pub mod errors;
pub mod services;

pub async fn run(settings: &Arc<Settings>) {
    let store = Arc::new(StoreClient::new(
        &settings.store.base_url,
        settings.store.timeout(),
    ));
    let cache = Arc::new(DeviceCache::new(store.clone()));
    let dispatcher = CommandDispatcher::new(store.clone(), cache.clone());
    let poller = StatusPoller::new(cache.clone(), settings.poller.interval());

    match dispatcher.ensure_robot_arm().await {
        Ok(arm) => info!(id = %arm.id, name = %arm.name, "welding arm online"),
        Err(error) => {
            warn!(%error, "store unreachable; showing placeholder fleet until a poll succeeds");
            for device in DeviceRecord::placeholder_fleet() {
                info!(name = %device.name, status = ?device.status, "placeholder device");
            }
        }
    }

    poller.start().await;
    info!(
        store = %store.base_url(),
        interval_ms = settings.poller.interval().as_millis() as u64,
        "status polling started"
    );

    if let Err(error) = tokio::signal::ctrl_c().await {
        error!(%error, "failed to listen for shutdown signal");
    }

    poller.stop().await;
    info!("status polling stopped");
}
