use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use forgesync_api::models::{Deletion, DeviceRecord, NewDevice};
use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::debug;

/// In-memory stand-in for the remote CRUD device registry.
///
/// Implements the same HTTP contract the real backend exposes, plus a few
/// knobs for tests: blanket failure, per-id PUT failure and the backend's
/// single-record quirk where a collection GET returns a bare object.
pub struct MockStore {
    devices: RwLock<Vec<DeviceRecord>>,
    next_id: AtomicU64,
    fail_all: AtomicBool,
    failing_ids: RwLock<HashSet<String>>,
    unwrap_single: AtomicBool,
}

impl MockStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            devices: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            fail_all: AtomicBool::new(false),
            failing_ids: RwLock::new(HashSet::new()),
            unwrap_single: AtomicBool::new(false),
        })
    }

    pub async fn with_seed(devices: Vec<DeviceRecord>) -> Arc<Self> {
        let store = Self::new();
        store.seed(devices).await;
        store
    }

    /// Replace the device list, advancing the id counter past any numeric
    /// seeded ids so later creates never collide.
    pub async fn seed(&self, devices: Vec<DeviceRecord>) {
        let max_id = devices
            .iter()
            .filter_map(|device| device.id.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        self.next_id.store(max_id + 1, Ordering::SeqCst);
        *self.devices.write().await = devices;
    }

    /// When set, every request answers 500.
    pub fn fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Make updates for one device id answer 500, for partial-failure
    /// scenarios.
    pub async fn fail_id(&self, id: &str) {
        self.failing_ids.write().await.insert(id.to_string());
    }

    pub async fn clear_failures(&self) {
        self.fail_all(false);
        self.failing_ids.write().await.clear();
    }

    /// When set and exactly one device exists, the collection GET returns
    /// the bare object instead of a one-element array.
    pub fn unwrap_single(&self, on: bool) {
        self.unwrap_single.store(on, Ordering::SeqCst);
    }

    pub async fn snapshot(&self) -> Vec<DeviceRecord> {
        self.devices.read().await.clone()
    }

    pub fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .route("/api/v1/devices", get(list_devices).post(create_device))
            .route(
                "/api/v1/devices/:id",
                get(get_device).put(update_device).delete(delete_device),
            )
            .with_state(self.clone())
    }

    /// Bind an ephemeral port and serve in the background; returns the
    /// collection base URL and the server task.
    pub async fn spawn(self: &Arc<Self>) -> (String, JoinHandle<()>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock store listener.");
        let addr = listener.local_addr().expect("Failed to read local addr.");
        let router = self.router();

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        (format!("http://{addr}/api/v1/devices"), handle)
    }
}

async fn list_devices(State(store): State<Arc<MockStore>>) -> Result<Json<Value>, StatusCode> {
    reject_when_failing(&store)?;

    let devices = store.devices.read().await.clone();
    if store.unwrap_single.load(Ordering::SeqCst) && devices.len() == 1 {
        let single =
            serde_json::to_value(&devices[0]).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        return Ok(Json(single));
    }

    let many = serde_json::to_value(&devices).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(many))
}

async fn get_device(
    State(store): State<Arc<MockStore>>,
    Path(id): Path<String>,
) -> Result<Json<DeviceRecord>, StatusCode> {
    reject_when_failing(&store)?;

    store
        .devices
        .read()
        .await
        .iter()
        .find(|device| device.id == id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn create_device(
    State(store): State<Arc<MockStore>>,
    Json(body): Json<NewDevice>,
) -> Result<(StatusCode, Json<DeviceRecord>), StatusCode> {
    reject_when_failing(&store)?;

    let id = store.next_id.fetch_add(1, Ordering::SeqCst).to_string();
    let record = body.into_record(id);
    debug!(id = %record.id, name = %record.name, "created device");

    store.devices.write().await.push(record.clone());
    Ok((StatusCode::CREATED, Json(record)))
}

async fn update_device(
    State(store): State<Arc<MockStore>>,
    Path(id): Path<String>,
    Json(mut body): Json<DeviceRecord>,
) -> Result<Json<DeviceRecord>, StatusCode> {
    reject_when_failing(&store)?;
    if store.failing_ids.read().await.contains(&id) {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    // The path id is authoritative, like the real backend.
    body.id = id.clone();

    let mut devices = store.devices.write().await;
    let slot = devices
        .iter_mut()
        .find(|device| device.id == id)
        .ok_or(StatusCode::NOT_FOUND)?;
    *slot = body.clone();
    debug!(id = %id, status = ?body.status, "updated device");
    Ok(Json(body))
}

async fn delete_device(
    State(store): State<Arc<MockStore>>,
    Path(id): Path<String>,
) -> Result<Json<Deletion>, StatusCode> {
    reject_when_failing(&store)?;

    let mut devices = store.devices.write().await;
    let before = devices.len();
    devices.retain(|device| device.id != id);
    if devices.len() == before {
        return Err(StatusCode::NOT_FOUND);
    }

    debug!(id = %id, "deleted device");
    Ok(Json(Deletion { id, deleted: true }))
}

fn reject_when_failing(store: &MockStore) -> Result<(), StatusCode> {
    if store.fail_all.load(Ordering::SeqCst) {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    Ok(())
}

/// Seed fleet served by the standalone binary.
pub fn default_fleet() -> Vec<DeviceRecord> {
    let now = OffsetDateTime::now_utc();
    DeviceRecord::placeholder_fleet()
        .into_iter()
        .map(|mut device| {
            device.last_update = now;
            device
        })
        .collect()
}
