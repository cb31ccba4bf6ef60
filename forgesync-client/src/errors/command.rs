use forgesync_api::models::DeviceType;

use super::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("no {0:?} registered in the device cache")]
    DeviceNotFound(DeviceType),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{name} ({id}) is emergency stopped; reset the emergency before commanding it")]
    EmergencyActive { id: String, name: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}
