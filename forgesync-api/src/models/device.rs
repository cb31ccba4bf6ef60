use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A single point of a weld trajectory, `[x, y, z]`.
pub type WeldPoint = [f64; 3];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    /// Six-axis welding arm
    RobotArm,
    /// Fume extraction fan
    Fan,
    /// Part feed conveyor
    Conveyor,
    /// Passive environment sensor
    Sensor,
}

impl DeviceType {
    /// Only the welding arm ever moves or welds; the rest of the fleet
    /// is limited to off/idle/emergency.
    pub fn supports_motion(self) -> bool {
        matches!(self, DeviceType::RobotArm)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Off,
    Idle,
    Moving,
    Welding,
    Emergency,
}

/// Canonical device record as stored by the remote registry.
///
/// Position and welding fields are meaningful only for [`DeviceType::RobotArm`];
/// other device types omit them on the wire and fall back to the serde
/// defaults here. `id` and `type` are immutable once the store has assigned
/// the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Store-assigned identifier
    pub id: String,
    /// Human label
    pub name: String,
    /// Device category
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    /// Current status
    pub status: DeviceStatus,
    /// Arm X coordinate
    #[serde(default)]
    pub position_x: i64,
    /// Arm Y coordinate
    #[serde(default)]
    pub position_y: i64,
    /// Arm Z coordinate
    #[serde(default)]
    pub position_z: i64,
    /// Latched emergency flag, independent of `status`
    #[serde(default)]
    pub emergency_stop: bool,
    /// Whether the arm is currently welding
    #[serde(default)]
    pub welding_active: bool,
    /// Trajectory of the last commanded weld, when any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weld_points: Option<Vec<WeldPoint>>,
    /// Stamped by the writer on every mutation
    #[serde(with = "time::serde::rfc3339")]
    pub last_update: OffsetDateTime,
}

impl DeviceRecord {
    /// Static demo fleet shown when the store is unreachable and no
    /// snapshot exists yet. Display-only data, never written back.
    pub fn placeholder_fleet() -> Vec<DeviceRecord> {
        let now = OffsetDateTime::now_utc();
        vec![
            DeviceRecord {
                id: "1".to_string(),
                name: "Primary welding arm".to_string(),
                device_type: DeviceType::RobotArm,
                status: DeviceStatus::Off,
                position_x: 0,
                position_y: 0,
                position_z: 0,
                emergency_stop: false,
                welding_active: false,
                weld_points: None,
                last_update: now,
            },
            DeviceRecord {
                id: "2".to_string(),
                name: "Extraction fan".to_string(),
                device_type: DeviceType::Fan,
                status: DeviceStatus::Idle,
                position_x: 0,
                position_y: 0,
                position_z: 0,
                emergency_stop: false,
                welding_active: false,
                weld_points: None,
                last_update: now,
            },
            DeviceRecord {
                id: "3".to_string(),
                name: "Line conveyor".to_string(),
                device_type: DeviceType::Conveyor,
                status: DeviceStatus::Off,
                position_x: 0,
                position_y: 0,
                position_z: 0,
                emergency_stop: false,
                welding_active: false,
                weld_points: None,
                last_update: now,
            },
        ]
    }
}

/// Create payload: everything but the store-assigned `id`.
///
/// `last_update` is optional so the store client can stamp it right before
/// the request goes out when the caller has not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDevice {
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub status: DeviceStatus,
    #[serde(default)]
    pub position_x: i64,
    #[serde(default)]
    pub position_y: i64,
    #[serde(default)]
    pub position_z: i64,
    #[serde(default)]
    pub emergency_stop: bool,
    #[serde(default)]
    pub welding_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weld_points: Option<Vec<WeldPoint>>,
    #[serde(
        with = "time::serde::rfc3339::option",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_update: Option<OffsetDateTime>,
}

impl NewDevice {
    pub fn new(name: impl Into<String>, device_type: DeviceType) -> Self {
        Self {
            name: name.into(),
            device_type,
            status: DeviceStatus::Off,
            position_x: 0,
            position_y: 0,
            position_z: 0,
            emergency_stop: false,
            welding_active: false,
            weld_points: None,
            last_update: None,
        }
    }

    /// Default arm record provisioned on first run when the registry holds
    /// no `robot_arm` yet.
    pub fn robot_arm() -> Self {
        Self::new("Primary welding arm", DeviceType::RobotArm)
    }

    /// Materialize the payload into a full record under a store-assigned id.
    pub fn into_record(self, id: String) -> DeviceRecord {
        DeviceRecord {
            id,
            name: self.name,
            device_type: self.device_type,
            status: self.status,
            position_x: self.position_x,
            position_y: self.position_y,
            position_z: self.position_z,
            emergency_stop: self.emergency_stop,
            welding_active: self.welding_active,
            weld_points: self.weld_points,
            last_update: self.last_update.unwrap_or_else(OffsetDateTime::now_utc),
        }
    }
}

/// Deletion acknowledgement returned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deletion {
    pub id: String,
    pub deleted: bool,
}
