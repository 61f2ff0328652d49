use crate::global_variables::WIRE_VERSION;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Name a vehicle announces itself with, e.g. `CarA`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VehicleId(pub String);

impl VehicleId {
    pub fn new(name: impl Into<String>) -> Self {
        VehicleId(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VehicleId {
    fn from(name: &str) -> Self {
        VehicleId(name.to_string())
    }
}

/// Type-specific payload. The `type` tag decides which fields exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageBody {
    Status {
        speed_mps: f64,
        accel_mps2: f64,
        braking: bool,
        hazard: String,
    },
    EmergencyBrake,
}

/// A V2V message as it travels on the wire.
///
/// Serialized as one flat JSON record, for example
/// `{"v":1,"from":"CarA","ts":1700000000000,"type":"EMERGENCY_BRAKE"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "v")]
    pub version: u8,
    #[serde(rename = "from")]
    pub sender_id: VehicleId,
    /// Milliseconds since the Unix epoch.
    #[serde(rename = "ts")]
    pub timestamp: u64,
    #[serde(flatten)]
    pub body: MessageBody,
}

impl Message {
    pub fn status(
        sender_id: VehicleId,
        speed_mps: f64,
        accel_mps2: f64,
        braking: bool,
        hazard: impl Into<String>,
    ) -> Self {
        Self {
            version: WIRE_VERSION,
            sender_id,
            timestamp: current_timestamp_millis(),
            body: MessageBody::Status {
                speed_mps: round2(speed_mps),
                accel_mps2: round2(accel_mps2),
                braking,
                hazard: hazard.into(),
            },
        }
    }

    pub fn emergency_brake(sender_id: VehicleId) -> Self {
        Self {
            version: WIRE_VERSION,
            sender_id,
            timestamp: current_timestamp_millis(),
            body: MessageBody::EmergencyBrake,
        }
    }

    pub fn kind(&self) -> MessageKind {
        match self.body {
            MessageBody::Status { .. } => MessageKind::Status,
            MessageBody::EmergencyBrake => MessageKind::EmergencyBrake,
        }
    }

    pub fn is_emergency(&self) -> bool {
        self.kind() == MessageKind::EmergencyBrake
    }
}

/// Payload-free discriminant of a message, handy for comparisons and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Status,
    EmergencyBrake,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MessageKind::Status => write!(f, "STATUS"),
            MessageKind::EmergencyBrake => write!(f, "EMERGENCY_BRAKE"),
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn current_timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
