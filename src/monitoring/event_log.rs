use crate::communication::messages::{current_timestamp_millis, VehicleId};
use crate::error::V2vResult;
use log::{info, warn};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// What a listener did with a message it classified.
#[derive(Debug, Clone, PartialEq)]
pub enum AdasEventKind {
    Status { speed_mps: f64 },
    EmergencyBrake { rebroadcast: bool },
}

/// One observable reaction of a listening vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct AdasEvent {
    pub timestamp: u64,
    pub listener: VehicleId,
    pub sender: VehicleId,
    pub kind: AdasEventKind,
}

impl AdasEvent {
    pub fn new(listener: &VehicleId, sender: &VehicleId, kind: AdasEventKind) -> Self {
        Self {
            timestamp: current_timestamp_millis(),
            listener: listener.clone(),
            sender: sender.clone(),
            kind,
        }
    }

    pub fn is_emergency(&self) -> bool {
        matches!(self.kind, AdasEventKind::EmergencyBrake { .. })
    }
}

/// Destination for ADAS events. Implementations must be callable from any
/// listener task.
pub trait EventSink: Send + Sync {
    fn record(&self, event: &AdasEvent);
}

/// Writes events through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn record(&self, event: &AdasEvent) {
        match event.kind {
            AdasEventKind::Status { speed_mps } => info!(
                "[ADAS {}] STATUS from {}: speed={} m/s",
                event.listener, event.sender, speed_mps
            ),
            AdasEventKind::EmergencyBrake { rebroadcast: true } => warn!(
                "[ADAS {}] EMERGENCY_BRAKE from {} -- AUTO-BRAKE ACTIVATED!",
                event.listener, event.sender
            ),
            AdasEventKind::EmergencyBrake { rebroadcast: false } => warn!(
                "[ADAS {}] EMERGENCY_BRAKE from {} -- already braking",
                event.listener, event.sender
            ),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<AdasEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AdasEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn emergencies(&self) -> Vec<AdasEvent> {
        self.events()
            .into_iter()
            .filter(AdasEvent::is_emergency)
            .collect()
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: &AdasEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}

/// Flat CSV row for an event.
#[derive(Debug, Serialize)]
struct AdasEventRecord<'a> {
    timestamp: u64,
    listener: &'a str,
    sender: &'a str,
    kind: &'static str,
    speed_mps: Option<f64>,
    rebroadcast: Option<bool>,
}

impl<'a> From<&'a AdasEvent> for AdasEventRecord<'a> {
    fn from(event: &'a AdasEvent) -> Self {
        let (kind, speed_mps, rebroadcast) = match event.kind {
            AdasEventKind::Status { speed_mps } => ("STATUS", Some(speed_mps), None),
            AdasEventKind::EmergencyBrake { rebroadcast } => {
                ("EMERGENCY_BRAKE", None, Some(rebroadcast))
            }
        };
        Self {
            timestamp: event.timestamp,
            listener: event.listener.as_str(),
            sender: event.sender.as_str(),
            kind,
            speed_mps,
            rebroadcast,
        }
    }
}

/// Appends events to a CSV file, writing the header only for a new file.
pub struct CsvSink {
    writer: Mutex<csv::Writer<File>>,
}

impl CsvSink {
    pub fn open(path: &Path) -> V2vResult<Self> {
        let file_exists = path.exists();
        let file = OpenOptions::new().append(true).create(true).open(path)?;
        let writer = csv::WriterBuilder::new()
            .has_headers(!file_exists)
            .from_writer(file);
        Ok(Self {
            writer: Mutex::new(writer),
        })
    }

    fn write(&self, event: &AdasEvent) -> V2vResult<()> {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        writer.serialize(AdasEventRecord::from(event))?;
        writer.flush()?;
        Ok(())
    }
}

impl EventSink for CsvSink {
    fn record(&self, event: &AdasEvent) {
        if let Err(e) = self.write(event) {
            warn!("Error logging ADAS event: {}", e);
        }
    }
}

/// Forwards every event to several sinks.
pub struct TeeSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl TeeSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

impl EventSink for TeeSink {
    fn record(&self, event: &AdasEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}
