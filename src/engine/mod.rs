// engine/mod.rs
pub mod dispatcher;
pub mod simulation;
pub mod vehicle_agent;

pub use dispatcher::{dispatch, Dispatch, EmergencyResponder};
pub use simulation::{build_convoy, run_convoy, ConvoyReport, VehicleReport};
pub use vehicle_agent::{ListenerStats, Vehicle};
