//! Vehicle-to-vehicle safety signaling over a noisy optical medium.
//!
//! Vehicles publish their kinematic status and, on hard braking, an
//! emergency alert. Messages travel as noisy sample sequences
//! ([`communication::codec`]) over a shared [`communication::OpticalChannel`];
//! each [`engine::Vehicle`] runs a listener task that decodes what it hears
//! and brakes when a peer does.

pub mod communication;
pub mod config;
pub mod engine;
pub mod error;
pub mod global_variables;
pub mod models;
pub mod monitoring;

pub use config::{ChannelProfile, DeliveryMode, SimulationConfig};
pub use error::{DecodeError, V2vError, V2vResult};
