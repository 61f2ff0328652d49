// src/engine/simulation.rs
use crate::communication::channel::OpticalChannel;
use crate::config::SimulationConfig;
use crate::engine::vehicle_agent::{ListenerStats, Vehicle};
use crate::error::{V2vError, V2vResult};
use crate::models::vehicle::VehicleState;
use crate::monitoring::event_log::EventSink;
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{sleep, Duration};

/// Final picture of one vehicle after a convoy run.
#[derive(Debug, Clone, Serialize)]
pub struct VehicleReport {
    pub name: String,
    pub state: VehicleState,
    pub listener: ListenerStats,
}

/// Outcome of a convoy run.
#[derive(Debug, Clone, Serialize)]
pub struct ConvoyReport {
    pub ticks: u32,
    pub transmitted: u64,
    pub delivered: u64,
    pub vehicles: Vec<VehicleReport>,
}

impl ConvoyReport {
    pub fn vehicle(&self, name: &str) -> Option<&VehicleReport> {
        self.vehicles.iter().find(|v| v.name == name)
    }
}

/// Builds one vehicle per configured name on a shared channel.
pub fn build_convoy(
    config: &SimulationConfig,
    sink: Arc<dyn EventSink>,
) -> V2vResult<(Arc<OpticalChannel>, Vec<Vehicle>)> {
    config.validate()?;
    if config.demo.vehicles.is_empty() {
        return Err(V2vError::Config("demo.vehicles must name at least one vehicle".to_string()));
    }
    let channel = Arc::new(OpticalChannel::new(config.delivery));
    let vehicles = config
        .demo
        .vehicles
        .iter()
        .map(|name| Vehicle::with_config(name.clone(), channel.clone(), config, sink.clone()))
        .collect::<V2vResult<Vec<_>>>()?;
    Ok((channel, vehicles))
}

/// Drives the convoy: listeners first, then every vehicle broadcasts once per
/// tick, with `demo.brake_vehicle` hard-braking on `demo.brake_tick`.
/// Listeners are shut down once the last tick has elapsed.
pub async fn run_convoy(
    config: &SimulationConfig,
    sink: Arc<dyn EventSink>,
) -> V2vResult<ConvoyReport> {
    let (channel, vehicles) = build_convoy(config, sink)?;
    let demo = &config.demo;
    if !vehicles.iter().any(|v| v.id().as_str() == demo.brake_vehicle) {
        warn!("brake vehicle {} is not part of the convoy", demo.brake_vehicle);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let listeners: Vec<_> = vehicles
        .iter()
        .map(|vehicle| vehicle.start(shutdown_rx.clone()))
        .collect();

    let interval = Duration::from_millis(demo.tick_interval_ms);
    for tick in 0..demo.ticks {
        for vehicle in &vehicles {
            let brake = tick == demo.brake_tick && vehicle.id().as_str() == demo.brake_vehicle;
            if brake {
                info!("{} triggers EMERGENCY BRAKE on tick {}", vehicle.id(), tick);
            }
            vehicle.broadcast(brake)?;
        }
        sleep(interval).await;
    }

    // A closed shutdown channel stops the listeners as well, so the send result is irrelevant.
    let _ = shutdown_tx.send(true);
    for listener in listeners {
        if let Err(e) = listener.await {
            warn!("listener task ended abnormally: {}", e);
        }
    }

    Ok(ConvoyReport {
        ticks: demo.ticks,
        transmitted: channel.transmitted(),
        delivered: channel.delivered(),
        vehicles: vehicles
            .iter()
            .map(|vehicle| VehicleReport {
                name: vehicle.id().to_string(),
                state: vehicle.state(),
                listener: vehicle.stats(),
            })
            .collect(),
    })
}
