// convoy_main.rs
use optical_v2v::config::SimulationConfig;
use optical_v2v::engine::run_convoy;
use optical_v2v::monitoring::event_log::{CsvSink, EventSink, LogSink, TeeSink};
use optical_v2v::V2vResult;
use std::path::Path;
use std::sync::Arc;

fn load_config() -> V2vResult<SimulationConfig> {
    match std::env::args().nth(1) {
        Some(path) => SimulationConfig::load(Path::new(&path)),
        None => Ok(SimulationConfig::default()),
    }
}

fn build_sink(config: &SimulationConfig) -> V2vResult<Arc<dyn EventSink>> {
    match &config.demo.event_log {
        Some(path) => {
            let sinks: Vec<Arc<dyn EventSink>> =
                vec![Arc::new(LogSink), Arc::new(CsvSink::open(path)?)];
            Ok(Arc::new(TeeSink::new(sinks)))
        }
        None => Ok(Arc::new(LogSink)),
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {}", e);
            std::process::exit(1);
        }
    };
    let sink = match build_sink(&config) {
        Ok(sink) => sink,
        Err(e) => {
            eprintln!("Event log error: {}", e);
            std::process::exit(1);
        }
    };

    println!(
        "Convoy demo: {} will hard-brake on tick {}, the others should auto-react ({:?} delivery).\n",
        config.demo.brake_vehicle, config.demo.brake_tick, config.delivery
    );

    match run_convoy(&config, sink).await {
        Ok(report) => {
            println!(
                "\nDemo finished after {} ticks: {} transmissions, {} deliveries.",
                report.ticks, report.transmitted, report.delivered
            );
            for vehicle in &report.vehicles {
                println!(
                    "  {:<6} speed={:>6.2} m/s braking={:<5} heard={} decoded={} discarded={}",
                    vehicle.name,
                    vehicle.state.speed,
                    vehicle.state.braking,
                    vehicle.listener.received,
                    vehicle.listener.decoded,
                    vehicle.listener.discarded
                );
            }
        }
        Err(e) => {
            eprintln!("Simulation error: {}", e);
            std::process::exit(1);
        }
    }
}
