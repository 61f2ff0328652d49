// channel_probe_main.rs
use optical_v2v::communication::messages::{Message, VehicleId};
use optical_v2v::config::SimulationConfig;
use optical_v2v::monitoring::link_quality::measure_link_quality;
use std::path::Path;

const BIT_DRAWS: usize = 100_000;
const MESSAGE_TRIALS: usize = 1_000;

fn main() {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => match SimulationConfig::load(Path::new(&path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Config error: {}", e);
                std::process::exit(1);
            }
        },
        None => SimulationConfig::default(),
    };
    let seed = config.seed.unwrap_or(0);
    let profile = &config.channel;
    println!("Channel profile: {:?}", profile);

    let probes = [
        Message::status(VehicleId::from("CarA"), 25.0, 0.12, false, ""),
        Message::emergency_brake(VehicleId::from("CarA")),
    ];
    for probe in &probes {
        match measure_link_quality(profile, probe, BIT_DRAWS, MESSAGE_TRIALS, seed) {
            Ok(quality) => println!(
                "{:<16} one-detect={:.4} false-one={:.4} message-success={:.4}",
                probe.kind().to_string(),
                quality.one_detect_rate,
                quality.false_one_rate,
                quality.message_success_rate
            ),
            Err(e) => {
                eprintln!("Probe error: {}", e);
                std::process::exit(1);
            }
        }
    }
}
