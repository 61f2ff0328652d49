//! A vehicle on the optical medium: kinematic state, a transmitter and a
//! listener task that reacts to what it hears.

use crate::communication::channel::{ChannelTap, OpticalChannel};
use crate::communication::codec::{decode_signal, Signal, SignalCodec};
use crate::communication::messages::{Message, VehicleId};
use crate::config::{KinematicsConfig, ListenerConfig, SimulationConfig};
use crate::engine::dispatcher::{dispatch, Dispatch, EmergencyResponder};
use crate::error::V2vResult;
use crate::models::vehicle::VehicleState;
use crate::monitoring::event_log::{EventSink, LogSink};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Duration;

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Derives an independent seed per vehicle and per random stream, so runs
/// with the same global seed are reproducible whatever the vehicle order.
fn derive_seed(global_seed: u64, name: &str, stream: u64) -> u64 {
    // FNV-1a over the vehicle name.
    let name_hash = name.bytes().fold(0xcbf2_9ce4_8422_2325u64, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x0000_0100_0000_01b3)
    });
    global_seed
        ^ name_hash.wrapping_mul(MIXING_CONSTANT)
        ^ stream.wrapping_mul(MIXING_CONSTANT >> 1)
}

const CODEC_STREAM: u64 = 1;
const DRIFT_STREAM: u64 = 2;

/// Counters of one listener.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ListenerStats {
    pub received: u64,
    pub decoded: u64,
    pub discarded: u64,
}

#[derive(Debug, Default)]
struct ListenerCounters {
    received: AtomicU64,
    decoded: AtomicU64,
    discarded: AtomicU64,
}

/// State only the vehicle itself mutates.
struct VehicleCore {
    state: VehicleState,
    codec: SignalCodec,
    drift_rng: StdRng,
}

struct VehicleInner {
    id: VehicleId,
    channel: Arc<OpticalChannel>,
    tap: ChannelTap,
    threshold: f64,
    kinematics: KinematicsConfig,
    listener: ListenerConfig,
    sink: Arc<dyn EventSink>,
    core: Mutex<VehicleCore>,
    counters: ListenerCounters,
}

/// Handle to a vehicle. Clones share the same vehicle.
#[derive(Clone)]
pub struct Vehicle {
    inner: Arc<VehicleInner>,
}

impl Vehicle {
    /// Vehicle with default parameters that reports to the log.
    pub fn new(name: impl Into<String>, channel: Arc<OpticalChannel>) -> V2vResult<Self> {
        Self::with_config(name, channel, &SimulationConfig::default(), Arc::new(LogSink))
    }

    /// Vehicle attached to `channel` with the given parameters.
    ///
    /// Under fan-out the vehicle's inbox exists from here on: every peer
    /// transmission is queued for it until a listener drains it or the
    /// listener shuts down and closes it. Vehicles that never listen should
    /// be dropped rather than kept around.
    pub fn with_config(
        name: impl Into<String>,
        channel: Arc<OpticalChannel>,
        config: &SimulationConfig,
        sink: Arc<dyn EventSink>,
    ) -> V2vResult<Self> {
        config.validate()?;
        let id = VehicleId::new(name);

        let (codec, drift_rng) = match config.seed {
            Some(seed) => (
                SignalCodec::seeded(
                    &config.channel,
                    derive_seed(seed, id.as_str(), CODEC_STREAM),
                )?,
                StdRng::seed_from_u64(derive_seed(seed, id.as_str(), DRIFT_STREAM)),
            ),
            None => (
                SignalCodec::from_entropy(&config.channel)?,
                StdRng::from_os_rng(),
            ),
        };

        let tap = channel.attach(&id);
        Ok(Self {
            inner: Arc::new(VehicleInner {
                id,
                channel,
                tap,
                threshold: config.channel.decode_threshold,
                kinematics: config.kinematics.clone(),
                listener: config.listener.clone(),
                sink,
                core: Mutex::new(VehicleCore {
                    state: VehicleState::new(config.kinematics.initial_speed_mps),
                    codec,
                    drift_rng,
                }),
                counters: ListenerCounters::default(),
            }),
        })
    }

    pub fn id(&self) -> &VehicleId {
        &self.inner.id
    }

    /// Snapshot of the kinematic state.
    pub fn state(&self) -> VehicleState {
        self.core().state.clone()
    }

    pub fn set_hazard(&self, hazard: impl Into<String>) {
        self.core().state.hazard = hazard.into();
    }

    pub fn stats(&self) -> ListenerStats {
        let counters = &self.inner.counters;
        ListenerStats {
            received: counters.received.load(Ordering::Relaxed),
            decoded: counters.decoded.load(Ordering::Relaxed),
            discarded: counters.discarded.load(Ordering::Relaxed),
        }
    }

    fn core(&self) -> MutexGuard<'_, VehicleCore> {
        self.inner.core.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Advances the kinematics one step without transmitting.
    pub fn update(&self, brake: bool) {
        let mut core = self.core();
        let VehicleCore {
            state, drift_rng, ..
        } = &mut *core;
        state.update(brake, &self.inner.kinematics, drift_rng);
    }

    /// Updates the kinematics and announces the result: a STATUS message, or
    /// an EMERGENCY_BRAKE message when `brake` is set. Returns what was sent.
    pub fn broadcast(&self, brake: bool) -> V2vResult<Message> {
        let mut core = self.core();
        self.announce(&mut core, brake)
    }

    fn announce(&self, core: &mut VehicleCore, brake: bool) -> V2vResult<Message> {
        let VehicleCore {
            state,
            codec,
            drift_rng,
        } = core;
        state.update(brake, &self.inner.kinematics, drift_rng);

        let message = if brake {
            Message::emergency_brake(self.inner.id.clone())
        } else {
            state.status_message(&self.inner.id)
        };
        let signal = codec.encode(&message)?;
        // Sent while the core is locked so one vehicle's signals leave in update order.
        self.inner.channel.transmit(&self.inner.id, signal);
        debug!(
            "{} broadcast {} (speed={:.2} m/s)",
            self.inner.id,
            message.kind(),
            state.speed
        );
        Ok(message)
    }

    /// Spawns the listener task. It runs until `shutdown` turns `true` or its
    /// sender is dropped, then closes the vehicle's fan-out inbox.
    pub fn start(&self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.clone().run_listener(shutdown))
    }

    pub async fn run_listener(self, mut shutdown: watch::Receiver<bool>) {
        let wait = self.inner.listener.receive_timeout();
        info!("[ADAS {}] listening", self.inner.id);
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                received = self.inner.tap.receive(wait) => {
                    if let Some(signal) = received {
                        self.handle_signal(&signal);
                    }
                }
            }
        }
        self.inner.tap.close().await;
        info!("[ADAS {}] listener stopped", self.inner.id);
    }

    /// Waits once for a signal and handles it. `None` when nothing arrived
    /// or the signal did not decode.
    pub async fn listen_once(&self, wait: Duration) -> Option<Dispatch> {
        let signal = self.inner.tap.receive(wait).await?;
        self.handle_signal(&signal)
    }

    /// Decodes a received signal and dispatches it. Undecodable signals are
    /// counted and dropped.
    pub fn handle_signal(&self, signal: &Signal) -> Option<Dispatch> {
        let counters = &self.inner.counters;
        counters.received.fetch_add(1, Ordering::Relaxed);
        match decode_signal(signal, self.inner.threshold) {
            Ok(message) => {
                counters.decoded.fetch_add(1, Ordering::Relaxed);
                Some(dispatch(self, &message, self.inner.sink.as_ref()))
            }
            Err(e) => {
                counters.discarded.fetch_add(1, Ordering::Relaxed);
                debug!("[ADAS {}] discarded signal: {}", self.inner.id, e);
                None
            }
        }
    }
}

impl EmergencyResponder for Vehicle {
    fn vehicle_id(&self) -> &VehicleId {
        self.id()
    }

    fn emergency_brake(&self) -> V2vResult<bool> {
        let mut core = self.core();
        if self.inner.listener.cascade_guard && core.state.braking {
            let VehicleCore {
                state, drift_rng, ..
            } = &mut *core;
            state.update(true, &self.inner.kinematics, drift_rng);
            debug!("[ADAS {}] already braking, alert not repeated", self.inner.id);
            return Ok(false);
        }
        self.announce(&mut core, true)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::messages::MessageKind;
    use crate::config::{ChannelProfile, DeliveryMode};
    use crate::monitoring::event_log::MemorySink;

    const WAIT: Duration = Duration::from_millis(100);

    fn clear_config(delivery: DeliveryMode) -> SimulationConfig {
        SimulationConfig {
            delivery,
            seed: Some(2024),
            channel: ChannelProfile::clear_air(),
            ..SimulationConfig::default()
        }
    }

    fn vehicle(name: &str, channel: &Arc<OpticalChannel>, config: &SimulationConfig) -> Vehicle {
        Vehicle::with_config(name, channel.clone(), config, Arc::new(MemorySink::new())).unwrap()
    }

    #[test]
    fn seeds_differ_per_vehicle_and_stream() {
        assert_ne!(derive_seed(1, "CarA", CODEC_STREAM), derive_seed(1, "CarB", CODEC_STREAM));
        assert_ne!(derive_seed(1, "CarA", CODEC_STREAM), derive_seed(1, "CarA", DRIFT_STREAM));
        assert_eq!(derive_seed(9, "CarC", DRIFT_STREAM), derive_seed(9, "CarC", DRIFT_STREAM));
    }

    #[test]
    fn update_follows_brake_flag() {
        let config = clear_config(DeliveryMode::FanOut);
        let channel = Arc::new(OpticalChannel::new(config.delivery));
        let car = vehicle("CarA", &channel, &config);

        car.update(true);
        let state = car.state();
        assert!(state.braking);
        assert_eq!(state.acceleration, -8.0);

        car.update(false);
        assert!(!car.state().braking);
        assert_eq!(channel.transmitted(), 0);
    }

    #[tokio::test]
    async fn broadcast_sends_status_or_emergency() {
        let config = clear_config(DeliveryMode::FanOut);
        let channel = Arc::new(OpticalChannel::new(config.delivery));
        let car = vehicle("CarA", &channel, &config);
        let observer = channel.attach(&VehicleId::from("Observer"));

        car.set_hazard("fog");
        assert_eq!(car.broadcast(false).unwrap().kind(), MessageKind::Status);
        assert_eq!(car.broadcast(true).unwrap().kind(), MessageKind::EmergencyBrake);

        let threshold = config.channel.decode_threshold;
        let first = decode_signal(&observer.receive(WAIT).await.unwrap(), threshold).unwrap();
        let second = decode_signal(&observer.receive(WAIT).await.unwrap(), threshold).unwrap();
        assert_eq!(first.kind(), MessageKind::Status);
        assert_eq!(second.kind(), MessageKind::EmergencyBrake);
        assert_eq!(second.sender_id, VehicleId::from("CarA"));
    }

    #[tokio::test]
    async fn garbage_is_counted_and_dropped() {
        let config = clear_config(DeliveryMode::FanOut);
        let channel = Arc::new(OpticalChannel::new(config.delivery));
        let car = vehicle("CarB", &channel, &config);

        assert_eq!(car.handle_signal(&Signal::from_samples(vec![9.0; 19])), None);
        assert_eq!(car.handle_signal(&Signal::from_samples(Vec::new())), None);
        assert_eq!(
            car.stats(),
            ListenerStats {
                received: 2,
                decoded: 0,
                discarded: 2
            }
        );
    }

    #[tokio::test]
    async fn cascade_guard_suppresses_repeat_alerts() {
        let config = clear_config(DeliveryMode::FanOut);
        let channel = Arc::new(OpticalChannel::new(config.delivery));
        let car = vehicle("CarB", &channel, &config);

        assert!(car.emergency_brake().unwrap());
        let after_first = car.state().speed;
        assert!(!car.emergency_brake().unwrap());
        assert_eq!(channel.transmitted(), 1);

        // The repeat alert is not re-announced but still brakes.
        let after_second = car.state();
        assert!(after_second.braking);
        assert_eq!(after_second.acceleration, -8.0);
        assert!((after_first - after_second.speed - 0.8).abs() < 1e-9);

        car.broadcast(false).unwrap();
        assert!(car.emergency_brake().unwrap());
        assert_eq!(channel.transmitted(), 3);
    }

    #[tokio::test]
    async fn without_guard_every_alert_is_repeated() {
        let mut config = clear_config(DeliveryMode::FanOut);
        config.listener.cascade_guard = false;
        let channel = Arc::new(OpticalChannel::new(config.delivery));
        let car = vehicle("CarB", &channel, &config);

        assert!(car.emergency_brake().unwrap());
        assert!(car.emergency_brake().unwrap());
        assert_eq!(channel.transmitted(), 2);
    }

    #[tokio::test]
    async fn listener_stops_on_shutdown() {
        let config = clear_config(DeliveryMode::FanOut);
        let channel = Arc::new(OpticalChannel::new(config.delivery));
        let car = vehicle("CarB", &channel, &config);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = car.start(shutdown_rx);
        shutdown_tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("listener did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn stopped_listener_no_longer_collects_signals() {
        let config = clear_config(DeliveryMode::FanOut);
        let channel = Arc::new(OpticalChannel::new(config.delivery));
        let car_a = vehicle("CarA", &channel, &config);
        let car_b = vehicle("CarB", &channel, &config);
        assert_eq!(channel.listener_count(), 2);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = car_b.start(shutdown_rx);
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("listener did not stop")
            .unwrap();

        assert_eq!(channel.listener_count(), 1);
        car_a.broadcast(false).unwrap();
        assert_eq!(channel.delivered(), 0);
        assert_eq!(car_b.listen_once(WAIT).await, None);
    }

    #[tokio::test]
    async fn listener_stops_when_shutdown_sender_is_dropped() {
        let config = clear_config(DeliveryMode::FanOut);
        let channel = Arc::new(OpticalChannel::new(config.delivery));
        let car = vehicle("CarC", &channel, &config);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = car.start(shutdown_rx);
        drop(shutdown_tx);

        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("listener did not stop")
            .unwrap();
    }
}
