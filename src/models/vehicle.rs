use crate::communication::messages::{Message, VehicleId};
use crate::config::KinematicsConfig;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Kinematic state a vehicle reports about itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    /// Meters per second, never negative.
    pub speed: f64,
    /// Meters per second squared.
    pub acceleration: f64,
    pub braking: bool,
    pub hazard: String,
}

impl VehicleState {
    pub fn new(initial_speed: f64) -> Self {
        Self {
            speed: initial_speed.max(0.0),
            acceleration: 0.0,
            braking: false,
            hazard: String::new(),
        }
    }

    /// Advances the state by one simulation step.
    ///
    /// A hard brake applies the configured emergency deceleration; otherwise
    /// the acceleration drifts uniformly within `±drift`. Speed is clamped at
    /// zero since vehicles never reverse.
    pub fn update<R: Rng>(&mut self, brake: bool, kinematics: &KinematicsConfig, rng: &mut R) {
        if brake {
            self.acceleration = kinematics.emergency_decel_mps2;
            self.braking = true;
        } else {
            let drift = kinematics.drift_mps2;
            self.acceleration = rng.random_range(-drift..=drift);
            self.braking = false;
        }
        self.speed = (self.speed + self.acceleration * kinematics.time_step_s).max(0.0);
    }

    pub fn status_message(&self, sender: &VehicleId) -> Message {
        Message::status(
            sender.clone(),
            self.speed,
            self.acceleration,
            self.braking,
            self.hazard.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::messages::MessageBody;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn hard_brake_sets_deceleration_and_flag() {
        let kinematics = KinematicsConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut state = VehicleState::new(25.0);

        state.update(true, &kinematics, &mut rng);
        assert!(state.braking);
        assert_eq!(state.acceleration, -8.0);
        assert!((state.speed - 24.2).abs() < 1e-9);

        state.update(false, &kinematics, &mut rng);
        assert!(!state.braking);
        assert!(state.acceleration.abs() <= 0.5);
    }

    #[test]
    fn speed_never_goes_negative() {
        let kinematics = KinematicsConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        let mut state = VehicleState::new(1.0);

        for step in 0..5_000 {
            let brake = rng.random_bool(0.4) || step % 7 == 0;
            state.update(brake, &kinematics, &mut rng);
            assert!(state.speed >= 0.0, "negative speed at step {step}");
        }
    }

    #[test]
    fn braking_to_a_stop_clamps_at_zero() {
        let kinematics = KinematicsConfig::default();
        let mut rng = StdRng::seed_from_u64(0);
        let mut state = VehicleState::new(0.5);
        state.update(true, &kinematics, &mut rng);
        assert_eq!(state.speed, 0.0);
    }

    #[test]
    fn zero_drift_keeps_cruise_speed() {
        let kinematics = KinematicsConfig {
            drift_mps2: 0.0,
            ..KinematicsConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(0);
        let mut state = VehicleState::new(20.0);
        state.update(false, &kinematics, &mut rng);
        assert_eq!(state.speed, 20.0);
    }

    #[test]
    fn status_message_reflects_state() {
        let mut state = VehicleState::new(12.346);
        state.hazard = "debris".to_string();
        let msg = state.status_message(&VehicleId::from("CarC"));
        assert_eq!(msg.sender_id, VehicleId::from("CarC"));
        match msg.body {
            MessageBody::Status { speed_mps, hazard, braking, .. } => {
                assert_eq!(speed_mps, 12.35);
                assert_eq!(hazard, "debris");
                assert!(!braking);
            }
            MessageBody::EmergencyBrake => panic!("expected a status message"),
        }
    }
}
