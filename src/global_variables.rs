// Kinematics
pub const DEFAULT_INITIAL_SPEED_MPS: f64 = 25.0;
pub const DEFAULT_TIME_STEP_S: f64 = 0.1;
pub const DEFAULT_EMERGENCY_DECEL_MPS2: f64 = -8.0;
pub const DEFAULT_DRIFT_MPS2: f64 = 0.5;

// Optical channel noise
pub const DEFAULT_BASE_SIGMA: f64 = 1.0;
pub const DEFAULT_ONE_SIGMA: f64 = 3.0;
pub const DEFAULT_ZERO_SIGMA: f64 = 0.2;
pub const DEFAULT_DECODE_THRESHOLD: f64 = 1.5;

// Listener
pub const DEFAULT_RECEIVE_TIMEOUT_MS: u64 = 100;

// Wire format
pub const WIRE_VERSION: u8 = 1;
pub const BITS_PER_BYTE: usize = 8;

// Convoy demo
pub const DEMO_VEHICLES: [&str; 3] = ["CarA", "CarB", "CarC"];
pub const DEMO_TICKS: u32 = 6;
pub const DEMO_BRAKE_TICK: u32 = 2;
pub const DEMO_TICK_INTERVAL_MS: u64 = 1000;
