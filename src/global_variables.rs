// Shockwave propagation speed (m/s, negative: the wave moves upstream).
pub const WAVE_SPEED: f64 = -15.0 / 3.6;

// Ramp insertion trigger location (m).
pub const RAMP_POSITION: f64 = 1000.0;

// Time headway threshold for a safe insertion (s).
pub const INSERTION_HEADWAY_THRESHOLD: f64 = 3.0;

// Detector locations (m).
pub const DETECTOR_LOC_UPSTREAM: f64 = 500.0;
pub const DETECTOR_LOC_DOWNSTREAM: f64 = 7000.0;

// Stop-and-go detection criteria.
pub const SG_MAX_SPEED: f64 = 10.0; // m/s
pub const SG_MIN_DURATION: u64 = 30; // s

// Half-width of the window a detector watches around its location (m).
pub const DETECTION_RANGE: f64 = 50.0;

// Leader speeds below this are treated as standing traffic (no headway defined).
pub const MIN_LEADER_SPEED: f64 = 0.1;

// Id and lane for the one controlled vehicle inserted at the ramp.
pub const JAD_VEHICLE_ID: u64 = 900_000;
pub const RAMP_LANE: u8 = 0;

// One simulation step is one second.
pub const STEP_LENGTH: f64 = 1.0;

// How far ahead (s) the planner brackets when searching for an intersection.
pub const BRACKET_HORIZON: f64 = 3600.0;
