// Sensorless rotor estimation
// Back-EMF observer for angle/velocity plus R/L identification at standstill

pub mod blend;
pub mod covariance;
pub mod lowpass;
pub mod parameter_estimator;
pub mod state_estimator;
pub mod transforms;

// Re-export main types for easier access
pub use blend::{blend_open_loop, RotorState};
pub use covariance::{Covariance2, Gain2};
pub use parameter_estimator::{IdentificationError, MotorImpedance, ParameterEstimator};
pub use state_estimator::{MotorState, StateEstimator};
pub use transforms::{inverse_park, park, sin_cos, wrap_angle};
