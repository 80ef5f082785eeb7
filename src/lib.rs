#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod channel;
pub mod config;
pub mod foc;
pub mod plant;

pub use channel::{ChannelEvent, ChannelMode, MotorChannel};
pub use config::{
    ControlParams, ExcitationStage, IdentificationSchedule, MotorParams, ObserverTuning,
};
pub use foc::{
    IdentificationError, MotorImpedance, MotorState, ParameterEstimator, StateEstimator,
};
pub use plant::MotorPlant;
