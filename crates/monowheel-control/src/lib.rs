#![cfg_attr(not(test), no_std)]

mod fmt;

pub mod motor;
pub mod orientation;
pub mod pid;
pub mod share;
pub mod tuning;

// Re-export commonly used types
pub use motor::{HBridge, HBridgeDuty, Motor, SteeringServo};
pub use orientation::{OrientationEstimator, OrientationSensor, QuaternionSample};
pub use pid::BalanceController;
pub use share::Slot;
pub use tuning::Tuning;
