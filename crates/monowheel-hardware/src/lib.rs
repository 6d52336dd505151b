#![no_std]

pub mod imu;
pub mod pwm;
pub mod servo;

// Re-export commonly used types
pub use imu::Bno055Sensor;
pub use pwm::{BridgeMotor, h_bridge};
pub use servo::SteerServo;
