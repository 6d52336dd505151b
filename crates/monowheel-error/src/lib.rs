//! Flash-efficient error handling using thiserror 2.0
#![no_std]

use thiserror::Error;

/// IMU-related errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ImuError {
    #[error("IMU not detected on the bus")]
    NotDetected,

    #[error("IMU rotation vector report could not be enabled")]
    ReportEnableFailed,

    #[error("IMU quaternion read failed")]
    QuaternionReadFailed,
}

/// Actuator errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotorError {
    #[error("PWM duty write failed")]
    PwmWriteFailed,

    #[error("PWM slice did not provide both outputs")]
    OutputUnavailable,
}

/// Rejected tuning input
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TuningError {
    #[error("tuning value is not a finite number")]
    NonFinite,
}

/// Main error type that encompasses all subsystem errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MonoError {
    #[error("IMU error: {0}")]
    Imu(#[from] ImuError),

    #[error("Motor error: {0}")]
    Motor(#[from] MotorError),

    #[error("Tuning error: {0}")]
    Tuning(#[from] TuningError),
}

pub type MonoResult<T> = Result<T, MonoError>;
