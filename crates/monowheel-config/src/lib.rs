#![no_std]

// Balance controller defaults (restored on every boot)
pub const BALANCE_KP: f32 = 225.0;
pub const BALANCE_KI: f32 = 0.1;
pub const BALANCE_KD: f32 = 1000.0;
pub const BALANCE_SETPOINT_RAD: f32 = 0.0;
pub const BALANCE_PERIOD: f32 = 1.0; // One loop tick between runs

// Setpoint drift applied every cycle to walk off mount bias
pub const DITHER_STEP_RAD: f32 = 0.0002;

// Integral term is bounded to this many percent of motor command
pub const INTEGRAL_OUTPUT_LIMIT: f32 = 50.0;

// H-bridge duty mapping: percent command -> 8-bit duty
pub const MOTOR_DUTY_SCALE: f32 = 2.55;
pub const MOTOR_DUTY_MAX: u8 = 255;
pub const PWM_FREQUENCY_HZ: u32 = 20_000;

// Angle used until the first valid IMU sample arrives
pub const ANGLE_FALLBACK_RAD: f32 = 0.0;

// IMU parameters
pub const IMU_I2C_ADDRESS: u8 = 0x28; // COM3 pulled low
pub const IMU_I2C_ADDRESS_ALT: u8 = 0x29;
pub const IMU_I2C_FREQ: u32 = 400_000;
pub const IMU_INIT_ATTEMPTS: u32 = 3;
pub const IMU_STARTUP_DELAY_MS: u64 = 100;
pub const IMU_RESET_ERROR_THRESHOLD: u32 = 10; // Consecutive read failures before re-init
pub const IMU_CALIBRATION_REFRESH: u32 = 1_000; // Samples between calibration polls
pub const QUATERNION_MIN_NORM_SQ: f32 = 1e-3; // Below this a sample carries no orientation

// Task cadence
pub const BALANCE_LOOP_DELAY_MS: u64 = 1;
pub const DRIVE_LOOP_PERIOD_MS: u64 = 10;
pub const STEER_LOOP_PERIOD_MS: u64 = 10;
pub const REMOTE_POLL_PERIOD_MS: u64 = 10;

// Drive command range exposed by the control page
pub const DRIVE_LIMIT_PERCENT: f32 = 70.0;

// Steering servo
pub const SERVO_REFRESH_INTERVAL_US: u32 = 20_000; // 50Hz servo refresh rate
pub const SERVO_MIN_PULSE_US: u32 = 544; // 0 degrees
pub const SERVO_MAX_PULSE_US: u32 = 2_400; // 180 degrees
pub const SERVO_RANGE_DEG: i32 = 180;
pub const STEER_CENTER_DEG: i32 = 90;
pub const STEER_MIN_DEG: i32 = 45;
pub const STEER_MAX_DEG: i32 = 135;

/// PID gain set
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Gains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

impl Gains {
    pub const DEFAULT: Self = Self {
        kp: BALANCE_KP,
        ki: BALANCE_KI,
        kd: BALANCE_KD,
    };

    pub const fn new(kp: f32, ki: f32, kd: f32) -> Self {
        Self { kp, ki, kd }
    }
}

impl Default for Gains {
    fn default() -> Self {
        Self::DEFAULT
    }
}
