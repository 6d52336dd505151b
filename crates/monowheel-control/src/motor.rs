//! Actuator abstractions: two-pin H-bridge motors and the steering servo

use embedded_hal::pwm::SetDutyCycle;
use monowheel_config::{
    MOTOR_DUTY_MAX, MOTOR_DUTY_SCALE, SERVO_MAX_PULSE_US, SERVO_MIN_PULSE_US, SERVO_RANGE_DEG,
};
use monowheel_error::MotorError;

/// Anything that accepts a signed percentage drive command
pub trait Motor {
    /// `percent` in [-100, 100]; values outside saturate
    fn set_pwm(&mut self, percent: f32) -> Result<(), MotorError>;
}

/// Angle-commanded hobby servo
pub trait SteeringServo {
    fn write_angle(&mut self, degrees: i32);
}

/// Duty on each polarity line of a two-pin H-bridge (DRV8871 style).
/// At most one line is non-zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HBridgeDuty {
    pub in1: u8,
    pub in2: u8,
}

impl HBridgeDuty {
    pub const COAST: Self = Self { in1: 0, in2: 0 };

    /// Map a percent command onto an 8-bit duty, saturating at ±255
    pub fn from_percent(percent: f32) -> Self {
        let max = MOTOR_DUTY_MAX as f32;
        let scaled = (percent * MOTOR_DUTY_SCALE).clamp(-max, max);
        // NaN falls through to zero here
        let duty = libm::roundf(libm::fabsf(scaled)) as u8;

        if duty == 0 {
            Self::COAST
        } else if scaled > 0.0 {
            Self { in1: duty, in2: 0 }
        } else {
            Self { in1: 0, in2: duty }
        }
    }

    /// Duty in [-255, 255], positive when IN1 is driven
    pub fn signed(&self) -> i16 {
        self.in1 as i16 - self.in2 as i16
    }
}

/// Two PWM outputs wired to the IN1/IN2 lines of an H-bridge driver
pub struct HBridge<A, B> {
    in1: A,
    in2: B,
    duty: HBridgeDuty,
}

impl<A: SetDutyCycle, B: SetDutyCycle> HBridge<A, B> {
    /// Takes the two outputs and holds both lines low
    pub fn new(in1: A, in2: B) -> Result<Self, MotorError> {
        let mut bridge = Self {
            in1,
            in2,
            duty: HBridgeDuty::COAST,
        };
        bridge.apply(HBridgeDuty::COAST)?;
        Ok(bridge)
    }

    pub fn apply(&mut self, duty: HBridgeDuty) -> Result<(), MotorError> {
        // Release the idle line before driving the other one
        if duty.in1 > 0 {
            write_line(&mut self.in2, 0)?;
            write_line(&mut self.in1, duty.in1)?;
        } else {
            write_line(&mut self.in1, 0)?;
            write_line(&mut self.in2, duty.in2)?;
        }
        self.duty = duty;
        Ok(())
    }

    /// Last duty written to the bridge
    pub fn duty(&self) -> HBridgeDuty {
        self.duty
    }
}

impl<A: SetDutyCycle, B: SetDutyCycle> Motor for HBridge<A, B> {
    fn set_pwm(&mut self, percent: f32) -> Result<(), MotorError> {
        self.apply(HBridgeDuty::from_percent(percent))
    }
}

fn write_line<P: SetDutyCycle>(line: &mut P, duty: u8) -> Result<(), MotorError> {
    let result = if duty == 0 {
        line.set_duty_cycle_fully_off()
    } else {
        line.set_duty_cycle_fraction(duty as u16, MOTOR_DUTY_MAX as u16)
    };
    result.map_err(|_| MotorError::PwmWriteFailed)
}

/// Servo pulse width for an angle in degrees, clamped to the servo's travel
pub fn servo_pulse_us(degrees: i32) -> u32 {
    let degrees = degrees.clamp(0, SERVO_RANGE_DEG) as u32;
    SERVO_MIN_PULSE_US
        + degrees * (SERVO_MAX_PULSE_US - SERVO_MIN_PULSE_US) / SERVO_RANGE_DEG as u32
}
