//! Reaction-wheel balance controller: PID with integral clamping and setpoint dithering
use crate::motor::Motor;
use crate::tuning::Tuning;
use monowheel_config::{DITHER_STEP_RAD, Gains, INTEGRAL_OUTPUT_LIMIT};
use monowheel_error::{MonoResult, TuningError};

/// Balance PID driving an owned motor.
///
/// Gains and setpoint are read from the shared [`Tuning`] block every cycle,
/// so remote changes take effect on the next `run`. The setpoint is nudged by
/// [`DITHER_STEP_RAD`] each cycle toward the measured angle to walk off
/// static mount and sensor bias.
pub struct BalanceController<'a, M> {
    motor: M,
    tuning: &'a Tuning,

    // State
    integral: f32,
    prev_error: f32,

    // Time between runs, in the same unit the derivative gain was tuned for
    period: f32,
}

impl<'a, M: Motor> BalanceController<'a, M> {
    pub fn new(motor: M, tuning: &'a Tuning, period: f32) -> Self {
        debug_assert!(period > 0.0, "controller period must be positive");

        Self {
            motor,
            tuning,
            integral: 0.0,
            prev_error: 0.0,
            period,
        }
    }

    /// Run one control cycle against `measured` and drive the motor.
    ///
    /// Returns the command sent to the motor (before saturation).
    pub fn run(&mut self, measured: f32) -> MonoResult<f32> {
        let Gains { kp, ki, kd } = self.tuning.gains();
        let error = self.tuning.setpoint() - measured;

        self.integral += error;

        // Dither toward the measured side
        if error < 0.0 {
            self.tuning.dither(-DITHER_STEP_RAD);
        } else {
            self.tuning.dither(DITHER_STEP_RAD);
        }

        if let Some(limit) = integral_limit(ki) {
            self.integral = self.integral.clamp(-limit, limit);
        }

        let derivative = (error - self.prev_error) / self.period;
        let output = kp * error + ki * self.integral + kd * derivative;

        let applied = self.motor.set_pwm(output);
        self.prev_error = error;
        applied?;

        Ok(output)
    }

    /// Clear integral and derivative history
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = 0.0;
    }

    pub fn setpoint(&self) -> f32 {
        self.tuning.setpoint()
    }

    pub fn set_setpoint(&self, setpoint: f32) -> Result<(), TuningError> {
        self.tuning.set_setpoint(setpoint)
    }

    pub fn set_kp(&self, kp: f32) -> Result<(), TuningError> {
        self.tuning.set_kp(kp)
    }

    pub fn set_ki(&self, ki: f32) -> Result<(), TuningError> {
        self.tuning.set_ki(ki)
    }

    pub fn set_kd(&self, kd: f32) -> Result<(), TuningError> {
        self.tuning.set_kd(kd)
    }

    pub fn integral(&self) -> f32 {
        self.integral
    }

    pub fn motor(&self) -> &M {
        &self.motor
    }
}

/// Bound on the accumulated error so that `ki * integral` stays within
/// ±[`INTEGRAL_OUTPUT_LIMIT`]. `None` when `ki` is zero: the integral term
/// contributes nothing and is clamped again once `ki` becomes non-zero.
fn integral_limit(ki: f32) -> Option<f32> {
    if ki == 0.0 {
        None
    } else {
        Some(libm::fabsf(INTEGRAL_OUTPUT_LIMIT / ki))
    }
}
