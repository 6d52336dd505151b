//! Live-tunable gains and setpoint shared with the remote interface

use crate::share::Slot;
use monowheel_config::{BALANCE_SETPOINT_RAD, Gains};
use monowheel_error::TuningError;

/// Gains and setpoint of the balance controller.
///
/// Every field is its own [`Slot`], so a remote request can rewrite one value
/// while the control loop is running without tearing it. There is no
/// transaction across fields; the next control cycle picks up whatever each
/// slot holds at that moment.
pub struct Tuning {
    kp: Slot<f32>,
    ki: Slot<f32>,
    kd: Slot<f32>,
    setpoint: Slot<f32>,
}

impl Default for Tuning {
    fn default() -> Self {
        Self::new(Gains::DEFAULT, BALANCE_SETPOINT_RAD)
    }
}

impl Tuning {
    pub const fn new(gains: Gains, setpoint: f32) -> Self {
        Self {
            kp: Slot::new(gains.kp),
            ki: Slot::new(gains.ki),
            kd: Slot::new(gains.kd),
            setpoint: Slot::new(setpoint),
        }
    }

    pub fn gains(&self) -> Gains {
        Gains::new(self.kp.get(), self.ki.get(), self.kd.get())
    }

    pub fn set_kp(&self, kp: f32) -> Result<(), TuningError> {
        self.kp.put(finite(kp)?);
        info!("Tuning: kp -> {}", kp);
        Ok(())
    }

    /// Zero is accepted; the controller then stops clamping the integral
    pub fn set_ki(&self, ki: f32) -> Result<(), TuningError> {
        self.ki.put(finite(ki)?);
        info!("Tuning: ki -> {}", ki);
        Ok(())
    }

    pub fn set_kd(&self, kd: f32) -> Result<(), TuningError> {
        self.kd.put(finite(kd)?);
        info!("Tuning: kd -> {}", kd);
        Ok(())
    }

    pub fn setpoint(&self) -> f32 {
        self.setpoint.get()
    }

    pub fn set_setpoint(&self, setpoint: f32) -> Result<(), TuningError> {
        self.setpoint.put(finite(setpoint)?);
        Ok(())
    }

    /// Undo accumulated dithering drift
    pub fn reset_setpoint(&self) {
        self.setpoint.put(0.0);
        info!("Tuning: setpoint reset");
    }

    /// Shift the setpoint by `step` without losing a concurrent remote write
    pub(crate) fn dither(&self, step: f32) -> f32 {
        self.setpoint.update(|setpoint| setpoint + step)
    }
}

fn finite(value: f32) -> Result<f32, TuningError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(TuningError::NonFinite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let tuning = Tuning::default();
        assert_eq!(tuning.gains(), Gains::new(225.0, 0.1, 1000.0));
        assert_eq!(tuning.setpoint(), 0.0);
    }

    #[test]
    fn test_setpoint_round_trip() {
        let tuning = Tuning::default();
        tuning.set_setpoint(0.0375).unwrap();
        assert_eq!(tuning.setpoint(), 0.0375);
    }

    #[test]
    fn test_reset_setpoint() {
        let tuning = Tuning::default();
        tuning.set_setpoint(-0.2).unwrap();
        tuning.reset_setpoint();
        assert_eq!(tuning.setpoint(), 0.0);
    }

    #[test]
    fn test_gain_setters_are_independent() {
        let tuning = Tuning::default();
        tuning.set_kp(10.0).unwrap();
        tuning.set_kd(3.0).unwrap();
        assert_eq!(tuning.gains(), Gains::new(10.0, 0.1, 3.0));

        tuning.set_ki(0.0).unwrap();
        assert_eq!(tuning.gains().ki, 0.0);
    }

    #[test]
    fn test_non_finite_values_rejected() {
        let tuning = Tuning::default();
        assert_eq!(tuning.set_kp(f32::NAN), Err(TuningError::NonFinite));
        assert_eq!(tuning.set_ki(f32::INFINITY), Err(TuningError::NonFinite));
        assert_eq!(
            tuning.set_setpoint(f32::NEG_INFINITY),
            Err(TuningError::NonFinite)
        );
        assert_eq!(tuning.gains(), Gains::DEFAULT);
        assert_eq!(tuning.setpoint(), 0.0);
    }
}
