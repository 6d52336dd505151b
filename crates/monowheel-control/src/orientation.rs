//! Roll extraction from fused orientation quaternions

use core::f32::consts::PI;
use monowheel_config::QUATERNION_MIN_NORM_SQ;
use monowheel_error::{ImuError, MonoResult};

/// One fused orientation report from the IMU
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct QuaternionSample {
    pub i: f32,
    pub j: f32,
    pub k: f32,
    pub real: f32,
    pub accuracy: f32,
}

impl QuaternionSample {
    pub const fn new(i: f32, j: f32, k: f32, real: f32, accuracy: f32) -> Self {
        Self {
            i,
            j,
            k,
            real,
            accuracy,
        }
    }

    /// Signed roll angle in radians, see [`roll_from_quaternion`]
    pub fn roll(&self) -> f32 {
        roll_from_quaternion(self)
    }

    pub fn norm_squared(&self) -> f32 {
        self.i * self.i + self.j * self.j + self.k * self.k + self.real * self.real
    }

    /// Near-zero quaternion, as the BNO055 reports before fusion settles.
    /// Carries no orientation.
    pub fn is_degenerate(&self) -> bool {
        self.norm_squared() < QUATERNION_MIN_NORM_SQ
    }
}

/// IMU with on-chip fusion that reports orientation as quaternions
pub trait OrientationSensor {
    type Error;

    /// Probe the device at `address` and bring it up
    fn begin(&mut self, address: u8) -> Result<(), Self::Error>;

    /// Subscribe to the fused rotation-vector output
    fn enable_rotation_vector(&mut self) -> Result<(), Self::Error>;

    /// True once after the device has reset itself and dropped its reports
    fn was_reset(&mut self) -> bool;

    /// Latest sample if the sensor produced a new one since the last poll
    fn poll_event(&mut self) -> Option<QuaternionSample>;
}

/// Roll about the longitudinal axis.
///
/// `atan2(2(jk + ir), -i² - j² + k² + r²)`, with the lower half plane folded
/// back by π so the result always lies in `[-π/2, π/2]`.
///
/// At exactly ±90° the denominator is zero and takes the folded branch, so
/// a roll of +π/2 reads as -π/2 and vice versa. A zero quaternion is outside
/// the bound (it returns π); callers filter it with
/// [`QuaternionSample::is_degenerate`].
pub fn roll_from_quaternion(q: &QuaternionSample) -> f32 {
    let (i, j, k, r) = (q.i, q.j, q.k, q.real);

    let y = 2.0 * (j * k + i * r);
    let x = -i * i - j * j + k * k + r * r;
    let raw = libm::atan2f(y, x);

    if x > 0.0 {
        raw
    } else if raw > 0.0 {
        raw - PI
    } else {
        raw + PI
    }
}

/// Turns the sensor's report stream into roll angles.
pub struct OrientationEstimator<S> {
    sensor: S,
    address: u8,
}

impl<S: OrientationSensor> OrientationEstimator<S> {
    pub fn new(sensor: S, address: u8) -> Self {
        Self { sensor, address }
    }

    /// Bring up the sensor and subscribe to orientation reports.
    ///
    /// A missing sensor is an error for the caller to act on. A refused
    /// subscription is only logged: the reset path subscribes again later.
    pub fn start(&mut self) -> MonoResult<()> {
        info!("IMU: probing address {}", self.address);

        if self.sensor.begin(self.address).is_err() {
            error!("IMU: could not find sensor");
            return Err(ImuError::NotDetected.into());
        }
        info!("IMU: found");

        match self.sensor.enable_rotation_vector() {
            Ok(()) => info!("IMU: rotation vector enabled"),
            Err(_) => warn!("IMU: failed to enable rotation vector"),
        }

        Ok(())
    }

    /// Current roll in radians, or `None` when there is no new sample.
    ///
    /// After a sensor reset the report is re-enabled and this cycle yields
    /// `None`.
    pub fn read_roll(&mut self) -> Option<f32> {
        if self.sensor.was_reset() {
            warn!("IMU: sensor reset, re-enabling rotation vector");
            if self.sensor.enable_rotation_vector().is_err() {
                warn!("IMU: failed to enable rotation vector");
            }
            return None;
        }

        let sample = self.sensor.poll_event()?;
        if sample.is_degenerate() {
            debug!("IMU: degenerate quaternion dropped");
            return None;
        }
        trace!("IMU: accuracy {}", sample.accuracy);
        Some(sample.roll())
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }
}
