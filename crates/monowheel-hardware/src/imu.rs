//! BNO055 fused-orientation adapter for the balance loop

use bno055::{BNO055OperationMode, Bno055, mint};
use defmt::*;
use embassy_rp::i2c::{Blocking, I2c};
use embassy_rp::peripherals::I2C0;
use embassy_time::{Delay, Duration, block_for};
use monowheel_config::*;
use monowheel_control::{OrientationSensor, QuaternionSample};
use monowheel_error::ImuError;

type Bus<'a> = I2c<'a, I2C0, Blocking>;

/// BNO055 in NDOF fusion mode, polled for quaternions.
///
/// The chip has no event queue: a sample counts as new when the quaternion
/// differs from the previous read. A run of failed reads is reported as a
/// reset so the estimator puts the chip back into fusion mode.
pub struct Bno055Sensor<'a> {
    bus: Option<Bus<'a>>,
    bno: Option<Bno055<Bus<'a>>>,
    last: Option<QuaternionSample>,
    accuracy: f32,
    reads: u32,
    consecutive_errors: u32,
    reset_pending: bool,
}

impl<'a> Bno055Sensor<'a> {
    pub fn new(i2c: Bus<'a>) -> Self {
        Self {
            bus: Some(i2c),
            bno: None,
            last: None,
            accuracy: 0.0,
            reads: 0,
            consecutive_errors: 0,
            reset_pending: false,
        }
    }

    /// Refresh the accuracy estimate from the system calibration level (0..=3)
    fn refresh_calibration(bno: &mut Bno055<Bus<'a>>, accuracy: &mut f32) {
        match bno.get_calibration_status() {
            Ok(status) => {
                *accuracy = f32::from(status.sys) / 3.0;
                debug!(
                    "IMU: Cal - Sys:{}/3 Gyro:{}/3 Acc:{}/3 Mag:{}/3",
                    status.sys, status.gyr, status.acc, status.mag
                );
            }
            Err(e) => warn!("IMU: calibration read failed: {:?}", Debug2Format(&e)),
        }
    }
}

impl OrientationSensor for Bno055Sensor<'_> {
    type Error = ImuError;

    fn begin(&mut self, address: u8) -> Result<(), ImuError> {
        let bno = match self.bno.take() {
            Some(bno) => bno,
            None => {
                let bus = self.bus.take().ok_or(ImuError::NotDetected)?;
                let bno = Bno055::new(bus);
                if address == IMU_I2C_ADDRESS_ALT {
                    bno.with_alternative_address()
                } else {
                    bno
                }
            }
        };
        let bno = self.bno.insert(bno);

        let mut delay = Delay;
        for attempt in 1..=IMU_INIT_ATTEMPTS {
            match bno.init(&mut delay) {
                Ok(_) => {
                    info!("IMU: BNO055 initialized on attempt {}", attempt);
                    return Ok(());
                }
                Err(e) => {
                    error!(
                        "IMU: init attempt {} failed: {:?}",
                        attempt,
                        Debug2Format(&e)
                    );
                    block_for(Duration::from_millis(IMU_STARTUP_DELAY_MS));
                }
            }
        }

        Err(ImuError::NotDetected)
    }

    fn enable_rotation_vector(&mut self) -> Result<(), ImuError> {
        let bno = self.bno.as_mut().ok_or(ImuError::NotDetected)?;

        let mut delay = Delay;
        bno.set_mode(BNO055OperationMode::NDOF, &mut delay)
            .map_err(|_| ImuError::ReportEnableFailed)?;

        Self::refresh_calibration(bno, &mut self.accuracy);
        self.last = None;
        self.consecutive_errors = 0;
        Ok(())
    }

    fn was_reset(&mut self) -> bool {
        core::mem::take(&mut self.reset_pending)
    }

    fn poll_event(&mut self) -> Option<QuaternionSample> {
        let bno = self.bno.as_mut()?;

        let quat = match bno.quaternion() {
            Ok(quat) => quat,
            Err(e) => {
                self.consecutive_errors += 1;
                warn!(
                    "IMU: {} ({}): {:?}",
                    ImuError::QuaternionReadFailed,
                    self.consecutive_errors,
                    Debug2Format(&e)
                );
                if self.consecutive_errors >= IMU_RESET_ERROR_THRESHOLD {
                    error!("IMU: read failure threshold exceeded");
                    self.consecutive_errors = 0;
                    self.reset_pending = true;
                }
                return None;
            }
        };
        self.consecutive_errors = 0;

        self.reads = self.reads.wrapping_add(1);
        if self.reads.is_multiple_of(IMU_CALIBRATION_REFRESH) {
            Self::refresh_calibration(bno, &mut self.accuracy);
        }

        let sample = to_sample(&quat, self.accuracy);
        if self.last.is_some_and(|last| same_orientation(&last, &sample)) {
            return None;
        }
        self.last = Some(sample);
        Some(sample)
    }
}

fn to_sample(q: &mint::Quaternion<f32>, accuracy: f32) -> QuaternionSample {
    QuaternionSample::new(q.v.x, q.v.y, q.v.z, q.s, accuracy)
}

fn same_orientation(a: &QuaternionSample, b: &QuaternionSample) -> bool {
    a.i == b.i && a.j == b.j && a.k == b.k && a.real == b.real
}
