//! Control loop orchestration: balance, drive and steer loops sharing state
//! through single-slot cells.
use embassy_time::{Duration, Timer};
use monowheel_config::*;
use monowheel_control::{
    BalanceController, Motor, OrientationEstimator, OrientationSensor, Slot, SteeringServo,
};
use monowheel_error::{MonoResult, MotorError};

/// Values exchanged between the loops and the remote interface.
///
/// Every field is last-writer-wins; readers always see a whole value.
pub struct SharedValues {
    /// Latest accepted roll angle (rad)
    pub angle: Slot<f32>,
    /// Latest balance command (percent, before saturation)
    pub command: Slot<f32>,
    /// Requested drive motor percent
    pub drive: Slot<f32>,
    /// Requested steering angle (deg)
    pub steer: Slot<i32>,
}

impl SharedValues {
    pub const fn new() -> Self {
        Self {
            angle: Slot::new(ANGLE_FALLBACK_RAD),
            command: Slot::new(0.0),
            drive: Slot::new(0.0),
            steer: Slot::new(STEER_CENTER_DEG),
        }
    }
}

impl Default for SharedValues {
    fn default() -> Self {
        Self::new()
    }
}

/// Reaction-wheel balance loop.
///
/// Each step takes a fresh roll reading when the sensor has one and falls
/// back to the last accepted angle otherwise. The controller is fed the
/// negated angle so a rightward lean drives the wheel to the left.
pub struct BalanceLoop<'a, S, M> {
    estimator: OrientationEstimator<S>,
    controller: BalanceController<'a, M>,
    shared: &'a SharedValues,
    angle: f32,
}

impl<'a, S: OrientationSensor, M: Motor> BalanceLoop<'a, S, M> {
    pub fn new(
        estimator: OrientationEstimator<S>,
        controller: BalanceController<'a, M>,
        shared: &'a SharedValues,
    ) -> Self {
        Self {
            estimator,
            controller,
            shared,
            angle: ANGLE_FALLBACK_RAD,
        }
    }

    /// Bring up the orientation sensor. The loop must not run if this fails.
    pub fn start(&mut self) -> MonoResult<()> {
        self.estimator.start()
    }

    /// One control cycle. Returns the command sent to the motor.
    pub fn step(&mut self) -> MonoResult<f32> {
        if let Some(angle) = self.estimator.read_roll() {
            self.angle = angle;
        }
        self.shared.angle.put(self.angle);

        let command = self.controller.run(-self.angle)?;
        self.shared.command.put(command);
        Ok(command)
    }

    pub async fn run(&mut self) -> ! {
        info!("Balance loop started");

        loop {
            if let Err(e) = self.step() {
                error!("Balance step failed: {}", e);
            }
            Timer::after(Duration::from_millis(BALANCE_LOOP_DELAY_MS)).await;
        }
    }

    /// Last accepted roll angle
    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn controller(&self) -> &BalanceController<'a, M> {
        &self.controller
    }
}

/// Forwards the remote drive request to the drive motor.
///
/// The loop enforces ±[`DRIVE_LIMIT_PERCENT`] on whatever the `drive` slot
/// holds, whichever client wrote it.
pub struct DriveLoop<'a, M> {
    motor: M,
    shared: &'a SharedValues,
}

impl<'a, M: Motor> DriveLoop<'a, M> {
    pub fn new(motor: M, shared: &'a SharedValues) -> Self {
        Self { motor, shared }
    }

    pub fn step(&mut self) -> Result<f32, MotorError> {
        let percent = self
            .shared
            .drive
            .get()
            .clamp(-DRIVE_LIMIT_PERCENT, DRIVE_LIMIT_PERCENT);
        self.motor.set_pwm(percent)?;
        Ok(percent)
    }

    pub async fn run(&mut self) -> ! {
        if let Err(e) = self.motor.set_pwm(0.0) {
            warn!("Drive motor stop failed: {}", e);
        }
        info!("Drive loop started");

        loop {
            if let Err(e) = self.step() {
                warn!("Drive step failed: {}", e);
            }
            Timer::after(Duration::from_millis(DRIVE_LOOP_PERIOD_MS)).await;
        }
    }

    pub fn motor(&self) -> &M {
        &self.motor
    }
}

/// Forwards the remote steering request to the steering servo.
///
/// The loop enforces [`STEER_MIN_DEG`]..=[`STEER_MAX_DEG`] on whatever the
/// `steer` slot holds, whichever client wrote it.
pub struct SteerLoop<'a, S> {
    servo: S,
    shared: &'a SharedValues,
}

impl<'a, S: SteeringServo> SteerLoop<'a, S> {
    pub fn new(servo: S, shared: &'a SharedValues) -> Self {
        Self { servo, shared }
    }

    pub fn step(&mut self) -> i32 {
        let degrees = self.shared.steer.get().clamp(STEER_MIN_DEG, STEER_MAX_DEG);
        self.servo.write_angle(degrees);
        degrees
    }

    pub async fn run(&mut self) -> ! {
        self.servo.write_angle(STEER_CENTER_DEG);
        info!("Steer loop started");

        loop {
            self.step();
            Timer::after(Duration::from_millis(STEER_LOOP_PERIOD_MS)).await;
        }
    }

    pub fn servo(&self) -> &S {
        &self.servo
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monowheel_config::Gains;
    use monowheel_control::{QuaternionSample, Tuning};
    use monowheel_error::{ImuError, MonoError};
    use std::collections::VecDeque;

    #[derive(Default)]
    struct ScriptedSensor {
        absent: bool,
        samples: VecDeque<Option<QuaternionSample>>,
    }

    impl OrientationSensor for ScriptedSensor {
        type Error = ();

        fn begin(&mut self, _address: u8) -> Result<(), ()> {
            if self.absent { Err(()) } else { Ok(()) }
        }

        fn enable_rotation_vector(&mut self) -> Result<(), ()> {
            Ok(())
        }

        fn was_reset(&mut self) -> bool {
            false
        }

        fn poll_event(&mut self) -> Option<QuaternionSample> {
            self.samples.pop_front().flatten()
        }
    }

    #[derive(Default)]
    struct RecordingMotor {
        commands: Vec<f32>,
    }

    impl Motor for RecordingMotor {
        fn set_pwm(&mut self, percent: f32) -> Result<(), MotorError> {
            self.commands.push(percent);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingServo {
        angles: Vec<i32>,
    }

    impl SteeringServo for RecordingServo {
        fn write_angle(&mut self, degrees: i32) {
            self.angles.push(degrees);
        }
    }

    fn roll_sample(angle: f32) -> QuaternionSample {
        let half = angle / 2.0;
        QuaternionSample::new(half.sin(), 0.0, 0.0, half.cos(), 0.0)
    }

    fn proportional_only() -> Tuning {
        Tuning::new(Gains::new(1.0, 0.0, 0.0), 0.0)
    }

    #[test]
    fn test_stale_cycles_reuse_last_angle() {
        let tuning = proportional_only();
        let shared = SharedValues::new();
        let mut sensor = ScriptedSensor::default();
        sensor.samples.push_back(Some(roll_sample(0.05)));
        for _ in 0..5 {
            sensor.samples.push_back(None);
        }

        let estimator = OrientationEstimator::new(sensor, IMU_I2C_ADDRESS);
        let controller = BalanceController::new(RecordingMotor::default(), &tuning, 1.0);
        let mut balance = BalanceLoop::new(estimator, controller, &shared);
        balance.start().unwrap();

        for cycle in 0..6 {
            let command = balance.step().unwrap();

            // Controller sees -0.05 every cycle; setpoint walks up by one dither step
            let expected = 0.05 + cycle as f32 * DITHER_STEP_RAD;
            assert!((command - expected).abs() < 1e-4, "cycle {cycle}: {command}");
            assert!((shared.angle.get() - 0.05).abs() < 1e-5);
            assert_eq!(shared.command.get(), command);
        }
        assert_eq!(balance.controller().motor().commands.len(), 6);
    }

    #[test]
    fn test_no_sample_before_first_uses_fallback() {
        let tuning = proportional_only();
        let shared = SharedValues::new();
        let estimator = OrientationEstimator::new(ScriptedSensor::default(), IMU_I2C_ADDRESS);
        let controller = BalanceController::new(RecordingMotor::default(), &tuning, 1.0);
        let mut balance = BalanceLoop::new(estimator, controller, &shared);

        let command = balance.step().unwrap();
        assert_eq!(balance.angle(), ANGLE_FALLBACK_RAD);
        assert_eq!(shared.angle.get(), ANGLE_FALLBACK_RAD);
        assert!(command.abs() < 1e-6);
    }

    #[test]
    fn test_controller_receives_negated_angle() {
        let tuning = proportional_only();
        let shared = SharedValues::new();
        let mut sensor = ScriptedSensor::default();
        sensor.samples.push_back(Some(roll_sample(-0.2)));

        let estimator = OrientationEstimator::new(sensor, IMU_I2C_ADDRESS);
        let controller = BalanceController::new(RecordingMotor::default(), &tuning, 1.0);
        let mut balance = BalanceLoop::new(estimator, controller, &shared);

        // error = 0 - (0.2) with the lean negated
        let command = balance.step().unwrap();
        assert!((command + 0.2).abs() < 1e-4, "command {command}");
        assert!((shared.angle.get() + 0.2).abs() < 1e-4);
    }

    #[test]
    fn test_start_reports_missing_sensor() {
        let tuning = Tuning::default();
        let shared = SharedValues::new();
        let sensor = ScriptedSensor {
            absent: true,
            ..Default::default()
        };
        let estimator = OrientationEstimator::new(sensor, IMU_I2C_ADDRESS);
        let controller = BalanceController::new(RecordingMotor::default(), &tuning, 1.0);
        let mut balance = BalanceLoop::new(estimator, controller, &shared);

        assert_eq!(balance.start(), Err(MonoError::Imu(ImuError::NotDetected)));
    }

    #[test]
    fn test_drive_forwards_and_clamps() {
        let shared = SharedValues::new();
        let mut drive = DriveLoop::new(RecordingMotor::default(), &shared);

        assert_eq!(drive.step().unwrap(), 0.0);
        shared.drive.put(-35.0);
        assert_eq!(drive.step().unwrap(), -35.0);
        shared.drive.put(100.0);
        assert_eq!(drive.step().unwrap(), DRIVE_LIMIT_PERCENT);
        shared.drive.put(-100.0);
        assert_eq!(drive.step().unwrap(), -DRIVE_LIMIT_PERCENT);

        assert_eq!(drive.motor().commands, [0.0, -35.0, 70.0, -70.0]);
    }

    #[test]
    fn test_steer_defaults_to_center_and_clamps() {
        let shared = SharedValues::new();
        let mut steer = SteerLoop::new(RecordingServo::default(), &shared);

        assert_eq!(steer.step(), STEER_CENTER_DEG);
        shared.steer.put(120);
        assert_eq!(steer.step(), 120);
        shared.steer.put(10);
        assert_eq!(steer.step(), STEER_MIN_DEG);
        shared.steer.put(170);
        assert_eq!(steer.step(), STEER_MAX_DEG);

        assert_eq!(steer.servo().angles, [90, 120, 45, 135]);
    }
}
