//! Steering servo on a PIO state machine
use core::time::Duration;
use embassy_rp::Peri;
use embassy_rp::pio::{Common, Instance, PioPin, StateMachine};
use embassy_rp::pio_programs::pwm::{PioPwm, PioPwmProgram};
use monowheel_config::{SERVO_REFRESH_INTERVAL_US, STEER_CENTER_DEG};
use monowheel_control::SteeringServo;
use monowheel_control::motor::servo_pulse_us;

pub struct SteerServo<'d, T: Instance, const SM: usize> {
    pwm: PioPwm<'d, T, SM>,
}

impl<'d, T: Instance, const SM: usize> SteerServo<'d, T, SM> {
    /// Start a 50 Hz servo output parked at the center position
    pub fn new(
        common: &mut Common<'d, T>,
        sm: StateMachine<'d, T, SM>,
        pin: Peri<'d, impl PioPin>,
        program: &PioPwmProgram<'d, T>,
    ) -> Self {
        let mut pwm = PioPwm::new(common, sm, pin, program);
        pwm.set_period(Duration::from_micros(SERVO_REFRESH_INTERVAL_US.into()));
        pwm.start();

        let mut servo = Self { pwm };
        servo.write_angle(STEER_CENTER_DEG);
        servo
    }
}

impl<T: Instance, const SM: usize> SteeringServo for SteerServo<'_, T, SM> {
    fn write_angle(&mut self, degrees: i32) {
        self.pwm
            .write(Duration::from_micros(servo_pulse_us(degrees).into()));
    }
}
