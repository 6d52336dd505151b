#![no_std]
#![no_main]

//! Firmware for the monowheel balance testbed

#[cfg(all(feature = "rtt-control", feature = "defmt-logging"))]
compile_error!("`rtt-control` and `defmt-logging` both install a defmt logger; enable only one");
#[cfg(not(any(feature = "rtt-control", feature = "defmt-logging")))]
compile_error!("enable either `rtt-control` or `defmt-logging` for a defmt logger");

#[cfg(feature = "rtt-control")]
mod rtt_link;

#[cfg(feature = "defmt-logging")]
use defmt_rtt as _;

use defmt::info;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::i2c::{self, Blocking, I2c};
use embassy_rp::peripherals::{I2C0, PIN_16, PIO0};
use embassy_rp::pio::{Common, InterruptHandler as PioIrqHandler, Pio, StateMachine};
use embassy_rp::pio_programs::pwm::PioPwmProgram;
use embassy_rp::Peri;
use embassy_time::Timer;
use monowheel_config::*;
use monowheel_control::{BalanceController, OrientationEstimator, Tuning};
use monowheel_hardware::{Bno055Sensor, BridgeMotor, SteerServo, h_bridge};
use monowheel_system::{BalanceLoop, DriveLoop, SharedValues, SteerLoop};
use panic_probe as _;

#[cfg(feature = "rtt-control")]
use monowheel_system::RemoteHandler;
#[cfg(feature = "rtt-control")]
use rtt_link::RttLink;

bind_interrupts!(
    struct Irqs {
        PIO0_IRQ_0 => PioIrqHandler<PIO0>;
    }
);

/// Gains and setpoint, written by the remote link and read by the balance loop
static TUNING: Tuning = Tuning::new(Gains::DEFAULT, BALANCE_SETPOINT_RAD);

static SHARED: SharedValues = SharedValues::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // RTT has to be up before anything logs
    #[cfg(feature = "rtt-control")]
    let link = RttLink::init();

    let p = embassy_rp::init(Default::default());
    info!("Monowheel: starting");

    // Pin map: wheel IN1/IN2 on GPIO12/13 (slice 6), drive IN1/IN2 on
    // GPIO14/15 (slice 7), steering servo on GPIO16, IMU SDA/SCL on GPIO8/9
    let wheel = match h_bridge(p.PWM_SLICE6, p.PIN_12, p.PIN_13) {
        Ok(motor) => motor,
        Err(e) => defmt::panic!("Reaction wheel bring-up failed: {}", e),
    };
    let drive = match h_bridge(p.PWM_SLICE7, p.PIN_14, p.PIN_15) {
        Ok(motor) => motor,
        Err(e) => defmt::panic!("Drive motor bring-up failed: {}", e),
    };

    let mut i2c_config = i2c::Config::default();
    i2c_config.frequency = IMU_I2C_FREQ;
    let i2c_bus = I2c::new_blocking(p.I2C0, p.PIN_9, p.PIN_8, i2c_config);

    let Pio { common, sm0, .. } = Pio::new(p.PIO0, Irqs);

    spawner.spawn(balance_task(i2c_bus, wheel).unwrap());
    spawner.spawn(drive_task(drive).unwrap());
    spawner.spawn(steer_task(common, sm0, p.PIN_16).unwrap());

    #[cfg(feature = "rtt-control")]
    spawner.spawn(remote_task(link).unwrap());

    info!("Monowheel: tasks spawned");
}

#[embassy_executor::task]
async fn balance_task(i2c: I2c<'static, I2C0, Blocking>, wheel: BridgeMotor<'static>) {
    info!("Balance task starting");

    let estimator = OrientationEstimator::new(Bno055Sensor::new(i2c), IMU_I2C_ADDRESS);
    let controller = BalanceController::new(wheel, &TUNING, BALANCE_PERIOD);
    let mut balance = BalanceLoop::new(estimator, controller, &SHARED);

    if let Err(e) = balance.start() {
        defmt::panic!("IMU start failed: {}", e);
    }
    Timer::after_millis(IMU_STARTUP_DELAY_MS).await;

    balance.run().await
}

#[embassy_executor::task]
async fn drive_task(motor: BridgeMotor<'static>) {
    let mut drive = DriveLoop::new(motor, &SHARED);
    drive.run().await
}

#[embassy_executor::task]
async fn steer_task(
    mut common: Common<'static, PIO0>,
    sm0: StateMachine<'static, PIO0, 0>,
    pin: Peri<'static, PIN_16>,
) {
    let program = PioPwmProgram::new(&mut common);
    let servo = SteerServo::new(&mut common, sm0, pin, &program);

    let mut steer = SteerLoop::new(servo, &SHARED);
    steer.run().await
}

#[cfg(feature = "rtt-control")]
#[embassy_executor::task]
async fn remote_task(mut link: RttLink) {
    let handler = RemoteHandler::new(&TUNING, &SHARED);
    link.run(&handler).await
}
