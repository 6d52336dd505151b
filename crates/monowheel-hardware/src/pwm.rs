//! Hardware PWM H-bridge outputs
use defmt::*;
use embassy_rp::Peri;
use embassy_rp::pwm::{ChannelAPin, ChannelBPin, Config, Pwm, PwmOutput, Slice};
use monowheel_config::PWM_FREQUENCY_HZ;
use monowheel_control::HBridge;
use monowheel_error::MotorError;

/// H-bridge on the A/B outputs of one PWM slice
pub type BridgeMotor<'d> = HBridge<PwmOutput<'d>, PwmOutput<'d>>;

/// Slice configuration for `frequency_hz`, with the smallest divider that
/// keeps `top` within 16 bits.
pub fn bridge_config(frequency_hz: u32) -> Config {
    let clock_freq_hz = embassy_rp::clocks::clk_sys_freq();

    let divider = ((clock_freq_hz / frequency_hz) / 65_535 + 1) as u8;
    let top = (clock_freq_hz / (frequency_hz * u32::from(divider))) as u16 - 1;

    debug!("PWM: {} Hz, div {}, top {}", frequency_hz, divider, top);

    let mut config = Config::default();
    config.divider = divider.into();
    config.top = top;
    config
}

/// Bring up one slice as an H-bridge: channel A drives IN1, channel B drives
/// IN2. Both lines start low.
pub fn h_bridge<'d, T: Slice>(
    slice: Peri<'d, T>,
    in1: Peri<'d, impl ChannelAPin<T>>,
    in2: Peri<'d, impl ChannelBPin<T>>,
) -> Result<BridgeMotor<'d>, MotorError> {
    let pwm = Pwm::new_output_ab(slice, in1, in2, bridge_config(PWM_FREQUENCY_HZ));
    let (Some(a), Some(b)) = pwm.split() else {
        return Err(MotorError::OutputUnavailable);
    };

    info!("PWM: H-bridge ready");
    HBridge::new(a, b)
}
