//! Remote request link over RTT.
//!
//! Request lines (`GET /kp?value=200 HTTP/1.1` or just `/kp?value=200`) arrive
//! on down channel 0 and are answered with an HTTP-style response on up
//! channel 1. Up channel 0 carries defmt logs.

use core::fmt::Write;
use defmt::{info, warn};
use embassy_time::{Duration, Timer};
use heapless::Vec;
use monowheel_config::REMOTE_POLL_PERIOD_MS;
use monowheel_system::{RemoteHandler, Response};
use rtt_target::ChannelMode::{NoBlockSkip, NoBlockTrim};
use rtt_target::{DownChannel, UpChannel, rtt_init, set_defmt_channel};

const LINE_CAPACITY: usize = 256;

pub struct RttLink {
    down_channel: DownChannel,
    up_channel: UpChannel,
    line: Vec<u8, LINE_CAPACITY>,
}

impl RttLink {
    /// Set up the RTT control block. Must run before the first log line.
    pub fn init() -> Self {
        let channels = rtt_init! {
            up: {
                0: {
                    size: 1024,
                    mode: NoBlockSkip,
                    name: "Defmt Logs"
                }
                1: {
                    size: 4096,
                    mode: NoBlockTrim,
                    name: "Responses"
                }
            }
            down: {
                0: {
                    size: 256,
                    mode: NoBlockSkip,
                    name: "Requests"
                }
            }
        };

        set_defmt_channel(channels.up.0);

        Self {
            down_channel: channels.down.0,
            up_channel: channels.up.1,
            line: Vec::new(),
        }
    }

    pub async fn run(&mut self, handler: &RemoteHandler<'_>) -> ! {
        info!("Remote link started");
        let _ = writeln!(
            self.up_channel,
            "Remote link ready. Send request lines such as `/readIMU` or `/kp?value=200`."
        );

        let mut buffer = [0u8; 64];

        loop {
            let count = self.down_channel.read(&mut buffer);
            for &byte in &buffer[..count] {
                self.push(byte, handler);
            }

            Timer::after(Duration::from_millis(REMOTE_POLL_PERIOD_MS)).await;
        }
    }

    fn push(&mut self, byte: u8, handler: &RemoteHandler<'_>) {
        match byte {
            b'\n' | b'\r' => {
                if !self.line.is_empty() {
                    self.dispatch(handler);
                    self.line.clear();
                }
            }
            0 => {}
            _ => {
                if self.line.push(byte).is_err() {
                    warn!("Remote: request longer than {} bytes dropped", LINE_CAPACITY);
                    self.line.clear();
                }
            }
        }
    }

    fn dispatch(&mut self, handler: &RemoteHandler<'_>) {
        let Ok(line) = core::str::from_utf8(&self.line) else {
            warn!("Remote: request is not UTF-8");
            return;
        };

        match handler.handle_line(line) {
            Some(response) => self.respond(&response),
            None => {
                let _ = write!(
                    self.up_channel,
                    "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n"
                );
            }
        }
    }

    fn respond(&mut self, response: &Response) {
        let body = response.body();
        let _ = write!(
            self.up_channel,
            "HTTP/1.1 {} OK\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n{}\n",
            Response::STATUS,
            response.content_type(),
            body.len(),
            body
        );
    }
}
