//! Transport-independent remote interface: routes HTTP-style request lines
//! onto the tuning block and the shared drive/steer slots.
use crate::system::SharedValues;
use core::fmt::Write;
use heapless::String;
use monowheel_control::Tuning;
use monowheel_error::TuningError;

/// Static control page served at `/`
pub const CONTROL_PAGE: &str = include_str!("panel.html");

/// Capacity of a formatted reading; fits any `f32` at two decimals.
const VALUE_CAPACITY: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Endpoint {
    Root,
    ReadAngle,
    ReadCommand,
    ReadSetpoint,
    SetKp,
    SetKi,
    SetKd,
    SetSteer,
    SetDrive,
    ResetSetpoint,
}

impl Endpoint {
    pub fn from_path(path: &str) -> Option<Self> {
        let endpoint = match path {
            "/" => Self::Root,
            "/readIMU" => Self::ReadAngle,
            "/readPWM" => Self::ReadCommand,
            "/readSetpoint" => Self::ReadSetpoint,
            "/kp" => Self::SetKp,
            "/ki" => Self::SetKi,
            "/kd" => Self::SetKd,
            "/steer" => Self::SetSteer,
            "/drive" => Self::SetDrive,
            "/resetSetpoint" => Self::ResetSetpoint,
            _ => return None,
        };
        Some(endpoint)
    }

    pub const fn path(self) -> &'static str {
        match self {
            Self::Root => "/",
            Self::ReadAngle => "/readIMU",
            Self::ReadCommand => "/readPWM",
            Self::ReadSetpoint => "/readSetpoint",
            Self::SetKp => "/kp",
            Self::SetKi => "/ki",
            Self::SetKd => "/kd",
            Self::SetSteer => "/steer",
            Self::SetDrive => "/drive",
            Self::ResetSetpoint => "/resetSetpoint",
        }
    }
}

/// A routed request borrowing its `value` argument from the input line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Request<'r> {
    pub endpoint: Endpoint,
    pub value: Option<&'r str>,
}

impl<'r> Request<'r> {
    /// Parse `GET /kp?value=1.5 HTTP/1.1` or a bare `/kp?value=1.5`.
    /// Any method is accepted. Returns `None` for unknown paths.
    pub fn parse(line: &'r str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let first = parts.next()?;
        let target = if first.starts_with('/') {
            first
        } else {
            parts.next()?
        };

        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };
        let endpoint = Endpoint::from_path(path)?;

        let value = query.and_then(|q| {
            q.split('&')
                .filter_map(|pair| pair.split_once('='))
                .find(|(key, _)| *key == "value")
                .map(|(_, value)| value)
        });

        Some(Self { endpoint, value })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Page(&'static str),
    Value(String<VALUE_CAPACITY>),
    Empty,
}

/// Every routed request is answered with status 200; failures only show up
/// in the log.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub body: Body,
}

impl Response {
    pub const STATUS: u16 = 200;

    fn page(page: &'static str) -> Self {
        Self {
            body: Body::Page(page),
        }
    }

    fn value(value: f32) -> Self {
        let mut text = String::new();
        // Cannot overflow at this capacity
        let _ = write!(text, "{:.2}", value);
        Self {
            body: Body::Value(text),
        }
    }

    fn empty() -> Self {
        Self { body: Body::Empty }
    }

    pub fn content_type(&self) -> &'static str {
        match self.body {
            Body::Page(_) => "text/html",
            Body::Value(_) | Body::Empty => "text/plain",
        }
    }

    pub fn body(&self) -> &str {
        match &self.body {
            Body::Page(page) => page,
            Body::Value(text) => text.as_str(),
            Body::Empty => "",
        }
    }
}

/// Applies remote requests. Holds only shared references, never the
/// controller itself.
pub struct RemoteHandler<'a> {
    tuning: &'a Tuning,
    shared: &'a SharedValues,
}

impl<'a> RemoteHandler<'a> {
    pub const fn new(tuning: &'a Tuning, shared: &'a SharedValues) -> Self {
        Self { tuning, shared }
    }

    /// Parse and dispatch a raw request line
    pub fn handle_line(&self, line: &str) -> Option<Response> {
        match Request::parse(line) {
            Some(request) => Some(self.handle(&request)),
            None => {
                debug!("Remote: unknown request");
                None
            }
        }
    }

    pub fn handle(&self, request: &Request<'_>) -> Response {
        match request.endpoint {
            Endpoint::Root => Response::page(CONTROL_PAGE),
            Endpoint::ReadAngle => Response::value(self.shared.angle.get()),
            Endpoint::ReadCommand => Response::value(self.shared.command.get()),
            Endpoint::ReadSetpoint => Response::value(self.tuning.setpoint()),
            Endpoint::SetKp => {
                self.set_gain(request, Tuning::set_kp);
                Response::empty()
            }
            Endpoint::SetKi => {
                self.set_gain(request, Tuning::set_ki);
                Response::empty()
            }
            Endpoint::SetKd => {
                self.set_gain(request, Tuning::set_kd);
                Response::empty()
            }
            Endpoint::SetSteer => {
                match request.value.and_then(parse_degrees) {
                    Some(degrees) => self.shared.steer.put(degrees),
                    None => warn!("Remote: bad steer value"),
                }
                Response::empty()
            }
            Endpoint::SetDrive => {
                match request.value.and_then(parse_finite) {
                    Some(percent) => self.shared.drive.put(percent),
                    None => warn!("Remote: bad drive value"),
                }
                Response::empty()
            }
            Endpoint::ResetSetpoint => {
                self.tuning.reset_setpoint();
                Response::empty()
            }
        }
    }

    fn set_gain(
        &self,
        request: &Request<'_>,
        set: fn(&Tuning, f32) -> Result<(), TuningError>,
    ) {
        let applied = request
            .value
            .and_then(|v| v.parse::<f32>().ok())
            .is_some_and(|value| set(self.tuning, value).is_ok());
        if !applied {
            warn!("Remote: gain rejected on {}", request.endpoint);
        }
    }
}

fn parse_finite(text: &str) -> Option<f32> {
    text.parse::<f32>().ok().filter(|v| v.is_finite())
}

/// Whole degrees; a fractional value is truncated.
fn parse_degrees(text: &str) -> Option<i32> {
    text.parse::<i32>()
        .ok()
        .or_else(|| parse_finite(text).map(|v| v as i32))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (Tuning, SharedValues) {
        (Tuning::default(), SharedValues::new())
    }

    #[test]
    fn test_parse_request_line() {
        let request = Request::parse("GET /kp?value=1.5 HTTP/1.1").unwrap();
        assert_eq!(request.endpoint, Endpoint::SetKp);
        assert_eq!(request.value, Some("1.5"));
    }

    #[test]
    fn test_parse_bare_path() {
        let request = Request::parse("/readIMU").unwrap();
        assert_eq!(request.endpoint, Endpoint::ReadAngle);
        assert_eq!(request.value, None);

        let request = Request::parse("  /drive?x=1&value=-20  ").unwrap();
        assert_eq!(request.endpoint, Endpoint::SetDrive);
        assert_eq!(request.value, Some("-20"));
    }

    #[test]
    fn test_parse_unknown_or_empty() {
        assert_eq!(Request::parse("GET /nope HTTP/1.1"), None);
        assert_eq!(Request::parse(""), None);
        assert_eq!(Request::parse("GET"), None);
    }

    #[test]
    fn test_paths_round_trip() {
        for endpoint in [
            Endpoint::Root,
            Endpoint::ReadAngle,
            Endpoint::ReadCommand,
            Endpoint::ReadSetpoint,
            Endpoint::SetKp,
            Endpoint::SetKi,
            Endpoint::SetKd,
            Endpoint::SetSteer,
            Endpoint::SetDrive,
            Endpoint::ResetSetpoint,
        ] {
            assert_eq!(Endpoint::from_path(endpoint.path()), Some(endpoint));
        }
    }

    #[test]
    fn test_root_serves_page() {
        let (tuning, shared) = fixture();
        let handler = RemoteHandler::new(&tuning, &shared);
        let response = handler.handle_line("GET / HTTP/1.1").unwrap();
        assert_eq!(response.content_type(), "text/html");
        assert!(response.body().contains("/resetSetpoint"));
    }

    #[test]
    fn test_readings_have_two_decimals() {
        let (tuning, shared) = fixture();
        let handler = RemoteHandler::new(&tuning, &shared);
        shared.angle.put(0.05);
        shared.command.put(-122.514);
        tuning.set_setpoint(0.0123).unwrap();

        assert_eq!(handler.handle_line("/readIMU").unwrap().body(), "0.05");
        assert_eq!(handler.handle_line("/readPWM").unwrap().body(), "-122.51");
        let setpoint = handler.handle_line("/readSetpoint").unwrap();
        assert_eq!(setpoint.body(), "0.01");
        assert_eq!(setpoint.content_type(), "text/plain");
    }

    #[test]
    fn test_gain_updates() {
        let (tuning, shared) = fixture();
        let handler = RemoteHandler::new(&tuning, &shared);

        handler.handle_line("GET /kp?value=150 HTTP/1.1").unwrap();
        handler.handle_line("GET /ki?value=0 HTTP/1.1").unwrap();
        handler.handle_line("GET /kd?value=-3.5 HTTP/1.1").unwrap();

        let gains = tuning.gains();
        assert_eq!(gains.kp, 150.0);
        assert_eq!(gains.ki, 0.0);
        assert_eq!(gains.kd, -3.5);
    }

    #[test]
    fn test_bad_values_are_ignored() {
        let (tuning, shared) = fixture();
        let handler = RemoteHandler::new(&tuning, &shared);
        let before = tuning.gains();

        let response = handler.handle_line("/kp?value=abc").unwrap();
        assert_eq!(response.body(), "");
        handler.handle_line("/ki").unwrap();
        handler.handle_line("/kd?value=inf").unwrap();
        handler.handle_line("/drive?value=NaN").unwrap();
        handler.handle_line("/steer?value=left").unwrap();

        assert_eq!(tuning.gains(), before);
        assert_eq!(shared.drive.get(), 0.0);
        assert_eq!(shared.steer.get(), 90);
    }

    #[test]
    fn test_drive_and_steer() {
        let (tuning, shared) = fixture();
        let handler = RemoteHandler::new(&tuning, &shared);

        handler.handle_line("/drive?value=-42.5").unwrap();
        handler.handle_line("/steer?value=120").unwrap();
        assert_eq!(shared.drive.get(), -42.5);
        assert_eq!(shared.steer.get(), 120);

        handler.handle_line("/steer?value=100.7").unwrap();
        assert_eq!(shared.steer.get(), 100);
    }

    #[test]
    fn test_reset_setpoint() {
        let (tuning, shared) = fixture();
        let handler = RemoteHandler::new(&tuning, &shared);
        tuning.set_setpoint(0.3).unwrap();

        handler.handle_line("GET /resetSetpoint HTTP/1.1").unwrap();
        assert_eq!(tuning.setpoint(), 0.0);
        assert_eq!(handler.handle_line("/readSetpoint").unwrap().body(), "0.00");
    }

    #[test]
    fn test_status_is_always_ok() {
        assert_eq!(Response::STATUS, 200);
    }
}
