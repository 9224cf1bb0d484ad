//! Network control surface
//!
//! Maps GET requests onto the shared [`TestStand`] and renders the reply.
//! Every handler runs to completion against one `&mut TestStand`, so a log
//! export always observes a whole number of rows.

pub mod http;

use alloc::string::String;
use embedded_hal::digital::OutputPin;
use log::{error, warn};
use serde::Serialize;

use crate::app_state::TestStand;
use crate::ignition::IgnitionState;
use http::{Body, Method, Request, Response, content_type};

/// Static operator page: ignition buttons, live table and download link.
pub const DASHBOARD_HTML: &str = include_str!("dashboard.html");

/// File name offered for the CSV export
pub const EXPORT_FILE_NAME: &str = "thrust_data.csv";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Dashboard,
    Ignite,
    Extinguish,
    Data,
    Download,
    Status,
    NotFound,
}

impl Route {
    /// Only GET is served; every other method falls through to not-found.
    pub fn resolve(method: Method, path: &str) -> Self {
        if method != Method::Get {
            return Self::NotFound;
        }
        match path {
            "/" => Self::Dashboard,
            "/ignite" => Self::Ignite,
            "/extinguish" => Self::Extinguish,
            "/data" => Self::Data,
            "/download" => Self::Download,
            "/status" => Self::Status,
            _ => Self::NotFound,
        }
    }

    /// Routes a raw request head; unparseable requests are not found.
    pub fn from_head(head: &[u8]) -> Self {
        match Request::parse(head) {
            Ok(request) => Self::resolve(request.method, request.path),
            Err(e) => {
                warn!("Rejected request: {}", e);
                Self::NotFound
            }
        }
    }
}

#[derive(Serialize)]
struct StatusReport {
    ignition: IgnitionState,
    samples: usize,
    dropped: u32,
    sensor_faults: u32,
    last_fault: Option<&'static str>,
}

/// Runs one control-surface operation against the stand.
pub fn handle<P: OutputPin>(stand: &mut TestStand<P>, route: Route) -> Response {
    match route {
        Route::Dashboard => Response::ok(content_type::HTML, Body::Static(DASHBOARD_HTML)),
        Route::Ignite => {
            set_ignition(stand, IgnitionState::Armed);
            Response::ok(content_type::PLAIN, Body::Static("Ignition ON"))
        }
        Route::Extinguish => {
            set_ignition(stand, IgnitionState::Idle);
            Response::ok(content_type::PLAIN, Body::Static("Ignition OFF"))
        }
        Route::Data => json_response(&stand.latest()),
        Route::Download => match stand.log().to_csv() {
            Ok(csv) => {
                Response::ok(content_type::CSV, Body::Owned(csv)).with_attachment(EXPORT_FILE_NAME)
            }
            Err(_) => {
                error!("Not enough memory to export {} samples", stand.log().len());
                Response::unavailable()
            }
        },
        Route::Status => {
            let health = stand.health();
            json_response(&StatusReport {
                ignition: stand.ignition_state(),
                samples: stand.log().len(),
                dropped: stand.log().dropped(),
                sensor_faults: health.faults,
                last_fault: health.last_fault.map(|e| e.kind()),
            })
        }
        Route::NotFound => Response::not_found(),
    }
}

fn set_ignition<P: OutputPin>(stand: &mut TestStand<P>, state: IgnitionState) {
    // The state is recorded even if the pin write fails; the next loop pass retries it
    if let Err(e) = stand.set_ignition(state) {
        error!("Failed to drive ignition output: {}", e);
    }
}

fn json_response<T: Serialize>(value: &T) -> Response {
    match serde_json::to_string(value) {
        Ok(json) => Response::ok(content_type::JSON, Body::Owned(json)),
        Err(_) => {
            error!("Failed to serialize JSON response");
            Response::ok(content_type::JSON, Body::Owned(String::from("{}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ignition::test_pin::RecordingPin;
    use crate::storage::{LogPolicy, Weight};
    use http::Status;

    fn stand() -> TestStand<RecordingPin> {
        TestStand::new(RecordingPin::default(), LogPolicy::Unbounded).unwrap()
    }

    fn get(stand: &mut TestStand<RecordingPin>, path: &str) -> Response {
        handle(stand, Route::resolve(Method::Get, path))
    }

    #[test]
    fn test_routes() {
        assert_eq!(Route::resolve(Method::Get, "/"), Route::Dashboard);
        assert_eq!(Route::resolve(Method::Get, "/ignite"), Route::Ignite);
        assert_eq!(Route::resolve(Method::Get, "/extinguish"), Route::Extinguish);
        assert_eq!(Route::resolve(Method::Get, "/data"), Route::Data);
        assert_eq!(Route::resolve(Method::Get, "/download"), Route::Download);
        assert_eq!(Route::resolve(Method::Get, "/status"), Route::Status);
        assert_eq!(Route::resolve(Method::Get, "/foo"), Route::NotFound);
        assert_eq!(Route::resolve(Method::Post, "/ignite"), Route::NotFound);
        assert_eq!(Route::from_head(b"PUT /data HTTP/1.1\r\n\r\n"), Route::NotFound);
        assert_eq!(Route::from_head(b"nonsense"), Route::NotFound);
    }

    #[test]
    fn test_dashboard_is_constant_html() {
        let mut stand = stand();
        let first = get(&mut stand, "/");
        stand.record(100, Ok(Weight::from_units(1)));
        let second = get(&mut stand, "/");

        assert_eq!(first, second);
        assert_eq!(first.content_type, "text/html");
        assert!(first.body().contains("/ignite"));
        assert!(first.body().contains("/download"));
    }

    #[test]
    fn test_poll_before_first_sample() {
        let mut stand = stand();
        let response = get(&mut stand, "/data");
        assert_eq!(response.status, Status::Ok);
        assert_eq!(response.content_type, "application/json");
        assert_eq!(response.body(), r#"{"time":0,"weight":0.0}"#);
    }

    #[test]
    fn test_ignition_sequence_leaves_data_untouched() {
        let mut stand = stand();
        stand.record(100, Ok(Weight::from_units(4_321)));

        assert_eq!(get(&mut stand, "/ignite").body(), "Ignition ON");
        assert!(stand.ignition().pin().high);
        let armed_data = get(&mut stand, "/data");

        assert_eq!(get(&mut stand, "/extinguish").body(), "Ignition OFF");
        assert!(!stand.ignition().pin().high);
        let idle_data = get(&mut stand, "/data");

        assert_eq!(armed_data.body(), r#"{"time":100,"weight":0.4321}"#);
        assert_eq!(armed_data, idle_data);
    }

    #[test]
    fn test_download_attachment() {
        let mut stand = stand();
        stand.record(100, Ok(Weight::from_units(0)));
        stand.record(200, Ok(Weight::from_units(25_000)));

        let response = get(&mut stand, "/download");
        assert_eq!(response.content_type, "text/csv");
        assert_eq!(response.attachment, Some("thrust_data.csv"));
        assert_eq!(
            response.body(),
            "Time (ms),Weight (kg)\n100,0.0000\n200,2.5000\n"
        );
        assert!(
            response
                .head()
                .contains("Content-Disposition: attachment; filename=thrust_data.csv\r\n")
        );
        assert_eq!(get(&mut stand, "/download"), response);
    }

    #[test]
    fn test_unknown_path() {
        let mut stand = stand();
        let response = get(&mut stand, "/foo");
        assert_eq!(response.status, Status::NotFound);
        assert_eq!(response.content_type, "text/plain");
        assert_eq!(response.body(), "404: Not found");
    }

    #[test]
    fn test_status_report() {
        let mut stand = stand();
        stand.record(100, Ok(Weight::from_units(1)));
        stand.record(
            200,
            Err(crate::sensors::SensorError::Saturated {
                sensor: "HX711",
                raw: 0x7F_FFFF,
            }),
        );
        get(&mut stand, "/ignite");

        let response = get(&mut stand, "/status");
        assert_eq!(
            response.body(),
            r#"{"ignition":"armed","samples":1,"dropped":0,"sensor_faults":1,"last_fault":"saturated"}"#
        );
    }
}
