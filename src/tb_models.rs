// Data model for the transit board: lines, stations, arrival routes and alerts
//
// All payloads come from the transit-data REST service as JSON:
// - GET {base}/lines
// - GET {base}/stations
// - GET {base}/stations/{code}/routes
// - GET {base}/alerts

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Transit Modes
// ============================================================================

/// Every kind of service the board knows about. Mode-specific data lives in
/// optional fields on the shared records instead of one record type per mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TransitMode {
    Metro,
    Bus,
    Tram,
    Rail,
    Funicular,
    BikeShare,
}

impl TransitMode {
    pub const ALL: [TransitMode; 6] = [
        TransitMode::Metro,
        TransitMode::Bus,
        TransitMode::Tram,
        TransitMode::Rail,
        TransitMode::Funicular,
        TransitMode::BikeShare,
    ];

    /// Whether one physical stop of this mode is served by several lines, in which
    /// case arrivals fetched for the stop must be narrowed to the requested line.
    pub fn filters_by_line(&self) -> bool {
        matches!(self, TransitMode::Bus | TransitMode::Tram)
    }

    pub fn label(&self) -> &'static str {
        match self {
            TransitMode::Metro => "Metro",
            TransitMode::Bus => "Bus",
            TransitMode::Tram => "Tram",
            TransitMode::Rail => "Regional rail",
            TransitMode::Funicular => "Funicular",
            TransitMode::BikeShare => "Bike share",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            TransitMode::Metro => "🚇",
            TransitMode::Bus => "🚌",
            TransitMode::Tram => "🚊",
            TransitMode::Rail => "🚆",
            TransitMode::Funicular => "🚞",
            TransitMode::BikeShare => "🚲",
        }
    }
}

impl fmt::Display for TransitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Data Structures
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    pub code: String,
    pub name: String,
    pub mode: TransitMode,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub destination: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BikeAvailability {
    pub bikes: u32,
    pub docks: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub code: String,
    pub name: String,
    pub mode: TransitMode,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub lines: Vec<String>,
    /// Only present for bike-share docks.
    #[serde(default)]
    pub bikes: Option<BikeAvailability>,
}

/// One upcoming vehicle arrival.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: String,
    /// Absolute arrival instant in epoch seconds.
    pub arrival: i64,
    #[serde(default, rename = "delay")]
    pub delay_minutes: i32,
    #[serde(default)]
    pub platform: String,
}

/// A directional service of one line as observed at a station. Trips keep the
/// order the service returned them in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: String,
    pub line_type: TransitMode,
    pub line_code: String,
    pub line_name: String,
    #[serde(default = "default_color")]
    pub color: String,
    pub destination: String,
    #[serde(default)]
    pub trips: Vec<Trip>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub line_codes: Vec<String>,
    #[serde(default)]
    pub station_codes: Vec<String>,
    #[serde(default)]
    pub active_from: Option<i64>,
    #[serde(default)]
    pub active_until: Option<i64>,
}

impl Alert {
    /// Open-ended periods count as active on that side.
    pub fn is_active_at(&self, now: i64) -> bool {
        self.active_from.is_none_or(|start| start <= now)
            && self.active_until.is_none_or(|end| now <= end)
    }

    pub fn affects_line(&self, line_code: &str) -> bool {
        self.line_codes.iter().any(|c| c.eq_ignore_ascii_case(line_code))
    }

    pub fn affects_station(&self, station_code: &str) -> bool {
        self.station_codes.iter().any(|c| c == station_code)
    }
}

fn default_color() -> String {
    "808080".to_string()
}

// ============================================================================
// Error Handling
// ============================================================================

/// Failures of the transit-data service, classified for display.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network unreachable: {0}")]
    Network(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("request rejected by the transit service")]
    Unauthorized,
    #[error("unexpected failure: {0:#}")]
    Unknown(anyhow::Error),
}

impl FetchError {
    pub fn user_message(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "No connection. Check your internet connection.",
            FetchError::Timeout(_) => "The server took too long to answer. Try again.",
            FetchError::Unauthorized => "Access to the transit service was denied.",
            FetchError::Unknown(_) => "Something went wrong while loading arrivals.",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        // The request URL carries the app key as a query parameter
        let e = e.without_url();
        if e.is_timeout() {
            FetchError::Timeout(e.to_string())
        } else if e.is_connect() {
            FetchError::Network(e.to_string())
        } else if matches!(
            e.status(),
            Some(reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN)
        ) {
            FetchError::Unauthorized
        } else {
            FetchError::Unknown(e.into())
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

pub struct TBModels;

impl TBModels {
    /// Narrow a station's routes to one line when the stop is shared by several lines.
    /// Modes with one stop per line return the routes untouched.
    pub fn routes_for_line(routes: Vec<Route>, mode: TransitMode, line_code: Option<&str>) -> Vec<Route> {
        match line_code {
            Some(code) if mode.filters_by_line() => routes
                .into_iter()
                .filter(|r| r.line_code == code)
                .collect(),
            _ => routes,
        }
    }

    pub fn parse_hex_color(hex_color: &str) -> (u8, u8, u8) {
        let hex = hex_color.trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return (128, 128, 128);
        }
        let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(128);
        let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(128);
        let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(128);
        (r, g, b)
    }

    /// Format a delay in minutes as a readable string
    pub fn format_delay(delay_minutes: i32) -> String {
        if delay_minutes == 0 {
            "On time".to_string()
        } else {
            format!("{:+} min", delay_minutes)
        }
    }
}
