// Command line and environment configuration
use crate::tb_models::TransitMode;
use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand};
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Parser)]
#[command(name = "transit-board", version, about = "Real-time arrivals for metro, bus, tram, rail and bike share")]
pub struct Cli {
    #[command(flatten)]
    pub settings: Settings,

    #[command(subcommand)]
    pub command: Command,
}

/// Connection and display settings. Every value can come from the environment
/// (or a `.env` file) as well as from flags.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Base URL of the transit-data REST service
    #[arg(long, env = "TRANSIT_API_BASE", default_value = "https://api.transit.example/v1")]
    pub api_base: String,

    #[arg(long, env = "TRANSIT_APP_ID", default_value = "")]
    pub app_id: String,

    #[arg(long, env = "TRANSIT_APP_KEY", default_value = "", hide_env_values = true)]
    pub app_key: String,

    /// Seconds between two arrival fetches
    #[arg(long, env = "TRANSIT_POLL_INTERVAL", default_value_t = DEFAULT_POLL_INTERVAL_SECS,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval_secs: u64,

    /// HTTP request timeout in seconds
    #[arg(long, env = "TRANSIT_REQUEST_TIMEOUT", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub request_timeout_secs: u64,

    /// IANA time zone used for clock times and calendar days
    #[arg(long, env = "TRANSIT_TIMEZONE", default_value = "Europe/Madrid", value_parser = parse_timezone)]
    pub timezone: Tz,
}

impl Settings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn parse_timezone(name: &str) -> Result<Tz, String> {
    name.parse::<Tz>().map_err(|e| format!("unknown time zone '{}': {}", name, e))
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Live arrivals at a station, refreshed until Ctrl+C
    Arrivals(ArrivalsArgs),
    /// List lines, grouped by mode
    Lines {
        #[arg(long, value_enum)]
        mode: Option<TransitMode>,
    },
    /// List stations
    Stations {
        #[arg(long, value_enum)]
        mode: Option<TransitMode>,
        /// Case-insensitive part of the station name
        #[arg(long)]
        search: Option<String>,
    },
    /// Stations around a coordinate, grouped by walking distance
    Nearby {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        /// Search radius in metres
        #[arg(long, default_value_t = 1000.0)]
        radius: f64,
    },
    /// Active service alerts
    Alerts {
        #[arg(long)]
        line: Option<String>,
        /// Only alerts that mention this station code
        #[arg(long)]
        station: Option<String>,
    },
}

#[derive(Debug, Clone, Args)]
pub struct ArrivalsArgs {
    /// Station (stop) code
    #[arg(long)]
    pub station: String,

    /// Only show this line when the stop is shared by several lines
    #[arg(long)]
    pub line: Option<String>,

    #[arg(long, value_enum, default_value = "bus")]
    pub mode: TransitMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_flags() {
        let cli = Cli::try_parse_from(["transit-board", "arrivals", "--station", "2775"]).unwrap();
        assert_eq!(cli.settings.poll_interval(), Duration::from_secs(15));
        assert_eq!(cli.settings.request_timeout_secs, 15);
        assert_eq!(cli.settings.timezone, chrono_tz::Europe::Madrid);

        match cli.command {
            Command::Arrivals(args) => {
                assert_eq!(args.station, "2775");
                assert_eq!(args.line, None);
                assert_eq!(args.mode, TransitMode::Bus);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "transit-board",
            "--poll-interval-secs", "10",
            "--timezone", "Europe/Paris",
            "arrivals", "--station", "137", "--line", "L3", "--mode", "metro",
        ])
        .unwrap();
        assert_eq!(cli.settings.poll_interval(), Duration::from_secs(10));
        assert_eq!(cli.settings.timezone, chrono_tz::Europe::Paris);
        match cli.command {
            Command::Arrivals(args) => {
                assert_eq!(args.line.as_deref(), Some("L3"));
                assert_eq!(args.mode, TransitMode::Metro);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn zero_interval_and_bad_timezone_are_rejected() {
        assert!(Cli::try_parse_from(["transit-board", "--poll-interval-secs", "0", "lines"]).is_err());
        assert!(Cli::try_parse_from(["transit-board", "--timezone", "Mars/Olympus", "lines"]).is_err());
    }

    #[test]
    fn nearby_accepts_negative_coordinates() {
        let cli = Cli::try_parse_from(["transit-board", "nearby", "--lat", "-33.45", "--lon", "-70.66"]).unwrap();
        match cli.command {
            Command::Nearby { lat, lon, radius } => {
                assert_eq!(lat, -33.45);
                assert_eq!(lon, -70.66);
                assert_eq!(radius, 1000.0);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn alerts_can_narrow_to_a_station() {
        let cli = Cli::try_parse_from(["transit-board", "alerts", "--station", "0418"]).unwrap();
        match cli.command {
            Command::Alerts { line, station } => {
                assert_eq!(line, None);
                assert_eq!(station.as_deref(), Some("0418"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
