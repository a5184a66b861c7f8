// Controllers for the transit board: one handler per command
use crate::tb_config::{ArrivalsArgs, Cli, Command, Settings};
use crate::tb_countdown::{Clock, CountdownDisplay, CountdownTicker, SystemClock};
use crate::tb_models::{Alert, FetchError, Route, Station, TransitMode};
use crate::tb_nearby;
use crate::tb_polling::{ArrivalPoller, ArrivalsSnapshot, PollRequest};
use crate::tb_source::{HttpTransitSource, TransitSource};
use crate::tb_views::TBViews;
use anyhow::{Context, Result};
use chrono::Utc;
use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::WatchStream;

const REDRAW_EVERY: Duration = Duration::from_secs(1);

pub struct TBControllers;

impl TBControllers {
    pub async fn run(cli: Cli) -> Result<()> {
        let source: Arc<dyn TransitSource> = Arc::new(
            HttpTransitSource::new(&cli.settings).context("Could not set up the transit service client")?,
        );

        match cli.command {
            Command::Arrivals(args) => Self::handle_live_board(source, &cli.settings, args).await,
            Command::Lines { mode } => Self::handle_lines(source.as_ref(), mode).await,
            Command::Stations { mode, search } => {
                Self::handle_stations(source.as_ref(), mode, search.as_deref()).await
            }
            Command::Nearby { lat, lon, radius } => Self::handle_nearby(source.as_ref(), lat, lon, radius).await,
            Command::Alerts { line, station } => {
                Self::handle_alerts(source.as_ref(), line.as_deref(), station.as_deref()).await
            }
        }
    }

    /// Live arrivals: the poller refreshes the data, one ticker per trip row
    /// refreshes its countdown, and the screen is redrawn every second.
    async fn handle_live_board(source: Arc<dyn TransitSource>, settings: &Settings, args: ArrivalsArgs) -> Result<()> {
        let request = PollRequest {
            station_code: args.station.clone(),
            line_code: args.line.clone(),
            mode: args.mode,
        };
        let poller = ArrivalPoller::new(source, request, settings.poll_interval()).spawn();
        let mut updates = WatchStream::new(poller.subscribe());

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let mut board = BoardRows::default();
        let mut snapshot = ArrivalsSnapshot::default();

        let mut redraw = tokio::time::interval(REDRAW_EVERY);
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                update = updates.next() => {
                    let Some(update) = update else { break };
                    board.sync(&update.routes, settings.timezone, &clock);
                    snapshot = update;
                }
                _ = redraw.tick() => {}
                result = &mut shutdown => {
                    result.context("Failed to listen for Ctrl+C")?;
                    break;
                }
            }

            TBViews::clear_screen();
            TBViews::show_board(
                &args.station,
                args.line.as_deref(),
                &snapshot,
                &board.displays(),
                settings.timezone,
            );
        }

        debug!("Leaving station {} with {} routes on screen", args.station, snapshot.routes.len());
        poller.stop().await;
        drop(board);
        TBViews::goodbye_message();
        Ok(())
    }

    async fn handle_lines(source: &dyn TransitSource, mode: Option<TransitMode>) -> Result<()> {
        TBViews::show_loading("Loading lines");
        let result = source.fetch_lines().await;
        TBViews::clear_loading();

        let mut lines = Self::report(result, "Failed to load lines")?;
        if let Some(mode) = mode {
            lines.retain(|l| l.mode == mode);
        }
        TBViews::show_lines(&lines);
        Ok(())
    }

    async fn handle_stations(source: &dyn TransitSource, mode: Option<TransitMode>, search: Option<&str>) -> Result<()> {
        TBViews::show_loading("Loading stations");
        let result = source.fetch_stations().await;
        TBViews::clear_loading();

        let stations = Self::report(result, "Failed to load stations")?;
        let matching = Self::filter_stations(&stations, mode, search);
        TBViews::show_stations(&matching);
        Ok(())
    }

    async fn handle_nearby(source: &dyn TransitSource, lat: f64, lon: f64, radius: f64) -> Result<()> {
        TBViews::show_loading("Looking for nearby stations");
        let result = source.fetch_stations().await;
        TBViews::clear_loading();

        let stations = Self::report(result, "Failed to load stations")?;
        let groups = tb_nearby::group_by_distance(&stations, lat, lon, radius);
        debug!("{} distance bands around ({}, {})", groups.len(), lat, lon);
        TBViews::show_nearby(&groups, radius);
        Ok(())
    }

    async fn handle_alerts(source: &dyn TransitSource, line: Option<&str>, station: Option<&str>) -> Result<()> {
        TBViews::show_loading("Loading service alerts");
        let result = source.fetch_alerts().await;
        TBViews::clear_loading();

        let alerts = Self::report(result, "Failed to load alerts")?;
        let active = Self::active_alerts(&alerts, line, station, Utc::now().timestamp());
        info!("{} of {} alerts active", active.len(), alerts.len());
        TBViews::show_alerts(&active);
        Ok(())
    }

    /// Show a fetch failure to the user and turn it into the command's error.
    fn report<T>(result: std::result::Result<T, FetchError>, what: &'static str) -> Result<T> {
        result.map_err(|e| {
            TBViews::network_error(e.user_message());
            anyhow::Error::new(e).context(what)
        })
    }

    // ========================================================================
    // Helper Functions
    // ========================================================================

    pub fn filter_stations<'a>(
        stations: &'a [Station],
        mode: Option<TransitMode>,
        search: Option<&str>,
    ) -> Vec<&'a Station> {
        let needle = search.map(|s| s.trim().to_lowercase());
        stations
            .iter()
            .filter(|s| mode.is_none_or(|m| s.mode == m))
            .filter(|s| {
                needle
                    .as_ref()
                    .is_none_or(|n| s.name.to_lowercase().contains(n.as_str()))
            })
            .collect()
    }

    pub fn active_alerts<'a>(
        alerts: &'a [Alert],
        line: Option<&str>,
        station: Option<&str>,
        now: i64,
    ) -> Vec<&'a Alert> {
        alerts
            .iter()
            .filter(|a| a.is_active_at(now))
            .filter(|a| line.is_none_or(|code| a.affects_line(code)))
            .filter(|a| station.is_none_or(|code| a.affects_station(code)))
            .collect()
    }
}

/// Countdown tickers for the rows currently on screen, rebuilt whenever a poll
/// delivers a different route list. Dropping a row drops its ticker.
#[derive(Default)]
struct BoardRows {
    shown: Vec<Route>,
    tickers: Vec<Vec<CountdownTicker>>,
}

impl BoardRows {
    fn sync(&mut self, routes: &[Route], timezone: chrono_tz::Tz, clock: &Arc<dyn Clock>) {
        if self.shown.as_slice() == routes {
            return;
        }
        self.tickers = routes
            .iter()
            .map(|route| {
                route
                    .trips
                    .iter()
                    .map(|trip| CountdownTicker::spawn(trip.arrival, timezone, clock.clone()))
                    .collect()
            })
            .collect();
        self.shown = routes.to_vec();
    }

    fn displays(&self) -> Vec<Vec<CountdownDisplay>> {
        self.tickers
            .iter()
            .map(|row| row.iter().map(CountdownTicker::current).collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tb_countdown::ARRIVING_TEXT;
    use crate::tb_models::Trip;
    use chrono::{DateTime, TimeZone};

    fn station(code: &str, name: &str, mode: TransitMode) -> Station {
        Station {
            code: code.to_string(),
            name: name.to_string(),
            mode,
            latitude: 41.38,
            longitude: 2.17,
            lines: Vec::new(),
            bikes: None,
        }
    }

    fn alert(id: &str, lines: &[&str], from: Option<i64>, until: Option<i64>) -> Alert {
        Alert {
            id: id.to_string(),
            title: format!("Alert {}", id),
            description: String::new(),
            line_codes: lines.iter().map(|l| l.to_string()).collect(),
            station_codes: vec!["2775".to_string()],
            active_from: from,
            active_until: until,
        }
    }

    #[test]
    fn stations_filter_by_mode_and_name() {
        let stations = vec![
            station("1", "Catalunya", TransitMode::Metro),
            station("2", "Pl. Catalunya", TransitMode::Bus),
            station("3", "Sagrada Família", TransitMode::Metro),
        ];

        let metro = TBControllers::filter_stations(&stations, Some(TransitMode::Metro), None);
        assert_eq!(metro.len(), 2);

        let named = TBControllers::filter_stations(&stations, None, Some("  CATALUNYA "));
        assert_eq!(named.iter().map(|s| s.code.as_str()).collect::<Vec<_>>(), vec!["1", "2"]);

        let both = TBControllers::filter_stations(&stations, Some(TransitMode::Bus), Some("catalunya"));
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].code, "2");
    }

    #[test]
    fn only_active_alerts_for_the_line_are_kept() {
        let alerts = vec![
            alert("past", &["L1"], Some(0), Some(50)),
            alert("now", &["L1", "L3"], Some(50), Some(500)),
            alert("future", &["L1"], Some(1000), None),
            alert("other", &["L5"], None, None),
        ];

        let all = TBControllers::active_alerts(&alerts, None, None, 100);
        assert_eq!(all.iter().map(|a| a.id.as_str()).collect::<Vec<_>>(), vec!["now", "other"]);

        let l3 = TBControllers::active_alerts(&alerts, Some("L3"), None, 100);
        assert_eq!(l3.len(), 1);
        assert_eq!(l3[0].id, "now");
    }

    #[test]
    fn alerts_narrow_to_the_requested_station() {
        let mut elevator = alert("elevator", &[], None, None);
        elevator.station_codes = vec!["0418".to_string()];
        let alerts = vec![alert("works", &["L1"], None, None), elevator];

        let at_0418 = TBControllers::active_alerts(&alerts, None, Some("0418"), 100);
        assert_eq!(at_0418.iter().map(|a| a.id.as_str()).collect::<Vec<_>>(), vec!["elevator"]);

        let l1_at_2775 = TBControllers::active_alerts(&alerts, Some("L1"), Some("2775"), 100);
        assert_eq!(l1_at_2775.len(), 1);
        assert_eq!(l1_at_2775[0].id, "works");

        assert!(TBControllers::active_alerts(&alerts, Some("L1"), Some("0418"), 100).is_empty());
    }

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn route_with(arrivals: &[i64]) -> Route {
        Route {
            id: "L3-0".to_string(),
            line_type: TransitMode::Metro,
            line_code: "L3".to_string(),
            line_name: "L3".to_string(),
            color: "37A737".to_string(),
            destination: "Trinitat Nova".to_string(),
            trips: arrivals
                .iter()
                .map(|a| Trip {
                    id: a.to_string(),
                    arrival: *a,
                    delay_minutes: 0,
                    platform: "1".to_string(),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn board_rows_follow_the_latest_routes() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap();
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(now));
        let t = now.timestamp();
        let mut board = BoardRows::default();

        board.sync(&[route_with(&[t + 20, t + 125])], chrono_tz::Europe::Madrid, &clock);
        let displays = board.displays();
        assert_eq!(displays.len(), 1);
        assert_eq!(displays[0][0].text, ARRIVING_TEXT);
        assert_eq!(displays[0][1].text, "2 min 5s");

        board.sync(&[route_with(&[t + 45]), route_with(&[])], chrono_tz::Europe::Madrid, &clock);
        let displays = board.displays();
        assert_eq!(displays.len(), 2);
        assert_eq!(displays[0].len(), 1);
        assert_eq!(displays[0][0].text, "45s");
        assert!(displays[1].is_empty());
    }
}
