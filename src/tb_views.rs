// Terminal views for the transit board
use crate::tb_countdown::CountdownDisplay;
use crate::tb_models::{Alert, Line, Station, TBModels, TransitMode, Trip};
use crate::tb_nearby::{DistanceBand, NearbyStation};
use crate::tb_polling::ArrivalsSnapshot;
use chrono_tz::Tz;
use std::io::{self, Write};

pub struct TBViews;

impl TBViews {
    /// Clear screen and move cursor to top-left
    pub fn clear_screen() {
        print!("\x1B[2J\x1B[1;1H");
        let _ = io::stdout().flush();
    }

    /// Live arrivals board. `countdowns[i][j]` is the current display of
    /// `snapshot.routes[i].trips[j]`.
    pub fn show_board(
        station_code: &str,
        line_filter: Option<&str>,
        snapshot: &ArrivalsSnapshot,
        countdowns: &[Vec<CountdownDisplay>],
        timezone: Tz,
    ) {
        println!("{}", "═".repeat(70));
        println!("🕐 NEXT ARRIVALS AT STATION {}", station_code);
        if let Some(line) = line_filter {
            println!("   Filtered by line: {}", line);
        }
        match snapshot.last_updated {
            Some(at) => println!(
                "   Updated at {}{}",
                at.with_timezone(&timezone).format("%H:%M:%S"),
                if snapshot.loading { "  🔄 refreshing..." } else { "" }
            ),
            None if snapshot.loading => println!("   🔄 Loading arrivals..."),
            None => {}
        }
        println!("{}", "═".repeat(70));

        if let Some(error) = &snapshot.error {
            println!("\n⚠️  {}", error);
            if !snapshot.routes.is_empty() {
                println!("   Showing the last arrivals received.");
            }
        }

        if snapshot.routes.is_empty() {
            if snapshot.last_updated.is_some() {
                Self::show_no_arrivals_message(line_filter);
            }
            return;
        }

        for (route, displays) in snapshot.routes.iter().zip(countdowns) {
            println!(
                "\n  {} {} → {}",
                Self::colorize_line(&route.line_name, &route.color),
                route.line_type.icon(),
                route.destination
            );
            if route.trips.is_empty() {
                println!("     No upcoming trips");
            }
            for (trip, display) in route.trips.iter().zip(displays) {
                Self::display_trip(trip, display);
            }
        }

        println!("\n{}", "─".repeat(70));
        println!("Press Ctrl+C to return");
    }

    fn display_trip(trip: &Trip, display: &CountdownDisplay) {
        let marker = if display.is_imminent {
            "🔴"
        } else if display.is_absolute_time {
            "🕐"
        } else {
            "🟢"
        };

        print!("     {} {:<14}", marker, display.text);
        if trip.delay_minutes != 0 {
            print!("  ⏱️  {}", TBModels::format_delay(trip.delay_minutes));
        }
        if !trip.platform.is_empty() {
            print!("  🛤️  Platform {}", trip.platform);
        }
        println!();
    }

    fn show_no_arrivals_message(line_filter: Option<&str>) {
        println!("\n⚠️  No upcoming arrivals found");
        println!("\n📋 Possible reasons:");
        if line_filter.is_some() {
            println!("  • No vehicles of the selected line are approaching this stop");
            println!("  • Try again without the line filter");
        } else {
            println!("  • Service may not be operating at this time");
            println!("  • Real-time data temporarily unavailable");
        }
    }

    /// Lines grouped by transit mode
    pub fn show_lines(lines: &[Line]) {
        println!("\n{}", "═".repeat(70));
        println!("🚌 LINES ({} total)", lines.len());
        println!("{}", "═".repeat(70));

        for mode in TransitMode::ALL {
            let of_mode: Vec<&Line> = lines.iter().filter(|l| l.mode == mode).collect();
            if of_mode.is_empty() {
                continue;
            }
            println!("\n{} {} ({}):", mode.icon(), mode.label().to_uppercase(), of_mode.len());
            println!("{}", "─".repeat(70));
            for line in of_mode {
                if line.origin.is_empty() && line.destination.is_empty() {
                    println!("  {} {}", Self::colorize_line(&line.code, &line.color), line.name);
                } else {
                    println!(
                        "  {} {}  ({} ↔ {})",
                        Self::colorize_line(&line.code, &line.color),
                        line.name,
                        line.origin,
                        line.destination
                    );
                }
            }
        }
    }

    pub fn show_stations(stations: &[&Station]) {
        println!("\n{}", "═".repeat(70));
        println!("📍 STATIONS ({} found)", stations.len());
        println!("{}", "═".repeat(70));

        for station in stations {
            Self::display_station(station, None);
        }
    }

    fn display_station(station: &Station, distance_m: Option<f64>) {
        match distance_m {
            Some(d) => println!(
                "\n  {} {} (ID: {}) - {:.0} m",
                station.mode.icon(),
                station.name,
                station.code,
                d
            ),
            None => println!("\n  {} {} (ID: {})", station.mode.icon(), station.name, station.code),
        }
        if !station.lines.is_empty() {
            println!("     Lines: {}", station.lines.join(" "));
        }
        if let Some(bikes) = station.bikes {
            println!("     🚲 {} bikes | 🅿️  {} free docks", bikes.bikes, bikes.docks);
        }
    }

    pub fn show_nearby(groups: &[(DistanceBand, Vec<NearbyStation>)], radius_m: f64) {
        println!("\n{}", "═".repeat(70));
        println!("🧭 STATIONS WITHIN {:.0} m", radius_m);
        println!("{}", "═".repeat(70));

        if groups.is_empty() {
            println!("\n⚠️  No stations in range. Try a larger --radius.");
            return;
        }

        for (band, members) in groups {
            println!("\n{} ({})", band.label(), members.len());
            println!("{}", "─".repeat(70));
            for nearby in members {
                Self::display_station(nearby.station, Some(nearby.distance_m));
            }
        }
    }

    pub fn show_alerts(alerts: &[&Alert]) {
        println!("\n{}", "═".repeat(70));
        println!("⚠️  SERVICE ALERTS ({} active)", alerts.len());
        println!("{}", "═".repeat(70));

        if alerts.is_empty() {
            println!("\n✓ No active alerts. Service is running normally.");
            return;
        }

        for alert in alerts {
            println!("\n  • {}", alert.title);
            if !alert.line_codes.is_empty() {
                println!("    Lines: {}", alert.line_codes.join(", "));
            }
            if !alert.description.is_empty() {
                println!("    {}", alert.description);
            }
        }
    }

    pub fn network_error(error: &str) {
        println!("\n{}", "═".repeat(60));
        println!("❌ NETWORK ERROR");
        println!("{}", "═".repeat(60));
        println!("\n{}", error);
        println!("\n💡 Troubleshooting:");
        println!("  • Check your internet connection");
        println!("  • Check TRANSIT_APP_ID and TRANSIT_APP_KEY");
        println!("  • Try again in a few moments");
        println!("{}", "═".repeat(60));
    }

    pub fn show_loading(message: &str) {
        print!("\r🔄 {}...", message);
        let _ = io::stdout().flush();
    }

    pub fn clear_loading() {
        print!("\r{}\r", " ".repeat(60));
        let _ = io::stdout().flush();
    }

    pub fn goodbye_message() {
        println!("\n{}", "═".repeat(60));
        println!("       👋 Leaving the live board");
        println!("{}", "═".repeat(60));
    }

    /// Line badge with the line color as background and a readable foreground
    pub fn colorize_line(code: &str, hex_color: &str) -> String {
        let (r, g, b) = TBModels::parse_hex_color(hex_color);

        let luminance = (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32) / 255.0;
        let text_color = if luminance > 0.5 { "30" } else { "97" };

        format!(
            "\x1b[48;2;{};{};{}m\x1b[{}m {} \x1b[0m",
            r, g, b, text_color, code
        )
    }
}
