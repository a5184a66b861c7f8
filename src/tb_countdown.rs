// Countdown text for upcoming arrivals and the per-row timer that refreshes it
use chrono::{DateTime, Datelike, TimeZone, Utc};
use chrono_tz::Tz;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// At or below this many milliseconds away an arrival is shown as imminent.
pub const ARRIVING_THRESHOLD_MS: i64 = 40_000;
/// Beyond this many milliseconds away an arrival is shown as a clock time.
pub const ABSOLUTE_TIME_THRESHOLD_MS: i64 = 3_600_000;

pub const ARRIVING_TEXT: &str = "arriving";
pub const HOUR_MARKER: &str = "h";

const TICK: Duration = Duration::from_secs(1);

// ============================================================================
// Formatter
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownThresholds {
    pub arriving_ms: i64,
    pub absolute_time_ms: i64,
}

impl Default for CountdownThresholds {
    fn default() -> Self {
        CountdownThresholds {
            arriving_ms: ARRIVING_THRESHOLD_MS,
            absolute_time_ms: ABSOLUTE_TIME_THRESHOLD_MS,
        }
    }
}

/// What one trip row shows right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountdownDisplay {
    pub text: String,
    pub is_imminent: bool,
    pub is_absolute_time: bool,
    /// The clock time also carries a day/month because the arrival is on another day.
    pub shows_date: bool,
}

impl CountdownDisplay {
    fn arriving() -> Self {
        CountdownDisplay {
            text: ARRIVING_TEXT.to_string(),
            is_imminent: true,
            is_absolute_time: false,
            shows_date: false,
        }
    }

    fn relative(text: String) -> Self {
        CountdownDisplay {
            text,
            is_imminent: false,
            is_absolute_time: false,
            shows_date: false,
        }
    }
}

pub fn format_countdown<T: TimeZone>(arrival: i64, now: &DateTime<T>) -> CountdownDisplay
where
    T::Offset: fmt::Display,
{
    format_countdown_with(arrival, now, CountdownThresholds::default())
}

/// Render `arrival` (epoch seconds) relative to `now`. Calendar days are taken in
/// `now`'s time zone. Past arrivals saturate at the imminent text.
pub fn format_countdown_with<T: TimeZone>(
    arrival: i64,
    now: &DateTime<T>,
    thresholds: CountdownThresholds,
) -> CountdownDisplay
where
    T::Offset: fmt::Display,
{
    let delta_ms = arrival
        .saturating_mul(1000)
        .saturating_sub(now.timestamp_millis());

    if delta_ms <= thresholds.arriving_ms {
        return CountdownDisplay::arriving();
    }

    if delta_ms <= thresholds.absolute_time_ms {
        let total_secs = delta_ms / 1000;
        let minutes = total_secs / 60;
        let seconds = total_secs % 60;
        let text = if minutes == 0 {
            format!("{}s", seconds)
        } else {
            format!("{} min {}s", minutes, seconds)
        };
        return CountdownDisplay::relative(text);
    }

    let Some(at) = now.timezone().timestamp_opt(arrival, 0).single() else {
        return CountdownDisplay {
            text: format!("--:--{}", HOUR_MARKER),
            is_imminent: false,
            is_absolute_time: true,
            shows_date: false,
        };
    };

    let other_day = at.year() != now.year() || at.ordinal() != now.ordinal();
    let text = if other_day {
        format!("{}{}", at.format("%d/%m %H:%M"), HOUR_MARKER)
    } else {
        format!("{}{}", at.format("%H:%M"), HOUR_MARKER)
    };

    CountdownDisplay {
        text,
        is_imminent: false,
        is_absolute_time: true,
        shows_date: other_day,
    }
}

// ============================================================================
// Per-row Ticker
// ============================================================================

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Recomputes one trip's countdown once per second while it is displayed.
/// Dropping the ticker stops its timer.
pub struct CountdownTicker {
    display: watch::Receiver<CountdownDisplay>,
    task: JoinHandle<()>,
}

impl CountdownTicker {
    pub fn spawn(arrival: i64, timezone: Tz, clock: Arc<dyn Clock>) -> Self {
        let compute = move |clock: &dyn Clock| format_countdown(arrival, &clock.now().with_timezone(&timezone));

        let (tx, display) = watch::channel(compute(clock.as_ref()));

        let task = tokio::spawn(async move {
            let mut ticks = tokio::time::interval(TICK);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticks.tick().await;
                let next = compute(clock.as_ref());
                tx.send_if_modified(|current| {
                    if *current == next {
                        false
                    } else {
                        *current = next;
                        true
                    }
                });
            }
        });

        CountdownTicker { display, task }
    }

    pub fn current(&self) -> CountdownDisplay {
        self.display.borrow().clone()
    }

    #[cfg(test)]
    pub fn subscribe(&self) -> watch::Receiver<CountdownDisplay> {
        self.display.clone()
    }
}

impl Drop for CountdownTicker {
    fn drop(&mut self) {
        self.task.abort();
    }
}
