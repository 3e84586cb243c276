use chrono::{Local, TimeZone};
use shmoo_types::{EpochMillis, UserStats};

pub const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

pub struct StatsCalculator;

impl StatsCalculator {
    /// Derive the stats after one confirmed click at `event_timestamp`,
    /// using the local time zone for the daily boundary.
    pub fn next_stats(previous: &UserStats, event_timestamp: EpochMillis) -> UserStats {
        Self::next_stats_in(previous, event_timestamp, &Local)
    }

    /// Same as [`StatsCalculator::next_stats`] with an explicit time zone
    pub fn next_stats_in<Tz: TimeZone>(
        previous: &UserStats,
        event_timestamp: EpochMillis,
        tz: &Tz,
    ) -> UserStats {
        UserStats {
            total_clicks: previous.total_clicks.saturating_add(1),
            streak_count: Self::next_streak(previous, event_timestamp),
            last_click_timestamp: event_timestamp,
            daily_clicks: Self::next_daily_clicks(previous, event_timestamp, tz),
        }
    }

    /// Streak grows while clicks are at most one whole day apart (floor of
    /// elapsed 24h periods) and restarts at 1 otherwise.
    pub fn next_streak(previous: &UserStats, event_timestamp: EpochMillis) -> u64 {
        if !previous.has_clicked() {
            return 1;
        }

        if Self::gap_days(previous.last_click_timestamp, event_timestamp) <= 1 {
            previous.streak_count.saturating_add(1)
        } else {
            1
        }
    }

    pub fn next_daily_clicks<Tz: TimeZone>(
        previous: &UserStats,
        event_timestamp: EpochMillis,
        tz: &Tz,
    ) -> u64 {
        if previous.has_clicked()
            && Self::same_calendar_day(previous.last_click_timestamp, event_timestamp, tz)
        {
            previous.daily_clicks.saturating_add(1)
        } else {
            1
        }
    }

    /// Whole days between two timestamps. A negative gap (clock moved back)
    /// floors below zero and therefore still counts as consecutive.
    pub fn gap_days(last: EpochMillis, event: EpochMillis) -> i64 {
        event.saturating_sub(last).div_euclid(DAY_MILLIS)
    }

    pub fn same_calendar_day<Tz: TimeZone>(a: EpochMillis, b: EpochMillis, tz: &Tz) -> bool {
        match (
            tz.timestamp_millis_opt(a).single(),
            tz.timestamp_millis_opt(b).single(),
        ) {
            (Some(a), Some(b)) => a.date_naive() == b.date_naive(),
            _ => false,
        }
    }
}
