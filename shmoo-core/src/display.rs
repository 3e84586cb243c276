use chrono::TimeZone;
use shmoo_types::{EpochMillis, PointEntry, ShmooPoint, StatsSummary, UserStats};

const MINUTE_MILLIS: i64 = 60 * 1000;
const HOUR_MILLIS: i64 = 60 * MINUTE_MILLIS;

/// Relative label for the last click: "Never", "Just now", "5m ago", "3h ago", "2d ago"
pub fn format_last_click(timestamp: EpochMillis, now: EpochMillis) -> String {
    if timestamp == 0 {
        return "Never".to_string();
    }

    let diff = now.saturating_sub(timestamp);
    let minutes = diff.div_euclid(MINUTE_MILLIS);
    let hours = diff.div_euclid(HOUR_MILLIS);
    let days = diff.div_euclid(crate::DAY_MILLIS);

    if minutes < 1 {
        "Just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if hours < 24 {
        format!("{}h ago", hours)
    } else {
        format!("{}d ago", days)
    }
}

pub fn format_streak(streak: u64) -> String {
    if streak == 1 {
        "1 day".to_string()
    } else {
        format!("{} days", streak)
    }
}

/// Integer with thousands separators, e.g. `12,345`
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// "Shmoo Point #N" where the oldest point is #1
pub fn point_label(index: usize, total: usize) -> String {
    format!("Shmoo Point #{}", total.saturating_sub(index))
}

/// e.g. "Mar 10 at 09:00:00 AM"
pub fn format_point_time<Tz: TimeZone>(timestamp: EpochMillis, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match tz.timestamp_millis_opt(timestamp).single() {
        Some(time) => time.format("%b %-d at %I:%M:%S %p").to_string(),
        None => "Unknown time".to_string(),
    }
}

/// History rows for a newest-first page of points out of `total` stored
pub fn history_entries<Tz: TimeZone>(
    points: Vec<ShmooPoint>,
    total: usize,
    tz: &Tz,
) -> Vec<PointEntry>
where
    Tz::Offset: std::fmt::Display,
{
    points
        .into_iter()
        .enumerate()
        .map(|(index, point)| PointEntry {
            label: point_label(index, total),
            display_time: format_point_time(point.timestamp, tz),
            point,
        })
        .collect()
}

pub fn summarize(stats: &UserStats, now: EpochMillis) -> StatsSummary {
    StatsSummary {
        total_clicks: format_count(stats.total_clicks),
        current_streak: format_streak(stats.streak_count),
        today: stats.daily_clicks.to_string(),
        last_click: format_last_click(stats.last_click_timestamp, now),
    }
}
