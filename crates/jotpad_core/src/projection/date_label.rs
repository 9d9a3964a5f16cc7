//! Relative date labels for note cards.

use crate::model::note::CreatedAt;
use chrono::{DateTime, TimeZone, Utc};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Label for timestamps that have not resolved yet.
pub const PENDING_LABEL: &str = "Just now";

/// Formats `created_at` relative to `now`.
///
/// Rules, on whole elapsed days (absolute difference, floored):
/// - `0` -> `Today`
/// - `1` -> `Yesterday`
/// - `2..=6` -> `N days ago`
/// - otherwise the calendar date as `YYYY-MM-DD`
pub fn relative_date_label(created_at: CreatedAt, now: DateTime<Utc>) -> String {
    let Some(epoch_ms) = created_at.epoch_ms() else {
        return PENDING_LABEL.to_string();
    };
    let Some(created) = Utc.timestamp_millis_opt(epoch_ms).single() else {
        return PENDING_LABEL.to_string();
    };

    let elapsed_days = (now.timestamp_millis() - epoch_ms).abs() / MILLIS_PER_DAY;
    match elapsed_days {
        0 => "Today".to_string(),
        1 => "Yesterday".to_string(),
        2..=6 => format!("{elapsed_days} days ago"),
        _ => created.format("%Y-%m-%d").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{relative_date_label, MILLIS_PER_DAY, PENDING_LABEL};
    use crate::model::note::CreatedAt;
    use chrono::{TimeZone, Utc};

    #[test]
    fn labels_follow_elapsed_day_buckets() {
        let now = Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap();
        let now_ms = now.timestamp_millis();

        let at = |days_ago: i64| CreatedAt::At(now_ms - days_ago * MILLIS_PER_DAY);
        assert_eq!(relative_date_label(at(0), now), "Today");
        assert_eq!(relative_date_label(at(1), now), "Yesterday");
        assert_eq!(relative_date_label(at(3), now), "3 days ago");
        assert_eq!(relative_date_label(at(10), now), "2024-03-10");
    }

    #[test]
    fn pending_renders_as_just_now() {
        let now = Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap();
        assert_eq!(relative_date_label(CreatedAt::Pending, now), PENDING_LABEL);
    }
}
