//! Opening-hours filter for place records.
//!
//! Only the first span of a day is considered and minutes are truncated, so a
//! place open `09:30-12:00, 13:00-18:00` is treated as open `9-12`. All
//! comparisons are strict: a place opening exactly at `range.begin` does not
//! match on that bound alone.

use chrono::Weekday;

use crate::model::{LocationRecord, TimeRange};

/// Keep the records open at some point of `range` on `day`.
#[must_use]
pub fn filter_open_during(
    records: Vec<LocationRecord>,
    day: Weekday,
    range: TimeRange,
) -> Vec<LocationRecord> {
    records
        .into_iter()
        .filter(|record| is_open_during(record, day, range))
        .collect()
}

/// Whether the record's first span on `day` overlaps `range`.
#[must_use]
pub fn is_open_during(record: &LocationRecord, day: Weekday, range: TimeRange) -> bool {
    let Some(span) = record
        .hours
        .as_ref()
        .and_then(|hours| hours.spans_on(day))
        .and_then(|spans| spans.first())
    else {
        return false;
    };

    let (Some(open), Some(close)) = (parse_hour(&span.open), parse_hour(&span.close)) else {
        return false;
    };

    (open < range.begin && range.begin < close)
        || (open < range.end && range.end < close)
        || (open > range.begin && close < range.end)
}

/// Leading integer of an `"HH:MM"` string; `"9:45"` is `9`.
fn parse_hour(raw: &str) -> Option<i32> {
    let trimmed = raw.trim_start();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .find(|ch: char| !ch.is_ascii_digit())
        .unwrap_or(digits.len());
    digits.get(..end)?.parse::<i32>().ok().map(|hour| sign * hour)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::model::{OpenSpan, PlaceId, WeeklyHours};

    fn record(hours: Option<&[(&str, &str, &str)]>) -> LocationRecord {
        let hours = hours.map(|entries| {
            let mut days = BTreeMap::<String, Vec<OpenSpan>>::new();
            for (day, open, close) in entries {
                days.entry((*day).to_owned()).or_default().push(OpenSpan {
                    open: (*open).to_owned(),
                    close: (*close).to_owned(),
                });
            }
            WeeklyHours(days)
        });
        LocationRecord {
            id: PlaceId("p".to_owned()),
            address: None,
            name: "place".to_owned(),
            latitude: Some(0.0),
            longitude: Some(0.0),
            category_ids: vec![123],
            hours,
        }
    }

    #[test]
    fn includes_when_range_end_falls_inside() {
        let shop = record(Some(&[("monday", "09:00", "17:00")]));
        assert!(is_open_during(&shop, Weekday::Mon, TimeRange::new(8, 10)));
    }

    #[test]
    fn excludes_range_after_closing() {
        let shop = record(Some(&[("monday", "09:00", "17:00")]));
        assert!(!is_open_during(&shop, Weekday::Mon, TimeRange::new(20, 22)));
    }

    #[test]
    fn excludes_records_without_hours() {
        let shop = record(None);
        for range in [TimeRange::new(0, 23), TimeRange::new(10, 12), TimeRange::new(5, 2)] {
            assert!(!is_open_during(&shop, Weekday::Mon, range));
        }
    }

    #[test]
    fn reversed_ranges_match_only_on_a_bound_inside_the_span() {
        let shop = record(Some(&[("monday", "09:00", "17:00")]));
        assert!(is_open_during(&shop, Weekday::Mon, TimeRange::new(14, 8)));
        assert!(!is_open_during(&shop, Weekday::Mon, TimeRange::new(20, 18)));
        assert!(!is_open_during(&shop, Weekday::Mon, TimeRange::new(22, 3)));
    }

    #[test]
    fn excludes_days_not_listed() {
        let shop = record(Some(&[("monday", "09:00", "17:00")]));
        assert!(!is_open_during(&shop, Weekday::Tue, TimeRange::new(10, 12)));
    }

    #[test]
    fn includes_span_strictly_inside_range() {
        let shop = record(Some(&[("friday", "11:00", "13:00")]));
        assert!(is_open_during(&shop, Weekday::Fri, TimeRange::new(10, 14)));
    }

    #[test]
    fn exact_boundaries_do_not_match() {
        let shop = record(Some(&[("monday", "09:00", "17:00")]));
        assert!(!is_open_during(&shop, Weekday::Mon, TimeRange::new(9, 17)));
    }

    #[test]
    fn only_first_span_counts_and_minutes_truncate() {
        let shop = record(Some(&[
            ("sunday", "09:45", "12:30"),
            ("sunday", "14:00", "20:00"),
        ]));
        assert!(is_open_during(&shop, Weekday::Sun, TimeRange::new(11, 13)));
        assert!(!is_open_during(&shop, Weekday::Sun, TimeRange::new(15, 18)));
    }

    #[test]
    fn malformed_hours_exclude() {
        let shop = record(Some(&[("monday", "noon", "17:00")]));
        assert!(!is_open_during(&shop, Weekday::Mon, TimeRange::new(10, 12)));
    }

    #[test]
    fn filter_keeps_only_matching_records() {
        let open = record(Some(&[("monday", "09:00", "17:00")]));
        let closed = record(Some(&[("monday", "18:00", "23:00")]));
        let kept = filter_open_during(
            vec![open, closed, record(None)],
            Weekday::Mon,
            TimeRange::new(12, 14),
        );
        assert_eq!(kept.len(), 1);
    }
}
