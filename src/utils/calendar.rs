use chrono::{DateTime, NaiveDate, Utc};

/// Every calendar day an event touches, inclusive on both ends.
///
/// An event whose end lies before its start yields no days. Spans are
/// truncated after 365 iterations so a bad row cannot produce an unbounded
/// bucket map.
pub fn date_span_keys(start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<NaiveDate> {
    let end_day = end.date_naive();
    let mut day = start.date_naive();
    let mut keys = Vec::new();

    while day <= end_day {
        keys.push(day);
        if keys.len() > 365 {
            log::warn!("event spans more than 365 days, truncating");
            break;
        }
        day = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
    keys
}

pub fn format_date_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn month_boundary_span_covers_every_day() {
        let keys = date_span_keys(at(2025, 1, 30, 9), at(2025, 2, 2, 17));
        let formatted: Vec<String> = keys.into_iter().map(format_date_key).collect();
        assert_eq!(
            formatted,
            ["2025-01-30", "2025-01-31", "2025-02-01", "2025-02-02"]
        );
    }

    #[test]
    fn single_day_event_yields_one_key() {
        let keys = date_span_keys(at(2025, 3, 10, 9), at(2025, 3, 10, 18));
        assert_eq!(keys.len(), 1);
        assert_eq!(format_date_key(keys[0]), "2025-03-10");
    }

    #[test]
    fn inverted_range_yields_nothing() {
        let keys = date_span_keys(at(2025, 3, 11, 0), at(2025, 3, 10, 0));
        assert!(keys.is_empty());
    }

    #[test]
    fn runaway_span_is_truncated() {
        let keys = date_span_keys(at(2020, 1, 1, 0), at(2030, 1, 1, 0));
        assert_eq!(keys.len(), 366);
    }
}
