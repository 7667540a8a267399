use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Which end of a time window a date argument describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Start,
    End,
}

const DAY_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d-%m-%Y"];

/// Parses a window bound from RFC 3339, `YYYY-MM-DD` or `DD-MM-YYYY`.
/// A bare day covers the whole day: midnight for a start bound, the last
/// nanosecond of the day for an end bound.
pub fn parse_bound(input: &str, bound: Bound) -> Result<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(input) {
        return Ok(instant.with_timezone(&Utc));
    }

    let day = DAY_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(input, format).ok())
        .ok_or_else(|| {
            anyhow!("invalid date '{input}' (expected RFC 3339, YYYY-MM-DD or DD-MM-YYYY)")
        })?;
    let time = match bound {
        Bound::Start => NaiveTime::MIN,
        Bound::End => NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999)
            .ok_or_else(|| anyhow!("invalid end-of-day time"))?,
    };
    Ok(day.and_time(time).and_utc())
}

/// Resolves optional `--from`/`--to` arguments; a missing side is open.
pub fn parse_window(
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>> {
    if from.is_none() && to.is_none() {
        return Ok(None);
    }
    let begin = match from {
        Some(raw) => parse_bound(raw, Bound::Start)?,
        None => DateTime::<Utc>::MIN_UTC,
    };
    let end = match to {
        Some(raw) => parse_bound(raw, Bound::End)?,
        None => DateTime::<Utc>::MAX_UTC,
    };
    Ok(Some((begin, end)))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::util::dates::{parse_bound, parse_window, Bound};

    #[test]
    fn accepts_rfc3339_and_day_formats() {
        let expected = Utc
            .with_ymd_and_hms(2020, 6, 1, 0, 0, 0)
            .single()
            .expect("valid test date");
        assert_eq!(
            parse_bound("2020-06-01T00:00:00Z", Bound::Start).expect("rfc3339"),
            expected
        );
        assert_eq!(parse_bound("2020-06-01", Bound::Start).expect("iso day"), expected);
        assert_eq!(parse_bound("01-06-2020", Bound::Start).expect("dmy day"), expected);
    }

    #[test]
    fn end_bound_covers_the_whole_day() {
        let end = parse_bound("2020-06-01", Bound::End).expect("end bound");
        let late = Utc
            .with_ymd_and_hms(2020, 6, 1, 23, 59, 59)
            .single()
            .expect("valid test date");
        assert!(end > late);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_bound("yesterday", Bound::Start).is_err());
    }

    #[test]
    fn open_window_sides() {
        assert!(parse_window(None, None).expect("no window").is_none());
        let (begin, end) = parse_window(Some("2020-01-01"), None)
            .expect("half window")
            .expect("window present");
        assert!(begin < end);
    }
}
