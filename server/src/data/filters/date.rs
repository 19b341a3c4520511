//! Date coercion for date-typed filter fields

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use super::types::FilterError;

/// Naive formats tried after RFC 3339, interpreted as UTC
const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses raw parameter values into timestamps
pub trait DateParser: Send + Sync {
    fn parse(&self, field: &str, value: &str) -> Result<DateTime<Utc>, FilterError>;
}

/// Default parser: RFC 3339, `YYYY-MM-DD HH:MM[:SS[.f]]` and `YYYY-MM-DD` (UTC)
#[derive(Debug, Clone, Copy, Default)]
pub struct ChronoDateParser;

impl DateParser for ChronoDateParser {
    fn parse(&self, field: &str, value: &str) -> Result<DateTime<Utc>, FilterError> {
        let trimmed = value.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(dt.with_timezone(&Utc));
        }

        for format in NAIVE_DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Ok(naive.and_utc());
            }
        }

        if let Some(naive) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return Ok(naive.and_utc());
        }

        Err(FilterError::InvalidDateFormat {
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn parse(value: &str) -> Result<DateTime<Utc>, FilterError> {
        ChronoDateParser.parse("created_at", value)
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        let parsed = parse("2024-01-15T10:30:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 0).unwrap());
    }

    #[test]
    fn parses_naive_datetime_as_utc() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(parse("2024-01-15 10:30:00").unwrap(), expected);
        assert_eq!(parse("2024-01-15T10:30:00").unwrap(), expected);
        assert_eq!(parse("2024-01-15 10:30").unwrap(), expected);
    }

    #[test]
    fn parses_fractional_seconds() {
        let parsed = parse("2024-01-15 10:30:00.250").unwrap();
        assert_eq!(parsed.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn parses_date_as_midnight() {
        assert_eq!(
            parse("2024-01-15").unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn rejects_garbage() {
        let err = parse("last tuesday").unwrap_err();
        assert_eq!(
            err,
            FilterError::InvalidDateFormat {
                field: "created_at".to_string(),
                value: "last tuesday".to_string(),
            }
        );
        assert!(parse("2024-13-45").is_err());
        assert!(parse("null").is_err());
    }
}
