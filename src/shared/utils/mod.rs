//! Utility functions

use rand::{distributions::Alphanumeric, Rng};
use serde_json::Value;

/// Generates a random alphanumeric string
pub fn generate_random_string(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Generates an access token for reminder and invitation links
pub fn generate_access_token() -> String {
    generate_random_string(21)
}

/// Replaces every JSON null in place with an empty string.
///
/// The corporate registry rejects null members, so outgoing filings are cleaned first.
pub fn clean_none(value: &mut Value) {
    match value {
        Value::Null => *value = Value::String(String::new()),
        Value::Array(items) => items.iter_mut().for_each(clean_none),
        Value::Object(map) => map.values_mut().for_each(clean_none),
        _ => {}
    }
}

/// Reads a string at a dotted path such as `filing.header.name`
pub fn str_at<'a>(value: &'a Value, path: &str) -> Option<&'a str> {
    value_at(value, path).and_then(Value::as_str)
}

/// Reads a value at a dotted path
pub fn value_at<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| current.get(segment))
}

/// Time helpers
pub mod time {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
    use chrono_tz::Tz;

    /// Parses an ISO-8601 timestamp, with or without offset (naive values are UTC)
    pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(dt.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M:%S%.f%:z"]
            .iter()
            .find_map(|format| {
                DateTime::parse_from_str(value, format)
                    .map(|dt| dt.with_timezone(&Utc))
                    .ok()
                    .or_else(|| NaiveDateTime::parse_from_str(value, format).ok().map(|naive| Utc.from_utc_datetime(&naive)))
            })
            .or_else(|| parse_date(value).and_then(|d| d.and_hms_opt(0, 0, 0)).map(|naive| Utc.from_utc_datetime(&naive)))
    }

    /// Parses the `YYYY-MM-DD` prefix of a date or datetime string
    pub fn parse_date(value: &str) -> Option<NaiveDate> {
        value
            .get(..10)
            .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
    }

    /// "August 5, 2021 at 11:00 am Pacific time", as printed on reports
    pub fn format_report_datetime(datetime: DateTime<Utc>, tz: Tz) -> String {
        datetime
            .with_timezone(&tz)
            .format("%B %-d, %Y at %-I:%M %P Pacific time")
            .to_string()
    }

    /// "August 05, 2021 at 11:00 am Pacific time", as printed in emails
    pub fn format_email_datetime(datetime: DateTime<Utc>, tz: Tz) -> String {
        datetime
            .with_timezone(&tz)
            .format("%B %d, %Y at %-I:%M %P Pacific time")
            .to_string()
    }

    /// "August 5, 2021"
    pub fn format_report_date(date: NaiveDate) -> String {
        date.format("%B %-d, %Y").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike, Utc};
    use serde_json::json;

    #[test]
    fn test_generate_random_string() {
        let s1 = generate_random_string(10);
        let s2 = generate_random_string(10);

        assert_eq!(s1.len(), 10);
        assert_eq!(s2.len(), 10);
        assert_ne!(s1, s2);
        assert_eq!(generate_access_token().len(), 21);
    }

    #[test]
    fn test_clean_none_replaces_nested_nulls() {
        let mut value = json!({
            "a": null,
            "b": {"c": null, "d": 1},
            "e": [null, "x"]
        });
        clean_none(&mut value);
        assert_eq!(value, json!({"a": "", "b": {"c": "", "d": 1}, "e": ["", "x"]}));
    }

    #[test]
    fn test_value_at_paths() {
        let value = json!({"filing": {"header": {"name": "annualReport"}}});
        assert_eq!(str_at(&value, "filing.header.name"), Some("annualReport"));
        assert!(value_at(&value, "filing.missing").is_none());
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let with_offset = time::parse_timestamp("2024-03-01T10:15:00+00:00").unwrap();
        assert_eq!(with_offset.hour(), 10);

        let naive = time::parse_timestamp("2024-03-01T10:15:00.123456").unwrap();
        assert_eq!(naive.minute(), 15);

        let date_only = time::parse_timestamp("2024-03-01").unwrap();
        assert_eq!(date_only.day(), 1);

        assert!(time::parse_timestamp("not a date").is_none());
    }

    #[test]
    fn test_report_datetime_format() {
        let tz: chrono_tz::Tz = "America/Vancouver".parse().unwrap();
        // 18:00 UTC in August is 11:00 am PDT
        let dt = Utc.with_ymd_and_hms(2021, 8, 5, 18, 0, 0).unwrap();
        assert_eq!(time::format_report_datetime(dt, tz), "August 5, 2021 at 11:00 am Pacific time");
        assert_eq!(time::format_email_datetime(dt, tz), "August 05, 2021 at 11:00 am Pacific time");
    }
}
