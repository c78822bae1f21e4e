//! `lastUpdated` is ISO-8601 on the wire, which is wider than what chrono's
//! serde support accepts. Values without an offset are read as UTC and a bare
//! date means midnight. Serialization stays RFC 3339.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer};

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| de::Error::custom(format!("invalid ISO-8601 timestamp '{raw}'")))
}

pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_timestamp(&raw)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid ISO-8601 timestamp '{raw}'"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, m, s).unwrap()
    }

    #[test]
    fn accepts_offset_naive_and_date_only_forms() {
        assert_eq!(parse_timestamp("2024-01-15T10:30:00Z"), Some(utc(10, 30, 0)));
        assert_eq!(parse_timestamp("2024-01-15T12:30:00+02:00"), Some(utc(10, 30, 0)));
        assert_eq!(parse_timestamp("2024-01-15T12:30:00+0200"), Some(utc(10, 30, 0)));
        assert_eq!(parse_timestamp("2024-01-15T10:30:00"), Some(utc(10, 30, 0)));
        assert_eq!(parse_timestamp("2024-01-15 10:30:00"), Some(utc(10, 30, 0)));
        assert_eq!(parse_timestamp("2024-01-15T10:30"), Some(utc(10, 30, 0)));
        assert_eq!(parse_timestamp("2024-01-15"), Some(utc(0, 0, 0)));
        assert_eq!(
            parse_timestamp("2024-01-15T10:30:00.250"),
            Some(utc(10, 30, 0) + chrono::Duration::milliseconds(250))
        );
    }

    #[test]
    fn rejects_non_dates() {
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("2024-13-40"), None);
    }
}
