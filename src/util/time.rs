use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

// Parse a publish timestamp as the source emits it: epoch seconds (number)
// or RFC3339 text, with or without the trailing Z. None if unparseable.
pub fn parse_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let secs = n.as_f64()?;
            DateTime::from_timestamp(secs.trunc() as i64, 0)
        }
        Value::String(s) => parse_datetime_str(s),
        _ => None,
    }
}

pub fn parse_datetime_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // "YYYY-MM-DD HH:MM:SS" without offset shows up on older renders
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc));
    }
    None
}

// Sold dates are plain "YYYY-MM-DD".
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn epoch_seconds() {
        let dt = parse_datetime(&json!(1_700_000_000)).unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
    }

    #[test]
    fn rfc3339_with_zulu() {
        let dt = parse_datetime(&json!("2024-03-01T09:30:00Z")).unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-03-01T09:30:00+00:00");
    }

    #[test]
    fn rfc3339_with_offset() {
        let dt = parse_datetime(&json!("2024-03-01T10:30:00+01:00")).unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-03-01T09:30:00+00:00");
    }

    #[test]
    fn garbage_is_none() {
        assert!(parse_datetime(&json!("not a date")).is_none());
        assert!(parse_datetime(&json!(true)).is_none());
    }

    #[test]
    fn sold_date() {
        assert_eq!(
            parse_date(" 2024-02-17 "),
            NaiveDate::from_ymd_opt(2024, 2, 17)
        );
        assert!(parse_date("N/A").is_none());
    }
}
