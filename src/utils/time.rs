use chrono::{NaiveDate, TimeZone, Utc};

/// Returns current timestamp in seconds (Unix epoch)
pub fn current_timestamp_seconds() -> i64 {
    Utc::now().timestamp()
}

/// Calendar day (UTC, `YYYY-MM-DD`) of a Unix timestamp in seconds.
pub fn date_of_timestamp(timestamp: i64) -> String {
    Utc.timestamp_opt(timestamp, 0)
        .single()
        .unwrap_or_else(Utc::now)
        .format("%Y-%m-%d")
        .to_string()
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_of_timestamp() {
        // 2024-03-01T12:00:00Z
        assert_eq!(date_of_timestamp(1_709_294_400), "2024-03-01");
        assert_eq!(date_of_timestamp(0), "1970-01-01");
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2024-10-24"),
            NaiveDate::from_ymd_opt(2024, 10, 24)
        );
        assert!(parse_date("24/10/2024").is_none());
        assert!(parse_date("2024-02-30").is_none());
    }
}
