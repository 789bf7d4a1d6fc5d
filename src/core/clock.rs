use crate::domain::normalize::parse_date;
use crate::domain::ports::Clock;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant. Used by tests and by `--now`.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// Same formats as backend dates: RFC 3339 or `YYYY-MM-DD`.
    pub fn parse(raw: &str) -> Option<Self> {
        parse_date(&serde_json::Value::String(raw.to_string())).map(Self)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fixed_clock_parse() {
        let clock = FixedClock::parse("2025-01-05").unwrap();
        assert_eq!(clock.now(), Utc.with_ymd_and_hms(2025, 1, 5, 0, 0, 0).unwrap());
        assert!(FixedClock::parse("yesterday").is_none());
    }
}
