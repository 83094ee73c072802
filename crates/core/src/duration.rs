//! Duration string parsing and formatting
//!
//! Scenario authors express durations as a number with a unit suffix:
//! `ns`, `us`, `ms`, `s`, `m`, `h`.

use std::time::Duration;

/// Parse a duration string into a [`Duration`].
///
/// Supports: "500ns", "10us", "100ms", "15s", "30m", "6h"
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    if let Some(ns) = s.strip_suffix("ns") {
        let n: u64 = ns
            .parse()
            .map_err(|e| format!("invalid nanoseconds '{}': {}", ns, e))?;
        Ok(Duration::from_nanos(n))
    } else if let Some(us) = s.strip_suffix("us") {
        let u: u64 = us
            .parse()
            .map_err(|e| format!("invalid microseconds '{}': {}", us, e))?;
        Ok(Duration::from_micros(u))
    } else if let Some(ms) = s.strip_suffix("ms") {
        let millis: u64 = ms
            .parse()
            .map_err(|e| format!("invalid milliseconds '{}': {}", ms, e))?;
        Ok(Duration::from_millis(millis))
    } else if let Some(secs) = s.strip_suffix('s') {
        let sec: u64 = secs
            .parse()
            .map_err(|e| format!("invalid seconds '{}': {}", secs, e))?;
        Ok(Duration::from_secs(sec))
    } else if let Some(minutes) = s.strip_suffix('m') {
        let m: u64 = minutes
            .parse()
            .map_err(|e| format!("invalid minutes '{}': {}", minutes, e))?;
        Ok(Duration::from_secs(m.saturating_mul(60)))
    } else if let Some(hours) = s.strip_suffix('h') {
        let h: u64 = hours
            .parse()
            .map_err(|e| format!("invalid hours '{}': {}", hours, e))?;
        Ok(Duration::from_secs(h.saturating_mul(3600)))
    } else {
        Err(format!(
            "unknown duration format '{}': expected suffix ns/us/ms/s/m/h",
            s
        ))
    }
}

/// Format a [`Duration`] back into the largest unit that divides it evenly.
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos % 3_600_000_000_000 == 0 {
        format!("{}h", nanos / 3_600_000_000_000)
    } else if nanos % 60_000_000_000 == 0 {
        format!("{}m", nanos / 60_000_000_000)
    } else if nanos % 1_000_000_000 == 0 {
        format!("{}s", nanos / 1_000_000_000)
    } else if nanos % 1_000_000 == 0 {
        format!("{}ms", nanos / 1_000_000)
    } else if nanos % 1_000 == 0 {
        format!("{}us", nanos / 1_000)
    } else {
        format!("{}ns", nanos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("500ns").unwrap(), Duration::from_nanos(500));
        assert_eq!(parse_duration("10us").unwrap(), Duration::from_micros(10));
        assert_eq!(parse_duration("100ms").unwrap(), Duration::from_millis(100));
        assert_eq!(parse_duration("15s").unwrap(), Duration::from_secs(15));
        assert_eq!(parse_duration("30m").unwrap(), Duration::from_secs(1800));
        assert_eq!(parse_duration("6h").unwrap(), Duration::from_secs(21600));
        assert_eq!(parse_duration(" 5s ").unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn test_parse_duration_errors() {
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("10x").is_err());
        assert!(parse_duration("").is_err());
        assert!(parse_duration("-5s").is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0s");
        assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
        assert_eq!(format_duration(Duration::from_secs(90)), "90s");
        assert_eq!(format_duration(Duration::from_secs(120)), "2m");
        assert_eq!(format_duration(Duration::from_secs(7200)), "2h");
        assert_eq!(format_duration(Duration::from_nanos(1500)), "1500ns");
    }

    #[test]
    fn test_round_trip() {
        for s in ["250ms", "10s", "3m", "1h", "750us"] {
            let d = parse_duration(s).unwrap();
            assert_eq!(format_duration(d), s);
        }
    }
}
