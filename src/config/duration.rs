//! Duration parsing for configuration values
//!
//! Accepts a bare number of seconds (`"300"`, `"1.5"`) or a sequence of
//! `<number><unit>` terms (`"1h30m"`, `"1.5s"`, `"250ms"`), with units
//! `ns`, `us`, `µs`, `ms`, `s`, `m`, `h`.

use crate::{Error, Result};
use std::time::Duration;

/// Parse a duration string
pub fn parse_duration(input: &str) -> Result<Duration> {
    let s = input.trim();
    if s.is_empty() {
        return Err(invalid(input, "empty value"));
    }

    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    if s.chars().all(|c| c.is_ascii_digit() || c == '.') {
        let secs: f64 = s.parse().map_err(|_| invalid(input, "bad number"))?;
        return Duration::try_from_secs_f64(secs).map_err(|_| invalid(input, "out of range"));
    }

    let mut total = 0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| invalid(input, "missing unit"))?;
        if num_len == 0 {
            return Err(invalid(input, "expected a number"));
        }
        let value: f64 = rest[..num_len]
            .parse()
            .map_err(|_| invalid(input, "bad number"))?;
        rest = &rest[num_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let nanos_per_unit = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            other => return Err(invalid(input, &format!("unknown unit '{}'", other))),
        };
        total += value * nanos_per_unit;
        rest = &rest[unit_len..];
    }

    if !total.is_finite() || total > u64::MAX as f64 {
        return Err(invalid(input, "out of range"));
    }
    Ok(Duration::from_nanos(total as u64))
}

fn invalid(input: &str, reason: &str) -> Error {
    Error::Config(format!("invalid duration '{}': {}", input, reason))
}
