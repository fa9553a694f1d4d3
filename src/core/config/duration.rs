use std::time::Duration;

use crate::core::error::{StarterError, StarterResult};

/// Parse durations written as a sequence of `<number><unit>` pairs,
/// e.g. `"90s"`, `"60m"`, `"1h30m"`. Units: `ms`, `s`, `m`, `h`.
pub fn parse_duration(raw: &str) -> StarterResult<Duration> {
    let input = raw.trim();
    if input.is_empty() {
        return Err(invalid(raw));
    }

    let mut total = Duration::ZERO;
    let mut rest = input;

    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits == 0 {
            return Err(invalid(raw));
        }
        let value: u64 = rest[..digits].parse().map_err(|_| invalid(raw))?;
        rest = &rest[digits..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];

        let part = match unit {
            "ms" => Some(Duration::from_millis(value)),
            "s" => Some(Duration::from_secs(value)),
            "m" => value.checked_mul(60).map(Duration::from_secs),
            "h" => value.checked_mul(3600).map(Duration::from_secs),
            _ => return Err(invalid(raw)),
        }
        .ok_or_else(|| invalid(raw))?;
        total = total.checked_add(part).ok_or_else(|| invalid(raw))?;
    }

    Ok(total)
}

fn invalid(raw: &str) -> StarterError {
    StarterError::Config(format!("invalid duration {raw:?}"))
}
