//! Size-string parsing for command arguments such as `--size 10GiB`.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{Result, VinfraError};

const UNITS: [(&str, u32); 6] = [
    ("KiB", 1),
    ("MiB", 2),
    ("GiB", 3),
    ("TiB", 4),
    ("PiB", 5),
    ("EiB", 6),
];

fn size_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<value>\d+)(?P<unit>KiB|MiB|GiB|TiB|PiB|EiB)?$")
            .unwrap_or_else(|e| panic!("invalid size pattern: {}", e))
    })
}

fn format_error(value: &str) -> VinfraError {
    VinfraError::Validation(format!(
        "Invalid size '{}': expected a number optionally followed by one of KiB, MiB, GiB, TiB, PiB, EiB",
        value
    ))
}

/// Parse a size string into bytes.
///
/// Plain numbers are bytes; binary unit suffixes are case-sensitive and must
/// directly follow the number. Surrounding whitespace is ignored.
pub fn get_size_in_bytes(value: &str) -> Result<u64> {
    let trimmed = value.trim();
    let captures = size_pattern()
        .captures(trimmed)
        .ok_or_else(|| format_error(value))?;

    let number: u64 = captures["value"].parse().map_err(|_| format_error(value))?;
    let power = match captures.name("unit") {
        Some(unit) => UNITS
            .iter()
            .find(|(name, _)| *name == unit.as_str())
            .map(|(_, power)| *power)
            .ok_or_else(|| format_error(value))?,
        None => 0,
    };

    number
        .checked_mul(1024u64.pow(power))
        .ok_or_else(|| format_error(value))
}

/// Parse a size from a loosely typed value, as found in YAML or JSON input.
/// Only strings are accepted.
pub fn size_from_value(value: &Value) -> Result<u64> {
    match value {
        Value::String(text) => get_size_in_bytes(text),
        other => Err(VinfraError::Validation(format!(
            "Invalid size {}: expected a string",
            other
        ))),
    }
}
