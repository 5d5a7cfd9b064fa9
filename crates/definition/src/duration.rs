// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Duration strings: `500ms`, `30s`, `5m`, `2h`.

use crate::error::DefinitionError;
use std::time::Duration;

pub fn parse_duration(input: &str) -> Result<Duration, DefinitionError> {
    let input = input.trim();
    let split = input
        .find(|c: char| !c.is_ascii_digit())
        .filter(|&i| i > 0)
        .ok_or_else(|| DefinitionError::InvalidDuration(input.to_string()))?;
    let (digits, unit) = input.split_at(split);
    let value: u64 = digits
        .parse()
        .map_err(|_| DefinitionError::InvalidDuration(input.to_string()))?;
    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 3600)),
        _ => Err(DefinitionError::InvalidDuration(input.to_string())),
    }
}

#[cfg(test)]
#[path = "duration_tests.rs"]
mod tests;
