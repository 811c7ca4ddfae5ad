use std::{ops::Deref, str::FromStr};

use serde::Deserialize;
use thiserror::Error;

/// A duration written as whitespace separated parts like `1d 2h 3m 4s`.
///
/// Supported units are `ms`, `s`, `m`, `h` and `d`. A part without a unit is
/// read as seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration(pub std::time::Duration);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid duration {0:?}")]
pub struct ParseDurationError(String);

impl FromStr for Duration {
    type Err = ParseDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseDurationError(s.into());

        s.split_whitespace()
            .try_fold(0u64, |total, part| {
                let split = part
                    .find(|c: char| !c.is_ascii_digit())
                    .unwrap_or(part.len());
                let (value, unit) = part.split_at(split);
                let value = value.parse::<u64>().map_err(|_| invalid())?;
                let millis = match unit {
                    "ms" => 1,
                    "" | "s" => 1000,
                    "m" => 60 * 1000,
                    "h" => 60 * 60 * 1000,
                    "d" => 24 * 60 * 60 * 1000,
                    _ => return Err(invalid()),
                };
                value
                    .checked_mul(millis)
                    .and_then(|x| total.checked_add(x))
                    .ok_or_else(invalid)
            })
            .map(|millis| Self(std::time::Duration::from_millis(millis)))
    }
}

impl From<Duration> for std::time::Duration {
    fn from(value: Duration) -> Self {
        value.0
    }
}

impl Deref for Duration {
    type Target = std::time::Duration;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Duration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}
