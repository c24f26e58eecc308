use std::fmt;
use std::ops::Range;

use crate::error::{LatencyError, Result};

/// Token separating the timestamp prefix from the log message.
pub const SEPARATOR: &str = " - ";

/// Shortest prefix that can hold `HH:MM:SS.m`.
const MIN_PREFIX_LEN: usize = 10;

const HOURS: Range<usize> = 0..2;
const MINUTES: Range<usize> = 3..5;
const SECONDS: Range<usize> = 6..8;
const MILLIS_START: usize = 9;

/// Time of day as printed at the start of a peer log line.
///
/// There is no date component, so two timestamps can only be compared when
/// both were taken on the same day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
    pub milliseconds: u16,
}

impl Timestamp {
    pub fn new(hours: u8, minutes: u8, seconds: u8, milliseconds: u16) -> Self {
        Self {
            hours,
            minutes,
            seconds,
            milliseconds,
        }
    }

    /// Parse the timestamp prefix of a raw log line.
    ///
    /// Everything before the first [`SEPARATOR`] is treated as the time
    /// string; a line without a separator is parsed as a whole. Fields are
    /// read from fixed character offsets.
    pub fn parse(line: &str) -> Result<Self> {
        let prefix = line
            .split_once(SEPARATOR)
            .map(|(prefix, _)| prefix)
            .unwrap_or(line);

        if prefix.len() < MIN_PREFIX_LEN {
            return Err(LatencyError::malformed(
                line,
                format!(
                    "timestamp prefix is {} characters, need at least {}",
                    prefix.len(),
                    MIN_PREFIX_LEN
                ),
            ));
        }

        let millis = prefix
            .get(MILLIS_START..)
            .map(str::trim)
            .ok_or_else(|| LatencyError::malformed(line, "milliseconds are not valid text"))?;

        Ok(Self {
            hours: field(line, prefix, HOURS, "hours", 23)? as u8,
            minutes: field(line, prefix, MINUTES, "minutes", 59)? as u8,
            seconds: field(line, prefix, SECONDS, "seconds", 59)? as u8,
            milliseconds: digits(line, millis, "milliseconds", 999)? as u16,
        })
    }

    /// Milliseconds since midnight.
    pub fn millis_of_day(&self) -> i64 {
        ((i64::from(self.hours) * 60 + i64::from(self.minutes)) * 60 + i64::from(self.seconds))
            * 1000
            + i64::from(self.milliseconds)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}.{:03}",
            self.hours, self.minutes, self.seconds, self.milliseconds
        )
    }
}

/// Milliseconds from `start` to `stop`.
///
/// Plain subtraction of the two times of day. A `stop` that precedes
/// `start` (for example across midnight) is an [`LatencyError::InvalidInterval`].
pub fn elapsed(start: &Timestamp, stop: &Timestamp) -> Result<u64> {
    let mut millis = i64::from(stop.hours) - i64::from(start.hours);
    millis = millis * 60 + i64::from(stop.minutes) - i64::from(start.minutes);
    millis = millis * 60 + i64::from(stop.seconds) - i64::from(start.seconds);
    millis = millis * 1000 + i64::from(stop.milliseconds) - i64::from(start.milliseconds);

    u64::try_from(millis).map_err(|_| LatencyError::InvalidInterval {
        start: *start,
        stop: *stop,
        elapsed_ms: millis,
    })
}

fn field(line: &str, prefix: &str, range: Range<usize>, name: &str, max: u32) -> Result<u32> {
    let raw = prefix
        .get(range)
        .ok_or_else(|| LatencyError::malformed(line, format!("{} are not valid text", name)))?;
    digits(line, raw, name, max)
}

fn digits(line: &str, raw: &str, name: &str, max: u32) -> Result<u32> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LatencyError::malformed(
            line,
            format!("{} {:?} is not a number", name, raw),
        ));
    }
    let value: u32 = raw
        .parse()
        .map_err(|e| LatencyError::malformed(line, format!("{} {:?}: {}", name, raw, e)))?;
    if value > max {
        return Err(LatencyError::malformed(
            line,
            format!("{} {} out of range 0-{}", name, value, max),
        ));
    }
    Ok(value)
}
