//! Grid resolution and the quantization rule shared by every stage.
//!
//! A timestamp `t` belongs to the bucket with integer tick
//! `round(t / r)`, rounding halves to even. The tick, not the floating-point
//! bucket time, is the join key everywhere, so the grid builder and the
//! per-stream aggregator can never disagree about which bucket a record
//! falls into.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use snafu::prelude::*;

/// Default grid spacing in seconds (1 ms).
pub const DEFAULT_RESOLUTION_SECS: f64 = 0.001;

/// Errors produced when parsing a resolution spec (e.g. `1ms`, `0.001`).
#[derive(Debug, Snafu, PartialEq)]
pub enum ParseResolutionError {
    /// The spec string was empty or only whitespace.
    #[snafu(display("resolution spec is empty"))]
    Empty,

    /// The spec did not include a numeric value.
    #[snafu(display("resolution spec '{spec}' is missing a numeric value"))]
    MissingNumber {
        /// The original spec string.
        spec: String,
    },

    /// The numeric portion of the spec failed to parse.
    #[snafu(display("invalid resolution value in '{spec}': {source}"))]
    InvalidNumber {
        /// The original spec string.
        spec: String,
        /// The parse error returned by `f64::from_str`.
        source: std::num::ParseFloatError,
    },

    /// The value was zero, negative, or not finite.
    #[snafu(display("resolution must be finite and > 0 (got {value}) in '{spec}'"))]
    NonPositive {
        /// The original spec string.
        spec: String,
        /// The parsed value in seconds.
        value: f64,
    },

    /// The spec used an unsupported unit suffix.
    #[snafu(display("unknown resolution unit '{unit}' in '{spec}' (expected s|ms|us|ns)"))]
    UnknownUnit {
        /// The original spec string.
        spec: String,
        /// The unrecognized unit suffix.
        unit: String,
    },
}

/// Spacing of the time grid, in seconds.
///
/// Always finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ResolutionRepr", into = "f64")]
pub struct Resolution(f64);

impl Resolution {
    /// Build a resolution from a value in seconds.
    pub fn from_secs(secs: f64) -> Result<Self, ParseResolutionError> {
        if !(secs.is_finite() && secs > 0.0) {
            return Err(ParseResolutionError::NonPositive {
                spec: secs.to_string(),
                value: secs,
            });
        }
        Ok(Self(secs))
    }

    /// Parse a human-friendly resolution spec (`1ms`, `500us`, `0.5s`,
    /// or a bare number of seconds such as `0.001`).
    pub fn parse(spec: &str) -> Result<Self, ParseResolutionError> {
        spec.parse()
    }

    /// Grid spacing in seconds.
    pub fn as_secs(self) -> f64 {
        self.0
    }

    /// Integer tick of the bucket nearest to `t`.
    ///
    /// Returns `None` for non-finite timestamps or ticks that do not fit in
    /// an `i64`.
    pub fn tick(self, t: f64) -> Option<i64> {
        if !t.is_finite() {
            return None;
        }
        let q = (t / self.0).round_ties_even();
        // i64::MAX is not representable; compare against 2^63.
        if q >= -(2f64.powi(63)) && q < 2f64.powi(63) {
            Some(q as i64)
        } else {
            None
        }
    }

    /// Bucket time for `tick`, i.e. `tick * r`.
    ///
    /// When `1/r` is a whole number (1 ms, 10 us, ...) the division form is
    /// used so that bucket times print as the expected decimals.
    pub fn tick_time(self, tick: i64) -> f64 {
        match self.ticks_per_second() {
            Some(per_sec) => tick as f64 / per_sec,
            None => tick as f64 * self.0,
        }
    }

    /// Quantized timestamp `round(t / r) * r`.
    pub fn quantize(self, t: f64) -> Option<f64> {
        self.tick(t).map(|k| self.tick_time(k))
    }

    fn ticks_per_second(self) -> Option<f64> {
        let inv = 1.0 / self.0;
        let rounded = inv.round();
        if rounded >= 1.0 && (inv - rounded).abs() <= 1e-9 * rounded {
            Some(rounded)
        } else {
            None
        }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self(DEFAULT_RESOLUTION_SECS)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

impl From<Resolution> for f64 {
    fn from(r: Resolution) -> Self {
        r.0
    }
}

impl FromStr for Resolution {
    type Err = ParseResolutionError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let spec = input.trim();
        if spec.is_empty() {
            return Err(ParseResolutionError::Empty);
        }

        // Exponent markers (`1e-3`) are part of the number, not a unit.
        let unit_start = spec
            .char_indices()
            .find(|(i, c)| {
                c.is_ascii_alphabetic()
                    && !(matches!(c, 'e' | 'E')
                        && spec[i + 1..]
                            .chars()
                            .next()
                            .is_some_and(|n| n.is_ascii_digit() || n == '-' || n == '+'))
            })
            .map(|(i, _)| i)
            .unwrap_or(spec.len());

        if unit_start == 0 {
            return Err(ParseResolutionError::MissingNumber {
                spec: spec.to_string(),
            });
        }

        let (num_str, unit_str) = spec.split_at(unit_start);
        let value: f64 =
            num_str
                .trim()
                .parse()
                .map_err(|source| ParseResolutionError::InvalidNumber {
                    spec: spec.to_string(),
                    source,
                })?;

        let divisor = match unit_str.trim().to_ascii_lowercase().as_str() {
            "" | "s" | "sec" | "secs" | "second" | "seconds" => 1.0,
            "ms" | "msec" | "millis" | "milliseconds" => 1e3,
            "us" | "usec" | "micros" | "microseconds" => 1e6,
            "ns" | "nsec" | "nanos" | "nanoseconds" => 1e9,
            _ => {
                return Err(ParseResolutionError::UnknownUnit {
                    spec: spec.to_string(),
                    unit: unit_str.trim().to_string(),
                });
            }
        };

        let secs = value / divisor;
        if !(secs.is_finite() && secs > 0.0) {
            return Err(ParseResolutionError::NonPositive {
                spec: spec.to_string(),
                value: secs,
            });
        }
        Ok(Self(secs))
    }
}

impl TryFrom<f64> for Resolution {
    type Error = ParseResolutionError;

    fn try_from(secs: f64) -> Result<Self, Self::Error> {
        Self::from_secs(secs)
    }
}

/// Config files may give the resolution either as seconds or as a spec string.
#[derive(Deserialize)]
#[serde(untagged)]
enum ResolutionRepr {
    Secs(f64),
    Spec(String),
}

impl TryFrom<ResolutionRepr> for Resolution {
    type Error = ParseResolutionError;

    fn try_from(repr: ResolutionRepr) -> Result<Self, Self::Error> {
        match repr {
            ResolutionRepr::Secs(secs) => Self::from_secs(secs),
            ResolutionRepr::Spec(spec) => spec.parse(),
        }
    }
}
