// Metronome - A batching Statsd client for Rust!
//
// Copyright 2025-2026 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::fmt;
use std::io;
use thiserror::Error;

/// Type of metric that knows how to display itself
#[derive(Debug, Clone, Copy)]
pub(crate) enum MetricType {
    Counter,
    Timer,
    Gauge,
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MetricType::Counter => "c".fmt(f),
            MetricType::Timer => "ms".fmt(f),
            MetricType::Gauge => "g".fmt(f),
        }
    }
}

/// Holder for primitive metric values that knows how to display itself
///
/// Counters are built from `i64` values, timings from `u64` millisecond
/// values, and gauges from either `u64` or `f64` values (via the `From`
/// implementations below). Values are rendered with the standard `Display`
/// implementation for the underlying type.
///
/// Typical use of Metronome shouldn't require interacting with this type.
#[derive(Debug, Clone, Copy)]
pub enum MetricValue {
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MetricValue::Signed(v) => v.fmt(f),
            MetricValue::Unsigned(v) => v.fmt(f),
            MetricValue::Float(v) => v.fmt(f),
        }
    }
}

impl From<u64> for MetricValue {
    fn from(v: u64) -> Self {
        MetricValue::Unsigned(v)
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Float(v)
    }
}

/// Error generated while constructing a client or transport.
///
/// This error is only ever surfaced at construction time: an unresolvable
/// host or an unbindable socket indicates a configuration bug and fails
/// fast. Once a client exists, emitting metrics is best effort and
/// transport failures are discarded, never returned.
#[derive(Debug, Error)]
pub enum MetricError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type MetricResult<T> = Result<T, MetricError>;
