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
use std::fmt::Write as _;
use std::marker::PhantomData;
use std::mem;
use std::panic::RefUnwindSafe;
use std::time::Duration;

use tracing::debug;

use crate::sampler::Sampler;
use crate::sync::{BufferLock, LocalLock, SyncLock};
use crate::timer::Timer;
use crate::transport::{NopTransport, Transport, TransportStats, UdpTransport};
use crate::types::{MetricResult, MetricType, MetricValue};
use crate::{DEFAULT_HOST, DEFAULT_PORT};

type BoxedTransport = Box<dyn Transport + Send + Sync + RefUnwindSafe>;

/// Builder for creating and customizing `StatsClient` instances.
///
/// Instances of the builder should be created by calling the `::builder()`
/// method on the `StatsClient` struct.
///
/// # Example
///
/// ```no_run
/// use metronome::StatsClient;
///
/// let client = StatsClient::builder()
///     .host("metrics.example.com")
///     .prefix("my.service")
///     .batch_len(16)
///     .build()
///     .unwrap();
///
/// client.incr("requests.handled");
/// client.flush();
/// ```
#[must_use]
pub struct StatsClientBuilder<L = LocalLock>
where
    L: BufferLock,
{
    host: String,
    port: u16,
    prefix: String,
    batch_len: usize,
    debug: bool,
    seed: Option<u64>,
    transport: Option<BoxedTransport>,
    lock: PhantomData<L>,
}

impl StatsClientBuilder<LocalLock> {
    // Set the defaults for all optional fields
    fn new() -> Self {
        StatsClientBuilder {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            prefix: String::new(),
            batch_len: 1,
            debug: false,
            seed: None,
            transport: None,
            lock: PhantomData,
        }
    }

    /// Guard the pending batch with a real mutex so that the built client
    /// can be shared between threads.
    ///
    /// By default the batch is guarded by a borrow flag that never blocks
    /// and the client is not `Sync`. Calling this method switches the
    /// client's lock parameter to [`SyncLock`].
    pub fn thread_safe(self) -> StatsClientBuilder<SyncLock> {
        StatsClientBuilder {
            host: self.host,
            port: self.port,
            prefix: self.prefix,
            batch_len: self.batch_len,
            debug: self.debug,
            seed: self.seed,
            transport: self.transport,
            lock: PhantomData,
        }
    }
}

impl<L> StatsClientBuilder<L>
where
    L: BufferLock,
{
    /// Set the host metrics are sent to. Default is `localhost`.
    ///
    /// The host is resolved once, when `build` is called. An empty host
    /// disables network transmission entirely for the lifetime of the
    /// client, which is useful for tests or for turning metrics off via
    /// configuration.
    pub fn host<H>(mut self, host: H) -> Self
    where
        H: Into<String>,
    {
        self.host = host.into();
        self
    }

    /// Set the port metrics are sent to. Default is `8125`.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set a prefix prepended to every stat name, separated with a `.`.
    /// Default is no prefix.
    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_owned();
        self
    }

    /// Set the number of lines collected before the pending batch is
    /// flushed as a single datagram. Default is `1`, meaning every metric
    /// is transmitted immediately and nothing is ever staged.
    ///
    /// Values below `1` are treated as `1`.
    pub fn batch_len(mut self, batch_len: usize) -> Self {
        self.batch_len = batch_len.max(1);
        self
    }

    /// Echo every outgoing payload to the `tracing` diagnostic channel at
    /// debug level. Default is off.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Seed the sampling RNG so that suppress/include decisions are
    /// reproducible. Default is an entropy seeded, thread local RNG.
    pub fn sample_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Use the given transport instead of the UDP transport the builder
    /// would otherwise construct from host and port.
    pub fn transport<T>(mut self, transport: T) -> Self
    where
        T: Transport + Send + Sync + RefUnwindSafe + 'static,
    {
        self.transport = Some(Box::new(transport));
        self
    }

    /// Construct a new `StatsClient` instance based on current settings.
    ///
    /// # Failures
    ///
    /// This method may fail if:
    ///
    /// * It is unable to resolve the configured host name.
    /// * The local UDP socket cannot be bound or configured.
    pub fn build(self) -> MetricResult<StatsClient<L>> {
        let transport: BoxedTransport = match self.transport {
            Some(transport) => transport,
            None if self.host.is_empty() => Box::new(NopTransport),
            None => Box::new(UdpTransport::new((self.host.as_str(), self.port))?),
        };

        let sampler = match self.seed {
            Some(seed) => Sampler::seeded(seed),
            None => Sampler::from_entropy(),
        };

        Ok(StatsClient {
            prefix: formatted_prefix(&self.prefix),
            batch_len: self.batch_len,
            debug: self.debug,
            buffer: L::default(),
            sampler,
            transport,
        })
    }
}

/// Client for Statsd that emits counters, timers, and gauges over UDP.
///
/// # Batching
///
/// With the default batch length of `1` every metric is transmitted
/// immediately as its own datagram. With a larger batch length, formatted
/// lines are staged in a pending batch and sent as one newline joined
/// datagram once the batch reaches that length (or when [`flush`] is
/// called, e.g. at shutdown).
///
/// # Sampling
///
/// Each emitting method has a `_sampled` variant taking a rate in
/// `(0, 1]`. Events are randomly suppressed so that roughly `rate` of
/// them go out, and the emitted lines carry a `|@rate` suffix so the
/// server can rescale. Rate `1` never suppresses and adds no suffix.
///
/// # Threading
///
/// The default client is single threaded and pays no synchronization
/// cost. Calling [`StatsClientBuilder::thread_safe`] builds a
/// `StatsClient<SyncLock>` which is `Send + Sync` and can be shared as
/// an `Arc`. See [`SyncLock`] and [`LocalLock`].
///
/// # Delivery
///
/// Emitting is best effort and fire-and-forget: methods return nothing,
/// transport failures are discarded, and nothing is ever retried. A
/// client built with an empty host performs no network activity at all.
///
/// [`flush`]: StatsClient::flush
pub struct StatsClient<L = LocalLock>
where
    L: BufferLock,
{
    prefix: String,
    batch_len: usize,
    debug: bool,
    buffer: L,
    sampler: Sampler,
    transport: BoxedTransport,
}

impl StatsClient<LocalLock> {
    /// Create a client that sends unbatched metrics to `host:port`.
    ///
    /// The host is resolved immediately; an unresolvable host is a
    /// construction error rather than a silently disabled client.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use metronome::{StatsClient, DEFAULT_PORT};
    ///
    /// let client = StatsClient::new("metrics.example.com", DEFAULT_PORT).unwrap();
    /// client.incr("user.logins");
    /// ```
    pub fn new(host: &str, port: u16) -> MetricResult<Self> {
        Self::builder().host(host).port(port).build()
    }

    /// Create a new builder to customize a client.
    pub fn builder() -> StatsClientBuilder<LocalLock> {
        StatsClientBuilder::new()
    }

    /// Create a client that will emit metrics with the given prefix to
    /// the given `Transport` implementation, unbatched.
    ///
    /// # Example
    ///
    /// ```
    /// use metronome::{NopTransport, StatsClient};
    ///
    /// let client = StatsClient::from_transport("my.prefix", NopTransport);
    /// client.incr("some.counter");
    /// ```
    pub fn from_transport<T>(prefix: &str, transport: T) -> Self
    where
        T: Transport + Send + Sync + RefUnwindSafe + 'static,
    {
        StatsClient {
            prefix: formatted_prefix(prefix),
            batch_len: 1,
            debug: false,
            buffer: LocalLock::default(),
            sampler: Sampler::from_entropy(),
            transport: Box::new(transport),
        }
    }
}

impl<L> StatsClient<L>
where
    L: BufferLock,
{
    /// Record a timing in milliseconds with the given stat name.
    pub fn timing(&self, stat: &str, ms: u64) {
        self.timing_sampled(stat, ms, 1.0);
    }

    /// Record a timing in milliseconds, sampled at the given rate.
    pub fn timing_sampled(&self, stat: &str, ms: u64, rate: f64) {
        self.send(stat, MetricValue::Unsigned(ms), MetricType::Timer, rate);
    }

    /// Record a `Duration` as a timing, converted to whole milliseconds.
    pub fn timing_duration(&self, stat: &str, duration: Duration) {
        let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        self.timing(stat, ms);
    }

    /// Increment the counter with the given stat name by 1.
    pub fn incr(&self, stat: &str) {
        self.count(stat, 1);
    }

    /// Increment the counter by 1, sampled at the given rate.
    pub fn incr_sampled(&self, stat: &str, rate: f64) {
        self.count_sampled(stat, 1, rate);
    }

    /// Decrement the counter with the given stat name by 1.
    pub fn decr(&self, stat: &str) {
        self.count(stat, -1);
    }

    /// Decrement the counter by 1, sampled at the given rate.
    pub fn decr_sampled(&self, stat: &str, rate: f64) {
        self.count_sampled(stat, -1, rate);
    }

    /// Increment or decrement the counter by the given amount.
    pub fn count(&self, stat: &str, count: i64) {
        self.count_sampled(stat, count, 1.0);
    }

    /// Increment or decrement the counter by the given amount, sampled
    /// at the given rate.
    pub fn count_sampled(&self, stat: &str, count: i64, rate: f64) {
        self.send(stat, MetricValue::Signed(count), MetricType::Counter, rate);
    }

    /// Record a gauge value with the given stat name.
    ///
    /// Values may be `u64` or `f64`.
    pub fn gauge<V>(&self, stat: &str, value: V)
    where
        V: Into<MetricValue>,
    {
        self.gauge_sampled(stat, value, 1.0);
    }

    /// Record a gauge value, sampled at the given rate.
    pub fn gauge_sampled<V>(&self, stat: &str, value: V, rate: f64)
    where
        V: Into<MetricValue>,
    {
        self.send(stat, value.into(), MetricType::Gauge, rate);
    }

    /// Start a [`Timer`] bound to this client that will record a timing
    /// for the given stat name when stopped or dropped.
    ///
    /// # Example
    ///
    /// ```
    /// use metronome::{NopTransport, StatsClient};
    ///
    /// let client = StatsClient::from_transport("my.prefix", NopTransport);
    ///
    /// let mut timer = client.timer("query.duration");
    /// // ... the work being measured ...
    /// let elapsed = timer.stop();
    /// ```
    pub fn timer(&self, stat: &str) -> Timer<'_, L> {
        Timer::new(self, stat)
    }

    /// Wrap a callable so that every invocation of it is timed under the
    /// given stat name and rate, forwarding the return value unchanged.
    ///
    /// The timing fires even if the callable panics.
    ///
    /// # Example
    ///
    /// ```
    /// use metronome::{NopTransport, StatsClient};
    ///
    /// let client = StatsClient::from_transport("my.prefix", NopTransport);
    /// let mut render = client.wrap("render.time", 1.0, || "page content");
    ///
    /// assert_eq!("page content", render());
    /// ```
    pub fn wrap<'a, F, R>(&'a self, stat: &str, rate: f64, mut f: F) -> impl FnMut() -> R + 'a
    where
        F: FnMut() -> R + 'a,
    {
        let stat = stat.to_owned();
        move || {
            let mut timer = self.timer(&stat).with_rate(rate);
            let result = f();
            timer.stop();
            result
        }
    }

    /// Drain the pending batch and transmit it, regardless of whether it
    /// has reached the configured batch length.
    ///
    /// Does nothing when the batch is empty. Callers using batching
    /// should flush at shutdown so trailing metrics are not lost.
    pub fn flush(&self) {
        self.flush_batch(true);
    }

    /// Traffic counters from the underlying transport.
    pub fn transport_stats(&self) -> TransportStats {
        self.transport.stats()
    }

    fn send(&self, stat: &str, value: MetricValue, type_: MetricType, rate: f64) {
        let mut value = format!("{}|{}", value, type_);
        if rate < 1.0 {
            if !self.sampler.accept(rate) {
                return;
            }
            let _ = write!(value, "|@{}", rate);
        }

        let line = format!("{}{}:{}", self.prefix, stat, value);
        if self.batch_len <= 1 {
            // Optimization - skip the batch and transmit immediately
            self.transmit(&line);
        } else {
            self.buffer.with(|stats| stats.push(line));
            self.flush_batch(false);
        }
    }

    fn flush_batch(&self, force: bool) {
        let payload = self.buffer.with(|stats| {
            if !stats.is_empty() && (force || stats.len() >= self.batch_len) {
                Some(mem::take(stats).join("\n"))
            } else {
                None
            }
        });

        // The lock is released before the payload goes out so a slow send
        // never serializes other callers. A concurrent flush that loses
        // this race sees an empty batch and does nothing.
        if let Some(payload) = payload {
            self.transmit(&payload);
        }
    }

    fn transmit(&self, payload: &str) {
        if self.debug {
            debug!("{}", payload);
        }

        // Best effort delivery: a failed send is a dropped sample
        let _ = self.transport.send(payload);
    }
}

impl<L> fmt::Debug for StatsClient<L>
where
    L: BufferLock,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StatsClient {{ prefix: {:?}, batch_len: {:?}, debug: {:?}, buffer: ..., transport: ... }}",
            self.prefix, self.batch_len, self.debug,
        )
    }
}

fn formatted_prefix(prefix: &str) -> String {
    if prefix.is_empty() {
        String::new()
    } else {
        format!("{}.", prefix.trim_end_matches('.'))
    }
}
