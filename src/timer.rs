// Metronome - A batching Statsd client for Rust!
//
// Copyright 2025-2026 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::time::Instant;

use crate::client::StatsClient;
use crate::sync::{BufferLock, LocalLock};

/// Scoped helper that measures wall clock time and records it as a timing.
///
/// A timer starts measuring when it is created via
/// [`StatsClient::timer`] and fires `timing` on the owning client exactly
/// once: either when [`stop`](Timer::stop) is called, or when the timer
/// is dropped. Firing on drop means the timing is recorded on every exit
/// path out of the enclosing scope, including early returns, `?`
/// propagation, and panics.
///
/// Elapsed time is rounded to the nearest whole millisecond.
///
/// # Example
///
/// ```
/// use metronome::{NopTransport, StatsClient};
///
/// let client = StatsClient::from_transport("my.prefix", NopTransport);
///
/// {
///     let _timer = client.timer("page.render");
///     // ... the work being measured, timing fires at the end of scope
/// }
///
/// let mut timer = client.timer("query.duration");
/// // ... the work being measured ...
/// let elapsed = timer.stop();
/// assert_eq!(Some(elapsed), timer.elapsed_ms());
/// ```
#[derive(Debug)]
pub struct Timer<'c, L = LocalLock>
where
    L: BufferLock,
{
    client: &'c StatsClient<L>,
    stat: String,
    rate: f64,
    start: Instant,
    ms: Option<u64>,
}

impl<'c, L> Timer<'c, L>
where
    L: BufferLock,
{
    pub(crate) fn new(client: &'c StatsClient<L>, stat: &str) -> Self {
        Timer {
            client,
            stat: stat.to_owned(),
            rate: 1.0,
            start: Instant::now(),
            ms: None,
        }
    }

    /// Set the sample rate forwarded with the recorded timing.
    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }

    /// Stop the timer, record the timing, and return the elapsed whole
    /// milliseconds.
    ///
    /// Stopping an already stopped timer records nothing further and
    /// returns the originally measured value.
    pub fn stop(&mut self) -> u64 {
        self.record()
    }

    /// The measured elapsed milliseconds, `None` until the timer fires.
    pub fn elapsed_ms(&self) -> Option<u64> {
        self.ms
    }

    fn record(&mut self) -> u64 {
        if let Some(ms) = self.ms {
            return ms;
        }

        let ms = (self.start.elapsed().as_secs_f64() * 1000.0).round() as u64;
        self.ms = Some(ms);
        self.client.timing_sampled(&self.stat, ms, self.rate);
        ms
    }
}

impl<L> Drop for Timer<'_, L>
where
    L: BufferLock,
{
    fn drop(&mut self) {
        if self.ms.is_none() {
            self.record();
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::client::StatsClient;
    use crate::transport::SpyTransport;
    use crossbeam_channel::Receiver;
    use std::thread;
    use std::time::Duration;

    fn new_spy_client() -> (Receiver<Vec<u8>>, StatsClient) {
        let (rx, transport) = SpyTransport::new();
        (rx, StatsClient::from_transport("", transport))
    }

    fn payload(rx: &Receiver<Vec<u8>>) -> String {
        String::from_utf8(rx.try_recv().unwrap()).unwrap()
    }

    #[test]
    fn test_timer_fires_on_stop() {
        let (rx, client) = new_spy_client();

        let mut timer = client.timer("some.timer");
        let elapsed = timer.stop();

        let line = payload(&rx);
        assert_eq!(format!("some.timer:{}|ms", elapsed), line);
    }

    #[test]
    fn test_timer_fires_on_drop() {
        let (rx, client) = new_spy_client();

        {
            let _timer = client.timer("some.timer");
        }

        let line = payload(&rx);
        assert!(line.starts_with("some.timer:"), "got {}", line);
        assert!(line.ends_with("|ms"), "got {}", line);
    }

    #[test]
    fn test_timer_fires_exactly_once() {
        let (rx, client) = new_spy_client();

        let mut timer = client.timer("some.timer");
        let first = timer.stop();
        let second = timer.stop();
        drop(timer);

        assert_eq!(first, second);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_timer_elapsed_none_before_stop() {
        let (_rx, client) = new_spy_client();

        let mut timer = client.timer("some.timer");
        assert_eq!(None, timer.elapsed_ms());

        let elapsed = timer.stop();
        assert_eq!(Some(elapsed), timer.elapsed_ms());
    }

    #[test]
    fn test_timer_measures_sleep_within_tolerance() {
        let (rx, client) = new_spy_client();

        let mut timer = client.timer("some.timer");
        thread::sleep(Duration::from_millis(50));
        let elapsed = timer.stop();

        assert!((40..=70).contains(&elapsed), "elapsed {} ms", elapsed);
        assert_eq!(format!("some.timer:{}|ms", elapsed), payload(&rx));
    }

    #[test]
    fn test_timer_forwards_rate() {
        let (rx, client) = new_spy_client();

        // rate 1 must never suppress or annotate
        let mut timer = client.timer("some.timer").with_rate(1.0);
        timer.stop();

        let line = payload(&rx);
        assert!(!line.contains("|@"), "got {}", line);
    }
}
