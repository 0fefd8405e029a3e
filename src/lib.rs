// Metronome - A batching Statsd client for Rust!
//
// Copyright 2025-2026 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A batching Statsd client for Rust!
//!
//! Metronome is a small, fire-and-forget way to emit Statsd metrics from
//! your application.
//!
//! ## Features
//!
//! * Counters, timers, and gauges emitted to Statsd over UDP.
//! * Optional batching of multiple metrics into a single datagram.
//! * Optional statistical sampling of high frequency metrics, with
//!   rate-annotated lines so the server can rescale.
//! * A scoped timer helper that records wall clock time on every exit
//!   path, including panics.
//! * A disabled mode with zero network activity for tests and opt-outs.
//! * Alternate backends via the `Transport` trait.
//!
//! ## Install
//!
//! To make use of `metronome` in your project, add it as a dependency in
//! your `Cargo.toml` file.
//!
//! ```toml
//! [dependencies]
//! metronome = "x.y.z"
//! ```
//!
//! That's all you need!
//!
//! ## Usage
//!
//! ### Simple Use
//!
//! In this example, we create a client that will write each metric to
//! some imaginary metrics server immediately, as its own datagram.
//!
//! ```rust,no_run
//! use metronome::{StatsClient, DEFAULT_PORT};
//!
//! // Note that you'll probably want to actually handle any errors
//! // creating the client when you use it for real in your application.
//! // We're just using .unwrap() here since this is an example!
//! let client = StatsClient::new("metrics.example.com", DEFAULT_PORT).unwrap();
//!
//! // Emit metrics!
//! client.incr("some.counter");
//! client.timing("some.methodCall", 42);
//! client.gauge("some.thing", 7);
//! ```
//!
//! ### Batching
//!
//! While sending a metric over UDP is very fast, the overhead of frequent
//! network calls can start to add up. A client constructed with a batch
//! length greater than one collects formatted lines and sends them as a
//! single newline joined datagram once the batch is full. Call
//! [`StatsClient::flush`] to drain a partial batch, for example at
//! shutdown.
//!
//! ```rust,no_run
//! use metronome::StatsClient;
//!
//! let client = StatsClient::builder()
//!     .host("metrics.example.com")
//!     .prefix("my.service")
//!     .batch_len(16)
//!     .build()
//!     .unwrap();
//!
//! client.incr("requests.handled");
//! client.timing("request.duration", 35);
//! // ... the 16th line triggers a single datagram with all of them
//!
//! client.flush();
//! ```
//!
//! ### Sampling
//!
//! Metrics emitted at a rate below one are randomly suppressed so that
//! only roughly that fraction of them is sent, each carrying a `|@rate`
//! annotation the server uses to rescale counts.
//!
//! ```rust,no_run
//! use metronome::{StatsClient, DEFAULT_PORT};
//!
//! let client = StatsClient::new("metrics.example.com", DEFAULT_PORT).unwrap();
//!
//! // Sent about one time in ten, as "cache.hit:1|c|@0.1"
//! client.incr_sampled("cache.hit", 0.1);
//! ```
//!
//! ### Timers
//!
//! A [`Timer`] measures the wall clock time of a scope or a callable and
//! records it with the client that created it. The timing fires exactly
//! once, no matter how the scope exits.
//!
//! ```rust
//! use metronome::{NopTransport, StatsClient};
//!
//! let client = StatsClient::from_transport("my.service", NopTransport);
//!
//! // Scoped form: fires when the timer leaves scope
//! {
//!     let _timer = client.timer("page.render");
//!     // ... render the page ...
//! }
//!
//! // Wrapper form: times every invocation of the callable
//! let mut lookup = client.wrap("user.lookup", 1.0, || {
//!     // ... look up the user ...
//!     42
//! });
//! assert_eq!(42, lookup());
//! ```
//!
//! ### Sharing Between Threads
//!
//! The default client is single threaded and pays no locking cost; the
//! compiler will refuse to share it. Opting into thread safety guards the
//! pending batch with a mutex that is held only long enough to stage or
//! drain lines, never during network sends.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::thread;
//! use metronome::StatsClient;
//!
//! let client = Arc::new(
//!     StatsClient::builder()
//!         .host("metrics.example.com")
//!         .batch_len(8)
//!         .thread_safe()
//!         .build()
//!         .unwrap(),
//! );
//!
//! let handles: Vec<_> = (0..8)
//!     .map(|_| {
//!         let client = Arc::clone(&client);
//!         thread::spawn(move || client.incr("worker.started"))
//!     })
//!     .collect();
//!
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! ```
//!
//! ### Disabled Mode
//!
//! A client constructed with an empty host performs no network activity
//! for its entire lifetime. This is useful for unit tests or for turning
//! metrics off with configuration alone.
//!
//! ```rust
//! use metronome::StatsClient;
//!
//! let client = StatsClient::builder().host("").build().unwrap();
//! client.incr("goes.nowhere");
//! ```
//!
//! ### Custom Transports
//!
//! The client uses implementations of the [`Transport`] trait to put
//! payloads on the wire. Implementing it yourself lets metrics go
//! somewhere other than a UDP socket.
//!
//! ```rust
//! use std::io;
//! use metronome::{StatsClient, Transport};
//!
//! pub struct MyTransport;
//!
//! impl Transport for MyTransport {
//!     fn send(&self, payload: &str) -> io::Result<usize> {
//!         // Your custom transport implementation goes here!
//!         Ok(0)
//!     }
//! }
//!
//! let client = StatsClient::from_transport("my.prefix", MyTransport);
//! client.incr("some.counter");
//! ```
//!
//! ## Delivery Guarantees
//!
//! There are none. Metrics delivery is best effort: transport failures
//! are caught and discarded, nothing is retried, and a dropped datagram
//! is permanently lost. This matches the Statsd model, where losing an
//! occasional sample is vastly preferable to slowing the application
//! down. The only errors the library ever surfaces are construction
//! errors, since an unresolvable host indicates a configuration bug.

#![forbid(unsafe_code)]

/// Default host that metrics are sent to.
pub const DEFAULT_HOST: &str = "localhost";

/// Default UDP port that Statsd servers listen on.
pub const DEFAULT_PORT: u16 = 8125;

pub use self::client::{StatsClient, StatsClientBuilder};
pub use self::sync::{BufferLock, LocalLock, SyncLock};
pub use self::timer::Timer;
pub use self::transport::{NopTransport, SpyTransport, Transport, TransportStats, UdpTransport};
pub use self::types::{MetricError, MetricResult, MetricValue};

mod client;
mod sampler;
mod sync;
mod timer;
mod transport;
mod types;
