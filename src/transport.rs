// Metronome - A batching Statsd client for Rust!
//
// Copyright 2025-2026 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::types::{MetricError, MetricResult};

/// Snapshot of the traffic counters kept by a transport.
#[derive(Clone, Debug, Default)]
pub struct TransportStats {
    pub bytes_sent: u64,
    pub packets_sent: u64,
    pub bytes_dropped: u64,
    pub packets_dropped: u64,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct SocketStats {
    bytes_sent: Arc<AtomicU64>,
    packets_sent: Arc<AtomicU64>,
    bytes_dropped: Arc<AtomicU64>,
    packets_dropped: Arc<AtomicU64>,
}

impl SocketStats {
    pub fn update(&self, res: io::Result<usize>, len: usize) -> io::Result<usize> {
        match res {
            Ok(written) => {
                self.bytes_sent.fetch_add(written as u64, Ordering::Relaxed);
                self.packets_sent.fetch_add(1, Ordering::Relaxed);
                Ok(written)
            }
            Err(e) => {
                self.bytes_dropped.fetch_add(len as u64, Ordering::Relaxed);
                self.packets_dropped.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
        }
    }
}

impl From<&SocketStats> for TransportStats {
    fn from(stats: &SocketStats) -> Self {
        TransportStats {
            bytes_sent: stats.bytes_sent.load(Ordering::Relaxed),
            packets_sent: stats.packets_sent.load(Ordering::Relaxed),
            bytes_dropped: stats.bytes_dropped.load(Ordering::Relaxed),
            packets_dropped: stats.packets_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Attempt to convert anything implementing the `ToSocketAddrs` trait
/// into a concrete `SocketAddr` instance, returning an `InvalidInput`
/// error if the address could not be parsed.
fn get_addr<A: ToSocketAddrs>(addr: A) -> MetricResult<SocketAddr> {
    match addr.to_socket_addrs()?.next() {
        Some(addr) => Ok(addr),
        None => Err(MetricError::InvalidInput("No socket addresses yielded")),
    }
}

/// Trait for the datagram backends that payloads are written to.
///
/// A payload is one or more complete protocol lines joined with `\n`,
/// already prefixed and sampled by the client. Implementations send the
/// whole payload as a single datagram (or equivalent) in the thread of
/// the caller.
///
/// Note that the client treats every transport failure as best effort
/// and discards the error, so implementations should not retry or block
/// for longer than a single send requires.
pub trait Transport {
    /// Send a complete payload and return the number of bytes written
    /// or an I/O error.
    fn send(&self, payload: &str) -> io::Result<usize>;

    /// Return I/O telemetry like bytes / packets sent or dropped.
    ///
    /// Not all transports count traffic; the default implementation
    /// returns zeros.
    fn stats(&self) -> TransportStats {
        TransportStats::default()
    }
}

/// Implementation of a `Transport` that sends payloads over UDP.
///
/// The target address is resolved once, at construction, and an
/// unresolvable address is a construction error. Sends after that are
/// fire-and-forget: each payload becomes a single datagram and failures
/// are reported to the caller (the client discards them).
///
/// # Example
///
/// ```no_run
/// use metronome::{UdpTransport, DEFAULT_PORT};
///
/// let transport = UdpTransport::new(("metrics.example.com", DEFAULT_PORT)).unwrap();
/// ```
#[derive(Debug)]
pub struct UdpTransport {
    addr: SocketAddr,
    socket: UdpSocket,
    stats: SocketStats,
}

impl UdpTransport {
    /// Construct a new `UdpTransport` with a wildcard-bound local socket
    /// in non-blocking mode.
    ///
    /// # Failures
    ///
    /// This method may fail if:
    ///
    /// * It is unable to resolve the hostname of the metric server.
    /// * The local socket cannot be bound or configured.
    pub fn new<A>(to_addr: A) -> MetricResult<UdpTransport>
    where
        A: ToSocketAddrs,
    {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(true)?;
        Self::from_socket(to_addr, socket)
    }

    /// Construct a new `UdpTransport` from an already bound socket.
    ///
    /// The socket should have any desired configuration applied
    /// (blocking vs non-blocking, timeouts, etc.) before being passed
    /// here.
    pub fn from_socket<A>(to_addr: A, socket: UdpSocket) -> MetricResult<UdpTransport>
    where
        A: ToSocketAddrs,
    {
        let addr = get_addr(to_addr)?;
        let stats = SocketStats::default();
        Ok(UdpTransport { addr, socket, stats })
    }
}

impl Transport for UdpTransport {
    fn send(&self, payload: &str) -> io::Result<usize> {
        self.stats
            .update(self.socket.send_to(payload.as_bytes(), self.addr), payload.len())
    }

    fn stats(&self) -> TransportStats {
        (&self.stats).into()
    }
}

/// Implementation of a `Transport` that discards all payloads.
///
/// Used for the disabled mode a client enters when constructed without
/// a host, and useful for unit tests.
#[derive(Debug, Clone)]
pub struct NopTransport;

impl Transport for NopTransport {
    fn send(&self, _payload: &str) -> io::Result<usize> {
        Ok(0)
    }
}

/// Implementation of a `Transport` that writes all payloads to the
/// `Sender` half of a channel while callers are given ownership of the
/// `Receiver` half.
///
/// This is not a general purpose transport, rather it's meant for
/// verifying payloads written during the course of tests. By default the
/// channel used is unbounded. The channel size can be limited using the
/// `with_capacity` method.
#[derive(Debug)]
pub struct SpyTransport {
    sender: Sender<Vec<u8>>,
}

impl SpyTransport {
    pub fn new() -> (Receiver<Vec<u8>>, Self) {
        Self::with_queue_capacity(None)
    }

    pub fn with_capacity(queue: usize) -> (Receiver<Vec<u8>>, Self) {
        Self::with_queue_capacity(Some(queue))
    }

    fn with_queue_capacity(queue: Option<usize>) -> (Receiver<Vec<u8>>, Self) {
        let (tx, rx) = match queue {
            Some(sz) => bounded(sz),
            None => unbounded(),
        };

        (rx, SpyTransport { sender: tx })
    }
}

impl Transport for SpyTransport {
    fn send(&self, payload: &str) -> io::Result<usize> {
        match self.sender.try_send(payload.as_bytes().to_vec()) {
            Err(TrySendError::Disconnected(_)) => Err(io::Error::new(io::ErrorKind::Other, "channel disconnected")),
            Err(TrySendError::Full(_)) => Err(io::Error::new(io::ErrorKind::Other, "channel full")),
            Ok(_) => Ok(payload.len()),
        }
    }
}
