// Metronome - A batching Statsd client for Rust!
//
// Copyright 2025-2026 Nick Pillitteri
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::cell::RefCell;
use std::sync::Mutex;

/// Mutual exclusion capability guarding the pending batch of a client.
///
/// The closure passed to `with` runs with exclusive access to the batch;
/// callers must do all of their reading and mutating inside it and must
/// not perform network I/O from it, so that the lock is never held across
/// a send.
///
/// Two implementations are provided: [`SyncLock`] for clients shared
/// between threads and [`LocalLock`] for single threaded use. The lock is
/// picked at construction time through the client's type parameter rather
/// than a runtime flag, so a single threaded client pays no
/// synchronization cost at all.
pub trait BufferLock: Default {
    fn with<R>(&self, f: impl FnOnce(&mut Vec<String>) -> R) -> R;
}

/// `Mutex` backed lock for clients shared between threads.
///
/// A client built with this lock is `Send + Sync` and is typically shared
/// as an `Arc<StatsClient<SyncLock>>`.
#[derive(Debug, Default)]
pub struct SyncLock(Mutex<Vec<String>>);

impl BufferLock for SyncLock {
    fn with<R>(&self, f: impl FnOnce(&mut Vec<String>) -> R) -> R {
        let mut stats = self.0.lock().unwrap();
        f(&mut stats)
    }
}

/// Borrow-flag lock for single threaded clients.
///
/// Acquisition always succeeds and never blocks. A client built with this
/// lock is not `Sync`, so the single threaded contract is enforced by the
/// compiler instead of a runtime check.
#[derive(Debug, Default)]
pub struct LocalLock(RefCell<Vec<String>>);

impl BufferLock for LocalLock {
    fn with<R>(&self, f: impl FnOnce(&mut Vec<String>) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }
}
