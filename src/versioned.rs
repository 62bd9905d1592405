//! Versioned cells and debounced calculations.
//!
//! The host server runs analyser and builder summaries per file, keyed by
//! the client-supplied document version. Two rules keep the results
//! coherent under concurrency: a newer version always wins when publishing
//! a result, and a summary calculation only runs if no newer request has
//! arrived while it waited out its debounce delay.

use std::sync::Mutex;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

/// A value paired with the client-supplied document version it was computed
/// for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub version: i32,
    pub value: T,
}

impl<T> Versioned<T> {
    pub fn new(version: i32, value: T) -> Self {
        Versioned { version, value }
    }
}

/// A cell updated by compare-and-swap on `(version, value)`: a newer
/// version always wins, stale completions are discarded.
#[derive(Debug, Default)]
pub struct VersionedCell<T> {
    slot: Mutex<Option<Versioned<T>>>,
}

impl<T: Clone> VersionedCell<T> {
    pub fn new() -> Self {
        VersionedCell {
            slot: Mutex::new(None),
        }
    }

    /// Store `candidate` iff its version is strictly newer than the current
    /// occupant. Returns whether the store happened.
    pub fn set_if_newer(&self, candidate: Versioned<T>) -> bool {
        let mut slot = self.slot.lock().expect("versioned cell poisoned");
        match slot.as_ref() {
            Some(current) if current.version >= candidate.version => {
                tracing::debug!(
                    current = current.version,
                    discarded = candidate.version,
                    "discarding stale versioned result"
                );
                false
            }
            _ => {
                *slot = Some(candidate);
                true
            }
        }
    }

    pub fn get(&self) -> Option<Versioned<T>> {
        self.slot.lock().expect("versioned cell poisoned").clone()
    }
}

/// Debouncer for summary calculations.
///
/// Each request records its version; after the delay the calculation runs
/// iff the recorded version is still current, otherwise it is abandoned and
/// the caller receives the null-summary sentinel (`None`).
#[derive(Debug, Default)]
pub struct Debouncer {
    latest: AtomicI32,
}

impl Debouncer {
    pub fn new() -> Self {
        Debouncer {
            latest: AtomicI32::new(i32::MIN),
        }
    }

    /// Record that `version` is now the latest requested calculation.
    pub fn request(&self, version: i32) {
        self.latest.fetch_max(version, Ordering::AcqRel);
    }

    /// Wait out `delay`, then run `calc` iff no newer request has been
    /// recorded in the meantime.
    pub fn run_debounced<R>(
        &self,
        version: i32,
        delay: Duration,
        calc: impl FnOnce() -> R,
    ) -> Option<R> {
        self.request(version);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        if self.latest.load(Ordering::Acquire) == version {
            Some(calc())
        } else {
            tracing::debug!(version, "abandoning debounced calculation");
            None
        }
    }
}
