//! Serial line admission control
//!
//! A serial bus answers one request at a time, so events queue for the
//! line. [`AdmissionGate`] bounds that queue: up to `ceiling` events may
//! hold or wait for the line at once, and any event arriving beyond the
//! ceiling is shed immediately instead of piling up behind a slow or dead
//! bus. Shedding is the backpressure mechanism; a shed event is logged and
//! dropped, never queued.
//!
//! The gate owns the guarded value. Admission yields an RAII guard whose
//! drop releases both the line and the waiting slot.

use std::ops::{Deref, DerefMut};

use tokio::sync::{Mutex, MutexGuard, Semaphore, SemaphorePermit};
use tracing::debug;

/// Bounded-waiting exclusive access to the serial line.
pub struct AdmissionGate<T> {
    waiting: Semaphore,
    line: Mutex<T>,
}

/// Exclusive access to the gated value; dropping it releases the line and
/// frees a waiting slot.
pub struct AdmissionGuard<'a, T> {
    inner: MutexGuard<'a, T>,
    _permit: SemaphorePermit<'a>,
}

impl<T> Deref for AdmissionGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T> DerefMut for AdmissionGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

impl<T> AdmissionGate<T> {
    /// Create a gate around `value` admitting at most `ceiling` concurrent
    /// holders-plus-waiters.
    pub fn new(value: T, ceiling: usize) -> Self {
        Self {
            waiting: Semaphore::new(ceiling.max(1)),
            line: Mutex::new(value),
        }
    }

    /// Wait for the line, or shed if the ceiling is already reached.
    ///
    /// Returns `None` without waiting when `ceiling` events already hold or
    /// wait for the line.
    pub async fn admit(&self) -> Option<AdmissionGuard<'_, T>> {
        let permit = match self.waiting.try_acquire() {
            Ok(permit) => permit,
            Err(_) => {
                debug!("Max waiting events reached, shedding event");
                return None;
            }
        };
        let inner = self.line.lock().await;
        Some(AdmissionGuard {
            inner,
            _permit: permit,
        })
    }

    /// Wait for the line unconditionally, bypassing the ceiling. Used for
    /// lifecycle work (shutdown) that must not be shed.
    pub async fn lock(&self) -> MutexGuard<'_, T> {
        self.line.lock().await
    }

    #[cfg(test)]
    pub(crate) fn free_slots(&self) -> usize {
        self.waiting.available_permits()
    }
}
