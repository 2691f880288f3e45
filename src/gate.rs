use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct Counters {
    in_flight: usize,
    peak: usize,
}

/// Counting semaphore sized to the concurrency budget.
///
/// Every admitted unit of work holds a [`Permit`]; dropping the permit hands
/// the unit back and wakes one waiter. Because release happens in `Drop` it
/// also runs when a task unwinds.
#[derive(Debug)]
pub struct AdmissionGate {
    capacity: usize,
    counters: Mutex<Counters>,
    released: Condvar,
}

impl AdmissionGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            counters: Mutex::new(Counters::default()),
            released: Condvar::new(),
        }
    }

    // Counters are plain integers that are never left half-updated, so a
    // poisoned lock still holds valid values.
    fn lock(&self) -> MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until a unit of the budget is free.
    pub fn acquire(&self) -> Permit<'_> {
        let mut counters = self.lock();
        while counters.in_flight >= self.capacity {
            counters = self
                .released
                .wait(counters)
                .unwrap_or_else(PoisonError::into_inner);
        }
        counters.in_flight += 1;
        counters.peak = counters.peak.max(counters.in_flight);
        Permit { gate: self }
    }

    fn release(&self) {
        let mut counters = self.lock();
        counters.in_flight -= 1;
        drop(counters);
        self.released.notify_one();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn in_flight(&self) -> usize {
        self.lock().in_flight
    }

    /// Highest number of permits held at once since the gate was created.
    pub fn peak(&self) -> usize {
        self.lock().peak
    }
}

#[derive(Debug)]
pub struct Permit<'a> {
    gate: &'a AdmissionGate,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}
