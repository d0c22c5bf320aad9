use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Process-wide arbitration so that at most one visualisation runs at a time.
///
/// Every lifecycle in the process is handed a clone of the same slot at
/// construction. Acquisition is a single check-and-set under the slot's lock,
/// so two competing loads can never both win.
#[derive(Debug, Clone, Default)]
pub struct VisualisationSlot {
    occupied: Arc<Mutex<bool>>,
}

impl VisualisationSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the slot. Returns `false` if any holder already has it.
    ///
    /// Callers do not spin on a `false`; the next attempt waits for an
    /// explicit reselection or the next playback start.
    pub fn try_acquire(&self) -> bool {
        let mut occupied = self.lock();
        if *occupied {
            return false;
        }
        *occupied = true;
        true
    }

    pub fn release(&self) {
        *self.lock() = false;
    }

    pub fn is_occupied(&self) -> bool {
        *self.lock()
    }

    // A bare flag cannot be left half-written, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, bool> {
        self.occupied.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
