//! Single-value mailboxes shared between tasks

use core::cell::Cell;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

/// Last-writer-wins cell holding one `Copy` value.
///
/// Reads and writes never block on another task and never tear; a read after
/// a write observes that write or a later one.
pub struct Slot<T: Copy> {
    value: Mutex<CriticalSectionRawMutex, Cell<T>>,
}

impl<T: Copy> Slot<T> {
    pub const fn new(initial: T) -> Self {
        Self {
            value: Mutex::new(Cell::new(initial)),
        }
    }

    pub fn put(&self, value: T) {
        self.value.lock(|cell| cell.set(value));
    }

    pub fn get(&self) -> T {
        self.value.lock(|cell| cell.get())
    }

    /// Read-modify-write inside a single critical section, returns the new value
    pub fn update(&self, f: impl FnOnce(T) -> T) -> T {
        self.value.lock(|cell| {
            let next = f(cell.get());
            cell.set(next);
            next
        })
    }
}
