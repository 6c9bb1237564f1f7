//! Host local references
//!
//! Reading an element out of a host array hands back a local reference that
//! counts against a fixed-capacity table. Traversals hold one [`LocalRef`] per
//! element and drop it before moving on, so a large array never needs more
//! than a handful of slots.

use std::cell::Cell;

use crate::error::{CodecResult, PendingException};

/// Default capacity of the host local reference table
pub const DEFAULT_LOCAL_REF_CAPACITY: usize = 512;

#[derive(Debug)]
pub struct LocalRefTable {
    capacity: usize,
    live: Cell<usize>,
    peak: Cell<usize>,
}

impl Default for LocalRefTable {
    fn default() -> Self {
        Self::new(DEFAULT_LOCAL_REF_CAPACITY)
    }
}

impl LocalRefTable {
    /// Create a table that holds at most `capacity` live references
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            live: Cell::new(0),
            peak: Cell::new(0),
        }
    }

    /// Maximum number of live references
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of references currently live
    pub fn live(&self) -> usize {
        self.live.get()
    }

    /// Highest number of references live at once
    pub fn peak(&self) -> usize {
        self.peak.get()
    }

    /// Take a slot, raising a host `OutOfMemoryError` when the table is full
    pub fn acquire(&self) -> CodecResult<LocalRef<'_>> {
        let live = self.live.get();
        if live >= self.capacity {
            return Err(PendingException::host(
                "java.lang.OutOfMemoryError",
                format!("local reference table overflow (capacity {})", self.capacity),
            )
            .into());
        }
        self.live.set(live + 1);
        if live + 1 > self.peak.get() {
            self.peak.set(live + 1);
        }
        Ok(LocalRef { table: self })
    }
}

/// One occupied slot in a [`LocalRefTable`], freed on drop
#[derive(Debug)]
pub struct LocalRef<'a> {
    table: &'a LocalRefTable,
}

impl Drop for LocalRef<'_> {
    fn drop(&mut self) {
        self.table.live.set(self.table.live.get() - 1);
    }
}
