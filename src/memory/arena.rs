//! Per-type elastic object pool.
//!
//! Same free-list discipline as the slab allocator, but every cell holds one
//! live `T` by value: `alloc` moves an object in, `free` moves it back out.
//! All slabs are released when the arena is cleared or dropped.

use tracing::debug;

use super::free_list::{FreeCells, FreeList, Handle};
use super::link::{Link, LinkStore, Linked};
use crate::constants::memory::MIN_CELL_BYTES;
use crate::error::{Result, SioError};

enum Slot<T> {
    Free { next: Option<Handle> },
    Live(T),
}

struct Slabs<T> {
    slab_size: usize,
    slabs: Vec<Box<[Slot<T>]>>,
}

impl<T> Slabs<T> {
    fn slot(&self, cell: Handle) -> &Slot<T> {
        let i = cell.index();
        let s = i / self.slab_size;
        assert!(s < self.slabs.len(), "handle {cell} does not belong to this arena");
        &self.slabs[s][i % self.slab_size]
    }

    fn slot_mut(&mut self, cell: Handle) -> &mut Slot<T> {
        let i = cell.index();
        let s = i / self.slab_size;
        assert!(s < self.slabs.len(), "handle {cell} does not belong to this arena");
        &mut self.slabs[s][i % self.slab_size]
    }
}

impl<T> FreeCells for Slabs<T> {
    fn next_free(&self, cell: Handle) -> Option<Handle> {
        match self.slot(cell) {
            Slot::Free { next } => *next,
            Slot::Live(_) => panic!("free list reached live arena cell {cell}"),
        }
    }

    fn set_next_free(&mut self, cell: Handle, next: Option<Handle>) {
        *self.slot_mut(cell) = Slot::Free { next };
    }
}

/// Object pool for values of `T`, growing `slab_size` objects at a time.
pub struct ArenaAllocator<T> {
    storage: Slabs<T>,
    free_list: FreeList,
    num_used: usize,
}

impl<T> ArenaAllocator<T> {
    /// Create an arena allocating `slab_size` objects per slab.
    ///
    /// Fails when `slab_size` is zero or when `T` is smaller than a pointer.
    pub fn new(slab_size: usize) -> Result<Self> {
        if slab_size < 1 {
            return Err(SioError::Allocator(
                "arena slab must hold at least one element".to_string(),
            ));
        }
        if std::mem::size_of::<T>() < MIN_CELL_BYTES {
            return Err(SioError::Allocator(format!(
                "element size {} is smaller than a pointer ({} bytes)",
                std::mem::size_of::<T>(),
                MIN_CELL_BYTES
            )));
        }

        Ok(Self {
            storage: Slabs {
                slab_size,
                slabs: Vec::new(),
            },
            free_list: FreeList::default(),
            num_used: 0,
        })
    }

    /// Move `value` into a free cell, growing the arena by one slab if needed.
    pub fn alloc(&mut self, value: T) -> Handle {
        if self.free_list.is_empty() {
            self.grow();
        }

        let cell = match self.free_list.pop(&self.storage) {
            Some(cell) => cell,
            None => unreachable!("free list empty right after growing"),
        };
        *self.storage.slot_mut(cell) = Slot::Live(value);
        self.num_used += 1;
        cell
    }

    fn grow(&mut self) {
        let slab_size = self.storage.slab_size;
        let first = self.storage.slabs.len() * slab_size;
        let slab: Box<[Slot<T>]> = std::iter::repeat_with(|| Slot::Free { next: None })
            .take(slab_size)
            .collect();
        self.storage.slabs.push(slab);

        for i in (first..first + slab_size).rev() {
            self.free_list.push(&mut self.storage, Handle::new(i));
        }

        debug!(
            slabs = self.storage.slabs.len(),
            slab_size, "arena allocator grew"
        );
    }

    /// Move the object out of `cell` and put the cell back on the free list.
    ///
    /// # Panics
    /// Panics if `cell` is not live (double free or stale handle).
    pub fn free(&mut self, cell: Handle) -> T {
        let slot = std::mem::replace(self.storage.slot_mut(cell), Slot::Free { next: None });
        let value = match slot {
            Slot::Live(value) => value,
            Slot::Free { next } => {
                // Leave the chain exactly as it was before panicking.
                *self.storage.slot_mut(cell) = Slot::Free { next };
                panic!("double free of arena cell {cell}");
            }
        };
        self.num_used -= 1;
        self.free_list.push(&mut self.storage, cell);
        value
    }

    pub fn get(&self, cell: Handle) -> &T {
        match self.storage.slot(cell) {
            Slot::Live(value) => value,
            Slot::Free { .. } => panic!("access to free arena cell {cell}"),
        }
    }

    pub fn get_mut(&mut self, cell: Handle) -> &mut T {
        match self.storage.slot_mut(cell) {
            Slot::Live(value) => value,
            Slot::Free { .. } => panic!("access to free arena cell {cell}"),
        }
    }

    pub fn num_used(&self) -> usize {
        self.num_used
    }

    /// Walks the free chain.
    pub fn num_free(&self) -> usize {
        let n = self.free_list.walk(&self.storage);
        debug_assert_eq!(n, self.free_list.len());
        n
    }

    pub fn num_slabs(&self) -> usize {
        self.storage.slabs.len()
    }

    /// Drop every object and slab. Outstanding handles become invalid.
    pub fn clear(&mut self) {
        self.num_used = 0;
        self.free_list.clear();
        self.storage.slabs.clear();
    }
}

impl<T: Linked> LinkStore for ArenaAllocator<T> {
    fn link(&self, node: Handle) -> &Link {
        self.get(node).link()
    }

    fn link_mut(&mut self, node: Handle) -> &mut Link {
        self.get_mut(node).link_mut()
    }
}
