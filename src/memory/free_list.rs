//! Singly-linked free list threaded through vacant pool cells.
//!
//! The "next vacant cell" link of a free cell is stored inside the cell's own
//! slot, so a pool needs no side table to remember which cells can be reused.
//! Cells are addressed by [`Handle`] rather than by raw address.

/// Stable address of a cell inside a slab or arena pool.
///
/// Handles stay valid until the cell is freed or the owning pool is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(u32);

impl Handle {
    /// Create a handle for the cell at a flat pool index.
    ///
    /// # Panics
    /// Panics if the pool has grown past the handle range, which is treated the
    /// same way as running out of memory.
    pub(crate) fn new(index: usize) -> Self {
        match u32::try_from(index) {
            Ok(i) => Self(i),
            Err(_) => panic!("pool exhausted: cell index {index} exceeds handle range"),
        }
    }

    /// Flat index of the cell across all slabs of its pool.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for Handle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Storage able to keep a free-list link inside its vacant cells.
pub(crate) trait FreeCells {
    /// Link stored in a vacant cell.
    fn next_free(&self, cell: Handle) -> Option<Handle>;

    /// Turn `cell` into a vacant cell pointing at `next`.
    fn set_next_free(&mut self, cell: Handle, next: Option<Handle>);
}

/// Head of a free list plus its length.
#[derive(Debug, Default)]
pub(crate) struct FreeList {
    head: Option<Handle>,
    len: usize,
}

impl FreeList {
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn push<C: FreeCells + ?Sized>(&mut self, cells: &mut C, cell: Handle) {
        cells.set_next_free(cell, self.head);
        self.head = Some(cell);
        self.len += 1;
    }

    /// Pools grow in their `alloc`, never here: popping an empty list yields `None`.
    pub fn pop<C: FreeCells + ?Sized>(&mut self, cells: &C) -> Option<Handle> {
        let cell = self.head?;
        self.head = cells.next_free(cell);
        self.len -= 1;
        Some(cell)
    }

    /// Count the cells reachable from the head by following the stored links.
    pub fn walk<C: FreeCells + ?Sized>(&self, cells: &C) -> usize {
        let mut n = 0;
        let mut cur = self.head;
        while let Some(cell) = cur {
            n += 1;
            cur = cells.next_free(cell);
        }
        n
    }

    pub fn clear(&mut self) {
        self.head = None;
        self.len = 0;
    }
}
