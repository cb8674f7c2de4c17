//! Slab allocator for fixed-size cells of `T`.
//!
//! Storage grows one slab at a time: a slab holds `slab_cells` cells, each made
//! of `cell_units` consecutive values of `T`. Freed cells go back to a free list
//! and are handed out again before any new slab is created. Slabs are only
//! released by [`SlabAllocator::clear`] or when the allocator is dropped.

use tracing::debug;

use super::free_list::{FreeCells, FreeList, Handle};
use super::link::{Link, LinkStore, Linked};
use crate::constants::memory::{DEFAULT_CELL_UNITS, DEFAULT_SLAB_CELLS, MIN_CELL_BYTES};
use crate::error::{Result, SioError};

#[derive(Debug, Clone, Copy)]
enum CellState {
    Free { next: Option<Handle> },
    Used,
}

#[derive(Debug)]
struct Slab<T> {
    units: Box<[T]>,
    cells: Box<[CellState]>,
}

/// Pool handing out cells of `cell_units` values of `T`.
///
/// Every cell is reset to `T::default()` when it is handed out.
#[derive(Debug)]
pub struct SlabAllocator<T> {
    slab_cells: usize,
    cell_units: usize,
    slabs: Vec<Slab<T>>,

    free_list: FreeList,
    num_used: usize,
}

impl<T: Default> SlabAllocator<T> {
    /// Create an allocator with the default sizing (4096 cells of one unit).
    ///
    /// # Panics
    /// Panics if a single `T` is smaller than a pointer; such types need an
    /// explicit [`SlabAllocator::with_cache_size`] with more units per cell.
    pub fn new() -> Self {
        let cell_bytes = DEFAULT_CELL_UNITS * std::mem::size_of::<T>();
        assert!(
            cell_bytes >= MIN_CELL_BYTES,
            "default cell of {} bytes is smaller than a pointer ({} bytes)",
            cell_bytes,
            MIN_CELL_BYTES
        );
        Self::with_default_sizing()
    }

    /// Create an allocator with explicit sizing.
    pub fn with_cache_size(slab_cells: usize, cell_units: usize) -> Result<Self> {
        let mut allocator = Self::with_default_sizing();
        allocator.set_cache_size(slab_cells, cell_units)?;
        Ok(allocator)
    }

    fn with_default_sizing() -> Self {
        Self {
            slab_cells: DEFAULT_SLAB_CELLS,
            cell_units: DEFAULT_CELL_UNITS,
            slabs: Vec::new(),
            free_list: FreeList::default(),
            num_used: 0,
        }
    }

    /// Configure slab sizing.
    ///
    /// # Arguments
    /// * `slab_cells` - Number of cells allocated per slab.
    /// * `cell_units` - Number of `T` values making up one cell.
    ///
    /// Must be called before the first allocation, and a cell must be at least
    /// as large as a pointer.
    pub fn set_cache_size(&mut self, slab_cells: usize, cell_units: usize) -> Result<()> {
        if !self.slabs.is_empty() {
            return Err(SioError::Allocator(
                "cache size needs to be set before first use".to_string(),
            ));
        }
        if slab_cells < 1 {
            return Err(SioError::Allocator(
                "slab must hold at least one cell".to_string(),
            ));
        }
        let cell_bytes = cell_units * std::mem::size_of::<T>();
        if cell_bytes < MIN_CELL_BYTES {
            return Err(SioError::Allocator(format!(
                "cannot support cells of {} bytes, smaller than a pointer ({} bytes)",
                cell_bytes, MIN_CELL_BYTES
            )));
        }

        self.slab_cells = slab_cells;
        self.cell_units = cell_units;
        Ok(())
    }

    /// Take a cell from the free list, growing by one slab when it is empty.
    pub fn alloc(&mut self) -> Handle {
        if self.free_list.is_empty() {
            self.grow();
        }

        let cell = match self.free_list.pop(&self.slabs[..]) {
            Some(cell) => cell,
            None => unreachable!("free list empty right after growing"),
        };
        let (s, c) = self.locate(cell);
        let slab = &mut self.slabs[s];
        slab.cells[c] = CellState::Used;
        let begin = c * self.cell_units;
        slab.units[begin..begin + self.cell_units].fill_with(T::default);
        self.num_used += 1;
        cell
    }

    fn grow(&mut self) {
        let first = self.slabs.len() * self.slab_cells;
        let units = std::iter::repeat_with(T::default)
            .take(self.slab_cells * self.cell_units)
            .collect();
        let cells = vec![CellState::Free { next: None }; self.slab_cells].into_boxed_slice();
        self.slabs.push(Slab { units, cells });

        // Reverse order so the lowest cell of the new slab is handed out first.
        for i in (first..first + self.slab_cells).rev() {
            self.free_list.push(&mut self.slabs[..], Handle::new(i));
        }

        debug!(
            slabs = self.slabs.len(),
            cells_per_slab = self.slab_cells,
            "slab allocator grew"
        );
    }
}

impl<T> SlabAllocator<T> {
    /// Return a cell to the free list.
    ///
    /// # Panics
    /// Panics if `cell` is not currently allocated (double free or stale handle).
    pub fn free(&mut self, cell: Handle) {
        let (s, c) = self.locate(cell);
        assert!(
            matches!(self.slabs[s].cells[c], CellState::Used),
            "double free of slab cell {cell}"
        );
        self.num_used -= 1;
        self.free_list.push(&mut self.slabs[..], cell);
    }

    /// The `cell_units` values of an allocated cell.
    pub fn get(&self, cell: Handle) -> &[T] {
        let (s, c) = self.locate_used(cell);
        let begin = c * self.cell_units;
        &self.slabs[s].units[begin..begin + self.cell_units]
    }

    /// Mutable access to the values of an allocated cell.
    pub fn get_mut(&mut self, cell: Handle) -> &mut [T] {
        let (s, c) = self.locate_used(cell);
        let begin = c * self.cell_units;
        &mut self.slabs[s].units[begin..begin + self.cell_units]
    }

    pub fn num_used(&self) -> usize {
        self.num_used
    }

    pub fn num_free(&self) -> usize {
        self.free_list.len()
    }

    pub fn num_slabs(&self) -> usize {
        self.slabs.len()
    }

    pub fn cell_units(&self) -> usize {
        self.cell_units
    }

    /// Drop every slab and reset counters. Outstanding handles become invalid.
    pub fn clear(&mut self) {
        self.num_used = 0;
        self.free_list.clear();
        self.slabs.clear();
    }

    fn locate(&self, cell: Handle) -> (usize, usize) {
        let i = cell.index();
        let s = i / self.slab_cells;
        assert!(s < self.slabs.len(), "handle {cell} does not belong to this allocator");
        (s, i % self.slab_cells)
    }

    fn locate_used(&self, cell: Handle) -> (usize, usize) {
        let (s, c) = self.locate(cell);
        assert!(
            matches!(self.slabs[s].cells[c], CellState::Used),
            "access to free slab cell {cell}"
        );
        (s, c)
    }
}

impl<T: Default> Default for SlabAllocator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FreeCells for [Slab<T>] {
    fn next_free(&self, cell: Handle) -> Option<Handle> {
        let cells_per_slab = self[0].cells.len();
        let i = cell.index();
        match self[i / cells_per_slab].cells[i % cells_per_slab] {
            CellState::Free { next } => next,
            CellState::Used => panic!("free list reached allocated slab cell {cell}"),
        }
    }

    fn set_next_free(&mut self, cell: Handle, next: Option<Handle>) {
        let cells_per_slab = self[0].cells.len();
        let i = cell.index();
        self[i / cells_per_slab].cells[i % cells_per_slab] = CellState::Free { next };
    }
}

/// Cells whose first unit embeds a [`Link`] can be chained into intrusive lists.
impl<T: Linked> LinkStore for SlabAllocator<T> {
    fn link(&self, node: Handle) -> &Link {
        self.get(node)[0].link()
    }

    fn link_mut(&mut self, node: Handle) -> &mut Link {
        self.get_mut(node)[0].link_mut()
    }
}
