//! Fixed-size object pools for per-utterance search state.
//!
//! This module contains the allocation primitives used on the search hot path:
//! a slab allocator for raw fixed-size cells, a per-type arena, and the
//! intrusive link used to keep live hypotheses on lists without extra allocation.

mod arena;
mod free_list;
mod link;
mod slab;

pub use arena::ArenaAllocator;
pub use free_list::Handle;
pub use link::{Link, LinkIter, LinkStore, Linked};
pub use slab::SlabAllocator;
