//! Domain constants for the decoding-graph core.
//!
//! This module contains compile-time constants used throughout the crate.
//! These are separated from runtime configuration to provide clear distinction
//! between values that never change and those that can be configured.

/// Binary graph file framing.
pub mod fsm {
    /// Leading token of a binary graph file.
    pub const TOKEN_FSM: &str = "<Fsm>";

    pub const TOKEN_NUM_STATES: &str = "<NumStates>";
    pub const TOKEN_NUM_ARCS: &str = "<NumArcs>";
    pub const TOKEN_START: &str = "<Start>";
    pub const TOKEN_FINAL: &str = "<Final>";
    pub const TOKEN_STATES: &str = "<States>";
    pub const TOKEN_ARCS: &str = "<Arcs>";

    /// Encoded size of one state record: `arcs_begin: i32`.
    pub const STATE_RECORD_BYTES: usize = 4;

    /// Encoded size of one arc record: `src, dst, ilabel, olabel: i32` and `weight: f32`.
    pub const ARC_RECORD_BYTES: usize = 20;

    /// Required start state of every loaded graph.
    pub const START_STATE: i32 = 0;
}

/// Conventional spellings of special vocabulary tokens.
pub mod tokenizer {
    pub const BLANK_SPELLINGS: &[&str] = &["<blk>", "<blank>", "<pad>"];
    pub const UNK_SPELLINGS: &[&str] = &["<unk>", "<UNK>"];
    pub const BOS_SPELLINGS: &[&str] = &["<s>", "<bos>", "<sos>"];
    pub const EOS_SPELLINGS: &[&str] = &["</s>", "<eos>"];

    /// Marker for a special token that has not been resolved.
    pub const NO_TOKEN_ID: i32 = -1;
}

/// Language model constants.
pub mod lm {
    /// Multiplier for incremental prefix hashing (Kaldi's `VectorHasher` prime).
    pub const PREFIX_HASH_PRIME: u64 = 7853;

    /// Hash of the empty prefix.
    pub const NULL_PREFIX_HASH: u64 = 0;

    /// State id of the empty prefix.
    pub const NULL_STATE: i32 = 0;
}

/// Allocator sizing defaults.
pub mod memory {
    /// Cells per slab for the slab allocator.
    pub const DEFAULT_SLAB_CELLS: usize = 4096;

    /// Units of `T` per slab allocator cell.
    pub const DEFAULT_CELL_UNITS: usize = 1;

    /// Objects per slab for the arena allocator.
    pub const DEFAULT_ARENA_SLAB_SIZE: usize = 4096;

    /// Smallest cell the pools accept, in bytes.
    pub const MIN_CELL_BYTES: usize = std::mem::size_of::<usize>();
}
