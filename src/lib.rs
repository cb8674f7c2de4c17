//! The `sio_core` decoding-graph library.
//!
//! This crate provides the substrate a streaming speech-recognition search runs
//! on: an immutable weighted automaton ([`fsm::Fsm`]) with binary and text
//! formats, fixed-size memory pools and intrusive lists for per-utterance search
//! state, a pluggable language model abstraction, and the vocabulary table.

pub mod config;
pub mod constants;
pub mod error;
pub mod fsm;
pub mod lm;
pub mod logging;
pub mod memory;
pub mod runtime;
pub mod tokenizer;

pub use error::{Result, SioError};
