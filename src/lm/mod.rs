//! Language model abstraction consulted by the graph search.
//!
//! A language model is a deterministic automaton over word ids: from a state,
//! consuming a word yields an incremental score and a destination state.
//! Concrete strategies plug in behind [`LanguageModel`].

mod prefix;

pub use prefix::PrefixLm;

/// Dense language model state id.
pub type LmStateId = i32;

/// Word id, drawn from the tokenizer vocabulary.
pub type LmWordId = i32;

/// Incremental transition score.
pub type LmScore = f32;

/// Outcome of consuming one word.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LmTransition {
    pub score: LmScore,
    pub dst: LmStateId,
}

/// Capability interface over "score a (state, word) transition".
pub trait LanguageModel {
    /// Begin-of-sequence word id.
    fn bos(&self) -> LmWordId;

    /// End-of-sequence word id.
    fn eos(&self) -> LmWordId;

    /// Unknown word id.
    fn unk(&self) -> LmWordId;

    /// State every sequence starts from.
    fn null_state(&self) -> LmStateId;

    /// Consume `word` from `src`.
    ///
    /// Returns `None` when the model rejects the transition.
    fn get_score(&mut self, src: LmStateId, word: LmWordId) -> Option<LmTransition>;
}
