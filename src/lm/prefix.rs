//! Prefix-tracking language model.
//!
//! Each state stands for the word prefix consumed so far, identified only by an
//! incremental hash `hash(dst) = hash(src) * PRIME + word`. States are minted
//! lazily, in first-seen order, and every transition scores 0.
//!
//! Two distinct prefixes with the same hash share one state. Collisions are
//! neither detected nor resolved.

use std::collections::HashMap;

use tracing::debug;

use super::{LanguageModel, LmStateId, LmTransition, LmWordId};
use crate::constants::lm::{NULL_PREFIX_HASH, NULL_STATE, PREFIX_HASH_PRIME};
use crate::error::{Result, SioError};
use crate::tokenizer::{SpecialTokens, Tokenizer};

type PrefixHash = u64;

/// Language model whose states enumerate distinct word prefixes.
///
/// Not internally synchronized: one instance per decoding session, or an
/// external lock around a shared one.
#[derive(Debug, Default)]
pub struct PrefixLm {
    special: Option<SpecialTokens>,
    state_to_hash: Vec<PrefixHash>,
    hash_to_state: HashMap<PrefixHash, LmStateId>,
}

impl PrefixLm {
    /// Create a model bound to `tokenizer`'s special tokens, with the null state established.
    pub fn new(tokenizer: &Tokenizer) -> Self {
        let mut lm = Self::default();
        lm.establish(tokenizer);
        lm
    }

    /// Bind an unloaded model to `tokenizer` and establish the null state.
    pub fn load(&mut self, tokenizer: &Tokenizer) -> Result<()> {
        if self.special.is_some() {
            return Err(SioError::AlreadyLoaded("PrefixLm"));
        }
        self.establish(tokenizer);
        Ok(())
    }

    fn establish(&mut self, tokenizer: &Tokenizer) {
        self.special = Some(tokenizer.special());
        self.state_to_hash.push(NULL_PREFIX_HASH);
        self.hash_to_state.insert(NULL_PREFIX_HASH, NULL_STATE);
    }

    /// Number of states minted so far, including the null state.
    pub fn num_states(&self) -> usize {
        self.state_to_hash.len()
    }

    fn special(&self) -> &SpecialTokens {
        match &self.special {
            Some(special) => special,
            None => panic!("PrefixLm used before load"),
        }
    }
}

impl LanguageModel for PrefixLm {
    fn bos(&self) -> LmWordId {
        self.special().bos
    }

    fn eos(&self) -> LmWordId {
        self.special().eos
    }

    fn unk(&self) -> LmWordId {
        self.special().unk
    }

    fn null_state(&self) -> LmStateId {
        assert!(!self.hash_to_state.is_empty(), "PrefixLm uninitialized");
        NULL_STATE
    }

    fn get_score(&mut self, src: LmStateId, word: LmWordId) -> Option<LmTransition> {
        let src_hash = match usize::try_from(src).ok().and_then(|s| self.state_to_hash.get(s)) {
            Some(&hash) => hash,
            None => panic!("unknown PrefixLm state {src}"),
        };
        let dst_hash = src_hash
            .wrapping_mul(PREFIX_HASH_PRIME)
            .wrapping_add(word as PrefixHash);

        let dst = match self.hash_to_state.get(&dst_hash) {
            Some(&state) => state,
            None => {
                let state = match LmStateId::try_from(self.state_to_hash.len()) {
                    Ok(state) => state,
                    Err(_) => panic!("PrefixLm state space exhausted"),
                };
                self.state_to_hash.push(dst_hash);
                self.hash_to_state.insert(dst_hash, state);
                debug!(src, word, dst = state, "new prefix state");
                state
            }
        };

        Some(LmTransition { score: 0.0, dst })
    }
}
