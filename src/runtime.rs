//! Process-wide decoding resources and per-session search state.
//!
//! The graph and tokenizer are loaded once and shared read-only; each decoding
//! session owns its language model state, its hypothesis arena and its slab of
//! fixed-size scratch cells.

use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::fsm::Fsm;
use crate::lm::PrefixLm;
use crate::memory::{ArenaAllocator, SlabAllocator};
use crate::tokenizer::Tokenizer;

/// Graph and vocabulary shared by every session.
#[derive(Debug, Clone)]
pub struct DecodingResources {
    config: Config,
    fsm: Arc<Fsm>,
    tokenizer: Arc<Tokenizer>,
}

impl DecodingResources {
    /// Load the tokenizer and graph named by `config`.
    pub fn load(config: Config) -> Result<Self> {
        config.validate()?;

        info!("Loading tokenizer from {:?}", config.tokenizer_vocab);
        let tokenizer = Tokenizer::load(&config.tokenizer_vocab)?;

        info!(
            "Loading {:?} graph from {:?}",
            config.graph.format, config.graph.path
        );
        let fsm = Fsm::open(&config.graph.path, config.graph.format)?;

        Ok(Self::from_parts(config, fsm, tokenizer))
    }

    /// Assemble resources that were loaded elsewhere.
    pub fn from_parts(config: Config, fsm: Fsm, tokenizer: Tokenizer) -> Self {
        Self {
            config,
            fsm: Arc::new(fsm),
            tokenizer: Arc::new(tokenizer),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn fsm(&self) -> &Arc<Fsm> {
        &self.fsm
    }

    pub fn tokenizer(&self) -> &Arc<Tokenizer> {
        &self.tokenizer
    }

    /// Start a session whose hypotheses are of type `H` and whose scratch
    /// cells hold `allocator.cell_units` values of `C`.
    pub fn new_session<H, C: Default>(&self) -> Result<DecodingSession<H, C>> {
        let sizing = &self.config.allocator;
        Ok(DecodingSession {
            fsm: Arc::clone(&self.fsm),
            lm: PrefixLm::new(&self.tokenizer),
            hyps: ArenaAllocator::new(sizing.arena_slab_size)?,
            cells: SlabAllocator::with_cache_size(sizing.slab_cells, sizing.cell_units)?,
        })
    }
}

/// State owned by one decoding session.
pub struct DecodingSession<H, C> {
    pub fsm: Arc<Fsm>,
    pub lm: PrefixLm,
    pub hyps: ArenaAllocator<H>,
    pub cells: SlabAllocator<C>,
}

impl<H, C> DecodingSession<H, C> {
    /// Drop all hypotheses and scratch cells at an utterance boundary.
    /// Language model states are kept.
    pub fn reset(&mut self) {
        self.hyps.clear();
        self.cells.clear();
    }
}
