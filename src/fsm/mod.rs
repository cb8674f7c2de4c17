//! Immutable weighted finite-state automaton used as the decoding graph.
//!
//! The graph is stored in compressed-sparse-row form: `states` has one entry per
//! state plus a trailing sentinel, and state `s` owns the arcs in
//! `arcs[states[s].arcs_begin..states[s + 1].arcs_begin]`. Arcs are grouped by
//! source state, and sorted by `(src, dst)` when built from text.
//!
//! Every graph has exactly one start state (`0`) and one final state
//! (`num_states - 1`). Once loaded a graph is never mutated, so a single
//! instance can be shared by any number of concurrent search sessions.

mod binary;
mod text;

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::constants::fsm::START_STATE;
use crate::error::{ErrorContext, Result, SioError};

pub type StateId = i32;
pub type ArcId = i32;
pub type LabelId = i32;
pub type Weight = f32;

/// CSR row entry: offset of the state's first outgoing arc.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct State {
    pub arcs_begin: ArcId,
}

/// A directed, labeled, weighted edge.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Arc {
    pub src: StateId,
    pub dst: StateId,
    pub ilabel: LabelId,
    pub olabel: LabelId,
    pub weight: Weight,
}

impl Arc {
    pub fn new(src: StateId, dst: StateId, ilabel: LabelId, olabel: LabelId, weight: Weight) -> Self {
        Self {
            src,
            dst,
            ilabel,
            olabel,
            weight,
        }
    }
}

/// On-disk encoding of a graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphFormat {
    /// Token-framed binary records, see [`Fsm::load`].
    #[default]
    Binary,
    /// Human-editable arc listing, see [`Fsm::load_from_string`].
    Text,
}

/// Read-only cursor over the outgoing arcs of one state.
///
/// Use it either as a cursor (`done` / `value` / `advance`) or as an
/// [`Iterator`]; both share the same single forward pass.
#[derive(Debug, Clone)]
pub struct ArcIterator<'a> {
    arcs: &'a [Arc],
    pos: usize,
}

impl<'a> ArcIterator<'a> {
    /// Current arc.
    ///
    /// # Panics
    /// Panics when the cursor is done.
    pub fn value(&self) -> &'a Arc {
        &self.arcs[self.pos]
    }

    pub fn advance(&mut self) {
        self.pos += 1;
    }

    pub fn done(&self) -> bool {
        self.pos >= self.arcs.len()
    }
}

impl<'a> Iterator for ArcIterator<'a> {
    type Item = &'a Arc;

    fn next(&mut self) -> Option<&'a Arc> {
        let arc = self.arcs.get(self.pos)?;
        self.pos += 1;
        Some(arc)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.arcs.len().saturating_sub(self.pos);
        (n, Some(n))
    }
}

impl ExactSizeIterator for ArcIterator<'_> {}

/// Weighted automaton in CSR layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fsm {
    start_state: StateId,
    final_state: StateId,
    states: Vec<State>,
    arcs: Vec<Arc>,
}

impl Fsm {
    /// Read a binary graph from `reader`.
    pub fn from_binary<R: Read>(reader: R) -> Result<Self> {
        let mut fsm = Self::default();
        fsm.load(reader)?;
        Ok(fsm)
    }

    /// Read a text graph from `reader`.
    pub fn from_text<R: BufRead>(reader: R) -> Result<Self> {
        let mut fsm = Self::default();
        fsm.load_from_string(reader)?;
        Ok(fsm)
    }

    /// Open a graph file in the given format.
    pub fn open<P: AsRef<Path>>(path: P, format: GraphFormat) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("opening graph {:?}", path))?;
        let reader = BufReader::new(file);
        match format {
            GraphFormat::Binary => Self::from_binary(reader),
            GraphFormat::Text => Self::from_text(reader),
        }
    }

    /// Build a graph from an arc list in any order.
    ///
    /// Start is state `0` and final is state `num_states - 1`. Arcs are stably
    /// sorted by `(src, dst)`.
    pub fn from_arcs(num_states: i64, arcs: Vec<Arc>) -> Result<Self> {
        let final_state = num_states
            .checked_sub(1)
            .and_then(|last| StateId::try_from(last).ok())
            .ok_or_else(|| SioError::Format(format!("invalid state count {}", num_states)))?;
        build(num_states, START_STATE, final_state, arcs)
    }

    /// Load the binary form, framed by `<Fsm>`, `<NumStates>`, `<NumArcs>`,
    /// `<Start>`, `<Final>`, `<States>` and `<Arcs>` tokens.
    ///
    /// Fails if this instance already holds a graph.
    pub fn load<R: Read>(&mut self, reader: R) -> Result<()> {
        if !self.is_empty() {
            return Err(SioError::AlreadyLoaded("Fsm"));
        }
        *self = binary::decode(reader).map_err(|e| {
            warn!("Failed to load binary graph: {}", e);
            e
        })?;
        info!(
            num_states = self.num_states(),
            num_arcs = self.num_arcs(),
            "Loaded binary graph"
        );
        Ok(())
    }

    /// Load the text form: a `num_states,num_arcs,start,final` header, then one
    /// `src dst ilabel[:olabel] weight` line per arc.
    ///
    /// Fails if this instance already holds a graph.
    pub fn load_from_string<R: BufRead>(&mut self, reader: R) -> Result<()> {
        if !self.is_empty() {
            return Err(SioError::AlreadyLoaded("Fsm"));
        }
        *self = text::decode(reader).map_err(|e| {
            warn!("Failed to load text graph: {}", e);
            e
        })?;
        info!(
            num_states = self.num_states(),
            num_arcs = self.num_arcs(),
            "Loaded text graph"
        );
        Ok(())
    }

    /// Write the binary form accepted by [`Fsm::load`].
    pub fn dump<W: Write>(&self, writer: W) -> Result<()> {
        if self.is_empty() {
            return Err(SioError::EmptyGraph);
        }
        binary::encode(self, writer)
    }

    /// Write the text form accepted by [`Fsm::load_from_string`].
    pub fn write_text<W: Write>(&self, mut writer: W) -> Result<()> {
        if self.is_empty() {
            return Err(SioError::EmptyGraph);
        }
        write!(writer, "{}", self)?;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn start(&self) -> StateId {
        self.check_loaded();
        self.start_state
    }

    pub fn final_state(&self) -> StateId {
        self.check_loaded();
        self.final_state
    }

    /// Number of states, not counting the sentinel.
    pub fn num_states(&self) -> i64 {
        self.check_loaded();
        self.states.len() as i64 - 1
    }

    pub fn num_arcs(&self) -> i64 {
        self.check_loaded();
        self.arcs.len() as i64
    }

    /// Cursor over the outgoing arcs of `state`.
    ///
    /// # Panics
    /// Panics on an empty graph or when `state` is not in `[0, num_states)`;
    /// the sentinel row is never exposed.
    pub fn arc_iterator(&self, state: StateId) -> ArcIterator<'_> {
        ArcIterator {
            arcs: self.arcs(state),
            pos: 0,
        }
    }

    /// Outgoing arcs of `state` as a slice.
    pub fn arcs(&self, state: StateId) -> &[Arc] {
        self.check_loaded();
        let s = match usize::try_from(state) {
            Ok(s) if s + 1 < self.states.len() => s,
            _ => panic!(
                "state {} out of range [0, {})",
                state,
                self.states.len() - 1
            ),
        };
        let begin = self.states[s].arcs_begin as usize;
        let end = self.states[s + 1].arcs_begin as usize;
        &self.arcs[begin..end]
    }

    /// CSR rows including the sentinel.
    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// All arcs in storage order.
    pub fn all_arcs(&self) -> &[Arc] {
        &self.arcs
    }

    fn check_loaded(&self) {
        assert!(!self.is_empty(), "Fsm is empty");
    }
}

impl fmt::Display for Fsm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        writeln!(
            f,
            "{},{},{},{}",
            self.num_states(),
            self.num_arcs(),
            self.start_state,
            self.final_state
        )?;
        for arc in &self.arcs {
            writeln!(
                f,
                "{}\t{}\t{}:{}\t{}",
                arc.src, arc.dst, arc.ilabel, arc.olabel, arc.weight
            )?;
        }
        Ok(())
    }
}

/// Check the start/final convention shared by both loaders.
fn check_header(num_states: i64, start: StateId, final_state: StateId) -> Result<()> {
    if num_states < 1 || num_states > StateId::MAX as i64 {
        return Err(SioError::Format(format!("invalid state count {}", num_states)));
    }
    if start != START_STATE {
        return Err(SioError::Format(format!(
            "start state must be {}, found {}",
            START_STATE, start
        )));
    }
    if i64::from(final_state) != num_states - 1 {
        return Err(SioError::Format(format!(
            "final state must be {}, found {}",
            num_states - 1,
            final_state
        )));
    }
    Ok(())
}

/// Sort arcs by `(src, dst)` and derive the CSR offsets.
fn build(num_states: i64, start: StateId, final_state: StateId, mut arcs: Vec<Arc>) -> Result<Fsm> {
    check_header(num_states, start, final_state)?;
    if ArcId::try_from(arcs.len()).is_err() {
        return Err(SioError::Format(format!("too many arcs: {}", arcs.len())));
    }

    let n = num_states as usize;
    let mut num_arcs_of_state = vec![0usize; n];
    for arc in &arcs {
        for (what, s) in [("source", arc.src), ("destination", arc.dst)] {
            if s < 0 || s as usize >= n {
                return Err(SioError::Format(format!(
                    "arc {} state {} out of range [0, {})",
                    what, s, n
                )));
            }
        }
        num_arcs_of_state[arc.src as usize] += 1;
    }

    arcs.sort_by_key(|arc| (arc.src, arc.dst));

    // states[s].arcs_begin = number of arcs leaving states [0, s)
    let mut states = Vec::with_capacity(n + 1);
    let mut offset = 0usize;
    for count in num_arcs_of_state {
        states.push(State {
            arcs_begin: offset as ArcId,
        });
        offset += count;
    }
    states.push(State {
        arcs_begin: offset as ArcId,
    });

    Ok(Fsm {
        start_state: start,
        final_state,
        states,
        arcs,
    })
}
