//! Text graph format.
//!
//! ```text
//! num_states,num_arcs,start_state,final_state
//! src dst ilabel[:olabel] weight
//! ```
//!
//! Arc lines may come in any order; an omitted `olabel` equals `ilabel`.

use std::io::BufRead;
use std::str::FromStr;

use super::{build, Arc, Fsm, LabelId, StateId, Weight};
use crate::error::{Result, SioError};

pub(super) fn decode<R: BufRead>(reader: R) -> Result<Fsm> {
    let mut lines = reader.lines();

    let header = match lines.next() {
        Some(line) => line?,
        None => return Err(SioError::Format("missing header line".to_string())),
    };
    let cols: Vec<&str> = header
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();
    if cols.len() != 4 {
        return Err(SioError::Format(format!(
            "header must be `num_states,num_arcs,start,final`, found {:?}",
            header
        )));
    }
    let num_states: i64 = parse(cols[0], "num_states", 1)?;
    let num_arcs: i64 = parse(cols[1], "num_arcs", 1)?;
    let start: StateId = parse(cols[2], "start_state", 1)?;
    let final_state: StateId = parse(cols[3], "final_state", 1)?;
    if num_arcs < 0 {
        return Err(SioError::Format(format!("invalid arc count {}", num_arcs)));
    }

    let mut arcs = Vec::with_capacity(num_arcs.min(1 << 20) as usize);
    for (i, line) in lines.enumerate() {
        let line = line?;
        let lineno = i + 2;
        if line.trim().is_empty() {
            continue;
        }
        if arcs.len() as i64 == num_arcs {
            return Err(SioError::Format(format!(
                "line {}: more arc lines than the {} declared",
                lineno, num_arcs
            )));
        }
        arcs.push(parse_arc(&line, lineno)?);
    }

    if arcs.len() as i64 != num_arcs {
        return Err(SioError::Format(format!(
            "expected {} arc lines, found {}",
            num_arcs,
            arcs.len()
        )));
    }

    build(num_states, start, final_state, arcs)
}

fn parse_arc(line: &str, lineno: usize) -> Result<Arc> {
    let cols: Vec<&str> = line.split_whitespace().collect();
    if cols.len() != 4 {
        return Err(SioError::Format(format!(
            "line {}: expected `src dst ilabel[:olabel] weight`, found {} columns",
            lineno,
            cols.len()
        )));
    }

    let labels: Vec<&str> = cols[2].split(':').collect();
    let (ilabel, olabel): (LabelId, LabelId) = match labels[..] {
        [i] => {
            let i = parse(i, "ilabel", lineno)?;
            (i, i)
        }
        [i, o] => (parse(i, "ilabel", lineno)?, parse(o, "olabel", lineno)?),
        _ => {
            return Err(SioError::Format(format!(
                "line {}: bad label field {:?}",
                lineno, cols[2]
            )))
        }
    };

    Ok(Arc {
        src: parse(cols[0], "src", lineno)?,
        dst: parse(cols[1], "dst", lineno)?,
        ilabel,
        olabel,
        weight: parse::<Weight>(cols[3], "weight", lineno)?,
    })
}

fn parse<T: FromStr>(s: &str, what: &str, lineno: usize) -> Result<T> {
    s.parse()
        .map_err(|_| SioError::Format(format!("line {}: invalid {} {:?}", lineno, what, s)))
}
