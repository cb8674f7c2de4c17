//! Binary graph codec.
//!
//! Layout, Kaldi style: each section starts with a token (ASCII followed by one
//! space). Scalars are a one-byte width marker followed by the little-endian
//! value. Record arrays are written field by field with no marker:
//!
//! ```text
//! <Fsm>
//! <NumStates> i64
//! <NumArcs>   i64
//! <Start>     i32
//! <Final>     i32
//! <States>    (NumStates + 1) x { arcs_begin: i32 }
//! <Arcs>      NumArcs x { src: i32, dst: i32, ilabel: i32, olabel: i32, weight: f32 }
//! ```
//!
//! There is no version or endianness tag in the format.

use std::io::{self, Read, Write};

use bytes::{Buf, BufMut, BytesMut};

use super::{check_header, Arc, ArcId, Fsm, State, StateId};
use crate::constants::fsm::{
    ARC_RECORD_BYTES, STATE_RECORD_BYTES, TOKEN_ARCS, TOKEN_FINAL, TOKEN_FSM, TOKEN_NUM_ARCS,
    TOKEN_NUM_STATES, TOKEN_START, TOKEN_STATES,
};
use crate::error::{Result, SioError};

/// Longest token we are willing to scan before declaring the stream corrupt.
const MAX_TOKEN_LEN: usize = 64;

pub(super) fn encode<W: Write>(fsm: &Fsm, mut writer: W) -> Result<()> {
    let num_states = fsm.num_states();
    let num_arcs = fsm.num_arcs();

    let mut buf = BytesMut::with_capacity(
        128 + fsm.states.len() * STATE_RECORD_BYTES + fsm.arcs.len() * ARC_RECORD_BYTES,
    );

    put_token(&mut buf, TOKEN_FSM);
    put_token(&mut buf, TOKEN_NUM_STATES);
    put_i64(&mut buf, num_states);
    put_token(&mut buf, TOKEN_NUM_ARCS);
    put_i64(&mut buf, num_arcs);
    put_token(&mut buf, TOKEN_START);
    put_i32(&mut buf, fsm.start());
    put_token(&mut buf, TOKEN_FINAL);
    put_i32(&mut buf, fsm.final_state());

    put_token(&mut buf, TOKEN_STATES);
    for state in &fsm.states {
        buf.put_i32_le(state.arcs_begin);
    }

    put_token(&mut buf, TOKEN_ARCS);
    for arc in &fsm.arcs {
        buf.put_i32_le(arc.src);
        buf.put_i32_le(arc.dst);
        buf.put_i32_le(arc.ilabel);
        buf.put_i32_le(arc.olabel);
        buf.put_f32_le(arc.weight);
    }

    writer.write_all(&buf)?;
    writer.flush()?;
    Ok(())
}

pub(super) fn decode<R: Read>(mut reader: R) -> Result<Fsm> {
    expect_token(&mut reader, TOKEN_FSM)?;

    expect_token(&mut reader, TOKEN_NUM_STATES)?;
    let num_states = read_i64(&mut reader)?;

    expect_token(&mut reader, TOKEN_NUM_ARCS)?;
    let num_arcs = read_i64(&mut reader)?;

    expect_token(&mut reader, TOKEN_START)?;
    let start_state = read_i32(&mut reader)?;

    expect_token(&mut reader, TOKEN_FINAL)?;
    let final_state = read_i32(&mut reader)?;

    check_header(num_states, start_state, final_state)?;
    if num_arcs < 0 || num_arcs > ArcId::MAX as i64 {
        return Err(SioError::Format(format!("invalid arc count {}", num_arcs)));
    }
    let num_states = num_states as usize;
    let num_arcs = num_arcs as usize;

    expect_token(&mut reader, TOKEN_STATES)?;
    let raw = read_records(&mut reader, num_states + 1, STATE_RECORD_BYTES, "states")?;
    let mut cur = &raw[..];
    let mut states = Vec::with_capacity(num_states + 1);
    while cur.has_remaining() {
        states.push(State {
            arcs_begin: cur.get_i32_le(),
        });
    }

    expect_token(&mut reader, TOKEN_ARCS)?;
    let raw = read_records(&mut reader, num_arcs, ARC_RECORD_BYTES, "arcs")?;
    let mut cur = &raw[..];
    let mut arcs = Vec::with_capacity(num_arcs);
    while cur.has_remaining() {
        arcs.push(Arc {
            src: cur.get_i32_le(),
            dst: cur.get_i32_le(),
            ilabel: cur.get_i32_le(),
            olabel: cur.get_i32_le(),
            weight: cur.get_f32_le(),
        });
    }

    check_offsets(&states, &arcs)?;

    Ok(Fsm {
        start_state,
        final_state,
        states,
        arcs,
    })
}

/// Offsets start at 0, never decrease, close at `num_arcs`, and every arc sits
/// in the row of its source state with an in-range destination.
fn check_offsets(states: &[State], arcs: &[Arc]) -> Result<()> {
    let num_states = states.len() - 1;
    if states[0].arcs_begin != 0 || states[num_states].arcs_begin as usize != arcs.len() {
        return Err(SioError::Format(format!(
            "state offsets must span [0, {}]",
            arcs.len()
        )));
    }

    // All offsets are checked before any row is sliced.
    for (s, row) in states.windows(2).enumerate() {
        if row[0].arcs_begin > row[1].arcs_begin {
            return Err(SioError::Format(format!(
                "state {} offsets decrease: {} > {}",
                s, row[0].arcs_begin, row[1].arcs_begin
            )));
        }
    }

    for (s, row) in states.windows(2).enumerate() {
        let range = row[0].arcs_begin as usize..row[1].arcs_begin as usize;
        for arc in &arcs[range] {
            if arc.src != s as StateId {
                return Err(SioError::Format(format!(
                    "arc from state {} stored in row of state {}",
                    arc.src, s
                )));
            }
            if arc.dst < 0 || arc.dst as usize >= num_states {
                return Err(SioError::Format(format!(
                    "arc destination {} out of range [0, {})",
                    arc.dst, num_states
                )));
            }
        }
    }
    Ok(())
}

fn put_token(buf: &mut BytesMut, token: &str) {
    buf.put_slice(token.as_bytes());
    buf.put_u8(b' ');
}

fn put_i64(buf: &mut BytesMut, v: i64) {
    buf.put_i8(std::mem::size_of::<i64>() as i8);
    buf.put_i64_le(v);
}

fn put_i32(buf: &mut BytesMut, v: i32) {
    buf.put_i8(std::mem::size_of::<i32>() as i8);
    buf.put_i32_le(v);
}

fn read_byte<R: Read>(reader: &mut R) -> Result<u8> {
    let mut b = [0u8; 1];
    reader.read_exact(&mut b).map_err(eof_as_format)?;
    Ok(b[0])
}

/// Skip leading whitespace, read one token, and consume the single space after it.
fn expect_token<R: Read>(reader: &mut R, expected: &str) -> Result<()> {
    let mut b = read_byte(reader)?;
    while b.is_ascii_whitespace() {
        b = read_byte(reader)?;
    }

    let mut token = Vec::with_capacity(expected.len());
    while !b.is_ascii_whitespace() {
        token.push(b);
        if token.len() > MAX_TOKEN_LEN {
            break;
        }
        b = read_byte(reader)?;
    }

    if token != expected.as_bytes() {
        return Err(SioError::Format(format!(
            "expected token {}, found {:?}",
            expected,
            String::from_utf8_lossy(&token)
        )));
    }
    Ok(())
}

fn read_width<R: Read>(reader: &mut R, width: usize) -> Result<()> {
    let marker = read_byte(reader)? as i8;
    if marker as isize != width as isize {
        return Err(SioError::Format(format!(
            "expected {}-byte signed integer, found width marker {}",
            width, marker
        )));
    }
    Ok(())
}

fn read_i64<R: Read>(reader: &mut R) -> Result<i64> {
    read_width(reader, 8)?;
    let mut b = [0u8; 8];
    reader.read_exact(&mut b).map_err(eof_as_format)?;
    Ok(i64::from_le_bytes(b))
}

fn read_i32<R: Read>(reader: &mut R) -> Result<i32> {
    read_width(reader, 4)?;
    let mut b = [0u8; 4];
    reader.read_exact(&mut b).map_err(eof_as_format)?;
    Ok(i32::from_le_bytes(b))
}

fn read_records<R: Read>(reader: &mut R, count: usize, size: usize, what: &str) -> Result<Vec<u8>> {
    let len = count
        .checked_mul(size)
        .ok_or_else(|| SioError::Format(format!("{} section too large", what)))?;

    // Grow as bytes arrive rather than trusting the header with one huge allocation.
    let mut raw = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut raw)?;
    if raw.len() != len {
        return Err(SioError::Format(format!(
            "truncated {} section: expected {} bytes, found {}",
            what,
            len,
            raw.len()
        )));
    }
    Ok(raw)
}

fn eof_as_format(e: io::Error) -> SioError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        SioError::Format("unexpected end of graph stream".to_string())
    } else {
        SioError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> Fsm {
        Fsm::from_arcs(
            4,
            vec![
                Arc::new(0, 1, 1, 1, 0.5),
                Arc::new(0, 2, 2, 7, -1.25),
                Arc::new(1, 3, 3, 3, 0.0),
                Arc::new(2, 3, 4, 0, f32::INFINITY),
            ],
        )
        .unwrap()
    }

    fn encoded(fsm: &Fsm) -> Vec<u8> {
        let mut out = Vec::new();
        encode(fsm, &mut out).unwrap();
        out
    }

    #[test]
    fn test_header_bytes() {
        let bytes = encoded(&sample());
        let mut expected = Vec::new();
        expected.extend_from_slice(b"<Fsm> <NumStates> ");
        expected.push(8);
        expected.extend_from_slice(&4i64.to_le_bytes());
        expected.extend_from_slice(b"<NumArcs> ");
        expected.push(8);
        expected.extend_from_slice(&4i64.to_le_bytes());
        expected.extend_from_slice(b"<Start> ");
        expected.push(4);
        expected.extend_from_slice(&0i32.to_le_bytes());
        expected.extend_from_slice(b"<Final> ");
        expected.push(4);
        expected.extend_from_slice(&3i32.to_le_bytes());
        expected.extend_from_slice(b"<States> ");
        assert_eq!(&bytes[..expected.len()], &expected[..]);

        let tail = b"<Arcs> ".len() + 4 * ARC_RECORD_BYTES;
        assert_eq!(bytes.len(), expected.len() + 5 * STATE_RECORD_BYTES + tail);
    }

    #[test]
    fn test_round_trip() {
        let fsm = sample();
        let decoded = decode(Cursor::new(encoded(&fsm))).unwrap();
        assert_eq!(decoded, fsm);
    }

    #[test]
    fn test_decode_consumes_only_the_graph() {
        let mut bytes = encoded(&sample());
        bytes.extend_from_slice(b"trailing");
        let mut cursor = Cursor::new(bytes);
        decode(&mut cursor).unwrap();
        let mut rest = String::new();
        cursor.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "trailing");
    }

    #[test]
    fn test_wrong_leading_token() {
        let mut bytes = encoded(&sample());
        bytes[1] = b'X';
        let err = decode(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, SioError::Format(_)));
    }

    #[test]
    fn test_truncated_stream() {
        let bytes = encoded(&sample());
        for cut in [3, 20, bytes.len() - 1] {
            let err = decode(Cursor::new(&bytes[..cut])).unwrap_err();
            assert!(matches!(err, SioError::Format(_)), "cut at {cut}: {err:?}");
        }
    }

    #[test]
    fn test_bad_final_state_rejected() {
        let mut bytes = encoded(&sample());
        let at = b"<Fsm> <NumStates> ".len() + 9 + b"<NumArcs> ".len() + 9 + b"<Start> ".len() + 5
            + b"<Final> ".len()
            + 1;
        bytes[at..at + 4].copy_from_slice(&2i32.to_le_bytes());
        let err = decode(Cursor::new(bytes)).unwrap_err();
        assert!(err.to_string().contains("final state"));
    }

    #[test]
    fn test_bad_width_marker_rejected() {
        let mut bytes = encoded(&sample());
        let at = b"<Fsm> <NumStates> ".len();
        bytes[at] = 4;
        assert!(decode(Cursor::new(bytes)).is_err());
    }

    #[test]
    fn test_misplaced_arc_rejected() {
        let fsm = sample();
        let mut bytes = encoded(&fsm);
        // Point the first arc's src at state 1 while it sits in row 0.
        let arcs_at = bytes.len() - 4 * ARC_RECORD_BYTES;
        bytes[arcs_at..arcs_at + 4].copy_from_slice(&1i32.to_le_bytes());
        let err = decode(Cursor::new(bytes)).unwrap_err();
        assert!(err.to_string().contains("row of state"));
    }

    #[test]
    fn test_offset_past_arc_count_rejected() {
        let fsm = Fsm::from_arcs(2, vec![Arc::new(0, 1, 1, 1, 0.0), Arc::new(0, 1, 2, 2, 0.0)])
            .unwrap();
        let mut bytes = encoded(&fsm);
        // Offsets become [0, 100, 2].
        let states_at = bytes.len() - 2 * ARC_RECORD_BYTES - b"<Arcs> ".len() - 3 * STATE_RECORD_BYTES;
        let row1 = states_at + STATE_RECORD_BYTES;
        bytes[row1..row1 + 4].copy_from_slice(&100i32.to_le_bytes());
        let err = decode(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, SioError::Format(_)), "{err:?}");
        assert!(err.to_string().contains("offsets decrease"));
    }

    #[test]
    fn test_negative_offset_rejected() {
        let fsm = Fsm::from_arcs(3, vec![Arc::new(0, 2, 1, 1, 0.0), Arc::new(1, 2, 2, 2, 0.0)])
            .unwrap();
        let mut bytes = encoded(&fsm);
        // Offsets become [0, -5, 1, 2].
        let states_at = bytes.len() - 2 * ARC_RECORD_BYTES - b"<Arcs> ".len() - 4 * STATE_RECORD_BYTES;
        let row1 = states_at + STATE_RECORD_BYTES;
        bytes[row1..row1 + 4].copy_from_slice(&(-5i32).to_le_bytes());
        let err = decode(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, SioError::Format(_)), "{err:?}");
    }
}
