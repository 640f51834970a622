//! Flat runtime form of the automaton.
//!
//! Everything lives in one owned byte buffer of little-endian `u32` fields:
//!
//! ```text
//! header       buf_len, root_goto_ofst, states_ofst_ofst,
//!              first_state_ofst, root_goto_num, state_num
//! root goto    256 one-byte kid ids (omitted when the root has 256 kids)
//! state index  state_num offsets, one per state id
//! states       first_kid, depth, output, match_depth, fail_link, goto_num,
//!              then goto_num sorted input bytes, padded to 4 bytes
//! ```
//!
//! States are numbered breadth-first with siblings in input order, so the
//! kids of a state have consecutive ids and the kid for the `i`-th input
//! byte is `first_kid + i`.

use crate::AhoCorasickError;
use crate::slow::{ROOT, SlowAutomaton};

const FIELD: usize = 4;

const HDR_BUF_LEN: usize = 0;
const HDR_ROOT_GOTO_OFST: usize = 4;
const HDR_STATES_OFST_OFST: usize = 8;
const HDR_FIRST_STATE_OFST: usize = 12;
const HDR_ROOT_GOTO_NUM: usize = 16;
const HDR_STATE_NUM: usize = 20;
const HEADER_LEN: usize = 24;

const ROOT_GOTO_LEN: usize = 256;

const ST_FIRST_KID: usize = 0;
const ST_DEPTH: usize = 4;
const ST_OUTPUT: usize = 8;
const ST_MATCH_DEPTH: usize = 12;
const ST_FAIL_LINK: usize = 16;
const ST_GOTO_NUM: usize = 20;
const STATE_HEADER_LEN: usize = 24;

// Past this many kids the input bytes are binary searched.
const LINEAR_SEARCH_MAX: usize = 8;

pub(crate) type FastStateId = u32;

pub(crate) const FAST_ROOT: FastStateId = 0;

fn align(n: usize) -> usize {
    (n + FIELD - 1) & !(FIELD - 1)
}

fn state_size(goto_num: usize) -> usize {
    STATE_HEADER_LEN + align(goto_num)
}

fn put_u32(buf: &mut [u8], ofst: usize, value: usize) {
    // Every value is bounded by the buffer length, checked against u32 up front.
    buf[ofst..ofst + FIELD].copy_from_slice(&(value as u32).to_le_bytes());
}

#[derive(Debug, Clone)]
pub(crate) struct FastAutomaton {
    buf: Vec<u8>,
}

impl FastAutomaton {
    pub(crate) fn convert(slow: &SlowAutomaton) -> Result<Self, AhoCorasickError> {
        let states = slow.states();
        let root_fanout = slow.root().goto.len();
        let full_root = root_fanout == ROOT_GOTO_LEN;

        // Breadth-first renumbering: order[new_id] = old_id.
        let mut order = vec![ROOT];
        let mut new_id = vec![0; states.len()];
        let mut first_kid = vec![0; states.len()];
        let mut i = 0;
        while i < order.len() {
            first_kid[i] = order.len();
            for &kid in states[order[i]].goto.values() {
                new_id[kid] = order.len();
                order.push(kid);
            }
            i += 1;
        }

        let root_goto_ofst = if full_root { 0 } else { HEADER_LEN };
        let states_ofst_ofst = align(HEADER_LEN + if full_root { 0 } else { ROOT_GOTO_LEN });
        let first_state_ofst = states_ofst_ofst + FIELD * states.len();
        let buf_len = first_state_ofst
            + states
                .iter()
                .map(|s| state_size(s.goto.len()))
                .sum::<usize>();
        if u32::try_from(buf_len).is_err() {
            return Err(AhoCorasickError::TooLarge { bytes: buf_len });
        }

        let mut buf = vec![0u8; buf_len];
        put_u32(&mut buf, HDR_BUF_LEN, buf_len);
        put_u32(&mut buf, HDR_ROOT_GOTO_OFST, root_goto_ofst);
        put_u32(&mut buf, HDR_STATES_OFST_OFST, states_ofst_ofst);
        put_u32(&mut buf, HDR_FIRST_STATE_OFST, first_state_ofst);
        put_u32(&mut buf, HDR_ROOT_GOTO_NUM, root_fanout);
        put_u32(&mut buf, HDR_STATE_NUM, states.len());

        if !full_root {
            for (&byte, &kid) in &slow.root().goto {
                // Root kids are numbered 1..=255 here, so they fit a byte.
                buf[root_goto_ofst + byte as usize] = new_id[kid] as u8;
            }
        }

        let mut ofst = first_state_ofst;
        for (id, &old) in order.iter().enumerate() {
            let state = &states[old];
            put_u32(&mut buf, states_ofst_ofst + FIELD * id, ofst);
            put_u32(&mut buf, ofst + ST_FIRST_KID, first_kid[id]);
            put_u32(&mut buf, ofst + ST_DEPTH, state.depth);
            let (output, match_depth) = state
                .output
                .map_or((0, 0), |o| (o.pattern_idx + 1, o.depth));
            put_u32(&mut buf, ofst + ST_OUTPUT, output);
            put_u32(&mut buf, ofst + ST_MATCH_DEPTH, match_depth);
            put_u32(&mut buf, ofst + ST_FAIL_LINK, new_id[state.fail_link]);
            put_u32(&mut buf, ofst + ST_GOTO_NUM, state.goto.len());
            for (k, &byte) in state.goto.keys().enumerate() {
                buf[ofst + STATE_HEADER_LEN + k] = byte;
            }
            ofst += state_size(state.goto.len());
        }
        debug_assert_eq!(ofst, buf_len);

        Ok(Self { buf })
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    fn read_u32(&self, ofst: usize) -> u32 {
        let bytes = self.buf.get(ofst..ofst + FIELD);
        debug_assert!(
            bytes.is_some(),
            "field at {ofst} is outside the {}-byte automaton",
            self.buf.len()
        );
        bytes
            .and_then(|b| b.try_into().ok())
            .map_or(0, u32::from_le_bytes)
    }

    pub(crate) fn state_num(&self) -> usize {
        self.read_u32(HDR_STATE_NUM) as usize
    }

    pub(crate) fn root_goto_num(&self) -> usize {
        self.read_u32(HDR_ROOT_GOTO_NUM) as usize
    }

    fn state_ofst(&self, state: FastStateId) -> usize {
        let index = self.read_u32(HDR_STATES_OFST_OFST) as usize;
        self.read_u32(index + FIELD * state as usize) as usize
    }

    fn field(&self, state: FastStateId, field: usize) -> u32 {
        self.read_u32(self.state_ofst(state) + field)
    }

    pub(crate) fn depth(&self, state: FastStateId) -> usize {
        self.field(state, ST_DEPTH) as usize
    }

    pub(crate) fn fail_link(&self, state: FastStateId) -> FastStateId {
        self.field(state, ST_FAIL_LINK)
    }

    /// `(pattern_idx, match_depth)` reported on reaching `state`.
    pub(crate) fn output(&self, state: FastStateId) -> Option<(usize, usize)> {
        match self.field(state, ST_OUTPUT) {
            0 => None,
            p => Some((p as usize - 1, self.field(state, ST_MATCH_DEPTH) as usize)),
        }
    }

    fn inputs(&self, state: FastStateId) -> &[u8] {
        let ofst = self.state_ofst(state);
        let num = self.read_u32(ofst + ST_GOTO_NUM) as usize;
        let first = ofst + STATE_HEADER_LEN;
        let inputs = self.buf.get(first..first + num);
        debug_assert!(inputs.is_some(), "inputs of state {state} overrun the automaton");
        inputs.unwrap_or(&[])
    }

    fn root_goto(&self, byte: u8) -> FastStateId {
        match self.read_u32(HDR_ROOT_GOTO_OFST) as usize {
            0 => byte as FastStateId + 1,
            table => self.buf.get(table + byte as usize).copied().unwrap_or(0) as FastStateId,
        }
    }

    /// Kid of a non-root `state` on `byte`.
    pub(crate) fn goto(&self, state: FastStateId, byte: u8) -> Option<FastStateId> {
        let inputs = self.inputs(state);
        let index = if inputs.len() <= LINEAR_SEARCH_MAX {
            inputs.iter().position(|&b| b == byte)
        } else {
            inputs.binary_search(&byte).ok()
        }?;
        Some(self.field(state, ST_FIRST_KID) + index as FastStateId)
    }

    /// One automaton step, following failure links on a miss.
    pub(crate) fn next_state(&self, mut state: FastStateId, byte: u8) -> FastStateId {
        loop {
            if state == FAST_ROOT {
                return self.root_goto(byte);
            }
            if let Some(kid) = self.goto(state, byte) {
                return kid;
            }
            state = self.fail_link(state);
        }
    }
}
