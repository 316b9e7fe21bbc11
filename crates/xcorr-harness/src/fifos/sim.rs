// SPDX-License-Identifier: AGPL-3.0-only

//! Software model of the cross-correlation accelerator.
//!
//! Implements [`StreamFifo`] in pure CPU arithmetic so the whole harness
//! runs without a board. The model consumes committed word streams with
//! the same device-side state machine the hardware uses:
//!
//! ```text
//! ExpectResultLen -> ExpectALen -> ReadA -> ExpectVLen -> ReadV -+
//!                        ^  |                                    |
//!                        |  +-- word 0: flush result, restart    |
//!                        +---------- accumulate xcorr -----------+
//! ```
//!
//! Each A/V pair adds its quantized cross-correlation into the
//! accumulator; a zero length word flushes `result_len` encoded words
//! into the read queue. Lane quantization and output encoding mirror the
//! wire formats exactly, so harness-side decode round-trips within one
//! output LSB.

use crate::codec::{decode_sample, unpack_word};
use crate::fifo::StreamFifo;
use std::cell::Cell;
use std::collections::VecDeque;
use xcorr_fifo::FixedFormat;

/// Transmit buffer depth of the modeled FIFO, in words.
const TX_DEPTH: u32 = 512;

#[derive(Debug, Clone, Copy)]
enum ParseState {
    ExpectResultLen,
    ExpectALen,
    ReadA { left: usize },
    ExpectVLen,
    ReadV { left: usize },
}

/// Virtual accelerator behind a register-accurate FIFO front.
#[derive(Debug)]
pub struct SimFifo {
    format: FixedFormat,
    staged: Vec<u32>,
    rx: VecDeque<u32>,
    state: ParseState,
    result_len: usize,
    acc: Vec<f32>,
    a: Vec<f32>,
    v: Vec<f32>,
    tx_complete: bool,
    /// Polls of the occupancy register before a flushed response becomes
    /// visible; models the device producing output at its own pace.
    response_delay: u32,
    delay_left: Cell<u32>,
}

impl SimFifo {
    /// Create a model producing output in the given format.
    pub fn new(format: FixedFormat) -> Self {
        Self {
            format,
            staged: Vec::new(),
            rx: VecDeque::new(),
            state: ParseState::ExpectResultLen,
            result_len: 0,
            acc: Vec::new(),
            a: Vec::new(),
            v: Vec::new(),
            tx_complete: false,
            response_delay: 0,
            delay_left: Cell::new(0),
        }
    }

    /// Delay responses by `polls` occupancy reads after each flush.
    #[must_use]
    pub fn with_response_delay(mut self, polls: u32) -> Self {
        self.response_delay = polls;
        self
    }

    /// Quantized cross-correlation of the current A/V pair, accumulated
    /// at lags 1..result_len (slot 0 stays reserved).
    fn accumulate(&mut self) {
        for k in 1..self.result_len {
            let mut sum = 0.0f32;
            for (i, &vi) in self.v.iter().enumerate() {
                if let Some(&ai) = self.a.get(i + k - 1) {
                    sum += ai * vi;
                }
            }
            self.acc[k] += sum;
        }
    }

    /// Emit the accumulated result into the read queue and reset.
    #[allow(clippy::cast_possible_truncation)]
    fn flush(&mut self) {
        let divisor = self.format.output_divisor();
        for &value in &self.acc {
            let word = ((value * divisor).floor() as i64) as i32 as u32;
            self.rx.push_back(word);
        }
        tracing::debug!("sim: flushed {} result words", self.acc.len());
        self.acc.clear();
        self.delay_left.set(self.response_delay);
    }

    fn consume(&mut self, word: u32) {
        self.state = match self.state {
            ParseState::ExpectResultLen => {
                self.result_len = word as usize;
                self.acc = vec![0.0; self.result_len];
                ParseState::ExpectALen
            }
            ParseState::ExpectALen => {
                if word == 0 {
                    self.flush();
                    ParseState::ExpectResultLen
                } else {
                    self.a.clear();
                    ParseState::ReadA {
                        left: (word as usize) / 4,
                    }
                }
            }
            ParseState::ReadA { left } => {
                for lane in unpack_word(word) {
                    self.a.push(decode_sample(lane));
                }
                if left == 1 {
                    ParseState::ExpectVLen
                } else {
                    ParseState::ReadA { left: left - 1 }
                }
            }
            ParseState::ExpectVLen => {
                self.v.clear();
                ParseState::ReadV {
                    left: (word as usize) / 4,
                }
            }
            ParseState::ReadV { left } => {
                for lane in unpack_word(word) {
                    self.v.push(decode_sample(lane));
                }
                if left == 1 {
                    self.accumulate();
                    ParseState::ExpectALen
                } else {
                    ParseState::ReadV { left: left - 1 }
                }
            }
        };
    }
}

impl StreamFifo for SimFifo {
    fn push(&mut self, word: u32) {
        self.staged.push(word);
    }

    fn commit(&mut self, byte_len: u32) {
        let staged_bytes = u32::try_from(self.staged.len()).expect("staged fits u32") * 4;
        if byte_len != staged_bytes {
            tracing::warn!("sim: commit of {byte_len} bytes but {staged_bytes} staged");
        }
        for word in std::mem::take(&mut self.staged) {
            self.consume(word);
        }
        self.tx_complete = true;
    }

    fn tx_vacancy(&self) -> u32 {
        TX_DEPTH.saturating_sub(u32::try_from(self.staged.len()).expect("staged fits u32"))
    }

    fn tx_complete(&self) -> bool {
        self.tx_complete
    }

    fn clear_tx_complete(&mut self) {
        self.tx_complete = false;
    }

    fn rx_occupancy(&self) -> u32 {
        let left = self.delay_left.get();
        if left > 0 {
            self.delay_left.set(left - 1);
            return 0;
        }
        u32::try_from(self.rx.len()).expect("read queue fits u32")
    }

    fn pop(&mut self) -> u32 {
        self.rx.pop_front().unwrap_or_else(|| {
            tracing::warn!("sim: pop from empty read FIFO");
            0
        })
    }

    fn soft_reset(&mut self) {
        self.staged.clear();
        self.rx.clear();
        self.state = ParseState::ExpectResultLen;
        self.result_len = 0;
        self.acc.clear();
        self.a.clear();
        self.v.clear();
        self.tx_complete = false;
        self.delay_left.set(0);
    }
}
