//! Register-level FIFO channel abstraction.
//!
//! The framing protocol and the polling engine are written against this
//! trait so they run unchanged over the real AXI-Stream FIFO
//! ([`crate::fifos::AxiFifo`]) and the software device model
//! ([`crate::fifos::SimFifo`]).

use std::fmt::Debug;

/// Minimal register operations of the accelerator's FIFO channel.
///
/// The methods map one-to-one onto the AXI4-Stream FIFO register set; an
/// implementation is a thin veneer over those registers, with no protocol
/// knowledge. All waiting lives in [`crate::poll::Poller`], all framing in
/// [`crate::frame::XcorrLink`].
pub trait StreamFifo: Debug {
    /// Push one word into the transmit FIFO (TDFD).
    fn push(&mut self, word: u32);

    /// Commit the staged frame by writing its byte length (TLR).
    ///
    /// This is the single point where a transmit is finalized; the caller
    /// guarantees `byte_len` equals 4 times the words pushed since the
    /// previous commit.
    fn commit(&mut self, byte_len: u32);

    /// Free word slots in the transmit FIFO (TDFV).
    fn tx_vacancy(&self) -> u32;

    /// Whether the transmit-complete status bit is set (ISR.TC).
    fn tx_complete(&self) -> bool;

    /// Clear the transmit-complete bit (write-one-to-clear).
    fn clear_tx_complete(&mut self);

    /// Words currently available in the receive FIFO (RDFO).
    fn rx_occupancy(&self) -> u32;

    /// Pop one word from the receive FIFO (RDFD).
    fn pop(&mut self) -> u32;

    /// Reset both stream paths and re-arm the channel.
    fn soft_reset(&mut self);
}
