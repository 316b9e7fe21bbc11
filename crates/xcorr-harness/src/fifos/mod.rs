//! [`StreamFifo`](crate::fifo::StreamFifo) implementations.
//!
//! - [`AxiFifo`]: the real AXI4-Stream FIFO over `/dev/mem` MMIO.
//! - [`SimFifo`]: software model of the accelerator for CI and
//!   algorithm validation without a board.

mod axi;
mod sim;

pub use axi::AxiFifo;
pub use sim::SimFifo;
