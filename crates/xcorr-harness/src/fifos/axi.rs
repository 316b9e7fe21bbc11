//! Hardware FIFO channel over memory-mapped registers.

use crate::error::Result;
use crate::fifo::StreamFifo;
use crate::mmio::MappedRegion;
use xcorr_fifo::regs::fifo as regs;

/// The Xilinx AXI4-Stream FIFO bridging the PS to the accelerator.
#[derive(Debug)]
pub struct AxiFifo {
    regs: MappedRegion,
}

impl AxiFifo {
    /// Map the FIFO block at its deployed base address.
    ///
    /// Bring-up ([`crate::setup`]) must have run first; mapping a held-in-
    /// reset PL region reads garbage.
    ///
    /// # Errors
    ///
    /// Returns [`crate::XcorrError::ResourceUnavailable`] if `/dev/mem`
    /// cannot be mapped.
    pub fn map() -> Result<Self> {
        Ok(Self {
            regs: MappedRegion::map_page(regs::BASE_ADDR)?,
        })
    }

    /// Wrap an already-mapped register window (tests, alternate bases).
    pub fn from_region(regs: MappedRegion) -> Self {
        Self { regs }
    }
}

impl StreamFifo for AxiFifo {
    fn push(&mut self, word: u32) {
        self.regs.write32(regs::TDFD, word);
    }

    fn commit(&mut self, byte_len: u32) {
        self.regs.write32(regs::TLR, byte_len);
        // Priming read: settles the vacancy register after the length
        // write.
        let _ = self.regs.read32(regs::TDFV);
    }

    fn tx_vacancy(&self) -> u32 {
        self.regs.read32(regs::TDFV)
    }

    fn tx_complete(&self) -> bool {
        self.regs.read32(regs::ISR) & regs::isr::TRANSMIT_COMPLETE != 0
    }

    fn clear_tx_complete(&mut self) {
        self.regs.write32(regs::ISR, regs::isr::TRANSMIT_COMPLETE);
    }

    fn rx_occupancy(&self) -> u32 {
        self.regs.read32(regs::RDFO)
    }

    fn pop(&mut self) -> u32 {
        self.regs.read32(regs::RDFD)
    }

    /// Reset both stream paths and re-arm interrupt flags.
    ///
    /// The exact register sequence the deployed harness uses; the
    /// interleaved reads are part of the hardware's reset handshake.
    fn soft_reset(&mut self) {
        self.regs.write32(regs::SSR, regs::SSR_RESET_KEY);
        self.regs.write32(regs::ISR, regs::isr::CLEAR_ALL);
        let _ = self.regs.read32(regs::ISR);
        let _ = self.regs.read32(regs::IER);
        self.regs.write32(regs::IER, regs::IER_DEFAULT);
        self.regs.write32(regs::TDR, regs::TDR_DEFAULT);
        let _ = self.regs.read32(regs::RDFO);
        let _ = self.regs.read32(regs::TDFV);
        tracing::debug!("stream FIFO reset");
    }
}
