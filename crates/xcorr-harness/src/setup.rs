//! Zynq PL bring-up for the accelerator.
//!
//! One-shot sequencing through the SLCR: enable the fabric clock feeding
//! the core, then pulse the PL reset. Must run before the first access
//! to the stream FIFO; a held-in-reset fabric hangs the AXI interconnect
//! on the first register read.

use crate::error::Result;
use crate::mmio::MappedRegion;
use xcorr_fifo::regs::slcr;

/// Handle on the SLCR block for bring-up sequencing.
#[derive(Debug)]
pub struct BringUp {
    slcr: MappedRegion,
}

impl BringUp {
    /// Map the SLCR block.
    ///
    /// # Errors
    ///
    /// Returns [`crate::XcorrError::ResourceUnavailable`] if `/dev/mem`
    /// cannot be mapped.
    pub fn map() -> Result<Self> {
        Ok(Self {
            slcr: MappedRegion::map_page(slcr::BASE_ADDR)?,
        })
    }

    /// Enable `fclk_clk0` and pulse the PL reset.
    ///
    /// The SLCR is write-protected; the unlock/lock pair brackets every
    /// mutation. Throttle count zero means a free-running clock.
    pub fn run(&mut self) {
        tracing::info!("bring-up: enabling fclk_clk0 and resetting PL");

        self.slcr.write32(slcr::FPGA0_THR_CNT, 0);

        self.slcr.write32(slcr::UNLOCK, slcr::UNLOCK_KEY);
        self.slcr.write32(slcr::FPGA_RST_CTRL, 1);
        self.slcr.write32(slcr::FPGA_RST_CTRL, 0);
        self.slcr.write32(slcr::LOCK, slcr::LOCK_KEY);
    }
}
