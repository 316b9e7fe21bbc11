//! Register maps for the Zynq deployment of the xcorr accelerator.
//!
//! Two memory-mapped regions are involved:
//!
//! 1. The Xilinx AXI4-Stream FIFO (PG080) bridging the PS to the
//!    accelerator's AXI-Stream ports, at [`fifo::BASE_ADDR`].
//! 2. The Zynq-7000 SLCR block used once at bring-up to enable
//!    `fclk_clk0` and pulse the PL reset, at [`slcr::BASE_ADDR`].
//!
//! Offsets are byte offsets from the region base. All registers are
//! 32 bits wide.

/// Size of one mapped page; both regions fit in a single page.
pub const MAP_PAGE_SIZE: usize = 4096;

/// AXI4-Stream FIFO register block (Xilinx PG080).
pub mod fifo {
    /// Physical base address of the FIFO block in the PL.
    pub const BASE_ADDR: u64 = 0x43C0_0000;

    /// Interrupt status register (write-one-to-clear).
    pub const ISR: usize = 0x0000;
    /// Interrupt enable register.
    pub const IER: usize = 0x0004;
    /// Transmit data FIFO reset.
    pub const TDFR: usize = 0x0008;
    /// Transmit data FIFO vacancy, in words.
    pub const TDFV: usize = 0x000C;
    /// Transmit data FIFO data (push port).
    pub const TDFD: usize = 0x0010;
    /// Transmit length register; writing the byte count launches the frame.
    pub const TLR: usize = 0x0014;
    /// Receive data FIFO reset.
    pub const RDFR: usize = 0x0018;
    /// Receive data FIFO occupancy, in words.
    pub const RDFO: usize = 0x001C;
    /// Receive data FIFO data (pop port).
    pub const RDFD: usize = 0x0020;
    /// Receive length register.
    pub const RLR: usize = 0x0024;
    /// AXI4-Stream reset; write [`SSR_RESET_KEY`] to reset both paths.
    pub const SSR: usize = 0x0028;
    /// Transmit destination register.
    pub const TDR: usize = 0x002C;
    /// Receive destination register.
    pub const RDR: usize = 0x0030;

    /// Key written to [`SSR`] to trigger the stream reset.
    pub const SSR_RESET_KEY: u32 = 0xA5;

    /// Interrupt-enable mask armed at reset (TC + RC).
    pub const IER_DEFAULT: u32 = 0x0C00_0000;

    /// Transmit destination used by the accelerator's stream switch.
    pub const TDR_DEFAULT: u32 = 0x02;

    /// ISR bit definitions.
    pub mod isr {
        /// Transmit complete, set when the committed frame has drained.
        pub const TRANSMIT_COMPLETE: u32 = 1 << 27;
        /// Receive complete.
        pub const RECEIVE_COMPLETE: u32 = 1 << 26;
        /// Clear-everything mask for the reset sequence.
        pub const CLEAR_ALL: u32 = 0xFFFF_FFFF;
    }
}

/// Zynq-7000 System Level Control Registers (bring-up only).
pub mod slcr {
    /// Physical base address of the SLCR block.
    pub const BASE_ADDR: u64 = 0xF800_0000;

    /// SLCR write-protect lock.
    pub const LOCK: usize = 0x0004;
    /// SLCR write-protect unlock.
    pub const UNLOCK: usize = 0x0008;
    /// FPGA clock 0 throttle count; zero for free-running fclk_clk0.
    pub const FPGA0_THR_CNT: usize = 0x0178;
    /// FPGA reset control; bit 0 resets PL region 0.
    pub const FPGA_RST_CTRL: usize = 0x0240;

    /// Magic value enabling SLCR writes.
    pub const UNLOCK_KEY: u32 = 0xDF0D;
    /// Magic value re-protecting the SLCR.
    pub const LOCK_KEY: u32 = 0x767B;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_offsets_match_pg080() {
        assert_eq!(fifo::ISR, 0x0000);
        assert_eq!(fifo::TDFD, 0x0010);
        assert_eq!(fifo::TLR, 0x0014);
        assert_eq!(fifo::RDFO, 0x001C);
        assert_eq!(fifo::RDFD, 0x0020);
        assert_eq!(fifo::SSR, 0x0028);
    }

    #[test]
    fn regions_fit_one_page() {
        assert!(fifo::RDR + 4 <= MAP_PAGE_SIZE);
        assert!(slcr::FPGA_RST_CTRL + 4 <= MAP_PAGE_SIZE);
    }

    #[test]
    fn transmit_complete_bit() {
        assert_eq!(fifo::isr::TRANSMIT_COMPLETE, 0x0800_0000);
    }
}
