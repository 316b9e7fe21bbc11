//! Verification harness for the AXI-Stream FIFO cross-correlation
//! accelerator.
//!
//! The harness streams quantized test vectors to the core through a
//! memory-mapped AXI4-Stream FIFO, reads back its fixed-point output and
//! judges it against floating-point reference data under a relative
//! tolerance. The interface has no interrupts, so synchronization with
//! the independently-timed hardware is bounded-budget busy polling.
//!
//! # Layers
//!
//! ```text
//! session::Verifier            drive loop, fault policy, summary
//!   frame::XcorrLink           request/response framing
//!     codec                    fixed-point pack/decode
//!     poll::Poller             bounded-retry condition waits
//!       fifo::StreamFifo       register-level channel trait
//!         fifos::AxiFifo       /dev/mem MMIO (hardware)
//!         fifos::SimFifo       software device model (CI)
//! ```
//!
//! # Quick start
//!
//! ```no_run
//! use xcorr_harness::prelude::*;
//!
//! # fn main() -> xcorr_harness::Result<()> {
//! let mut bring_up = BringUp::map()?;
//! bring_up.run();
//!
//! let fifo = AxiFifo::map()?;
//! let cases = CaseReader::open("xcorr-emat.dat".as_ref())?;
//! let final_ref = load_final_reference("xcorr-emat-sum.txt".as_ref())?;
//!
//! let outcome = Verifier::new(VerifyConfig::default()).run(fifo, cases, &final_ref)?;
//! println!(
//!     "{} runs, {} values, {} errors -> {}",
//!     outcome.summary.runs,
//!     outcome.summary.tested,
//!     outcome.summary.errors,
//!     if outcome.summary.passed() { "PASS" } else { "FAIL" }
//! );
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod codec;
mod compare;
mod error;
mod fifo;
pub mod fifos;
mod frame;
mod mmio;
mod poll;
pub mod reference;
mod session;
pub mod setup;

pub use compare::{
    compare_outputs, RunResult, SessionSummary, MAX_ERRORS_TOTAL, MAX_REL_DIF_FINAL,
    MAX_REL_DIF_SINGLE,
};
pub use error::{Result, XcorrError};
pub use fifo::StreamFifo;
pub use fifos::{AxiFifo, SimFifo};
pub use frame::{ResultMode, XcorrLink};
pub use mmio::MappedRegion;
pub use poll::{Poller, DEFAULT_POLL_BUDGET};
pub use reference::{load_final_reference, CaseReader, RunCase};
pub use session::{FaultPolicy, SessionOutcome, Verifier, VerifyConfig};
pub use setup::BringUp;

/// Commonly used types.
pub mod prelude {
    pub use crate::{
        load_final_reference, AxiFifo, BringUp, CaseReader, FaultPolicy, ResultMode, Result,
        RunCase, SessionOutcome, SessionSummary, SimFifo, StreamFifo, Verifier, VerifyConfig,
        XcorrError,
    };
    pub use xcorr_fifo::FixedFormat;
}
