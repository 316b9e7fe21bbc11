//! Hardware constants for the cross-correlation accelerator.
//!
//! This crate is the leaf of the workspace: register offsets, status bits
//! and fixed-point format descriptions shared by the harness library and
//! the CLI. It has no dependencies and no I/O; the actual register access
//! lives in `xcorr-harness`.

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod format;
pub mod regs;

pub use format::{FixedFormat, DIN_SCALE};
