//! Memory-mapped register access over `/dev/mem`.
//!
//! The Zynq PS exposes the AXI-Stream FIFO and the SLCR as physical
//! address windows; both fit in a single page. This module provides a
//! safe, bounds-checked wrapper with volatile 32-bit accessors. All
//! register traffic must stay volatile: writes have device side effects
//! and reads observe state the device changes on its own.
//!
//! Unsafe is confined to this module.

use crate::error::{Result, XcorrError};
use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};
use std::fs::{File, OpenOptions};
use std::os::unix::io::AsFd;
use std::ptr::NonNull;
use xcorr_fifo::regs::MAP_PAGE_SIZE;

/// One page of memory-mapped hardware registers.
pub struct MappedRegion {
    ptr: NonNull<u8>,
    size: usize,
    phys_base: u64,
    _file: File,
}

impl std::fmt::Debug for MappedRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedRegion")
            .field("phys_base", &format_args!("{:#x}", self.phys_base))
            .field("size", &self.size)
            .finish()
    }
}

// SAFETY: MappedRegion owns its mapping exclusively; moving it between
// threads does not invalidate the mapping (mmap'd memory is process-wide).
unsafe impl Send for MappedRegion {}

impl MappedRegion {
    /// Map one page of physical address space from `/dev/mem`.
    ///
    /// `phys_base` must be page-aligned (hardware blocks are).
    ///
    /// # Errors
    ///
    /// Returns [`XcorrError::ResourceUnavailable`] if `/dev/mem` cannot be
    /// opened (typically missing root) or the mapping fails.
    pub fn map_page(phys_base: u64) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open("/dev/mem")
            .map_err(|e| {
                XcorrError::resource_unavailable("/dev/mem", format!("{e}. Running as root?"))
            })?;

        // SAFETY: mmap of a freshly opened fd at a page-aligned device
        // offset. The file is stored in the struct so the fd outlives the
        // mapping; munmap happens exactly once in Drop.
        let ptr = unsafe {
            let addr = mmap(
                std::ptr::null_mut(),
                MAP_PAGE_SIZE,
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
                file.as_fd(),
                phys_base,
            )
            .map_err(|e| {
                XcorrError::resource_unavailable(
                    "/dev/mem",
                    format!("mmap of {phys_base:#x} failed: {e}"),
                )
            })?;

            NonNull::new(addr.cast::<u8>()).expect("mmap returns non-null on success")
        };

        tracing::debug!("Mapped {phys_base:#x} at {ptr:p}");

        Ok(Self {
            ptr,
            size: MAP_PAGE_SIZE,
            phys_base,
            _file: file,
        })
    }

    /// Read a 32-bit register.
    ///
    /// # Panics
    ///
    /// Panics if `offset + 4` exceeds the mapped page. Offsets come from
    /// `xcorr_fifo::regs` constants, all well inside one page.
    pub fn read32(&self, offset: usize) -> u32 {
        assert!(offset + 4 <= self.size, "register offset out of bounds");
        // SAFETY: bounds checked above; ptr valid for self.size bytes from
        // mmap; registers are 4-byte aligned by hardware. Volatile because
        // the device changes these values behind the compiler's back.
        let value = unsafe { self.ptr.as_ptr().add(offset).cast::<u32>().read_volatile() };
        tracing::trace!("rd {:#x}+{offset:#x} = {value:#x}", self.phys_base);
        value
    }

    /// Write a 32-bit register.
    ///
    /// # Panics
    ///
    /// Panics if `offset + 4` exceeds the mapped page.
    pub fn write32(&mut self, offset: usize, value: u32) {
        assert!(offset + 4 <= self.size, "register offset out of bounds");
        tracing::trace!("wr {:#x}+{offset:#x} = {value:#x}", self.phys_base);
        // SAFETY: bounds checked above; ptr valid; 4-byte aligned. Volatile
        // because writes trigger hardware side effects and must land in
        // program order.
        unsafe {
            self.ptr
                .as_ptr()
                .add(offset)
                .cast::<u32>()
                .write_volatile(value);
        }
    }

    /// Physical base address of this window.
    pub const fn phys_base(&self) -> u64 {
        self.phys_base
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        // SAFETY: ptr/size are exactly what mmap returned in map_page;
        // Drop runs at most once. Errors cannot propagate from Drop.
        unsafe {
            if let Err(e) = munmap(self.ptr.as_ptr().cast(), self.size) {
                tracing::error!("munmap failed during drop: {e}");
            }
        }
        tracing::debug!("Unmapped {:#x}", self.phys_base);
    }
}
