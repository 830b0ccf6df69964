//! Register access.

use super::IoMapper;
use core::{
    cell::UnsafeCell,
    fmt::Debug,
    ptr::read_volatile,
};
use core::ops::Range;
use utils::impl_basic;

#[repr(transparent)]
pub struct Register<T: Sized + Copy> {
    inner: UnsafeCell<T>,
}

impl<T: Sized + Copy> Register<T> {
    #[inline(always)]
    pub fn read(&self) -> T {
        unsafe { read_volatile(self.inner.get()) }
    }
}

/// A physical register range.
#[derive(Clone, PartialEq, Eq)]
pub struct IoRange {
    inner: Range<usize>,
}

impl_basic!(IoRange, Range<usize>);

impl Debug for IoRange {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("[{:#x},{:#x})", self.start, self.end))
    }
}

/// Read-only view of a mapped register block.
pub trait RegisterWindow {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The 32-bit register at `offset`, or `None` when it lies outside the window.
    fn read32(&self, offset: usize) -> Option<u32>;
}

/// A window over memory-mapped registers.
#[derive(Debug)]
pub struct MmioWindow {
    base: usize,
    len: usize,
}

impl MmioWindow {
    /// # Safety
    ///
    /// `base..base + len` must be mapped device memory that stays mapped while the window lives.
    pub unsafe fn new(base: usize, len: usize) -> MmioWindow {
        MmioWindow { base, len }
    }

    pub fn base(&self) -> usize {
        self.base
    }
}

impl RegisterWindow for MmioWindow {
    fn len(&self) -> usize {
        self.len
    }

    fn read32(&self, offset: usize) -> Option<u32> {
        let end = offset.checked_add(size_of::<u32>())?;
        if end > self.len || offset % size_of::<u32>() != 0 {
            return None;
        }
        // SAFETY: in bounds and aligned; the creator of the window vouched for the mapping.
        let reg = unsafe { &*((self.base + offset) as *const Register<u32>) };
        Some(reg.read())
    }
}

/// An [IoMapper] for platforms where device memory sits at a fixed offset from its physical
/// address, such as a kernel linear map.
#[derive(Debug)]
pub struct LinearMapper {
    virt_offset: usize,
}

impl LinearMapper {
    /// # Safety
    ///
    /// Every physical range handed to [IoMapper::ioremap] must be mapped at
    /// `phys + virt_offset`.
    pub const unsafe fn new(virt_offset: usize) -> LinearMapper {
        LinearMapper { virt_offset }
    }
}

impl IoMapper for LinearMapper {
    type Window = MmioWindow;

    fn ioremap(&self, range: IoRange) -> Option<MmioWindow> {
        if range.is_empty() {
            return None;
        }
        let base = range.start.checked_add(self.virt_offset)?;
        base.checked_add(range.len())?;
        Some(unsafe { MmioWindow::new(base, range.len()) })
    }

    fn iounmap(&self, _window: MmioWindow) {}
}
