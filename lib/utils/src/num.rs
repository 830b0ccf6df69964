//! Numeric Utilities
use core::ops::{Add, Rem, Sub};

/// A trait for aligning numerical values.
///
/// Provides methods to align values up or down to the nearest multiple of a given alignment.
pub trait AlignableTo {
    /// Aligns the value up to the nearest multiple of `align`.
    fn align_up(self, align: Self) -> Self;

    /// Aligns the value down to the nearest multiple of `align`.
    fn align_down(self, align: Self) -> Self;
}

impl<T> AlignableTo for T
where
    T: Copy + Rem<Output = T> + Add<Output = T> + PartialEq<T> + Default + Sub<Output = T>,
{
    fn align_up(self, align: Self) -> Self {
        if self % align == T::default() {
            self
        } else {
            self + (align - (self % align))
        }
    }
    fn align_down(self, align: Self) -> Self {
        if self % align == T::default() {
            self
        } else {
            self - (self % align)
        }
    }
}

/// Build a mask covering the low `bits` bits, saturating at the full width.
#[inline(always)]
pub const fn bit_mask(bits: u32) -> u64 {
    if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align() {
        assert_eq!(13usize.align_up(4), 16);
        assert_eq!(16usize.align_up(4), 16);
        assert_eq!(13usize.align_down(4), 12);
    }

    #[test]
    fn test_bit_mask() {
        assert_eq!(bit_mask(32), 0xffff_ffff);
        assert_eq!(bit_mask(0), 0);
        assert_eq!(bit_mask(64), u64::MAX);
    }
}
