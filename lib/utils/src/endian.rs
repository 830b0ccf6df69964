//! ## Endianness Module
//! Wrappers that describe how a word is laid out in memory, e.g. inside a flattened device tree
//! or a register block, independent of the endianness of the CPU reading it.
//!
//! All the types declared here implement [EndianData<T>],
//! which defines [EndianData<T>::value] to convert the stored word into native order.

///[u16] in Big Endianness
#[derive(Debug, Clone, Copy)]
#[repr(transparent)]
pub struct BigEndian16(u16);

///[u16] in Little Endianness
#[derive(Debug, Clone, Copy)]
#[repr(transparent)]
pub struct LittleEndian16(u16);

///[u32] in Big Endianness
#[derive(Debug, Clone, Copy)]
#[repr(transparent)]
pub struct BigEndian32(u32);

///[u32] in Little Endianness
#[derive(Debug, Clone, Copy)]
#[repr(transparent)]
pub struct LittleEndian32(u32);

///[u64] in Big Endianness
#[derive(Debug, Clone, Copy)]
#[repr(transparent)]
pub struct BigEndian64(u64);

///[u64] in Little Endianness
#[derive(Debug, Clone, Copy)]
#[repr(transparent)]
pub struct LittleEndian64(u64);

/// This trait defines a packed data in memory with some specific endianness.
pub trait EndianData<T>: Copy + Clone {
    /// Parse the value into the endianness of the current architecture.
    fn value(&self) -> T;

    /// Store a native value with this layout.
    fn store(value: T) -> Self;
}

/// Implement an [EndianData<T>] for a specific type, and explain the data in big endianess
macro_rules! impl_converter_big {
    ($type: tt, $tval: tt) => {
        impl EndianData<$tval> for $type {
            #[inline(always)]
            fn value(&self) -> $tval {
                $tval::from_be(self.0)
            }

            #[inline(always)]
            fn store(value: $tval) -> Self {
                $type(value.to_be())
            }
        }
    };
}

/// Implement an [EndianData<T>] for a specific type, and explain the data in little endianess
macro_rules! impl_converter_little {
    ($type: tt, $tval: tt) => {
        impl EndianData<$tval> for $type {
            #[inline(always)]
            fn value(&self) -> $tval {
                $tval::from_le(self.0)
            }

            #[inline(always)]
            fn store(value: $tval) -> Self {
                $type(value.to_le())
            }
        }
    };
}

impl_converter_big!(BigEndian16, u16);
impl_converter_big!(BigEndian32, u32);
impl_converter_big!(BigEndian64, u64);

impl_converter_little!(LittleEndian16, u16);
impl_converter_little!(LittleEndian32, u32);
impl_converter_little!(LittleEndian64, u64);
