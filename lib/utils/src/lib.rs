#![cfg_attr(not(test), no_std)]

pub mod endian;
pub mod macros;
pub mod num;
