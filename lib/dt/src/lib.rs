//! Device tree support: a flattened device tree reader and writer, and an in-memory node tree
//! with the lookups drivers use to find their clocks, resets, registers and interrupts.
#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod fdt;
pub mod node;
pub mod prop;
