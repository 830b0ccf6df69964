//! Build-time configuration for the mali glue.
//! Values come from `flags.json` at the workspace root and are baked in as constants.

#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]

/// Constants generated from `flags.json`.
#[allow(missing_docs)]
pub mod build_flags {
    include!(concat!(env!("OUT_DIR"), "/build_flags.rs"));
}
