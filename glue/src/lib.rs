//! Allwinner sunXi platform glue for the ARM Mali Utgard (Mali-400) GPU.
//!
//! The glue finds the GPU in the platform description, powers it up (clock defaults, bus and
//! module clocks, reset line), maps its registers long enough to count the pixel-processor
//! cores, and publishes a `mali-utgard` platform device carrying the resource table the GPU
//! driver binds against. Any failure unwinds exactly what was acquired so far.
//!
//! Entry points live on [MaliGlue]: [MaliGlue::register_device] and
//! [MaliGlue::unregister_device].
#![cfg_attr(not(test), no_std)]
extern crate alloc;

#[macro_use]
pub mod console;
#[macro_use]
pub mod logging;
pub mod bringup;
pub mod error;
pub mod handle;
mod ledger;
pub mod lifecycle;
pub mod params;
pub mod platform;
pub mod resource;
pub mod teardown;
pub mod topology;

pub use error::{GlueError, PlatformError, Stage};
pub use handle::DeviceHandle;
pub use lifecycle::MaliGlue;
pub use params::{GlueConfig, RuntimePm};
pub use resource::{Resource, ResourceKind, ResourceTable, build_resource_table};
pub use topology::{GpuModel, GpuRevision, Topology, identify_revision, probe_core_count};
