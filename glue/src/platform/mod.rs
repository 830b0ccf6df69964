//! Platform collaborators driven by the glue.
//!
//! Each subsystem the bring-up touches (description lookup, clocks, resets, register mapping,
//! the platform device bus) sits behind its own trait, so a board can plug in its own providers
//! and tests can plug in doubles. Acquire/release pairs are named after the kernel calls they
//! stand for.

pub mod bus;
pub mod mmio;
pub mod of;
pub mod soc;

#[cfg(test)]
pub(crate) mod mock;

use crate::{error::PlatformError, resource::{Irq, ResourceTable}};
use alloc::vec::Vec;
use dt::node::PhandleArgs;

pub use bus::PlatformBus;
pub use mmio::{IoRange, LinearMapper, MmioWindow, RegisterWindow};
pub use of::DtDescription;
pub use soc::SocPlatform;

pub type PlatformResult<T> = Result<T, PlatformError>;

utils::define_struct!(
    handle,
    /// A description node held by the glue.
    NodeRef,
    usize
);
utils::define_struct!(
    handle,
    /// A clock handle obtained from [ClockControl::clk_get].
    ClkRef,
    usize
);
utils::define_struct!(
    handle,
    /// A reset-control handle obtained from [ResetControl::reset_get].
    ResetRef,
    usize
);
utils::define_struct!(
    handle,
    /// A platform device object owned by a [DeviceBus].
    DeviceRef,
    usize
);

/// A provider reference with its specifier cells, e.g. one entry of `clocks`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Specifier {
    pub phandle: u32,
    pub args: Vec<u32>,
}

impl From<PhandleArgs> for Specifier {
    fn from(value: PhandleArgs) -> Self {
        Specifier {
            phandle: value.phandle,
            args: value.args,
        }
    }
}

/// One `assigned-clocks` entry with its optional parent and rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignedClock {
    pub clock: Specifier,
    pub parent: Option<Specifier>,
    pub rate: Option<u32>,
}

/// Read access to the platform description.
pub trait Description {
    /// First available node compatible with `compatible`. The returned node is held until
    /// [Description::put_node].
    fn find_compatible(&self, compatible: &str) -> Option<NodeRef>;
    fn put_node(&self, node: NodeRef);
    /// Clock defaults the node asks for; empty when it asks for none.
    fn assigned_clocks(&self, node: NodeRef) -> PlatformResult<Vec<AssignedClock>>;
    fn clock(&self, node: NodeRef, name: &str) -> PlatformResult<Specifier>;
    /// Reset line by name, or the first one when `name` is `None`.
    fn reset(&self, node: NodeRef, name: Option<&str>) -> PlatformResult<Specifier>;
    /// The `index`-th register range, in CPU physical addresses.
    fn address(&self, node: NodeRef, index: usize) -> PlatformResult<IoRange>;
    fn irq_by_name(&self, node: NodeRef, name: &str) -> PlatformResult<Irq>;
}

pub trait ClockControl {
    fn clk_set_defaults(&self, assigned: &[AssignedClock]) -> PlatformResult<()>;
    fn clk_get(&self, spec: &Specifier) -> PlatformResult<ClkRef>;
    fn clk_prepare_enable(&self, clk: ClkRef) -> PlatformResult<()>;
    fn clk_disable_unprepare(&self, clk: ClkRef);
    fn clk_put(&self, clk: ClkRef);
}

pub trait ResetControl {
    fn reset_get(&self, spec: &Specifier) -> PlatformResult<ResetRef>;
    fn reset_deassert(&self, rst: ResetRef) -> PlatformResult<()>;
    fn reset_assert(&self, rst: ResetRef);
    fn reset_put(&self, rst: ResetRef);
}

/// Maps physical register ranges into windows the glue can read.
pub trait IoMapper {
    type Window: RegisterWindow;

    fn ioremap(&self, range: IoRange) -> Option<Self::Window>;
    fn iounmap(&self, window: Self::Window);
}

/// The platform device bus the GPU driver binds against.
pub trait DeviceBus {
    /// A fresh, unpublished device object, or `None` when out of memory.
    fn device_alloc(&self, name: &'static str, id: i32) -> Option<DeviceRef>;
    fn set_dma_mask(&self, dev: DeviceRef, mask: u64);
    fn add_resources(&self, dev: DeviceRef, resources: ResourceTable) -> PlatformResult<()>;
    fn device_add(&self, dev: DeviceRef) -> PlatformResult<()>;
    fn device_del(&self, dev: DeviceRef);
    fn device_put(&self, dev: DeviceRef);

    fn set_autosuspend_delay(&self, dev: DeviceRef, delay_ms: u32);
    fn use_autosuspend(&self, dev: DeviceRef);
    fn pm_runtime_enable(&self, dev: DeviceRef);
    fn pm_runtime_disable(&self, dev: DeviceRef);
}

/// Everything the glue needs from the platform, grouped.
pub trait Platform {
    type Window: RegisterWindow;

    fn description(&self) -> &dyn Description;
    fn clocks(&self) -> &dyn ClockControl;
    fn resets(&self) -> &dyn ResetControl;
    fn io(&self) -> &dyn IoMapper<Window = Self::Window>;
    fn bus(&self) -> &dyn DeviceBus;
}

impl<T: ClockControl + ?Sized> ClockControl for &T {
    fn clk_set_defaults(&self, assigned: &[AssignedClock]) -> PlatformResult<()> {
        (**self).clk_set_defaults(assigned)
    }
    fn clk_get(&self, spec: &Specifier) -> PlatformResult<ClkRef> {
        (**self).clk_get(spec)
    }
    fn clk_prepare_enable(&self, clk: ClkRef) -> PlatformResult<()> {
        (**self).clk_prepare_enable(clk)
    }
    fn clk_disable_unprepare(&self, clk: ClkRef) {
        (**self).clk_disable_unprepare(clk)
    }
    fn clk_put(&self, clk: ClkRef) {
        (**self).clk_put(clk)
    }
}

impl<T: ResetControl + ?Sized> ResetControl for &T {
    fn reset_get(&self, spec: &Specifier) -> PlatformResult<ResetRef> {
        (**self).reset_get(spec)
    }
    fn reset_deassert(&self, rst: ResetRef) -> PlatformResult<()> {
        (**self).reset_deassert(rst)
    }
    fn reset_assert(&self, rst: ResetRef) {
        (**self).reset_assert(rst)
    }
    fn reset_put(&self, rst: ResetRef) {
        (**self).reset_put(rst)
    }
}

impl<T: IoMapper + ?Sized> IoMapper for &T {
    type Window = T::Window;

    fn ioremap(&self, range: IoRange) -> Option<Self::Window> {
        (**self).ioremap(range)
    }
    fn iounmap(&self, window: Self::Window) {
        (**self).iounmap(window)
    }
}
