//! The record owning everything a registered GPU holds.

use crate::{
    ledger::{Acquired, Ledger},
    platform::{ClkRef, DeviceRef, ResetRef},
};

/// Resources held by one registered GPU.
///
/// Every field was acquired by a successful bring-up and is released exactly once by
/// teardown, which consumes the handle. It is deliberately neither `Clone` nor `Copy`.
#[derive(Debug, PartialEq, Eq)]
pub struct DeviceHandle {
    bus_clk: ClkRef,
    mod_clk: ClkRef,
    reset: ResetRef,
    device: DeviceRef,
    runtime_pm: bool,
}

impl DeviceHandle {
    pub(crate) fn new(
        bus_clk: ClkRef,
        mod_clk: ClkRef,
        reset: ResetRef,
        device: DeviceRef,
        runtime_pm: bool,
    ) -> DeviceHandle {
        DeviceHandle {
            bus_clk,
            mod_clk,
            reset,
            device,
            runtime_pm,
        }
    }

    pub fn bus_clock(&self) -> ClkRef {
        self.bus_clk
    }

    pub fn mod_clock(&self) -> ClkRef {
        self.mod_clk
    }

    pub fn reset(&self) -> ResetRef {
        self.reset
    }

    /// The published device object.
    pub fn device(&self) -> DeviceRef {
        self.device
    }

    /// Whether runtime PM was enabled on the device.
    pub fn runtime_pm(&self) -> bool {
        self.runtime_pm
    }

    /// The ledger bring-up would hold at this point, so teardown is an ordinary unwind.
    pub(crate) fn into_ledger<W>(self) -> Ledger<W> {
        let mut ledger = Ledger::new();
        ledger.push(Acquired::BusClock(self.bus_clk));
        ledger.push(Acquired::ModClock(self.mod_clk));
        ledger.push(Acquired::Reset(self.reset));
        ledger.push(Acquired::Device(self.device));
        ledger.push(Acquired::Published(self.device));
        if self.runtime_pm {
            ledger.push(Acquired::RuntimePm(self.device));
        }
        ledger
    }
}
