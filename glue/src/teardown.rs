//! Teardown engine: the mirror of a successful bring-up.

use crate::{handle::DeviceHandle, platform::Platform};

/// Release everything `handle` holds, newest first: runtime PM, the published device object,
/// the device object with its resources, the reset line, the module clock, the bus clock.
///
/// There is no failure path. The handle is consumed, so it cannot be torn down twice.
pub fn teardown<P: Platform + ?Sized>(platform: &P, handle: DeviceHandle) {
    debug_ex!("tearing down mali device {}", *handle.device());
    handle.into_ledger::<P::Window>().unwind(platform);
}
