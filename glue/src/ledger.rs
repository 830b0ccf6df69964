//! Acquisition ledger.
//!
//! Bring-up pushes one entry per acquired resource. On failure the ledger is unwound: entries
//! are popped and released in reverse order, so exactly what was acquired is released, once.

use crate::platform::{ClkRef, DeviceRef, NodeRef, Platform, RegisterWindow, ResetRef};
use alloc::vec::Vec;

/// One acquired resource and what it takes to release it.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Acquired<W> {
    /// Description node reference; put.
    Node(NodeRef),
    /// Enabled bus clock; disable and put.
    BusClock(ClkRef),
    /// Enabled module clock; disable and put.
    ModClock(ClkRef),
    /// Deasserted reset line; assert and put.
    Reset(ResetRef),
    /// Register window; unmap.
    Mapping(W),
    /// Allocated device object and the resource table attached to it; put.
    Device(DeviceRef),
    /// Published device object; unregister.
    Published(DeviceRef),
    /// Runtime PM enabled on the device; disable.
    RuntimePm(DeviceRef),
}

impl<W> Acquired<W> {
    fn held_while_probing(&self) -> bool {
        matches!(self, Acquired::Node(_) | Acquired::Mapping(_))
    }
}

#[derive(Debug)]
pub(crate) struct Ledger<W> {
    stack: Vec<Acquired<W>>,
}

impl<W> Ledger<W> {
    pub fn new() -> Ledger<W> {
        Ledger { stack: Vec::new() }
    }

    pub fn push(&mut self, item: Acquired<W>) {
        self.stack.push(item);
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// The mapped register window, while it is held.
    pub fn mapping(&self) -> Option<&W> {
        self.stack.iter().find_map(|item| match item {
            Acquired::Mapping(window) => Some(window),
            _ => None,
        })
    }

    /// Forget every entry without releasing it; ownership has moved elsewhere.
    pub fn commit(&mut self) {
        self.stack.clear();
    }
}

impl<W: RegisterWindow> Ledger<W> {
    /// Release everything, newest first.
    pub fn unwind<P: Platform<Window = W> + ?Sized>(&mut self, platform: &P) {
        while let Some(item) = self.stack.pop() {
            release(platform, item);
        }
    }

    /// Release the entries only needed while probing (register window, description node),
    /// newest first, and keep the rest.
    pub fn release_probing<P: Platform<Window = W> + ?Sized>(&mut self, platform: &P) {
        let mut kept = Vec::with_capacity(self.stack.len());
        while let Some(item) = self.stack.pop() {
            if item.held_while_probing() {
                release(platform, item);
            } else {
                kept.push(item);
            }
        }
        kept.reverse();
        self.stack = kept;
    }
}

fn release<P: Platform + ?Sized>(platform: &P, item: Acquired<P::Window>) {
    match item {
        Acquired::Node(node) => platform.description().put_node(node),
        Acquired::BusClock(clk) | Acquired::ModClock(clk) => {
            platform.clocks().clk_disable_unprepare(clk);
            platform.clocks().clk_put(clk);
        }
        Acquired::Reset(rst) => {
            platform.resets().reset_assert(rst);
            platform.resets().reset_put(rst);
        }
        Acquired::Mapping(window) => platform.io().iounmap(window),
        Acquired::Device(dev) => platform.bus().device_put(dev),
        Acquired::Published(dev) => platform.bus().device_del(dev),
        Acquired::RuntimePm(dev) => platform.bus().pm_runtime_disable(dev),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{
        ClockControl, Description, DeviceBus, IoMapper, IoRange, ResetControl, Specifier,
        mock::{CLK_BUS, CLK_MOD, MOCK_BASE, MockPlatform, MockWindow},
    };
    use alloc::{string::String, vec};

    fn spec(id: u32) -> Specifier {
        Specifier {
            phandle: 1,
            args: vec![id],
        }
    }

    /// Acquire a node, both clocks, a mapping and a device object on `mock`.
    fn acquire_some(mock: &MockPlatform) -> Ledger<MockWindow> {
        let mut ledger = Ledger::new();
        ledger.push(Acquired::Node(mock.find_compatible("arm,mali-400").unwrap()));
        for (id, bus) in [(CLK_BUS, true), (CLK_MOD, false)] {
            let clk = mock.clk_get(&spec(id)).unwrap();
            mock.clk_prepare_enable(clk).unwrap();
            ledger.push(if bus {
                Acquired::BusClock(clk)
            } else {
                Acquired::ModClock(clk)
            });
        }
        let rst = mock.reset_get(&spec(20)).unwrap();
        mock.reset_deassert(rst).unwrap();
        ledger.push(Acquired::Reset(rst));
        let window = mock
            .ioremap(IoRange::from(MOCK_BASE..MOCK_BASE + 0x10000))
            .unwrap();
        ledger.push(Acquired::Mapping(window));
        ledger.push(Acquired::Device(mock.device_alloc("mali-utgard", 0).unwrap()));
        ledger
    }

    #[test]
    fn test_unwind_releases_newest_first() {
        let mock = MockPlatform::mp1();
        let mut ledger = acquire_some(&mock);
        assert_eq!(ledger.len(), 6);
        let before = mock.events().len();
        ledger.unwind(&mock);
        assert_eq!(ledger.len(), 0);
        let released: Vec<String> = mock.events().split_off(before);
        assert_eq!(
            released,
            [
                "device_put",
                "iounmap",
                "reset_assert 20",
                "reset_put 20",
                "clk_disable_unprepare 12",
                "clk_put 12",
                "clk_disable_unprepare 11",
                "clk_put 11",
                "put_node",
            ]
        );
        mock.assert_balanced();
    }

    #[test]
    fn test_release_probing_keeps_the_rest() {
        let mock = MockPlatform::mp1();
        let mut ledger = acquire_some(&mock);
        assert!(ledger.mapping().is_some());
        ledger.release_probing(&mock);
        assert!(ledger.mapping().is_none());
        assert_eq!(ledger.len(), 4);
        assert_eq!(mock.count("mapping"), 0);
        assert_eq!(mock.count("node"), 0);
        assert_eq!(mock.count("clk_on:11"), 1);
        ledger.unwind(&mock);
        mock.assert_balanced();
    }
}
