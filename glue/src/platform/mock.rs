//! In-memory platform double.
//!
//! Every collaborator call is appended to an event log, every acquisition bumps a counter
//! keyed by what was acquired, and every release drops it again. Releasing something that is
//! not held panics, so tests catch double releases as well as leaks.

use super::{
    AssignedClock, ClkRef, ClockControl, DeviceBus, DeviceRef, Description, IoMapper, IoRange,
    NodeRef, Platform, PlatformBus, PlatformResult, RegisterWindow, ResetControl, ResetRef,
    Specifier,
};
use crate::{
    error::PlatformError,
    resource::{IRQGP, IRQGPMMU, IRQPMU, IRQPP0, IRQPP1, IRQPPMMU0, IRQPPMMU1, Irq, ResourceTable},
    topology::{GP_VERSION_REG, PP_VERSION_REG, pp_base},
};
use alloc::{
    collections::btree_map::BTreeMap,
    format,
    string::{String, ToString},
    vec,
    vec::Vec,
};
use spin::Mutex;

pub(crate) const MOCK_BASE: usize = 0x01c4_0000;
pub(crate) const MOCK_LEN: usize = 0x10000;
pub(crate) const MOCK_CCU: u32 = 1;
pub(crate) const MOCK_RESET: u32 = 2;
pub(crate) const CLK_BUS: u32 = 11;
pub(crate) const CLK_MOD: u32 = 12;
pub(crate) const RST_GPU: u32 = 20;
/// Version register value of a present pixel processor.
pub(crate) const PP_PRESENT: u32 = 0xcd07_0101;
pub(crate) const MALI400_R1P1: u32 = 0x0b07_0101;

/// Interrupt numbers of a sun7i-a20.
const IRQS: [(&str, Irq); 7] = [
    (IRQGP, 101),
    (IRQGPMMU, 102),
    (IRQPP0, 103),
    (IRQPPMMU0, 104),
    (IRQPMU, 105),
    (IRQPP1, 106),
    (IRQPPMMU1, 107),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fault {
    FindNode,
    AssignedClocks,
    ClockDefaults,
    ClkGet(u32),
    ClkEnable(u32),
    ResetGet,
    ResetDeassert,
    Address,
    Ioremap,
    Irq(&'static str),
    DeviceAlloc,
    AddResources,
    DeviceAdd,
}

struct MockState {
    faults: Vec<Fault>,
    slots: [u32; 4],
    gp_version: u32,
    events: Vec<String>,
    held: BTreeMap<String, isize>,
}

impl MockState {
    fn faulty(&self, fault: Fault) -> bool {
        self.faults.contains(&fault)
    }

    fn acquire(&mut self, key: String) {
        *self.held.entry(key).or_insert(0) += 1;
    }

    fn release(&mut self, key: String) {
        let count = self.held.entry(key.clone()).or_insert(0);
        *count -= 1;
        assert!(*count >= 0, "released {} which is not held", key);
    }
}

pub(crate) struct MockPlatform {
    state: Mutex<MockState>,
    pub(crate) bus: PlatformBus,
}

pub(crate) struct MockWindow {
    regs: BTreeMap<usize, u32>,
    len: usize,
}

impl RegisterWindow for MockWindow {
    fn len(&self) -> usize {
        self.len
    }

    fn read32(&self, offset: usize) -> Option<u32> {
        (offset + 4 <= self.len).then(|| self.regs.get(&offset).copied().unwrap_or(0))
    }
}

impl MockPlatform {
    pub(crate) fn with_slots(slots: [u32; 4]) -> MockPlatform {
        MockPlatform {
            state: Mutex::new(MockState {
                faults: vec![],
                slots,
                gp_version: MALI400_R1P1,
                events: vec![],
                held: BTreeMap::new(),
            }),
            bus: PlatformBus::new(),
        }
    }

    pub(crate) fn mp1() -> MockPlatform {
        Self::with_slots([PP_PRESENT, 0, 0, 0])
    }

    pub(crate) fn mp2() -> MockPlatform {
        Self::with_slots([PP_PRESENT, PP_PRESENT, 0, 0])
    }

    pub(crate) fn fail(self, fault: Fault) -> MockPlatform {
        self.inject(fault);
        self
    }

    pub(crate) fn with_gp_version(self, value: u32) -> MockPlatform {
        self.state.lock().gp_version = value;
        self
    }

    pub(crate) fn inject(&self, fault: Fault) {
        self.state.lock().faults.push(fault);
    }

    pub(crate) fn events(&self) -> Vec<String> {
        self.state.lock().events.clone()
    }

    /// How many times `key` is currently held.
    pub(crate) fn count(&self, key: &str) -> isize {
        self.state.lock().held.get(key).copied().unwrap_or(0)
    }

    /// Total of everything currently held.
    pub(crate) fn held(&self) -> isize {
        self.state.lock().held.values().sum()
    }

    pub(crate) fn assert_balanced(&self) {
        let state = self.state.lock();
        let leaked: Vec<&String> = state
            .held
            .iter()
            .filter(|(_, count)| **count != 0)
            .map(|(key, _)| key)
            .collect();
        assert!(leaked.is_empty(), "still held: {:?}", leaked);
    }

    fn log(&self, event: impl Into<String>) {
        self.state.lock().events.push(event.into());
    }

    fn check(&self, fault: Fault, err: PlatformError) -> PlatformResult<()> {
        if self.state.lock().faulty(fault) {
            Err(err)
        } else {
            Ok(())
        }
    }

    fn spec_arg(spec: &Specifier) -> u32 {
        spec.args.first().copied().unwrap_or(0)
    }
}

impl Description for MockPlatform {
    fn find_compatible(&self, compatible: &str) -> Option<NodeRef> {
        self.log(format!("find_compatible {}", compatible));
        self.check(Fault::FindNode, PlatformError::NoDevice).ok()?;
        self.state.lock().acquire("node".to_string());
        Some(NodeRef::from(1))
    }

    fn put_node(&self, _node: NodeRef) {
        self.log("put_node");
        self.state.lock().release("node".to_string());
    }

    fn assigned_clocks(&self, _node: NodeRef) -> PlatformResult<Vec<AssignedClock>> {
        self.check(Fault::AssignedClocks, PlatformError::InvalidArgument)?;
        Ok(vec![AssignedClock {
            clock: Specifier {
                phandle: MOCK_CCU,
                args: vec![CLK_MOD],
            },
            parent: None,
            rate: Some(384_000_000),
        }])
    }

    fn clock(&self, _node: NodeRef, name: &str) -> PlatformResult<Specifier> {
        let id = match name {
            "ahb" => CLK_BUS,
            "mod" => CLK_MOD,
            _ => return Err(PlatformError::NotFound),
        };
        Ok(Specifier {
            phandle: MOCK_CCU,
            args: vec![id],
        })
    }

    fn reset(&self, _node: NodeRef, name: Option<&str>) -> PlatformResult<Specifier> {
        match name {
            None => Ok(Specifier {
                phandle: MOCK_RESET,
                args: vec![RST_GPU],
            }),
            Some(_) => Err(PlatformError::NotFound),
        }
    }

    fn address(&self, _node: NodeRef, index: usize) -> PlatformResult<IoRange> {
        self.check(Fault::Address, PlatformError::NotFound)?;
        match index {
            0 => Ok(IoRange::from(MOCK_BASE..MOCK_BASE + MOCK_LEN)),
            _ => Err(PlatformError::NotFound),
        }
    }

    fn irq_by_name(&self, _node: NodeRef, name: &str) -> PlatformResult<Irq> {
        self.log(format!("irq {}", name));
        if self
            .state
            .lock()
            .faults
            .iter()
            .any(|f| matches!(f, Fault::Irq(n) if *n == name))
        {
            return Err(PlatformError::NotFound);
        }
        IRQS.iter()
            .find(|(n, _)| *n == name)
            .map(|(_, irq)| *irq)
            .ok_or(PlatformError::NotFound)
    }
}

impl ClockControl for MockPlatform {
    fn clk_set_defaults(&self, assigned: &[AssignedClock]) -> PlatformResult<()> {
        self.log(format!("clk_set_defaults {}", assigned.len()));
        self.check(Fault::ClockDefaults, PlatformError::InvalidArgument)
    }

    fn clk_get(&self, spec: &Specifier) -> PlatformResult<ClkRef> {
        let id = Self::spec_arg(spec);
        self.log(format!("clk_get {}", id));
        self.check(Fault::ClkGet(id), PlatformError::ProbeDefer)?;
        self.state.lock().acquire(format!("clk:{}", id));
        Ok(ClkRef::from(id as usize))
    }

    fn clk_prepare_enable(&self, clk: ClkRef) -> PlatformResult<()> {
        self.log(format!("clk_prepare_enable {}", *clk));
        self.check(Fault::ClkEnable(*clk as u32), PlatformError::Io)?;
        self.state.lock().acquire(format!("clk_on:{}", *clk));
        Ok(())
    }

    fn clk_disable_unprepare(&self, clk: ClkRef) {
        self.log(format!("clk_disable_unprepare {}", *clk));
        self.state.lock().release(format!("clk_on:{}", *clk));
    }

    fn clk_put(&self, clk: ClkRef) {
        self.log(format!("clk_put {}", *clk));
        self.state.lock().release(format!("clk:{}", *clk));
    }
}

impl ResetControl for MockPlatform {
    fn reset_get(&self, spec: &Specifier) -> PlatformResult<ResetRef> {
        let id = Self::spec_arg(spec);
        self.log(format!("reset_get {}", id));
        self.check(Fault::ResetGet, PlatformError::ProbeDefer)?;
        self.state.lock().acquire(format!("reset:{}", id));
        Ok(ResetRef::from(id as usize))
    }

    fn reset_deassert(&self, rst: ResetRef) -> PlatformResult<()> {
        self.log(format!("reset_deassert {}", *rst));
        self.check(Fault::ResetDeassert, PlatformError::Io)?;
        self.state.lock().acquire(format!("deasserted:{}", *rst));
        Ok(())
    }

    fn reset_assert(&self, rst: ResetRef) {
        self.log(format!("reset_assert {}", *rst));
        self.state.lock().release(format!("deasserted:{}", *rst));
    }

    fn reset_put(&self, rst: ResetRef) {
        self.log(format!("reset_put {}", *rst));
        self.state.lock().release(format!("reset:{}", *rst));
    }
}

impl IoMapper for MockPlatform {
    type Window = MockWindow;

    fn ioremap(&self, range: IoRange) -> Option<MockWindow> {
        self.log(format!("ioremap {:?}", range));
        self.check(Fault::Ioremap, PlatformError::NoMemory).ok()?;
        let mut state = self.state.lock();
        state.acquire("mapping".to_string());
        let mut regs = BTreeMap::new();
        for (slot, value) in state.slots.iter().enumerate() {
            regs.insert(pp_base(slot) + PP_VERSION_REG, *value);
        }
        regs.insert(GP_VERSION_REG, state.gp_version);
        Some(MockWindow {
            regs,
            len: range.len(),
        })
    }

    fn iounmap(&self, _window: MockWindow) {
        self.log("iounmap");
        self.state.lock().release("mapping".to_string());
    }
}

impl DeviceBus for MockPlatform {
    fn device_alloc(&self, name: &'static str, id: i32) -> Option<DeviceRef> {
        self.log(format!("device_alloc {}.{}", name, id));
        self.check(Fault::DeviceAlloc, PlatformError::NoMemory).ok()?;
        let dev = self.bus.device_alloc(name, id)?;
        self.state.lock().acquire("device".to_string());
        Some(dev)
    }

    fn set_dma_mask(&self, dev: DeviceRef, mask: u64) {
        self.bus.set_dma_mask(dev, mask)
    }

    fn add_resources(&self, dev: DeviceRef, resources: ResourceTable) -> PlatformResult<()> {
        self.log(format!("add_resources {}", resources.len()));
        self.check(Fault::AddResources, PlatformError::NoMemory)?;
        self.bus.add_resources(dev, resources)
    }

    fn device_add(&self, dev: DeviceRef) -> PlatformResult<()> {
        self.log("device_add");
        self.check(Fault::DeviceAdd, PlatformError::Busy)?;
        self.bus.device_add(dev)?;
        self.state.lock().acquire("published".to_string());
        Ok(())
    }

    fn device_del(&self, dev: DeviceRef) {
        self.log("device_del");
        self.state.lock().release("published".to_string());
        self.bus.device_del(dev)
    }

    fn device_put(&self, dev: DeviceRef) {
        self.log("device_put");
        self.state.lock().release("device".to_string());
        self.bus.device_put(dev)
    }

    fn set_autosuspend_delay(&self, dev: DeviceRef, delay_ms: u32) {
        self.log(format!("set_autosuspend_delay {}", delay_ms));
        self.bus.set_autosuspend_delay(dev, delay_ms)
    }

    fn use_autosuspend(&self, dev: DeviceRef) {
        self.bus.use_autosuspend(dev)
    }

    fn pm_runtime_enable(&self, dev: DeviceRef) {
        self.log("pm_runtime_enable");
        self.state.lock().acquire("pm_runtime".to_string());
        self.bus.pm_runtime_enable(dev)
    }

    fn pm_runtime_disable(&self, dev: DeviceRef) {
        self.log("pm_runtime_disable");
        self.state.lock().release("pm_runtime".to_string());
        self.bus.pm_runtime_disable(dev)
    }
}

impl Platform for MockPlatform {
    type Window = MockWindow;

    fn description(&self) -> &dyn Description {
        self
    }

    fn clocks(&self) -> &dyn ClockControl {
        self
    }

    fn resets(&self) -> &dyn ResetControl {
        self
    }

    fn io(&self) -> &dyn IoMapper<Window = MockWindow> {
        self
    }

    fn bus(&self) -> &dyn DeviceBus {
        self
    }
}
