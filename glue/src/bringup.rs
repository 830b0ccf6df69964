//! Staged bring-up engine.
//!
//! Stages run in a fixed order and each successful acquisition lands in the [Ledger]. The
//! first failing stage stops the run; the ledger is then unwound so nothing acquired so far
//! stays held, and that stage's error is returned.

use crate::{
    error::{GlueError, PlatformError, Stage},
    handle::DeviceHandle,
    ledger::{Acquired, Ledger},
    params::GlueConfig,
    platform::{ClkRef, DeviceRef, NodeRef, Platform, ResetRef},
    resource::{GpuInterrupts, build_resource_table},
    topology::{Topology, identify_revision, probe_core_count},
};
use core::ops::Range;
use log::{error, info};

fn description(stage: Stage) -> impl FnOnce(PlatformError) -> GlueError {
    move |cause| GlueError::Description { stage, cause }
}

fn registration(stage: Stage) -> impl FnOnce(PlatformError) -> GlueError {
    move |cause| GlueError::Registration { stage, cause }
}

pub struct BringUp<'a, P: Platform + ?Sized> {
    platform: &'a P,
    config: &'a GlueConfig,
    ledger: Ledger<P::Window>,
}

impl<'a, P: Platform + ?Sized> BringUp<'a, P> {
    pub fn new(platform: &'a P, config: &'a GlueConfig) -> Self {
        BringUp {
            platform,
            config,
            ledger: Ledger::new(),
        }
    }

    /// Run every stage. On failure everything acquired is released before returning.
    pub fn run(mut self) -> Result<DeviceHandle, GlueError> {
        match self.stages() {
            Ok(handle) => {
                info!("Allwinner sunXi mali glue initialized");
                Ok(handle)
            }
            Err(err) => {
                error!(
                    "mali glue: couldn't {}, releasing {} acquired resources",
                    err,
                    self.ledger.len()
                );
                self.ledger.unwind(self.platform);
                Err(err)
            }
        }
    }

    fn stages(&mut self) -> Result<DeviceHandle, GlueError> {
        let node = self.locate_node()?;
        self.apply_clock_defaults(node)?;
        let bus_clk = self.enable_clock(
            node,
            Stage::BusClock,
            self.config.bus_clock,
            Acquired::BusClock,
        )?;
        let mod_clk = self.enable_clock(
            node,
            Stage::ModClock,
            self.config.mod_clock,
            Acquired::ModClock,
        )?;
        let reset = self.deassert_reset(node)?;
        let base = self
            .platform
            .description()
            .address(node, 0)
            .map_err(description(Stage::BaseAddress))?;
        debug_ex!("mali registers at {:?}", base);
        let range: Range<usize> = base.into();
        self.map_registers(range.clone())?;
        let topology = self.probe_topology()?;
        let irqs = self.resolve_interrupts(node, topology)?;
        let device = self.alloc_device()?;
        self.attach_resources(device, range.start, topology, &irqs)?;
        if let Some(window) = self.ledger.mapping() {
            identify_revision(window, topology.cores());
        }
        self.platform
            .bus()
            .device_add(device)
            .map_err(registration(Stage::Publish))?;
        self.ledger.push(Acquired::Published(device));
        let runtime_pm = self.enable_runtime_pm(device);

        self.ledger.release_probing(self.platform);
        self.ledger.commit();
        Ok(DeviceHandle::new(bus_clk, mod_clk, reset, device, runtime_pm))
    }

    fn locate_node(&mut self) -> Result<NodeRef, GlueError> {
        let node = self
            .platform
            .description()
            .find_compatible(self.config.compatible)
            .ok_or(GlueError::Description {
                stage: Stage::LocateNode,
                cause: PlatformError::NoDevice,
            })?;
        self.ledger.push(Acquired::Node(node));
        Ok(node)
    }

    fn apply_clock_defaults(&mut self, node: NodeRef) -> Result<(), GlueError> {
        let assigned = self
            .platform
            .description()
            .assigned_clocks(node)
            .map_err(description(Stage::ClockDefaults))?;
        self.platform
            .clocks()
            .clk_set_defaults(&assigned)
            .map_err(registration(Stage::ClockDefaults))
    }

    /// Look up and enable the bus or module clock. A clock that fails to enable is put
    /// before returning.
    fn enable_clock(
        &mut self,
        node: NodeRef,
        stage: Stage,
        name: &str,
        record: fn(ClkRef) -> Acquired<P::Window>,
    ) -> Result<ClkRef, GlueError> {
        let clocks = self.platform.clocks();
        let spec = self
            .platform
            .description()
            .clock(node, name)
            .map_err(description(stage))?;
        let clk = clocks.clk_get(&spec).map_err(description(stage))?;
        if let Err(cause) = clocks.clk_prepare_enable(clk) {
            clocks.clk_put(clk);
            return Err(GlueError::Registration { stage, cause });
        }
        self.ledger.push(record(clk));
        Ok(clk)
    }

    fn deassert_reset(&mut self, node: NodeRef) -> Result<ResetRef, GlueError> {
        let resets = self.platform.resets();
        let spec = self
            .platform
            .description()
            .reset(node, self.config.reset)
            .map_err(description(Stage::Reset))?;
        let rst = resets.reset_get(&spec).map_err(description(Stage::Reset))?;
        if let Err(cause) = resets.reset_deassert(rst) {
            resets.reset_put(rst);
            return Err(GlueError::Registration {
                stage: Stage::Reset,
                cause,
            });
        }
        self.ledger.push(Acquired::Reset(rst));
        Ok(rst)
    }

    fn map_registers(&mut self, range: Range<usize>) -> Result<(), GlueError> {
        let window = self
            .platform
            .io()
            .ioremap(range.into())
            .ok_or(GlueError::Allocation {
                stage: Stage::MapRegisters,
            })?;
        self.ledger.push(Acquired::Mapping(window));
        Ok(())
    }

    fn probe_topology(&self) -> Result<Topology, GlueError> {
        let cores = self
            .ledger
            .mapping()
            .map_or(0, |window| probe_core_count(window, self.config.max_core_slots));
        let topology = Topology::try_from(cores).map_err(|_| GlueError::Topology { cores })?;
        info!("Number of cores {}", cores);
        Ok(topology)
    }

    fn resolve_interrupts(
        &self,
        node: NodeRef,
        topology: Topology,
    ) -> Result<GpuInterrupts, GlueError> {
        let description = self.platform.description();
        GpuInterrupts::resolve(topology, |name| description.irq_by_name(node, name)).map_err(
            |(name, cause)| {
                error!("Couldn't retrieve our {} interrupt", name);
                GlueError::Description {
                    stage: Stage::Interrupts,
                    cause,
                }
            },
        )
    }

    fn alloc_device(&mut self) -> Result<DeviceRef, GlueError> {
        let bus = self.platform.bus();
        let device = bus
            .device_alloc(self.config.device_name, self.config.device_id)
            .ok_or(GlueError::Allocation {
                stage: Stage::AllocDevice,
            })?;
        self.ledger.push(Acquired::Device(device));
        bus.set_dma_mask(device, self.config.dma_mask());
        Ok(device)
    }

    fn attach_resources(
        &mut self,
        device: DeviceRef,
        base: usize,
        topology: Topology,
        irqs: &GpuInterrupts,
    ) -> Result<(), GlueError> {
        let table = build_resource_table(base, topology, irqs).ok_or(GlueError::Allocation {
            stage: Stage::Resources,
        })?;
        self.platform
            .bus()
            .add_resources(device, table)
            .map_err(registration(Stage::Resources))
    }

    /// Best effort; returns whether runtime PM was enabled.
    fn enable_runtime_pm(&mut self, device: DeviceRef) -> bool {
        let Some(pm) = self.config.runtime_pm else {
            return false;
        };
        let bus = self.platform.bus();
        bus.set_autosuspend_delay(device, pm.autosuspend_delay_ms);
        bus.use_autosuspend(device);
        bus.pm_runtime_enable(device);
        self.ledger.push(Acquired::RuntimePm(device));
        true
    }
}
