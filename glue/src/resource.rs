//! Resource table builder.
//!
//! The published device carries one ordered table of named register ranges and interrupt
//! lines. Its shape depends only on the topology; both shapes are kept as templates and the
//! builder fills in addresses and interrupt numbers.

use crate::topology::{Topology, pp_base};
use alloc::vec::Vec;
use utils::define_struct;

pub type Irq = u32;

pub const IRQGP: &str = "IRQGP";
pub const IRQGPMMU: &str = "IRQGPMMU";
pub const IRQPP0: &str = "IRQPP0";
pub const IRQPPMMU0: &str = "IRQPPMMU0";
pub const IRQPP1: &str = "IRQPP1";
pub const IRQPPMMU1: &str = "IRQPPMMU1";
pub const IRQPMU: &str = "IRQPMU";

const GP_OFFSET: usize = 0x0000;
const L2_OFFSET: usize = 0x1000;
const PMU_OFFSET: usize = 0x2000;
const GP_MMU_OFFSET: usize = 0x3000;
const PP_MMU_BASE: usize = 0x4000;
const PP_MMU_STRIDE: usize = 0x1000;

const L2_SIZE: usize = 0x200;
const PP_SIZE: usize = 0x1100;
const UNIT_SIZE: usize = 0x100;

const fn pp_mmu_base(index: usize) -> usize {
    PP_MMU_BASE + PP_MMU_STRIDE * index
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// A register range: `start..start + size`.
    Memory { start: usize, size: usize },
    Interrupt(Irq),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resource {
    pub name: &'static str,
    pub kind: ResourceKind,
}

define_struct!(ResourceTable, Vec<Resource>);

impl ResourceTable {
    pub fn by_name(&self, name: &str) -> Option<&Resource> {
        self.iter().find(|res| res.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PpInterrupts {
    pub pp: Irq,
    pub mmu: Irq,
}

/// Interrupt lines resolved for one GPU. `pp[i]` is present for every probed pixel processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuInterrupts {
    pub gp: Irq,
    pub gp_mmu: Irq,
    pub pp: [Option<PpInterrupts>; 2],
    pub pmu: Irq,
}

impl GpuInterrupts {
    /// Look up every line `topology` needs, in order: GP, GP MMU, each PP with its MMU, PMU.
    /// The first failing lookup is returned together with the name it was asked for.
    pub fn resolve<E>(
        topology: Topology,
        mut lookup: impl FnMut(&'static str) -> Result<Irq, E>,
    ) -> Result<GpuInterrupts, (&'static str, E)> {
        let mut get = |name: &'static str| lookup(name).map_err(|err| (name, err));
        let gp = get(IRQGP)?;
        let gp_mmu = get(IRQGPMMU)?;
        let mut pp = [None; 2];
        for (index, (pp_name, mmu_name)) in [(IRQPP0, IRQPPMMU0), (IRQPP1, IRQPPMMU1)]
            .into_iter()
            .take(topology.cores())
            .enumerate()
        {
            pp[index] = Some(PpInterrupts {
                pp: get(pp_name)?,
                mmu: get(mmu_name)?,
            });
        }
        let pmu = get(IRQPMU)?;
        Ok(GpuInterrupts { gp, gp_mmu, pp, pmu })
    }

    fn line(&self, line: Line) -> Option<Irq> {
        match line {
            Line::Gp => Some(self.gp),
            Line::GpMmu => Some(self.gp_mmu),
            Line::Pp(i) => self.pp.get(i).copied().flatten().map(|pp| pp.pp),
            Line::PpMmu(i) => self.pp.get(i).copied().flatten().map(|pp| pp.mmu),
            Line::Pmu => Some(self.pmu),
        }
    }
}

#[derive(Clone, Copy)]
enum Line {
    Gp,
    GpMmu,
    Pp(usize),
    PpMmu(usize),
    Pmu,
}

#[derive(Clone, Copy)]
enum SlotKind {
    Range { offset: usize, size: usize },
    Irq(Line),
}

#[derive(Clone, Copy)]
struct Slot {
    name: &'static str,
    kind: SlotKind,
}

impl Slot {
    const fn range(name: &'static str, offset: usize, size: usize) -> Slot {
        Slot {
            name,
            kind: SlotKind::Range { offset, size },
        }
    }

    const fn irq(name: &'static str, line: Line) -> Slot {
        Slot {
            name,
            kind: SlotKind::Irq(line),
        }
    }
}

const MALI400_MP1: [Slot; 11] = [
    Slot::range("Mali_L2", L2_OFFSET, L2_SIZE),
    Slot::range("Mali_GP", GP_OFFSET, UNIT_SIZE),
    Slot::irq("Mali_GP_IRQ", Line::Gp),
    Slot::range("Mali_GP_MMU", GP_MMU_OFFSET, UNIT_SIZE),
    Slot::irq("Mali_GP_MMU_IRQ", Line::GpMmu),
    Slot::range("Mali_PP0", pp_base(0), PP_SIZE),
    Slot::irq("Mali_PP0_IRQ", Line::Pp(0)),
    Slot::range("Mali_PP0_MMU", pp_mmu_base(0), UNIT_SIZE),
    Slot::irq("Mali_PP0_MMU_IRQ", Line::PpMmu(0)),
    Slot::range("Mali_PMU", PMU_OFFSET, UNIT_SIZE),
    Slot::irq("Mali_PMU_IRQ", Line::Pmu),
];

const MALI400_MP2: [Slot; 15] = [
    Slot::range("Mali_L2", L2_OFFSET, L2_SIZE),
    Slot::range("Mali_GP", GP_OFFSET, UNIT_SIZE),
    Slot::irq("Mali_GP_IRQ", Line::Gp),
    Slot::range("Mali_GP_MMU", GP_MMU_OFFSET, UNIT_SIZE),
    Slot::irq("Mali_GP_MMU_IRQ", Line::GpMmu),
    Slot::range("Mali_PP0", pp_base(0), PP_SIZE),
    Slot::irq("Mali_PP0_IRQ", Line::Pp(0)),
    Slot::range("Mali_PP0_MMU", pp_mmu_base(0), UNIT_SIZE),
    Slot::irq("Mali_PP0_MMU_IRQ", Line::PpMmu(0)),
    Slot::range("Mali_PP1", pp_base(1), PP_SIZE),
    Slot::irq("Mali_PP1_IRQ", Line::Pp(1)),
    Slot::range("Mali_PP1_MMU", pp_mmu_base(1), UNIT_SIZE),
    Slot::irq("Mali_PP1_MMU_IRQ", Line::PpMmu(1)),
    Slot::range("Mali_PMU", PMU_OFFSET, UNIT_SIZE),
    Slot::irq("Mali_PMU_IRQ", Line::Pmu),
];

fn template(topology: Topology) -> &'static [Slot] {
    match topology {
        Topology::Mp1 => &MALI400_MP1,
        Topology::Mp2 => &MALI400_MP2,
    }
}

/// Build the resource table for a GPU at `base`.
///
/// Returns `None` if memory for the table cannot be obtained, an address overflows, or `irqs`
/// lacks a line the topology needs.
pub fn build_resource_table(
    base: usize,
    topology: Topology,
    irqs: &GpuInterrupts,
) -> Option<ResourceTable> {
    let slots = template(topology);
    let mut table = Vec::new();
    table.try_reserve_exact(slots.len()).ok()?;
    for slot in slots {
        let kind = match slot.kind {
            SlotKind::Range { offset, size } => ResourceKind::Memory {
                start: base.checked_add(offset)?,
                size,
            },
            SlotKind::Irq(line) => ResourceKind::Interrupt(irqs.line(line)?),
        };
        table.push(Resource {
            name: slot.name,
            kind,
        });
    }
    Some(table.into())
}
