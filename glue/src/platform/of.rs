//! [Description] backed by a flattened device tree.

use super::{AssignedClock, Description, IoRange, NodeRef, PlatformResult, Specifier};
use crate::{error::PlatformError, resource::Irq};
use alloc::{collections::btree_map::BTreeMap, vec, vec::Vec};
use dt::{
    fdt::reader::{FdtError, FdtReader},
    node::{DeviceTree, Node, PhandleArgs},
};
use log::warn;
use spin::Mutex;

/// GIC specifier kinds, first cell of a 3-cell interrupt specifier.
const GIC_SPI: u32 = 0;
const GIC_PPI: u32 = 1;
/// Hardware interrupt number of SPI 0 and PPI 0.
const GIC_SPI_BASE: u32 = 32;
const GIC_PPI_BASE: u32 = 16;

pub struct DtDescription {
    tree: DeviceTree,
    /// Outstanding references per node id.
    refs: Mutex<BTreeMap<usize, usize>>,
}

impl DtDescription {
    pub fn new(tree: DeviceTree) -> DtDescription {
        DtDescription {
            tree,
            refs: Mutex::new(BTreeMap::new()),
        }
    }

    /// Parse the blob at `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must point at a readable flattened device tree that stays valid for the call.
    pub unsafe fn from_fdt(ptr: *const u8) -> Result<DtDescription, FdtError> {
        unsafe { FdtReader::new(ptr) }.read().map(DtDescription::new)
    }

    pub fn tree(&self) -> &DeviceTree {
        &self.tree
    }

    /// References currently held on `node`.
    pub fn node_refs(&self, node: NodeRef) -> usize {
        self.refs.lock().get(&*node).copied().unwrap_or(0)
    }

    fn node(&self, node: NodeRef) -> PlatformResult<&Node> {
        self.tree.get_node_by_id(*node).ok_or(PlatformError::NoDevice)
    }

    fn clock_list(&self, node: &Node, list_prop: &str) -> PlatformResult<Vec<PhandleArgs>> {
        match self.tree.get_property(node, list_prop) {
            Some(_) => Ok(self.tree.get_phandle_list(node, list_prop, "#clock-cells")?),
            None => Ok(vec![]),
        }
    }
}

/// Translate an interrupt specifier into a hardware interrupt number.
fn map_irq(args: &[u32]) -> PlatformResult<Irq> {
    match *args {
        [GIC_SPI, num, _] => num.checked_add(GIC_SPI_BASE),
        [GIC_PPI, num, _] => num.checked_add(GIC_PPI_BASE),
        [_, _, _] => None,
        [num] | [num, _] => Some(num),
        _ => None,
    }
    .ok_or(PlatformError::InvalidArgument)
}

impl Description for DtDescription {
    fn find_compatible(&self, compatible: &str) -> Option<NodeRef> {
        let node = self.tree.find_compatible(compatible)?;
        *self.refs.lock().entry(node.node_id).or_insert(0) += 1;
        Some(NodeRef::from(node.node_id))
    }

    fn put_node(&self, node: NodeRef) {
        let mut refs = self.refs.lock();
        match refs.get_mut(&*node) {
            Some(count) if *count > 1 => *count -= 1,
            Some(_) => {
                refs.remove(&*node);
            }
            None => warn!("put of unreferenced node {}", *node),
        }
    }

    fn assigned_clocks(&self, node: NodeRef) -> PlatformResult<Vec<AssignedClock>> {
        let node = self.node(node)?;
        let clocks = self.clock_list(node, "assigned-clocks")?;
        if clocks.is_empty() {
            return Ok(vec![]);
        }
        let parents = self.clock_list(node, "assigned-clock-parents")?;
        let rates = match self.tree.get_property(node, "assigned-clock-rates") {
            Some(prop) => prop.value_as_cells()?,
            None => vec![],
        };
        Ok(clocks
            .into_iter()
            .enumerate()
            .filter(|(_, clock)| clock.phandle != 0)
            .map(|(index, clock)| AssignedClock {
                clock: clock.into(),
                parent: parents
                    .get(index)
                    .filter(|parent| parent.phandle != 0)
                    .cloned()
                    .map(Specifier::from),
                rate: rates.get(index).copied().filter(|rate| *rate != 0),
            })
            .collect())
    }

    fn clock(&self, node: NodeRef, name: &str) -> PlatformResult<Specifier> {
        let node = self.node(node)?;
        let index = self.tree.index_of_name(node, "clock-names", name)?;
        let spec = self
            .tree
            .get_phandle_args(node, "clocks", "#clock-cells", index)?;
        Ok(spec.into())
    }

    fn reset(&self, node: NodeRef, name: Option<&str>) -> PlatformResult<Specifier> {
        let node = self.node(node)?;
        let index = match name {
            Some(name) => self.tree.index_of_name(node, "reset-names", name)?,
            None => 0,
        };
        let spec = self
            .tree
            .get_phandle_args(node, "resets", "#reset-cells", index)?;
        Ok(spec.into())
    }

    fn address(&self, node: NodeRef, index: usize) -> PlatformResult<IoRange> {
        let node = self.node(node)?;
        Ok(self.tree.get_translated_reg(node, index)?.into())
    }

    fn irq_by_name(&self, node: NodeRef, name: &str) -> PlatformResult<Irq> {
        let node = self.node(node)?;
        map_irq(&self.tree.get_interrupt_by_name(node, name)?.args)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use dt::fdt::writer::{FdtBlob, FdtWriter};

    pub(crate) const GIC: u32 = 1;
    pub(crate) const CCU: u32 = 2;
    pub(crate) const RESET: u32 = 3;

    /// A sun7i-a20 shaped tree: GIC interrupts, a CCU, a reset controller and a dual-core
    /// Mali-400 behind a `soc` bus that maps 1:1.
    pub(crate) fn sun7i_blob(cores: usize) -> FdtBlob {
        let names: &[&str] = if cores == 2 {
            &["IRQGP", "IRQGPMMU", "IRQPP0", "IRQPPMMU0", "IRQPP1", "IRQPPMMU1", "IRQPMU"]
        } else {
            &["IRQGP", "IRQGPMMU", "IRQPP0", "IRQPPMMU0", "IRQPMU"]
        };
        let spis: &[u32] = if cores == 2 {
            &[69, 70, 71, 72, 74, 75, 73]
        } else {
            &[69, 70, 71, 72, 73]
        };
        let interrupts: Vec<u32> = spis.iter().flat_map(|spi| [GIC_SPI, *spi, 4]).collect();

        let mut w = FdtWriter::new();
        w.begin_node("")
            .property_u32("#address-cells", 1)
            .property_u32("#size-cells", 1)
            .property_u32("interrupt-parent", GIC);
        w.begin_node("soc")
            .property_string("compatible", "simple-bus")
            .property_u32("#address-cells", 1)
            .property_u32("#size-cells", 1)
            .property_empty("ranges");
        w.begin_node("interrupt-controller@1c81000")
            .property_string("compatible", "arm,cortex-a7-gic")
            .property_u32("#interrupt-cells", 3)
            .property_u32("phandle", GIC)
            .end_node();
        w.begin_node("clock@1c20000")
            .property_string("compatible", "allwinner,sun7i-a20-ccu")
            .property_u32("#clock-cells", 1)
            .property_u32("#reset-cells", 1)
            .property_u32("phandle", CCU)
            .end_node();
        w.begin_node("reset@1c20000")
            .property_u32("#reset-cells", 1)
            .property_u32("phandle", RESET)
            .end_node();
        w.begin_node("gpu@1c40000")
            .property_strings("compatible", &["allwinner,sun7i-a20-mali", "arm,mali-400"])
            .property_cells("reg", &[0x01c4_0000, 0x10000])
            .property_cells("interrupts", &interrupts)
            .property_strings("interrupt-names", names)
            .property_cells("clocks", &[CCU, 11, CCU, 12])
            .property_strings("clock-names", &["ahb", "mod"])
            .property_cells("resets", &[RESET, 20])
            .property_cells("assigned-clocks", &[CCU, 12])
            .property_cells("assigned-clock-rates", &[384_000_000])
            .end_node();
        w.finish()
    }

    fn description(cores: usize) -> DtDescription {
        let blob = sun7i_blob(cores);
        unsafe { DtDescription::from_fdt(blob.as_ptr()) }.unwrap()
    }

    #[test]
    fn test_node_references_are_counted() {
        let desc = description(1);
        let node = desc.find_compatible("arm,mali-400").unwrap();
        assert_eq!(desc.node_refs(node), 1);
        let again = desc.find_compatible("allwinner,sun7i-a20-mali").unwrap();
        assert_eq!(node, again);
        assert_eq!(desc.node_refs(node), 2);
        desc.put_node(again);
        desc.put_node(node);
        assert_eq!(desc.node_refs(node), 0);
        assert!(desc.find_compatible("arm,mali-450").is_none());
    }

    #[test]
    fn test_clock_and_reset_specifiers() {
        let desc = description(1);
        let node = desc.find_compatible("arm,mali-400").unwrap();
        assert_eq!(
            desc.clock(node, "mod"),
            Ok(Specifier {
                phandle: CCU,
                args: vec![12]
            })
        );
        assert_eq!(desc.clock(node, "bus"), Err(PlatformError::NotFound));
        assert_eq!(desc.reset(node, None).map(|s| s.args), Ok(vec![20]));
        assert_eq!(desc.reset(node, Some("gpu")), Err(PlatformError::NotFound));
    }

    #[test]
    fn test_assigned_clocks() {
        let desc = description(1);
        let node = desc.find_compatible("arm,mali-400").unwrap();
        assert_eq!(
            desc.assigned_clocks(node),
            Ok(vec![AssignedClock {
                clock: Specifier {
                    phandle: CCU,
                    args: vec![12]
                },
                parent: None,
                rate: Some(384_000_000),
            }])
        );
    }

    #[test]
    fn test_address_and_interrupts() {
        let desc = description(2);
        let node = desc.find_compatible("arm,mali-400").unwrap();
        assert_eq!(*desc.address(node, 0).unwrap(), 0x01c4_0000..0x01c5_0000);
        assert_eq!(desc.irq_by_name(node, "IRQGP"), Ok(101));
        assert_eq!(desc.irq_by_name(node, "IRQPMU"), Ok(105));
        assert_eq!(desc.irq_by_name(node, "IRQPPMMU1"), Ok(107));

        let desc = description(1);
        let node = desc.find_compatible("arm,mali-400").unwrap();
        assert_eq!(desc.irq_by_name(node, "IRQPP1"), Err(PlatformError::NotFound));
    }

    #[test]
    fn test_wrapping_reg_is_invalid() {
        let mut w = FdtWriter::new();
        w.begin_node("")
            .property_u32("#address-cells", 2)
            .property_u32("#size-cells", 2);
        w.begin_node("gpu@ffffffff")
            .property_string("compatible", "arm,mali-400")
            .property_cells("reg", &[0xffff_ffff, 0xffff_f000, 0, 0x2000])
            .end_node();
        let blob = w.finish();
        let desc = unsafe { DtDescription::from_fdt(blob.as_ptr()) }.unwrap();
        let node = desc.find_compatible("arm,mali-400").unwrap();
        assert_eq!(desc.address(node, 0), Err(PlatformError::InvalidArgument));
    }

    #[test]
    fn test_irq_specifier_widths() {
        assert_eq!(map_irq(&[GIC_PPI, 9, 4]), Ok(25));
        assert_eq!(map_irq(&[7, 9, 4]), Err(PlatformError::InvalidArgument));
        assert_eq!(map_irq(&[44]), Ok(44));
        assert_eq!(map_irq(&[44, 1]), Ok(44));
        assert_eq!(map_irq(&[]), Err(PlatformError::InvalidArgument));
    }
}
