use crate::prop::{Property, PropertyError};
use alloc::{boxed::Box, collections::btree_map::BTreeMap, string::String, vec, vec::Vec};
use core::ops::Range;

pub struct DeviceTree {
    pub root_id: usize,
    pub container: Vec<Node>,
    pub mem_rsv_map: Vec<Range<usize>>,
    pub phandle_map: BTreeMap<u32, usize>,
}

pub struct Node {
    pub node_id: usize,
    pub parent_id: usize,
    pub full_name: Box<str>,
    pub node_name: Box<str>,
    pub unit_addr: Box<str>,
    pub children: Vec<usize>,
    pub props: Vec<Property>,
    pub node_type: NodeType,
}

#[derive(PartialEq, Eq, Debug)]
pub enum NodeType {
    Device,
    Description,
}

/// A phandle reference with its specifier cells, as found in `clocks`, `resets`,
/// `interrupts-extended` and similar lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhandleArgs {
    pub node_id: usize,
    pub phandle: u32,
    pub args: Vec<u32>,
}

const DEFAULT_ADDRESS_CELLS: usize = 2;
const DEFAULT_SIZE_CELLS: usize = 1;

/// Fold big-endian cells into one number. Cells beyond 64 bits are dropped from the top.
fn fold_cells(cells: &[u32]) -> u64 {
    cells
        .iter()
        .fold(0u64, |acc, c| acc.wrapping_shl(32) | *c as u64)
}

impl DeviceTree {
    pub fn is_root(&self, node: &Node) -> bool {
        self.get_parent(node).node_id == node.node_id
    }
    fn full_path(&self, node: &Node) -> String {
        if self.is_root(node) {
            String::from("")
        } else {
            self.full_path(self.get_parent(node)) + "/" + node.full_name.as_ref()
        }
    }
    pub fn get_full_path(&self, node: &Node) -> Box<str> {
        self.full_path(node).into_boxed_str()
    }
    pub fn get_root(&self) -> &Node {
        &self.container[self.root_id]
    }
    pub fn get_parent(&self, node: &Node) -> &Node {
        &self.container[node.parent_id]
    }
    pub fn get_node_by_id(&self, node_id: usize) -> Option<&Node> {
        self.container.get(node_id)
    }
    pub fn get_node_by_phandle(&self, phandle: u32) -> Option<&Node> {
        self.phandle_map
            .get(&phandle)
            .and_then(|id| self.get_node_by_id(*id))
    }
    pub fn get_children<'b>(&'b self, node: &Node) -> impl DoubleEndedIterator<Item = &'b Node> {
        node.children.iter().map(|x| &self.container[*x])
    }
    pub fn get_property<'b>(&self, node: &'b Node, name: impl AsRef<str>) -> Option<&'b Property> {
        let name = name.as_ref();
        node.props.iter().find(|prop| prop.name.as_ref().eq(name))
    }
    pub fn get_node(&self, path: impl AsRef<str>) -> Option<&Node> {
        let path_str = path.as_ref();
        let mut node = self.get_root();
        for section in path_str.split('/') {
            if section.trim().is_empty() {
                continue;
            }
            node = self
                .get_children(node)
                .find(|subnode| subnode.full_name.as_ref().eq(section))?;
        }
        Some(node)
    }
    pub fn get_node_mut(&mut self, path: impl AsRef<str>) -> Option<&mut Node> {
        let node_id = self.get_node(path)?.node_id;
        self.container.get_mut(node_id)
    }
    pub fn get_nodes(&self, path: impl AsRef<str>) -> Vec<&Node> {
        let path_str = path.as_ref();
        let path: Vec<&str> = path_str.split('/').collect();
        self.get_sub_nodes(self.get_root(), &path, 0)
    }
    pub fn get_nodes_mut<F: Fn(&mut Node)>(&mut self, path: impl AsRef<str>, f: F) {
        let ids: Vec<usize> = self.get_nodes(path).iter().map(|x| x.node_id).collect();
        for id in ids {
            f(&mut self.container[id]);
        }
    }
    fn get_sub_nodes<'b>(&'b self, node: &'b Node, path: &[&str], mut cursor: usize) -> Vec<&'b Node> {
        while cursor < path.len() && path[cursor].trim().is_empty() {
            cursor += 1;
        }
        if cursor >= path.len() {
            return vec![node];
        }
        let sec = path[cursor];
        self.get_children(node)
            .flat_map(|child| {
                if sec.eq("*")
                    || child.full_name.as_ref().eq(sec)
                    || child.node_name.as_ref().eq(sec)
                {
                    self.get_sub_nodes(child, path, cursor + 1)
                } else {
                    vec![]
                }
            })
            .collect()
    }

    /// All nodes in source order: a parent precedes its children, siblings keep their order.
    pub fn walk(&self) -> Vec<&Node> {
        let mut res = vec![];
        let mut stack = vec![self.get_root()];
        while let Some(node) = stack.pop() {
            res.push(node);
            stack.extend(self.get_children(node).rev());
        }
        res
    }

    /// Whether the node's `status` allows a driver to bind it.
    pub fn is_available(&self, node: &Node) -> bool {
        match self.get_property(node, "status") {
            None => true,
            Some(prop) => matches!(prop.value_as_str(), Ok("okay") | Ok("ok")),
        }
    }

    /// Whether any entry of the node's `compatible` list equals `compat`.
    pub fn is_compatible(&self, node: &Node, compat: &str) -> bool {
        self.get_property(node, "compatible")
            .and_then(|prop| prop.value_as_strlist().ok())
            .is_some_and(|list| list.contains(&compat))
    }

    /// First available node, in source order, compatible with `compat`.
    pub fn find_compatible(&self, compat: &str) -> Option<&Node> {
        self.walk()
            .into_iter()
            .find(|node| self.is_compatible(node, compat) && self.is_available(node))
    }

    fn cells_of(&self, node: &Node, name: &str, default: usize) -> Result<usize, PropertyError> {
        match self.get_property(node, name) {
            Some(prop) => Ok(prop.value_as_u32()? as usize),
            None => Ok(default),
        }
    }

    /// `(#address-cells, #size-cells)` that apply to the `reg` of `node`'s children.
    pub fn child_cells(&self, node: &Node) -> Result<(usize, usize), PropertyError> {
        Ok((
            self.cells_of(node, "#address-cells", DEFAULT_ADDRESS_CELLS)?,
            self.cells_of(node, "#size-cells", DEFAULT_SIZE_CELLS)?,
        ))
    }

    pub fn get_reg_value(&self, node: &Node) -> Result<Vec<Range<usize>>, PropertyError> {
        let (addr_cel, size_cel) = if self.is_root(node) {
            (DEFAULT_ADDRESS_CELLS, DEFAULT_SIZE_CELLS)
        } else {
            self.child_cells(self.get_parent(node))?
        };
        let reg = self
            .get_property(node, "reg")
            .ok_or(PropertyError::PropNotFound)?
            .value_as_cells()?;
        let width = size_cel + addr_cel;
        if width == 0 {
            return Err(PropertyError::InvalidPropFormat);
        }
        reg.chunks_exact(width)
            .map(|entry| {
                let addr = fold_cells(&entry[..addr_cel]) as usize;
                let sz = fold_cells(&entry[addr_cel..]) as usize;
                let end = addr.checked_add(sz).ok_or(PropertyError::InvalidPropFormat)?;
                Ok(addr..end)
            })
            .collect()
    }

    /// Translate a bus address of `node` into the root address space by walking every
    /// ancestor's `ranges`.
    ///
    /// An empty `ranges` is an identity mapping; a bus without `ranges` cannot be crossed.
    pub fn translate_address(&self, node: &Node, addr: usize) -> Result<usize, PropertyError> {
        let mut addr = addr as u64;
        let mut bus = self.get_parent(node);
        while !self.is_root(bus) {
            let ranges = self
                .get_property(bus, "ranges")
                .ok_or(PropertyError::Untranslatable)?;
            if !ranges.is_empty() {
                let (child_cel, size_cel) = self.child_cells(bus)?;
                let (parent_cel, _) = self.child_cells(self.get_parent(bus))?;
                let width = child_cel + parent_cel + size_cel;
                if width == 0 {
                    return Err(PropertyError::InvalidPropFormat);
                }
                let cells = ranges.value_as_cells()?;
                let (child, parent) = cells
                    .chunks_exact(width)
                    .map(|entry| {
                        let child = fold_cells(&entry[..child_cel]);
                        let parent = fold_cells(&entry[child_cel..child_cel + parent_cel]);
                        let size = fold_cells(&entry[child_cel + parent_cel..]);
                        (child, parent, size)
                    })
                    .find(|(child, _, size)| *child <= addr && addr - *child < *size)
                    .map(|(child, parent, _)| (child, parent))
                    .ok_or(PropertyError::Untranslatable)?;
                addr = parent
                    .checked_add(addr - child)
                    .ok_or(PropertyError::InvalidPropFormat)?;
            }
            bus = self.get_parent(bus);
        }
        Ok(addr as usize)
    }

    /// The `index`-th `reg` entry of `node`, translated to the root address space.
    pub fn get_translated_reg(&self, node: &Node, index: usize) -> Result<Range<usize>, PropertyError> {
        let reg = self
            .get_reg_value(node)?
            .get(index)
            .cloned()
            .ok_or(PropertyError::PropNotFound)?;
        let start = self.translate_address(node, reg.start)?;
        let end = start
            .checked_add(reg.len())
            .ok_or(PropertyError::InvalidPropFormat)?;
        Ok(start..end)
    }

    /// Position of `name` inside the string list `names_prop` (e.g. `clock-names`).
    pub fn index_of_name(&self, node: &Node, names_prop: &str, name: &str) -> Result<usize, PropertyError> {
        self.get_property(node, names_prop)
            .ok_or(PropertyError::PropNotFound)?
            .value_as_strlist()?
            .iter()
            .position(|n| *n == name)
            .ok_or(PropertyError::NameNotFound)
    }

    /// Decode a phandle list such as `clocks`, where each provider states its specifier
    /// width in `cells_prop` (e.g. `#clock-cells`).
    pub fn get_phandle_list(
        &self,
        node: &Node,
        list_prop: &str,
        cells_prop: &str,
    ) -> Result<Vec<PhandleArgs>, PropertyError> {
        let data = self
            .get_property(node, list_prop)
            .ok_or(PropertyError::PropNotFound)?
            .value_as_cells()?;
        let mut res = vec![];
        let mut index = 0;
        while index < data.len() {
            let phandle = data[index];
            index += 1;
            // a zero phandle is an empty slot with no specifier, kept so indexes stay aligned
            if phandle == 0 {
                res.push(PhandleArgs {
                    node_id: self.root_id,
                    phandle,
                    args: vec![],
                });
                continue;
            }
            let provider = self
                .get_node_by_phandle(phandle)
                .ok_or(PropertyError::DanglingHandle)?;
            let count = self
                .get_property(provider, cells_prop)
                .ok_or(PropertyError::InvalidPropFormat)?
                .value_as_u32()? as usize;
            let args = data
                .get(index..index + count)
                .ok_or(PropertyError::InvalidPropFormat)?;
            res.push(PhandleArgs {
                node_id: provider.node_id,
                phandle,
                args: args.to_vec(),
            });
            index += count;
        }
        Ok(res)
    }

    /// The `index`-th entry of a phandle list.
    pub fn get_phandle_args(
        &self,
        node: &Node,
        list_prop: &str,
        cells_prop: &str,
        index: usize,
    ) -> Result<PhandleArgs, PropertyError> {
        self.get_phandle_list(node, list_prop, cells_prop)?
            .into_iter()
            .nth(index)
            .ok_or(PropertyError::PropNotFound)
    }

    /// The interrupt controller `node` reports to, from `interrupt-parent` on the node or its
    /// closest ancestor.
    pub fn get_interrupt_parent(&self, node: &Node) -> Result<&Node, PropertyError> {
        let mut cur = node;
        loop {
            if let Some(prop) = self.get_property(cur, "interrupt-parent") {
                return self
                    .get_node_by_phandle(prop.value_as_u32()?)
                    .ok_or(PropertyError::DanglingHandle);
            }
            if self.is_root(cur) {
                return Err(PropertyError::PropNotFound);
            }
            cur = self.get_parent(cur);
        }
    }

    /// The `index`-th interrupt specifier of `node`, from `interrupts-extended` when present,
    /// otherwise from `interrupts` and the interrupt parent.
    pub fn get_interrupt(&self, node: &Node, index: usize) -> Result<PhandleArgs, PropertyError> {
        if self.get_property(node, "interrupts-extended").is_some() {
            return self.get_phandle_args(node, "interrupts-extended", "#interrupt-cells", index);
        }
        let data = self
            .get_property(node, "interrupts")
            .ok_or(PropertyError::PropNotFound)?
            .value_as_cells()?;
        let parent = self.get_interrupt_parent(node)?;
        let cells = self.cells_of(parent, "#interrupt-cells", 1)?;
        if cells == 0 {
            return Err(PropertyError::InvalidPropFormat);
        }
        let args = data
            .chunks_exact(cells)
            .nth(index)
            .ok_or(PropertyError::PropNotFound)?;
        Ok(PhandleArgs {
            node_id: parent.node_id,
            phandle: self
                .get_property(parent, "phandle")
                .and_then(|p| p.value_as_u32().ok())
                .unwrap_or(0),
            args: args.to_vec(),
        })
    }

    pub fn get_interrupt_by_name(&self, node: &Node, name: &str) -> Result<PhandleArgs, PropertyError> {
        let index = self.index_of_name(node, "interrupt-names", name)?;
        self.get_interrupt(node, index)
    }
}
