use core::{mem::swap, ops::Range, slice, str};

use crate::{
    fdt::{FDT_MAGIC, FDT_VERSION, FdtHeader, FdtNodeType, LAST_COMP_VERSION, ReservedMemoryEntry},
    node::{DeviceTree, Node, NodeType},
    prop::Property,
};
use alloc::{boxed::Box, collections::btree_map::BTreeMap, vec, vec::Vec};
use utils::{
    endian::{BigEndian32, EndianData},
    num::AlignableTo,
};

pub struct FdtReader {
    header_ptr: *const BigEndian32,
    cursor: *const BigEndian32,
    nodes: Vec<Node>,
}

/// Basic Reader Functions
impl FdtReader {
    /// Read a 32-bit big-endian word from `ptr` without advancing the pointer.
    #[inline(always)]
    fn peek_u32(&mut self) -> u32 {
        unsafe { (*self.cursor).value() }
    }

    /// Advance the pointer by 4 bytes.
    #[inline(always)]
    fn advance(&mut self) {
        unsafe {
            self.cursor = self.cursor.add(1);
        }
    }

    /// Advance the pointer by specific bytes and align the pointer to 4 bytes.
    #[inline(always)]
    fn advance_bytes_aligned(&mut self, step: usize) {
        self.cursor = (self.cursor as usize + step).align_up(4) as *const BigEndian32
    }

    /// Read a 32-bit big-endian word from `ptr` and advance the pointer by 4 bytes.
    #[inline(always)]
    fn read_u32(&mut self) -> u32 {
        let res = self.peek_u32();
        self.advance();
        res
    }

    /// Read `len` bytes starting at `ptr` and advance `ptr` to the next 4-byte aligned position.
    #[inline(always)]
    fn readbytes_aligned<'a>(&mut self, len: usize) -> &'a [u8] {
        let res = unsafe { slice::from_raw_parts(self.cursor as *const u8, len) };
        self.advance_bytes_aligned(len);
        res
    }

    /// Advance `ptr` past NOPs to the next meaningful token.
    #[inline(always)]
    fn skip(&mut self) {
        while self.peek_u32() == FdtNodeType::FDT_NOP.bits() {
            self.advance();
        }
    }

    /// Read a NUL-terminated string from `ptr` and advance `ptr` past the terminator, aligned.
    #[inline(always)]
    fn readstr_aligned<'a>(&mut self) -> Result<&'a str, FdtError> {
        let start = self.cursor as *const u8;
        let mut len = 0;
        unsafe {
            while *start.add(len) != 0 {
                len += 1;
            }
            self.advance_bytes_aligned(len + 1);
            str::from_utf8(slice::from_raw_parts(start, len)).map_err(|_| FdtError::InvalidString {
                cursor: start as usize,
            })
        }
    }

    /// Read a tag word and verify it equals `supposed`.
    ///
    /// Returns `Ok(())` if the tag matches, otherwise returns
    /// `FdtError::InvalidNodeType` with the current tag and pointer.
    fn read_and_check(&mut self, supposed: FdtNodeType) -> Result<(), FdtError> {
        let node_type = self.read_u32();
        if node_type != supposed.bits() {
            return Err(FdtError::InvalidNodeType {
                node_type: node_type as usize,
                cursor: self.cursor as usize,
            });
        }
        Ok(())
    }
}

impl FdtReader {
    // region: constructor

    /// Create a reader over a raw FDT blob in memory.
    ///
    /// This does not validate the blob; call `validate()` before `read()`.
    ///
    /// # Safety
    /// `ptr` must be 8-byte aligned and point to a readable FDT image that stays alive and
    /// unmodified while the reader is used.
    #[inline(always)]
    pub unsafe fn new(ptr: *const u8) -> FdtReader {
        FdtReader {
            cursor: ptr as *const BigEndian32,
            header_ptr: ptr as *const BigEndian32,
            nodes: vec![],
        }
    }

    // endregion

    // region: helper methods:

    #[inline(always)]
    fn get_pointer8(&self, offset: usize) -> *const u8 {
        unsafe { (self.header_ptr as *const u8).add(offset) }
    }

    #[inline(always)]
    fn get_pointer32(&self, offset: usize) -> *const BigEndian32 {
        self.get_pointer8(offset) as *const BigEndian32
    }

    #[inline(always)]
    fn get_end8(&self) -> *const u8 {
        self.get_pointer8(self.get_header().totalsize.value() as usize)
    }

    // endregion

    /// Return a reference to the FDT header.
    ///
    /// Note: this only performs a pointer cast. The header contents should be
    /// validated with `validate()` before relying on the fields.
    #[inline(always)]
    pub fn get_header(&self) -> &FdtHeader {
        unsafe { &*(self.header_ptr as *const FdtHeader) }
    }

    /// Validate the FDT header (magic number and compatible version range).
    pub fn validate(&self) -> Result<(), FdtError> {
        let header = self.get_header();
        let magic = header.magic.value();

        if magic != FDT_MAGIC {
            return Err(FdtError::InvalidMagic {
                magic: magic as usize,
            });
        }

        // We read version 17, and accept blobs down to version 16
        let version = header.version.value();
        if version < LAST_COMP_VERSION || header.last_comp_version.value() > FDT_VERSION {
            return Err(FdtError::IncompatibleVersion {
                version: version as usize,
            });
        }
        Ok(())
    }

    /// Read a null-terminated string from the FDT string table at `offset`.
    pub fn get_string<'a>(&self, offset: usize) -> Result<&'a str, FdtError> {
        let s = self.get_pointer8(self.get_header().off_dt_strings.value() as usize + offset);
        let bound = self.get_end8();
        let mut len = 0;
        unsafe {
            while s.add(len) < bound && *s.add(len) != 0 {
                len += 1;
            }
            str::from_utf8(slice::from_raw_parts(s, len)).map_err(|_| FdtError::InvalidString {
                cursor: s as usize,
            })
        }
    }

    /// Read consecutive property entries from the structure block and return them.
    ///
    /// Stops when a non-`FDT_PROP` tag is encountered and returns the collected props.
    fn read_props(&mut self) -> Result<Vec<Property>, FdtError> {
        let mut res = Vec::<Property>::new();
        loop {
            self.skip();
            if self.peek_u32() != FdtNodeType::FDT_PROP.bits() {
                break Ok(res);
            }
            self.read_u32();
            let len = self.read_u32() as usize;
            let name_offset = self.read_u32() as usize;
            let name = Box::from(self.get_string(name_offset)?);
            let data = Box::from(self.readbytes_aligned(len));
            res.push(Property { name, data });
        }
    }

    /// Parse a single node (name, properties and child nodes) from the structure block without setting its parent.
    ///
    /// Recursively parses subnodes until the matching `FDT_END_NODE` is found.
    fn read_node(&mut self) -> Result<usize, FdtError> {
        self.skip();
        self.read_and_check(FdtNodeType::FDT_BEGIN_NODE)?;
        let full_name = self.readstr_aligned()?;
        let (node_name, unit_addr) = match full_name.find('@') {
            Some(idx) => (&full_name[0..idx], &full_name[idx + 1..]),
            None => (full_name, ""),
        };
        let props = self.read_props()?;
        let mut children = vec![];
        loop {
            self.skip();
            let nodetype = self.peek_u32();
            if nodetype == FdtNodeType::FDT_BEGIN_NODE.bits() {
                children.push(self.read_node()?);
            } else if nodetype == FdtNodeType::FDT_END_NODE.bits() {
                self.advance();
                break;
            } else {
                return Err(FdtError::InvalidNodeType {
                    node_type: nodetype as usize,
                    cursor: self.cursor as usize,
                });
            }
        }
        let id = self.nodes.len();
        let node = Node {
            node_id: id,
            parent_id: 0,
            full_name: Box::from(full_name),
            node_name: Box::from(node_name),
            unit_addr: Box::from(unit_addr),
            children,
            props,
            node_type: NodeType::Device,
        };
        self.nodes.push(node);
        Ok(id)
    }

    fn set_parent(&mut self, node_id: usize) {
        for child_idx in 0..self.nodes[node_id].children.len() {
            let sub_id = self.nodes[node_id].children[child_idx];
            self.nodes[sub_id].parent_id = node_id;
            self.set_parent(sub_id);
        }
    }

    /// Get the memory reservation map. The reserved memory block is not aligned.
    ///
    /// **The reserved memory block are not promised to be not overlapped**
    ///
    /// Automatically add the fdt itself to the reservation block.
    fn get_mem_rsv_map(&self) -> Vec<Range<usize>> {
        let header = self.get_header();
        let mut ptr =
            self.get_pointer8(header.off_mem_rsvmap.value() as usize) as *const ReservedMemoryEntry;
        let mut res = Vec::new();

        let self_range = Range {
            start: (self.header_ptr as usize),
            end: (self.header_ptr as usize + header.totalsize.value() as usize),
        };

        unsafe {
            loop {
                let block = *ptr;
                let addr = block.addr.value() as usize;
                let size = block.size.value() as usize;
                if addr == 0 && size == 0 {
                    break;
                }
                res.push(addr..addr + size);
                ptr = ptr.add(1);
            }
        }
        res.push(self_range);
        res
    }

    fn collect_phandles(nodes: &[Node]) -> BTreeMap<u32, usize> {
        let mut map = BTreeMap::new();
        for node in nodes {
            let phandle = node
                .props
                .iter()
                .find(|p| p.name.as_ref() == "phandle" || p.name.as_ref() == "linux,phandle");
            if let Some(value) = phandle.and_then(|p| p.value_as_u32().ok()) {
                map.insert(value, node.node_id);
            }
        }
        map
    }

    fn read_internal(&mut self) -> Result<DeviceTree, FdtError> {
        self.validate()?;
        self.cursor = self.get_pointer32(self.get_header().off_dt_struct.value() as usize);
        let root_id = self.read_node()?;
        self.set_parent(root_id);
        self.nodes[root_id].parent_id = root_id;
        self.skip();
        self.read_and_check(FdtNodeType::FDT_END)?;

        let mut tree = DeviceTree {
            root_id,
            container: vec![],
            mem_rsv_map: self.get_mem_rsv_map(),
            phandle_map: Self::collect_phandles(&self.nodes),
        };
        swap(&mut self.nodes, &mut tree.container);
        if let Some(node) = tree.get_node_mut("/aliases") {
            node.node_type = NodeType::Description;
        }
        tree.get_nodes_mut("/memory", |node| {
            node.node_type = NodeType::Description;
        });
        if let Some(node) = tree.get_node_mut("/reserved-memory") {
            node.node_type = NodeType::Description;
        }
        if let Some(node) = tree.get_node_mut("/chosen") {
            node.node_type = NodeType::Description;
        }
        Ok(tree)
    }

    /// Validate the header and parse the entire structure block into a [DeviceTree].
    ///
    /// All strings and byte-array data will be **copied**, and the raw data of fdt can be safely wiped afterwards.
    pub fn read(&mut self) -> Result<DeviceTree, FdtError> {
        match self.read_internal() {
            Ok(res) => Ok(res),
            Err(err) => {
                log::warn!("device tree rejected: {:?}", err);
                self.cursor = self.header_ptr;
                self.nodes.clear();
                Err(err)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FdtError {
    InvalidNodeType { node_type: usize, cursor: usize },
    InvalidMagic { magic: usize },
    IncompatibleVersion { version: usize },
    InvalidString { cursor: usize },
}
