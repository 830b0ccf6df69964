//! Serialize a device tree into the flattened (FDT) binary format.
//!
//! The writer emits nodes in the order they are opened, so callers describe a tree the same way
//! a `.dts` source reads. The resulting [FdtBlob] is 8-byte aligned and can be handed straight
//! to [super::reader::FdtReader].

use super::{FDT_MAGIC, FDT_VERSION, FdtNodeType, LAST_COMP_VERSION};
use alloc::{string::String, vec, vec::Vec};
use utils::num::AlignableTo;

const HEADER_SIZE: usize = 40;
const RSVMAP_ENTRY_SIZE: usize = 16;

pub struct FdtWriter {
    structs: Vec<u8>,
    strings: Vec<u8>,
    string_offsets: Vec<(String, u32)>,
    depth: usize,
}

impl FdtWriter {
    pub fn new() -> FdtWriter {
        FdtWriter {
            structs: vec![],
            strings: vec![],
            string_offsets: vec![],
            depth: 0,
        }
    }

    fn push_word(&mut self, word: u32) {
        self.structs.extend_from_slice(&word.to_be_bytes());
    }

    fn push_padded(&mut self, data: &[u8]) {
        self.structs.extend_from_slice(data);
        let aligned = self.structs.len().align_up(4);
        self.structs.resize(aligned, 0);
    }

    fn string_offset(&mut self, name: &str) -> u32 {
        if let Some((_, off)) = self.string_offsets.iter().find(|(s, _)| s == name) {
            return *off;
        }
        let off = self.strings.len() as u32;
        self.strings.extend_from_slice(name.as_bytes());
        self.strings.push(0);
        self.string_offsets.push((String::from(name), off));
        off
    }

    pub fn begin_node(&mut self, name: &str) -> &mut Self {
        self.push_word(FdtNodeType::FDT_BEGIN_NODE.bits());
        let mut raw = Vec::with_capacity(name.len() + 1);
        raw.extend_from_slice(name.as_bytes());
        raw.push(0);
        self.push_padded(&raw);
        self.depth += 1;
        self
    }

    pub fn end_node(&mut self) -> &mut Self {
        self.push_word(FdtNodeType::FDT_END_NODE.bits());
        self.depth = self.depth.saturating_sub(1);
        self
    }

    pub fn property(&mut self, name: &str, data: &[u8]) -> &mut Self {
        let name_off = self.string_offset(name);
        self.push_word(FdtNodeType::FDT_PROP.bits());
        self.push_word(data.len() as u32);
        self.push_word(name_off);
        self.push_padded(data);
        self
    }

    pub fn property_empty(&mut self, name: &str) -> &mut Self {
        self.property(name, &[])
    }

    pub fn property_u32(&mut self, name: &str, value: u32) -> &mut Self {
        self.property(name, &value.to_be_bytes())
    }

    pub fn property_cells(&mut self, name: &str, cells: &[u32]) -> &mut Self {
        let data: Vec<u8> = cells.iter().flat_map(|c| c.to_be_bytes()).collect();
        self.property(name, &data)
    }

    pub fn property_string(&mut self, name: &str, value: &str) -> &mut Self {
        self.property_strings(name, &[value])
    }

    pub fn property_strings(&mut self, name: &str, values: &[&str]) -> &mut Self {
        let mut data = vec![];
        for value in values {
            data.extend_from_slice(value.as_bytes());
            data.push(0);
        }
        self.property(name, &data)
    }

    /// Close any open nodes and assemble the blob.
    pub fn finish(mut self) -> FdtBlob {
        while self.depth > 0 {
            self.end_node();
        }
        self.push_word(FdtNodeType::FDT_END.bits());

        let off_mem_rsvmap = HEADER_SIZE.align_up(8);
        let off_dt_struct = off_mem_rsvmap + RSVMAP_ENTRY_SIZE;
        let off_dt_strings = off_dt_struct + self.structs.len();
        let totalsize = off_dt_strings + self.strings.len();

        let header = [
            FDT_MAGIC,
            totalsize as u32,
            off_dt_struct as u32,
            off_dt_strings as u32,
            off_mem_rsvmap as u32,
            FDT_VERSION,
            LAST_COMP_VERSION,
            0,
            self.strings.len() as u32,
            self.structs.len() as u32,
        ];
        let mut bytes = Vec::with_capacity(totalsize);
        for word in header {
            bytes.extend_from_slice(&word.to_be_bytes());
        }
        bytes.resize(off_dt_struct, 0); // padding and the terminating reservation entry
        bytes.extend_from_slice(&self.structs);
        bytes.extend_from_slice(&self.strings);
        FdtBlob::from_bytes(&bytes)
    }
}

impl Default for FdtWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// An owned FDT image whose storage is 8-byte aligned.
pub struct FdtBlob {
    words: Vec<u64>,
    len: usize,
}

impl FdtBlob {
    pub fn from_bytes(bytes: &[u8]) -> FdtBlob {
        let mut words = vec![0u64; bytes.len().align_up(8) / 8];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks(8)) {
            let mut raw = [0u8; 8];
            raw[..chunk.len()].copy_from_slice(chunk);
            *word = u64::from_ne_bytes(raw);
        }
        FdtBlob {
            words,
            len: bytes.len(),
        }
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.words.as_ptr() as *const u8
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: `words` owns at least `len` initialized bytes.
        unsafe { core::slice::from_raw_parts(self.as_ptr(), self.len) }
    }
}
