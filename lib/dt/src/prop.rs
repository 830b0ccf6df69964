use alloc::{boxed::Box, vec::Vec};
use core::str;

pub struct Property {
    pub name: Box<str>,
    pub data: Box<[u8]>,
}

impl Property {
    pub fn new(name: &str, data: &[u8]) -> Property {
        Property {
            name: Box::from(name),
            data: Box::from(data),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn value_as_u32(&self) -> Result<u32, PropertyError> {
        let bytes = self
            .data
            .get(0..4)
            .ok_or(PropertyError::InvalidPropFormat)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn value_as_u64(&self) -> Result<u64, PropertyError> {
        let cells = self.value_as_cells()?;
        match cells.as_slice() {
            [hi, lo, ..] => Ok(((*hi as u64) << 32) | *lo as u64),
            _ => Err(PropertyError::InvalidPropFormat),
        }
    }

    pub fn value_as_str(&self) -> Result<&str, PropertyError> {
        let raw = self.data.split(|b| *b == 0).next().unwrap_or(&[]);
        str::from_utf8(raw).map_err(|_| PropertyError::InvalidPropFormat)
    }

    pub fn value_as_strlist(&self) -> Result<Vec<&str>, PropertyError> {
        let mut data: &[u8] = &self.data;
        // a single trailing NUL terminates the list, it does not start an empty entry
        if let [rest @ .., 0] = data {
            data = rest;
        }
        if data.is_empty() {
            return Ok(Vec::new());
        }
        data.split(|b| *b == 0)
            .map(|s| str::from_utf8(s).map_err(|_| PropertyError::InvalidPropFormat))
            .collect()
    }

    /// Decode the value as a list of big-endian 32-bit cells.
    pub fn value_as_cells(&self) -> Result<Vec<u32>, PropertyError> {
        if self.data.len() % 4 != 0 {
            return Err(PropertyError::InvalidPropFormat);
        }
        Ok(self
            .data
            .chunks_exact(4)
            .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyError {
    InvalidPropFormat,
    PropNotFound,
    DanglingHandle,
    /// The requested name is absent from the matching `*-names` list.
    NameNotFound,
    /// The address cannot be translated to the root address space.
    Untranslatable,
}
