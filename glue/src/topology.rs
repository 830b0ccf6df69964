//! Topology prober: how many pixel processors the GPU has and which product it is.

use crate::platform::RegisterWindow;
use log::{info, warn};
use num_enum::TryFromPrimitive;

/// Offset of pixel processor 0 from the GPU base.
pub const PP_BASE: usize = 0x8000;
/// Distance between consecutive pixel processors.
pub const PP_STRIDE: usize = 0x2000;
/// Version register inside a pixel processor block; zero when the core is absent.
pub const PP_VERSION_REG: usize = 0x1000;
/// Version register of the geometry processor.
pub const GP_VERSION_REG: usize = 0x6c;

pub const fn pp_base(index: usize) -> usize {
    PP_BASE + PP_STRIDE * index
}

/// Count the pixel processors present in `regs`.
///
/// Slots are read from 0 upwards and the count stops at the first slot whose version register
/// reads zero, or lies outside the window, or after `max_slots` slots.
pub fn probe_core_count<W: RegisterWindow + ?Sized>(regs: &W, max_slots: usize) -> usize {
    (0..max_slots)
        .map(|slot| regs.read32(pp_base(slot) + PP_VERSION_REG))
        .take_while(|value| matches!(value, Some(v) if *v != 0))
        .count()
}

/// Supported pixel-processor arrangements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(usize)]
pub enum Topology {
    Mp1 = 1,
    Mp2 = 2,
}

impl Topology {
    pub fn cores(self) -> usize {
        self as usize
    }
}

/// Utgard product ids found in the upper half of the version registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u16)]
pub enum GpuModel {
    Mali200 = 0x0a07,
    Mali300 = 0x0c07,
    Mali400 = 0x0b07,
    Mali450 = 0x0d07,
}

impl GpuModel {
    pub const fn number(self) -> u32 {
        match self {
            GpuModel::Mali200 => 200,
            GpuModel::Mali300 => 300,
            GpuModel::Mali400 => 400,
            GpuModel::Mali450 => 450,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuRevision {
    pub model: GpuModel,
    pub major: u8,
    pub minor: u8,
}

impl GpuRevision {
    /// Decode a version register value; the unknown product id is returned on failure.
    pub fn decode(value: u32) -> Result<GpuRevision, u16> {
        let product = (value >> 16) as u16;
        let model = GpuModel::try_from(product).map_err(|_| product)?;
        Ok(GpuRevision {
            model,
            major: (value >> 8) as u8,
            minor: value as u8,
        })
    }
}

/// Read the geometry processor version and log what was found.
///
/// Purely diagnostic: `None` means the product was not recognised, which callers must not
/// treat as a failure.
pub fn identify_revision<W: RegisterWindow + ?Sized>(regs: &W, cores: usize) -> Option<GpuRevision> {
    let decoded = regs
        .read32(GP_VERSION_REG)
        .ok_or(0)
        .and_then(GpuRevision::decode);
    match decoded {
        Ok(rev) => {
            info!(
                "Found ARM Mali {} MP{} (r{}p{})",
                rev.model.number(),
                cores,
                rev.major,
                rev.minor
            );
            Some(rev)
        }
        Err(product) => {
            warn!("Unrecognized GPU");
            debug_ex!("unknown product id {:#06x}", product);
            None
        }
    }
}
