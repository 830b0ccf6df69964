//! Run-time configuration of the glue, seeded from the build flags.

use config::build_flags::{
    MALI_AUTOSUSPEND_DELAY_MS, MALI_DEVICE_ID, MALI_DMA_MASK_BITS, MALI_MAX_CORE_SLOTS,
};
use utils::num::bit_mask;

/// Compatible string of the GPU node.
pub const MALI_COMPATIBLE: &str = "arm,mali-400";
/// Identity the GPU driver binds against.
pub const MALI_DEVICE_NAME: &str = "mali-utgard";
pub const MALI_BUS_CLOCK: &str = "ahb";
pub const MALI_MOD_CLOCK: &str = "mod";

/// Runtime power-management settings applied to the published device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimePm {
    pub autosuspend_delay_ms: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlueConfig {
    pub compatible: &'static str,
    pub bus_clock: &'static str,
    pub mod_clock: &'static str,
    /// Name of the reset line in `reset-names`; `None` takes the first one.
    pub reset: Option<&'static str>,
    pub device_name: &'static str,
    pub device_id: i32,
    pub dma_mask_bits: u32,
    /// Pixel-processor slots probed before giving up.
    pub max_core_slots: usize,
    /// `None` leaves runtime PM alone.
    pub runtime_pm: Option<RuntimePm>,
}

impl GlueConfig {
    pub fn dma_mask(&self) -> u64 {
        bit_mask(self.dma_mask_bits)
    }
}

impl Default for GlueConfig {
    fn default() -> Self {
        GlueConfig {
            compatible: MALI_COMPATIBLE,
            bus_clock: MALI_BUS_CLOCK,
            mod_clock: MALI_MOD_CLOCK,
            reset: None,
            device_name: MALI_DEVICE_NAME,
            device_id: MALI_DEVICE_ID as i32,
            dma_mask_bits: MALI_DMA_MASK_BITS as u32,
            max_core_slots: MALI_MAX_CORE_SLOTS,
            runtime_pm: if cfg!(feature = "pm-runtime") {
                Some(RuntimePm {
                    autosuspend_delay_ms: MALI_AUTOSUSPEND_DELAY_MS as u32,
                })
            } else {
                None
            },
        }
    }
}
