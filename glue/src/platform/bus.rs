//! A registry of platform device objects.

use super::{DeviceBus, DeviceRef, PlatformResult};
use crate::{error::PlatformError, resource::ResourceTable};
use alloc::collections::btree_map::BTreeMap;
use core::sync::atomic::{AtomicUsize, Ordering};
use log::warn;
use spin::RwLock;

/// Runtime power-management state of a device object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PmState {
    pub enabled: bool,
    pub use_autosuspend: bool,
    pub autosuspend_delay_ms: Option<u32>,
}

#[derive(Debug)]
pub struct PlatformDevice {
    pub name: &'static str,
    pub id: i32,
    pub dma_mask: u64,
    /// Owned by the device once attached; freed with it.
    pub resources: Option<ResourceTable>,
    pub published: bool,
    pub pm: PmState,
}

pub struct PlatformBus {
    devices: RwLock<BTreeMap<DeviceRef, PlatformDevice>>,
    next_id: AtomicUsize,
}

impl PlatformBus {
    pub const fn new() -> PlatformBus {
        PlatformBus {
            devices: RwLock::new(BTreeMap::new()),
            next_id: AtomicUsize::new(0),
        }
    }

    /// Device objects allocated and not yet put.
    pub fn device_count(&self) -> usize {
        self.devices.read().len()
    }

    pub fn find_published(&self, name: &str, id: i32) -> Option<DeviceRef> {
        self.devices
            .read()
            .iter()
            .find(|(_, dev)| dev.published && dev.name == name && dev.id == id)
            .map(|(handle, _)| *handle)
    }

    /// Run `f` on the device object behind `dev`.
    pub fn inspect<R>(&self, dev: DeviceRef, f: impl FnOnce(&PlatformDevice) -> R) -> Option<R> {
        self.devices.read().get(&dev).map(f)
    }

    fn update<R>(&self, dev: DeviceRef, f: impl FnOnce(&mut PlatformDevice) -> R) -> Option<R> {
        let res = self.devices.write().get_mut(&dev).map(f);
        if res.is_none() {
            warn!("no device object {}", *dev);
        }
        res
    }
}

impl Default for PlatformBus {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceBus for PlatformBus {
    fn device_alloc(&self, name: &'static str, id: i32) -> Option<DeviceRef> {
        let handle = DeviceRef::from(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.devices.write().insert(
            handle,
            PlatformDevice {
                name,
                id,
                dma_mask: 0,
                resources: None,
                published: false,
                pm: PmState::default(),
            },
        );
        Some(handle)
    }

    fn set_dma_mask(&self, dev: DeviceRef, mask: u64) {
        self.update(dev, |d| d.dma_mask = mask);
    }

    fn add_resources(&self, dev: DeviceRef, resources: ResourceTable) -> PlatformResult<()> {
        self.update(dev, |d| match d.resources {
            Some(_) => Err(PlatformError::Busy),
            None => {
                d.resources = Some(resources);
                Ok(())
            }
        })
        .unwrap_or(Err(PlatformError::NoDevice))
    }

    fn device_add(&self, dev: DeviceRef) -> PlatformResult<()> {
        let mut devices = self.devices.write();
        let (name, id) = match devices.get(&dev) {
            Some(d) => (d.name, d.id),
            None => return Err(PlatformError::NoDevice),
        };
        if devices
            .values()
            .any(|d| d.published && d.name == name && d.id == id)
        {
            warn!("{}.{} is already registered", name, id);
            return Err(PlatformError::Busy);
        }
        if let Some(d) = devices.get_mut(&dev) {
            d.published = true;
        }
        debug_ex!("published {}.{}", name, id);
        Ok(())
    }

    fn device_del(&self, dev: DeviceRef) {
        self.update(dev, |d| d.published = false);
    }

    fn device_put(&self, dev: DeviceRef) {
        match self.devices.write().remove(&dev) {
            Some(d) if d.published => warn!("{}.{} freed while registered", d.name, d.id),
            Some(_) => {}
            None => warn!("no device object {}", *dev),
        }
    }

    fn set_autosuspend_delay(&self, dev: DeviceRef, delay_ms: u32) {
        self.update(dev, |d| d.pm.autosuspend_delay_ms = Some(delay_ms));
    }

    fn use_autosuspend(&self, dev: DeviceRef) {
        self.update(dev, |d| d.pm.use_autosuspend = true);
    }

    fn pm_runtime_enable(&self, dev: DeviceRef) {
        self.update(dev, |d| d.pm.enabled = true);
    }

    fn pm_runtime_disable(&self, dev: DeviceRef) {
        self.update(dev, |d| d.pm.enabled = false);
    }
}
