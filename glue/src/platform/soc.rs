//! A [Platform] assembled from a device tree and the board's clock, reset and mapping
//! providers.

use super::{
    ClockControl, DeviceBus, Description, DtDescription, IoMapper, Platform, PlatformBus,
    ResetControl,
};

pub struct SocPlatform<C, R, I> {
    description: DtDescription,
    clocks: C,
    resets: R,
    io: I,
    bus: PlatformBus,
}

impl<C, R, I> SocPlatform<C, R, I> {
    pub fn new(description: DtDescription, clocks: C, resets: R, io: I) -> Self {
        SocPlatform {
            description,
            clocks,
            resets,
            io,
            bus: PlatformBus::new(),
        }
    }

    pub fn device_tree(&self) -> &DtDescription {
        &self.description
    }

    pub fn device_bus(&self) -> &PlatformBus {
        &self.bus
    }
}

impl<C: ClockControl, R: ResetControl, I: IoMapper> Platform for SocPlatform<C, R, I> {
    type Window = I::Window;

    fn description(&self) -> &dyn Description {
        &self.description
    }

    fn clocks(&self) -> &dyn ClockControl {
        &self.clocks
    }

    fn resets(&self) -> &dyn ResetControl {
        &self.resets
    }

    fn io(&self) -> &dyn IoMapper<Window = Self::Window> {
        &self.io
    }

    fn bus(&self) -> &dyn DeviceBus {
        &self.bus
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        lifecycle::MaliGlue,
        platform::{NodeRef, mock::MockPlatform, of::tests::sun7i_blob},
        resource::ResourceKind,
    };

    #[test]
    fn test_bring_up_from_device_tree() {
        let mock = MockPlatform::mp2();
        let blob = sun7i_blob(2);
        let description = unsafe { DtDescription::from_fdt(blob.as_ptr()) }.unwrap();
        let soc = SocPlatform::new(description, &mock, &mock, &mock);
        let mut glue = MaliGlue::new(soc);
        glue.register_device().unwrap();

        let bus = glue.platform().device_bus();
        let dev = bus.find_published("mali-utgard", 0).unwrap();
        let resources = bus
            .inspect(dev, |d| d.resources.as_ref().map(|r| r.to_vec()))
            .flatten()
            .unwrap();
        assert_eq!(resources.len(), 15);
        assert_eq!(
            resources[9].kind,
            ResourceKind::Memory {
                start: 0x01c4_a000,
                size: 0x1100
            }
        );
        assert_eq!(resources[10].kind, ResourceKind::Interrupt(74 + 32));
        assert_eq!(resources[14].kind, ResourceKind::Interrupt(73 + 32));
        assert_eq!(mock.count("clk_on:11"), 1);
        assert_eq!(mock.count("deasserted:20"), 1);
        let gpu = glue
            .platform()
            .device_tree()
            .tree()
            .find_compatible("arm,mali-400")
            .map(|n| NodeRef::from(n.node_id))
            .unwrap();
        // the node reference and the mapping are only held while probing
        assert_eq!(glue.platform().device_tree().node_refs(gpu), 0);
        assert_eq!(mock.count("mapping"), 0);

        glue.unregister_device().unwrap();
        assert_eq!(glue.platform().device_bus().device_count(), 0);
        mock.assert_balanced();
    }
}
