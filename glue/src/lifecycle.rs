//! Lifecycle context handed to both entry points of the owning module.

use crate::{
    bringup::BringUp, error::GlueError, handle::DeviceHandle, params::GlueConfig,
    platform::Platform, teardown::teardown,
};
use log::warn;

/// Owns the platform, the configuration and the handle of the registered GPU, if any.
///
/// At most one GPU is registered per context: [MaliGlue::register_device] refuses to run
/// while a handle is live and [MaliGlue::unregister_device] refuses to run without one.
pub struct MaliGlue<P: Platform> {
    platform: P,
    config: GlueConfig,
    handle: Option<DeviceHandle>,
}

impl<P: Platform> MaliGlue<P> {
    pub fn new(platform: P) -> Self {
        Self::with_config(platform, GlueConfig::default())
    }

    pub fn with_config(platform: P, config: GlueConfig) -> Self {
        MaliGlue {
            platform,
            config,
            handle: None,
        }
    }

    /// Bring the GPU up and publish it.
    ///
    /// Fails with [GlueError::AlreadyRegistered], touching nothing, while a device is
    /// registered. Any other error means bring-up failed and released what it had acquired.
    pub fn register_device(&mut self) -> Result<(), GlueError> {
        if self.handle.is_some() {
            warn!("mali device is already registered");
            return Err(GlueError::AlreadyRegistered);
        }
        let handle = BringUp::new(&self.platform, &self.config).run()?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Tear the registered GPU down. Fails with [GlueError::NotRegistered] if there is none.
    pub fn unregister_device(&mut self) -> Result<(), GlueError> {
        let handle = self.handle.take().ok_or(GlueError::NotRegistered)?;
        teardown(&self.platform, handle);
        Ok(())
    }

    pub fn is_registered(&self) -> bool {
        self.handle.is_some()
    }

    pub fn handle(&self) -> Option<&DeviceHandle> {
        self.handle.as_ref()
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn config(&self) -> &GlueConfig {
        &self.config
    }
}
