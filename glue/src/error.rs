//! Error types of the glue.
//!
//! [PlatformError] is what a collaborator (description, clocks, resets, device bus) reports.
//! [GlueError] is what bring-up reports to the owning module: one error naming the first stage
//! that failed, convertible into a single negative errno.

use core::fmt::{Display, Formatter};
use dt::prop::PropertyError;

/// Linux errno values used in the failure codes.
pub mod errno {
    pub const ENOENT: i32 = 2;
    pub const EIO: i32 = 5;
    pub const ENOMEM: i32 = 12;
    pub const EBUSY: i32 = 16;
    pub const ENODEV: i32 = 19;
    pub const EINVAL: i32 = 22;
    pub const EPROBE_DEFER: i32 = 517;
}

/// Failure reported by a platform collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformError {
    /// No matching device.
    NoDevice,
    /// A named entry (clock, reset, interrupt, address) is missing.
    NotFound,
    /// An entry exists but cannot be decoded.
    InvalidArgument,
    NoMemory,
    /// The resource is already in use, or the object is already registered.
    Busy,
    /// The provider is not ready yet; the caller may retry later.
    ProbeDefer,
    Io,
}

impl PlatformError {
    pub const fn errno(self) -> i32 {
        -(match self {
            PlatformError::NoDevice => errno::ENODEV,
            PlatformError::NotFound => errno::ENOENT,
            PlatformError::InvalidArgument => errno::EINVAL,
            PlatformError::NoMemory => errno::ENOMEM,
            PlatformError::Busy => errno::EBUSY,
            PlatformError::ProbeDefer => errno::EPROBE_DEFER,
            PlatformError::Io => errno::EIO,
        })
    }
}

impl From<PropertyError> for PlatformError {
    fn from(err: PropertyError) -> Self {
        match err {
            PropertyError::PropNotFound | PropertyError::NameNotFound => PlatformError::NotFound,
            PropertyError::InvalidPropFormat
            | PropertyError::DanglingHandle
            | PropertyError::Untranslatable => PlatformError::InvalidArgument,
        }
    }
}

impl Display for PlatformError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            PlatformError::NoDevice => "no such device",
            PlatformError::NotFound => "not found",
            PlatformError::InvalidArgument => "invalid argument",
            PlatformError::NoMemory => "out of memory",
            PlatformError::Busy => "busy",
            PlatformError::ProbeDefer => "provider not ready",
            PlatformError::Io => "I/O error",
        };
        write!(f, "{} ({})", msg, self.errno())
    }
}

/// Bring-up stages that can fail, in acquisition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    LocateNode,
    ClockDefaults,
    BusClock,
    ModClock,
    Reset,
    BaseAddress,
    MapRegisters,
    ProbeTopology,
    Interrupts,
    AllocDevice,
    Resources,
    Publish,
}

impl Stage {
    pub const fn name(self) -> &'static str {
        match self {
            Stage::LocateNode => "locate description node",
            Stage::ClockDefaults => "apply clock defaults",
            Stage::BusClock => "acquire bus clock",
            Stage::ModClock => "acquire module clock",
            Stage::Reset => "acquire reset control",
            Stage::BaseAddress => "resolve base address",
            Stage::MapRegisters => "map registers",
            Stage::ProbeTopology => "probe topology",
            Stage::Interrupts => "resolve interrupts",
            Stage::AllocDevice => "allocate device object",
            Stage::Resources => "attach resource table",
            Stage::Publish => "publish device object",
        }
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors returned by the glue entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlueError {
    /// A required description entry (node, clock, reset, address, interrupt) is missing or
    /// malformed.
    Description { stage: Stage, cause: PlatformError },
    /// The probed core count is outside the supported range.
    Topology { cores: usize },
    /// Memory for a device object or resource table could not be obtained.
    Allocation { stage: Stage },
    /// A platform subsystem rejected an operation: enabling a clock, releasing the reset line,
    /// attaching resources or publishing the device.
    Registration { stage: Stage, cause: PlatformError },
    /// A device is already registered by this context.
    AlreadyRegistered,
    /// No device is registered by this context.
    NotRegistered,
}

impl GlueError {
    /// The bring-up stage that failed, if the error comes from bring-up.
    pub const fn stage(&self) -> Option<Stage> {
        match self {
            GlueError::Description { stage, .. }
            | GlueError::Allocation { stage }
            | GlueError::Registration { stage, .. } => Some(*stage),
            GlueError::Topology { .. } => Some(Stage::ProbeTopology),
            GlueError::AlreadyRegistered | GlueError::NotRegistered => None,
        }
    }

    /// The failure code handed back to the owning module.
    pub const fn errno(&self) -> i32 {
        match self {
            GlueError::Description { cause, .. } | GlueError::Registration { cause, .. } => {
                cause.errno()
            }
            GlueError::Topology { .. } => -errno::EINVAL,
            GlueError::Allocation { .. } => -errno::ENOMEM,
            GlueError::AlreadyRegistered => -errno::EBUSY,
            GlueError::NotRegistered => -errno::ENODEV,
        }
    }
}

impl Display for GlueError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            GlueError::Description { stage, cause } => {
                write!(f, "{}: description entry {}", stage, cause)
            }
            GlueError::Topology { cores } => {
                write!(f, "{}: invalid number of GPU cores {}", Stage::ProbeTopology, cores)
            }
            GlueError::Allocation { stage } => write!(f, "{}: out of memory", stage),
            GlueError::Registration { stage, cause } => {
                write!(f, "{}: rejected by platform, {}", stage, cause)
            }
            GlueError::AlreadyRegistered => f.write_str("device already registered"),
            GlueError::NotRegistered => f.write_str("no device registered"),
        }
    }
}
