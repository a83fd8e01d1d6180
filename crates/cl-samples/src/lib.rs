//! Host-side building blocks for the OpenCL sample programs
//! (`enumopencl`, `copybuffer`, `copybufferkernel`).

// ─── Feature‑Module ───────────────────────────────────────────────────
#[cfg(feature = "metrics")]
mod metrics;
#[cfg(feature = "metrics")]
pub use metrics::{record, summary, ALLOCS, ALLOC_BYTES};

pub mod buffer;
pub mod cli;
pub mod copy;
pub mod enumerate;
pub mod kernel;
pub mod select;
pub mod verify;

pub use buffer::{GpuBuffer, GpuEventGuard, InFlight, MappedSlice, Queued, Ready, ELEMENTS};
pub use cli::Args;
pub use copy::run_copy;
pub use enumerate::{DeviceInfo, Inventory, PlatformInfo};
pub use kernel::{build_copy_program, run_copy_kernel, BuildOutcome, DeviceLog, KernelRun};
pub use select::{Selection, Session};

// ─── Fehler‑Typ ───────────────────────────────────────────────────────
#[derive(thiserror::Error, Debug)]
pub enum ClError {
    #[error("OpenCL API error: {0}")]
    Api(i32),
    #[error("Invalid platform index {index} ({count} platform(s) available)")]
    InvalidPlatformIndex { index: usize, count: usize },
    #[error("Invalid device index {index} ({count} device(s) available)")]
    InvalidDeviceIndex { index: usize, count: usize },
    #[error("invalid copy: wanted {expected}, got {actual} at index {index} ({mismatches} mismatch(es) in total)")]
    CopyVerificationFailure {
        index: usize,
        expected: u32,
        actual: u32,
        mismatches: usize,
    },
    #[error("Invalid buffer size: {0}")]
    InvalidSize(usize),
    #[error("Buffer size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("Mapped region cannot be viewed as u32: {0:?}")]
    Misaligned(bytemuck::PodCastError),
    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ClError {
    /// True for the errors raised while resolving `-p`/`-d`.
    pub fn is_invalid_index(&self) -> bool {
        matches!(
            self,
            ClError::InvalidPlatformIndex { .. } | ClError::InvalidDeviceIndex { .. }
        )
    }
}

impl From<opencl3::error_codes::ClError> for ClError {
    #[inline]
    fn from(err: opencl3::error_codes::ClError) -> Self {
        ClError::Api(err.0)
    }
}

impl From<i32> for ClError {
    #[inline]
    fn from(code: i32) -> Self {
        ClError::Api(code)
    }
}

pub type Result<T, E = ClError> = std::result::Result<T, E>;
