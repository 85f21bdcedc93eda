use tracing::debug;

use crate::{context::Device, error::QmmError};

/// Lowest capability score with block-scaled tensor-core instructions (10.0).
pub const MIN_BLOCK_SCALED_SCORE: i32 = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComputeCapability {
    pub major: i32,
    pub minor: i32,
}

impl ComputeCapability {
    pub fn of<D: Device>(device: &D) -> Self {
        Self {
            major: device.compute_capability_major(),
            minor: device.compute_capability_minor(),
        }
    }

    /// `major * 100 + minor * 10`, so 10.0 scores 1000 and 9.0 scores 900.
    pub const fn score(self) -> i32 {
        self.major * 100 + self.minor * 10
    }

    pub const fn supports_block_scaled(self) -> bool {
        self.score() >= MIN_BLOCK_SCALED_SCORE
    }
}

/// Reject devices without block-scaled tensor-core support.
///
/// Runs before any allocation, so a rejection commits no resources.
pub fn check<D: Device>(device: &D) -> Result<(), QmmError> {
    let capability = ComputeCapability::of(device);
    if capability.supports_block_scaled() {
        return Ok(());
    }
    debug!(
        device = device.ordinal(),
        major = capability.major,
        minor = capability.minor,
        score = capability.score(),
        "device rejected for block-scaled matmul"
    );
    Err(QmmError::UnsupportedDevice {
        major: capability.major,
        minor: capability.minor,
        required_major: MIN_BLOCK_SCALED_SCORE / 100,
        required_minor: (MIN_BLOCK_SCALED_SCORE % 100) / 10,
    })
}
