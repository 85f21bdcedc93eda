//! Seam between the engine and the external block-scaled GEMM primitive.

use std::fmt;

use crate::{kernels::qmm::MatmulDescriptor, tensor::DevicePtr};

/// Status reported by a failed GEMM launch.
///
/// Codes follow the vendor BLAS status numbering so diagnostics can be matched
/// against driver documentation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GemmStatus {
    pub code: i32,
    pub message: String,
}

impl GemmStatus {
    pub const INVALID_VALUE: i32 = 7;
    pub const NOT_SUPPORTED: i32 = 15;

    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_VALUE, message)
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::new(Self::NOT_SUPPORTED, message)
    }
}

impl fmt::Display for GemmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "status {}: {}", self.code, self.message)
    }
}

/// Per-launch pointers and scalars.
///
/// The descriptor carries the static plan; everything that may change between
/// launches of the same plan lives here. `out = alpha * (A x B) + beta * C`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatmulBinding {
    pub out: DevicePtr,
    pub a: DevicePtr,
    pub b: DevicePtr,
    /// Accumulation operand. Always `None` for block-scaled launches.
    pub c: Option<DevicePtr>,
    /// Block scales for operand B, bound per launch.
    pub b_scale: DevicePtr,
    pub alpha: f32,
    pub beta: f32,
}

/// A device stream able to launch a described matmul.
pub trait GemmPrimitive {
    /// Enqueue the multiply. Failures are not retried by the caller.
    fn execute_matmul(&mut self, descriptor: &MatmulDescriptor, binding: &MatmulBinding) -> Result<(), GemmStatus>;
}
