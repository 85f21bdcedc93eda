//! Block-scaled quantized matrix multiplication dispatch.
//!
//! [`QuantizedMatmul`] validates a request, packs operand layouts, plans the
//! launch, and hands it to the device's GEMM primitive with the weight's block
//! scales bound per call. Devices, arrays and the GEMM itself are supplied by
//! the host framework through the traits in [`context`], [`tensor`] and
//! [`operation`]; [`host`] implements them on the CPU.

pub mod caching;
pub mod config;
pub mod context;
pub mod error;
pub mod host;
pub mod kernels;
pub mod logging;
pub mod operation;
pub mod quantization;
pub mod tensor;

pub use config::{ConfigError, QmmConfig};
pub use context::{CommandEncoder, Device, OperationScope};
pub use error::QmmError;
pub use kernels::qmm::{BlockScaledMatmul, MatmulDescriptor, MatrixLayout, PlanCache, QmmPlanKey, QuantizedMatmul};
pub use operation::{GemmPrimitive, GemmStatus, MatmulBinding};
pub use quantization::{NumericFormat, QuantizationMode, ScaleApplicationMode, ScaleFormat, resolve};
pub use tensor::{ArrayFlags, DeviceArray, DevicePtr, Dtype};
