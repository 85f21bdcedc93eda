use thiserror::Error;

use crate::{quantization::QuantizationMode, tensor::Dtype};

#[derive(Error, Debug)]
pub enum QmmError {
    #[error("Unsupported quantization mode in block-scaled matmul: {mode:?}.")]
    UnsupportedQuantizationMode { mode: QuantizationMode },
    #[error("[{tag}] Invalid quantization mode '{value}'")]
    InvalidQuantizationMode { value: String, tag: &'static str },
    #[error(
        "Block-scaled quantized matmul is only supported on GPUs with compute capability {required_major}.{required_minor} or higher (found {major}.{minor})"
    )]
    UnsupportedDevice {
        major: i32,
        minor: i32,
        required_major: i32,
        required_minor: i32,
    },
    #[error("Unsupported shape: {0}")]
    UnsupportedShape(String),
    #[error("Unsupported dtype {dtype:?} for {operation}")]
    UnsupportedDtype { operation: &'static str, dtype: Dtype },
    #[error("Matmul execution failed with status {code}: {message}")]
    MatmulExecutionFailed { code: i32, message: String },
    #[error("Plan built for device {expected} cannot run on device {actual}")]
    DeviceMismatch { expected: usize, actual: usize },
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("Buffer creation failed with size {0}")]
    BufferCreationFailed(usize),
}

impl From<crate::operation::GemmStatus> for QmmError {
    fn from(status: crate::operation::GemmStatus) -> Self {
        QmmError::MatmulExecutionFailed {
            code: status.code,
            message: status.message,
        }
    }
}
