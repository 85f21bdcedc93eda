use std::sync::Arc;

use tracing::{debug, trace};

use super::descriptor::MatmulDescriptor;
use crate::{
    context::{CommandEncoder, Device}, error::QmmError, operation::MatmulBinding, tensor::DeviceArray
};

/// Alpha used when the caller folds no extra scaling into the launch.
pub const DEFAULT_ALPHA: f32 = 1.0;

/// Launches a shared plan with per-call buffers.
#[derive(Clone, Debug)]
pub struct BlockScaledMatmul {
    descriptor: Arc<MatmulDescriptor>,
}

impl BlockScaledMatmul {
    pub fn new(descriptor: Arc<MatmulDescriptor>) -> Self {
        Self { descriptor }
    }

    #[inline]
    pub fn descriptor(&self) -> &MatmulDescriptor {
        &self.descriptor
    }

    /// Enqueue `out = alpha * (a x weight)` with `weight_scales` bound for this launch only.
    ///
    /// `out` must already have storage. Accumulation into existing output is
    /// not supported, so beta is always zero.
    pub fn run<E: CommandEncoder>(
        &self,
        encoder: &mut E,
        out: &E::Array,
        a: &E::Array,
        weight_q: &E::Array,
        weight_scales: &E::Array,
        alpha: f32,
    ) -> Result<(), QmmError> {
        let device_ordinal = encoder.device().ordinal();
        if device_ordinal != self.descriptor.device_ordinal() {
            return Err(QmmError::DeviceMismatch {
                expected: self.descriptor.device_ordinal(),
                actual: device_ordinal,
            });
        }
        if out.device_ptr().is_null() {
            return Err(QmmError::InvalidOperation("output storage must be allocated before launch".to_string()));
        }

        encoder.set_input_array(a);
        encoder.set_input_array(weight_q);
        encoder.set_input_array(weight_scales);
        encoder.set_output_array(out);

        let binding = MatmulBinding {
            out: out.device_ptr(),
            a: a.device_ptr(),
            b: weight_q.device_ptr(),
            c: None,
            b_scale: weight_scales.device_ptr(),
            alpha,
            beta: 0.0,
        };
        trace!(
            mode = %self.descriptor.mode(),
            out = ?binding.out,
            b_scale = ?binding.b_scale,
            alpha,
            "launching block-scaled matmul"
        );

        encoder.execute_matmul(&self.descriptor, &binding).map_err(|status| {
            debug!(code = status.code, message = %status.message, "block-scaled matmul launch failed");
            QmmError::from(status)
        })
    }
}
