//! Block-scaled quantized matmul: `out = x @ dequant(weight_q, weight_scales)`.

use std::sync::Arc;

use tracing::{debug_span, trace};

use crate::{
    context::{CommandEncoder, Device, OperationScope}, error::QmmError, quantization::{NumericFormat, QuantizationMode, QuantizationScheme, resolve}, tensor::{DeviceArray, Dtype}
};

pub mod cache;
pub mod capability;
pub mod descriptor;
pub mod executor;
pub mod layout;

#[cfg(test)]
mod capability_test;
#[cfg(test)]
mod layout_test;

pub use cache::{DEFAULT_PLAN_CACHE_CAPACITY, PlanCache, QmmPlanKernel};
pub use capability::{ComputeCapability, MIN_BLOCK_SCALED_SCORE};
pub use descriptor::{MatmulDescriptor, MatrixLayout, QmmPlanKey};
pub use executor::{BlockScaledMatmul, DEFAULT_ALPHA};
pub use layout::{is_packed_matrix, normalize_any, normalize_matrix};

/// Graph-level quantized matmul with a block-scaled weight.
///
/// Inputs are `[x, weight_q, weight_scales]`. With `transpose_weight` the
/// weight is stored `[N, K]` (packed along K), otherwise `[K, N]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuantizedMatmul {
    pub mode: QuantizationMode,
    pub transpose_weight: bool,
}

impl QuantizedMatmul {
    pub const NAME: &'static str = "quantized_matmul";

    pub fn new(mode: QuantizationMode, transpose_weight: bool) -> Self {
        Self { mode, transpose_weight }
    }

    /// Validate, normalize, allocate `out`, and enqueue the matmul.
    ///
    /// Rejections happen before anything is allocated or copied. With a plan
    /// cache the descriptor is reused across calls with the same shapes.
    pub fn eval<E: CommandEncoder>(
        &self,
        encoder: &mut E,
        inputs: [&E::Array; 3],
        out: &mut E::Array,
        cache: Option<&mut PlanCache>,
    ) -> Result<(), QmmError> {
        let [x, weight_q, weight_scales] = inputs;
        let span = debug_span!("quantized_matmul", mode = %self.mode, transpose = self.transpose_weight);
        let _enter = span.enter();

        capability::check(encoder.device())?;
        let scheme = self.validate(x, weight_q, weight_scales, &*out)?;

        let mut scope = OperationScope::new(encoder);
        let x = normalize_matrix(x, &mut scope)?;
        let weight_q = normalize_matrix(weight_q, &mut scope)?;
        let weight_scales = normalize_matrix(weight_scales, &mut scope)?;

        let buffer = scope.encoder().malloc_async(out.nbytes())?;
        out.set_data(buffer);

        let key = self.plan_key(scope.device(), &x, &*out)?;
        trace!(?key, block_size = scheme.block_size(), copies = scope.temporary_count(), "quantized matmul planned");

        let descriptor = match cache {
            Some(cache) => cache.get_or_create(&key, scope.device())?,
            None => Arc::new(MatmulDescriptor::build(scope.device(), &key)?),
        };
        BlockScaledMatmul::new(descriptor).run(scope.encoder(), &*out, &x, &weight_q, &weight_scales, DEFAULT_ALPHA)
    }

    fn validate<A: DeviceArray>(&self, x: &A, weight_q: &A, weight_scales: &A, out: &A) -> Result<QuantizationScheme, QmmError> {
        if x.ndim() != 2 || weight_q.ndim() != 2 {
            return Err(QmmError::UnsupportedShape(format!(
                "only 2D inputs are supported on the block-scaled path, got x {:?} and weight {:?}",
                x.shape(),
                weight_q.shape()
            )));
        }
        let scheme = resolve(self.mode)?;

        NumericFormat::from_dtype(x.dtype(), Self::NAME)?;
        NumericFormat::from_dtype(out.dtype(), Self::NAME)?;
        for array in [weight_q, weight_scales] {
            if !matches!(array.dtype(), Dtype::U8 | Dtype::U32) {
                return Err(QmmError::UnsupportedDtype {
                    operation: Self::NAME,
                    dtype: array.dtype(),
                });
            }
        }

        let (m, k) = (x.dim(-2), x.dim(-1));
        if out.ndim() != 2 || out.dim(-2) != m {
            return Err(QmmError::UnsupportedShape(format!(
                "output {:?} does not match {m} activation rows",
                out.shape()
            )));
        }
        let n = out.dim(-1);
        if m == 0 || k == 0 || n == 0 {
            return Err(QmmError::UnsupportedShape(format!(
                "empty matmul with M = {m}, K = {k}, N = {n}"
            )));
        }

        if k % scheme.block_size() != 0 {
            return Err(QmmError::UnsupportedShape(format!(
                "K = {k} is not a multiple of the {} block size {}",
                self.mode,
                scheme.block_size()
            )));
        }

        let bits = scheme.weight_format.bits();
        let (stored_rows, packed_extent) = if self.transpose_weight { (n, k) } else { (k, n) };
        let row_bytes = weight_q.dim(-1) * weight_q.dtype().size_bytes();
        if weight_q.dim(-2) != stored_rows || row_bytes * 8 != packed_extent * bits {
            return Err(QmmError::UnsupportedShape(format!(
                "weight {:?} ({:?}) does not hold a {} {}x{} matrix for x {:?} and output {:?}",
                weight_q.shape(),
                weight_q.dtype(),
                self.mode,
                stored_rows,
                packed_extent,
                x.shape(),
                out.shape()
            )));
        }
        Ok(scheme)
    }

    /// GEMM extents for a 2D problem: unbatched, A never transposed, both
    /// leading dimensions equal to K.
    fn plan_key<D: Device, A: DeviceArray>(&self, device: &D, x: &A, out: &A) -> Result<QmmPlanKey, QmmError> {
        let k = x.dim(-1) as u64;
        let m = x.dim(-2) as u64;
        let n = out.dim(-1) as u64;
        let lda = k as i64;
        let ldb = k as i64;
        Ok(QmmPlanKey {
            device_ordinal: device.ordinal(),
            a_format: NumericFormat::from_dtype(x.dtype(), Self::NAME)?,
            a: MatrixLayout::new(m, k, lda, false),
            b: MatrixLayout::new(k, n, ldb, self.transpose_weight),
            out_format: NumericFormat::from_dtype(out.dtype(), Self::NAME)?,
            mode: self.mode,
        })
    }
}
