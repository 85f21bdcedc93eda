use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    context::Device, error::QmmError, quantization::{NumericFormat, QuantizationMode, ScaleApplicationMode, resolve}
};

/// Logical view of one matmul operand.
///
/// `rows`/`cols` are the extents of the operand as it enters the product
/// (`M x K` for A, `K x N` for B). When `transposed` is set the operand is
/// stored as `cols x rows`. `ld` is the element stride between stored rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatrixLayout {
    pub rows: u64,
    pub cols: u64,
    pub ld: i64,
    pub transposed: bool,
    pub batch_count: i32,
    pub batch_stride: i64,
}

impl MatrixLayout {
    /// Unbatched layout.
    pub const fn new(rows: u64, cols: u64, ld: i64, transposed: bool) -> Self {
        Self {
            rows,
            cols,
            ld,
            transposed,
            batch_count: 1,
            batch_stride: 0,
        }
    }

    pub const fn with_batch(mut self, batch_count: i32, batch_stride: i64) -> Self {
        self.batch_count = batch_count;
        self.batch_stride = batch_stride;
        self
    }

    /// Extents as laid out in memory, `(stored_rows, stored_cols)`.
    pub const fn stored_extents(&self) -> (u64, u64) {
        if self.transposed { (self.cols, self.rows) } else { (self.rows, self.cols) }
    }
}

/// Everything that identifies a matmul plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QmmPlanKey {
    pub device_ordinal: usize,
    pub a_format: NumericFormat,
    pub a: MatrixLayout,
    pub b: MatrixLayout,
    pub out_format: NumericFormat,
    pub mode: QuantizationMode,
}

/// Immutable launch plan for a block-scaled matmul.
///
/// Built once per shape and mode. The scale buffer address is not part of
/// the plan; it travels in the per-launch [`crate::operation::MatmulBinding`].
#[derive(Clone, Debug, PartialEq)]
pub struct MatmulDescriptor {
    key: QmmPlanKey,
    b_format: NumericFormat,
    compute_format: NumericFormat,
    scale_type: NumericFormat,
    out: MatrixLayout,
    b_scale_mode: ScaleApplicationMode,
}

impl MatmulDescriptor {
    /// Build a plan for `key` on `device`.
    ///
    /// Layout fields are taken verbatim; consistency of extents and strides is
    /// the caller's responsibility.
    pub fn build<D: Device>(device: &D, key: &QmmPlanKey) -> Result<Self, QmmError> {
        if key.device_ordinal != device.ordinal() {
            return Err(QmmError::DeviceMismatch {
                expected: key.device_ordinal,
                actual: device.ordinal(),
            });
        }
        let scheme = resolve(key.mode)?;

        let out = MatrixLayout::new(key.a.rows, key.b.cols, key.b.cols as i64, false).with_batch(key.a.batch_count, key.a.batch_stride);

        debug!(
            mode = %key.mode,
            m = key.a.rows,
            k = key.a.cols,
            n = key.b.cols,
            b_transposed = key.b.transposed,
            weight_format = %scheme.weight_format,
            scale_mode = %scheme.scale_mode,
            "built block-scaled matmul descriptor"
        );

        Ok(Self {
            key: *key,
            b_format: scheme.weight_format,
            compute_format: NumericFormat::F32,
            scale_type: NumericFormat::F32,
            out,
            b_scale_mode: scheme.scale_mode,
        })
    }

    #[inline]
    pub fn key(&self) -> &QmmPlanKey {
        &self.key
    }

    #[inline]
    pub fn device_ordinal(&self) -> usize {
        self.key.device_ordinal
    }

    #[inline]
    pub fn mode(&self) -> QuantizationMode {
        self.key.mode
    }

    #[inline]
    pub fn a_format(&self) -> NumericFormat {
        self.key.a_format
    }

    #[inline]
    pub fn b_format(&self) -> NumericFormat {
        self.b_format
    }

    #[inline]
    pub fn out_format(&self) -> NumericFormat {
        self.key.out_format
    }

    /// Accumulation format, always f32.
    #[inline]
    pub fn compute_format(&self) -> NumericFormat {
        self.compute_format
    }

    /// Format of the alpha/beta scalars, always f32. Unrelated to block scales.
    #[inline]
    pub fn scale_type(&self) -> NumericFormat {
        self.scale_type
    }

    #[inline]
    pub fn a(&self) -> &MatrixLayout {
        &self.key.a
    }

    #[inline]
    pub fn b(&self) -> &MatrixLayout {
        &self.key.b
    }

    #[inline]
    pub fn out(&self) -> &MatrixLayout {
        &self.out
    }

    /// Block scale policy of operand B. Operand A is never block scaled.
    #[inline]
    pub fn b_scale_mode(&self) -> ScaleApplicationMode {
        self.b_scale_mode
    }

    #[inline]
    pub fn batch_count(&self) -> i32 {
        self.key.a.batch_count
    }

    /// GEMM extents `(m, n, k)`.
    #[inline]
    pub fn extents(&self) -> (u64, u64, u64) {
        (self.key.a.rows, self.key.b.cols, self.key.a.cols)
    }
}
