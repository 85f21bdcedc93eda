//! Reference block-scaled GEMM on raw host memory.

use super::HostBuffer;
use crate::{
    kernels::qmm::{MatmulDescriptor, MatrixLayout}, operation::{GemmStatus, MatmulBinding}, quantization::{NumericFormat, minifloat}, tensor::{DevicePtr, Dtype}
};

/// Bytes reachable from a bound pointer.
struct Region {
    storage: HostBuffer,
    offset: usize,
}

impl Region {
    fn resolve(name: &str, ptr: DevicePtr, resolve: &impl Fn(DevicePtr) -> Option<(HostBuffer, usize)>) -> Result<Self, GemmStatus> {
        if ptr.is_null() {
            return Err(GemmStatus::invalid_value(format!("{name} pointer is null")));
        }
        let (storage, offset) =
            resolve(ptr).ok_or_else(|| GemmStatus::invalid_value(format!("{name} pointer {ptr:?} is not bound to the launch")))?;
        Ok(Self { storage, offset })
    }

    fn available(&self) -> usize {
        self.storage.len() - self.offset
    }

    fn read(&self) -> Vec<u8> {
        self.storage.lock()[self.offset..].to_vec()
    }
}

fn activation_dtype(format: NumericFormat) -> Option<Dtype> {
    match format {
        NumericFormat::F16 => Some(Dtype::F16),
        NumericFormat::BF16 => Some(Dtype::BF16),
        NumericFormat::F32 => Some(Dtype::F32),
        NumericFormat::Fp4E2m1 | NumericFormat::Fp8E4m3 => None,
    }
}

/// Check that a stored matrix fits in `available_elements` with stride `ld`.
fn check_extent(name: &str, layout: &MatrixLayout, available_elements: usize) -> Result<(usize, usize, usize), GemmStatus> {
    let (rows, cols) = layout.stored_extents();
    let (rows, cols) = (rows as usize, cols as usize);
    let min_ld = cols.max(1);
    if layout.ld < min_ld as i64 {
        return Err(GemmStatus::invalid_value(format!(
            "{name}: leading dimension {} is below the required {min_ld} for {cols} stored columns",
            layout.ld
        )));
    }
    let ld = layout.ld as usize;
    let required = if rows == 0 || cols == 0 { 0 } else { (rows - 1) * ld + cols };
    if required > available_elements {
        return Err(GemmStatus::invalid_value(format!(
            "{name}: {rows}x{cols} with ld {ld} needs {required} elements, buffer holds {available_elements}"
        )));
    }
    Ok((rows, cols, ld))
}

/// Run `out = alpha * (A x dequant(B))` for one launch.
pub(super) fn execute(
    descriptor: &MatmulDescriptor,
    binding: &MatmulBinding,
    resolve: impl Fn(DevicePtr) -> Option<(HostBuffer, usize)>,
) -> Result<(), GemmStatus> {
    if descriptor.batch_count() != 1 || descriptor.b().batch_count != 1 {
        return Err(GemmStatus::not_supported("reference GEMM runs unbatched launches only"));
    }
    if binding.c.is_some() || binding.beta != 0.0 {
        return Err(GemmStatus::not_supported("block-scaled launches do not accumulate into C"));
    }
    if descriptor.compute_format() != NumericFormat::F32 {
        return Err(GemmStatus::not_supported("block-scaled launches accumulate in f32"));
    }
    let a_dtype = activation_dtype(descriptor.a_format()).ok_or_else(|| GemmStatus::not_supported("A must be f16, bf16 or f32"))?;
    let out_dtype = activation_dtype(descriptor.out_format()).ok_or_else(|| GemmStatus::not_supported("output must be f16, bf16 or f32"))?;

    let (m, n, k) = descriptor.extents();
    let (m, n, k) = (m as usize, n as usize, k as usize);
    if descriptor.b().rows as usize != k {
        return Err(GemmStatus::invalid_value(format!("B has {} rows, A has {k} columns", descriptor.b().rows)));
    }
    let scale_mode = descriptor.b_scale_mode();
    let block = scale_mode.block_size();
    if k % block != 0 {
        return Err(GemmStatus::invalid_value(format!("K = {k} is not a multiple of the scale block {block}")));
    }

    let a_region = Region::resolve("A", binding.a, &resolve)?;
    let b_region = Region::resolve("B", binding.b, &resolve)?;
    let scale_region = Region::resolve("B scale", binding.b_scale, &resolve)?;
    let out_region = Region::resolve("D", binding.out, &resolve)?;

    let a_size = a_dtype.size_bytes();
    let (_, _, lda) = check_extent("A", descriptor.a(), a_region.available() / a_size)?;
    let b_bits = descriptor.b_format().bits();
    let (_, _, ldb) = check_extent("B", descriptor.b(), b_region.available() * 8 / b_bits)?;
    let out_size = out_dtype.size_bytes();
    let (_, _, ldd) = check_extent("D", descriptor.out(), out_region.available() / out_size)?;

    let blocks_per_k = k / block;
    if blocks_per_k * n > scale_region.available() {
        return Err(GemmStatus::invalid_value(format!(
            "B scale buffer holds {} scales, {} needed",
            scale_region.available(),
            blocks_per_k * n
        )));
    }

    let a_bytes = a_region.read();
    let b_bytes = b_region.read();
    let scale_bytes = scale_region.read();
    let b_transposed = descriptor.b().transposed;

    // Dequantized B in logical K x N order.
    let mut b = vec![0f32; k * n];
    for kk in 0..k {
        for nn in 0..n {
            let element = if b_transposed { nn * ldb + kk } else { kk * ldb + nn };
            let raw = match descriptor.b_format() {
                NumericFormat::Fp8E4m3 => minifloat::e4m3_to_f32(b_bytes[element]),
                NumericFormat::Fp4E2m1 => {
                    let byte = b_bytes[element / 2];
                    minifloat::e2m1_to_f32(if element % 2 == 0 { byte & 0x0F } else { byte >> 4 })
                }
                other => return Err(GemmStatus::not_supported(format!("B format {other} is not block scaled"))),
            };
            let scale_index = if b_transposed { nn * blocks_per_k + kk / block } else { (kk / block) * n + nn };
            b[kk * n + nn] = raw * scale_mode.scale_format().decode(scale_bytes[scale_index]);
        }
    }

    let a_transposed = descriptor.a().transposed;
    let mut result = vec![0f32; m * n];
    for mm in 0..m {
        for kk in 0..k {
            let element = if a_transposed { kk * lda + mm } else { mm * lda + kk };
            let a = a_dtype.read_f32(&a_bytes[element * a_size..]);
            let row = &b[kk * n..(kk + 1) * n];
            for (acc, &weight) in result[mm * n..(mm + 1) * n].iter_mut().zip(row) {
                *acc += a * weight;
            }
        }
    }

    let mut out = out_region.storage.lock();
    let out_bytes = &mut out[out_region.offset..];
    for mm in 0..m {
        for nn in 0..n {
            let start = (mm * ldd + nn) * out_size;
            out_dtype.write_f32(binding.alpha * result[mm * n + nn], &mut out_bytes[start..start + out_size]);
        }
    }
    Ok(())
}
