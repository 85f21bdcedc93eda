//! Host-side block quantization of f32 weights.

use super::HostArray;
use crate::{
    error::QmmError, quantization::{NumericFormat, QuantizationMode, minifloat, resolve}, tensor::Dtype
};

/// Weights quantized along their rows, with one scale per block.
#[derive(Clone, Debug, PartialEq)]
pub struct QuantizedWeights {
    pub mode: QuantizationMode,
    pub rows: usize,
    pub cols: usize,
    /// `rows x cols` elements, fp4 packed two per byte low nibble first.
    pub packed: Vec<u8>,
    /// `rows x cols / block_size` scale bytes.
    pub scales: Vec<u8>,
}

impl QuantizedWeights {
    pub fn block_size(&self) -> usize {
        resolve(self.mode).map(|scheme| scheme.block_size()).unwrap_or(1)
    }

    /// Packed elements as a `[rows, row_bytes]` U8 array.
    pub fn weight_array(&self) -> Result<HostArray, QmmError> {
        let row_bytes = self.packed.len() / self.rows.max(1);
        HostArray::from_bytes(&[self.rows, row_bytes], Dtype::U8, self.packed.clone())
    }

    /// Scales as a `[rows, cols / block_size]` U8 array.
    pub fn scale_array(&self) -> Result<HostArray, QmmError> {
        HostArray::from_bytes(&[self.rows, self.cols / self.block_size()], Dtype::U8, self.scales.clone())
    }
}

/// Quantize row-major `rows x cols` weights, blocking along each row.
///
/// mxfp8 picks the power-of-two scale `2^(floor(log2(amax)) - 8)` per block and
/// saturates elements to the e4m3 range. nvfp4 encodes `amax / 6` as an e4m3
/// scale; any tensor-wide scale is left to the caller (it folds into alpha).
pub fn quantize(weights: &[f32], rows: usize, cols: usize, mode: QuantizationMode) -> Result<QuantizedWeights, QmmError> {
    let scheme = resolve(mode)?;
    let block = scheme.block_size();
    if weights.len() != rows * cols {
        return Err(QmmError::UnsupportedShape(format!(
            "{} weights cannot form a {rows}x{cols} matrix",
            weights.len()
        )));
    }
    if cols % block != 0 {
        return Err(QmmError::UnsupportedShape(format!("{cols} columns are not a multiple of the {mode} block size {block}")));
    }

    let mut packed = vec![0u8; rows * cols * scheme.weight_format.bits() / 8];
    let mut scales = Vec::with_capacity(rows * cols / block);
    for (block_index, values) in weights.chunks_exact(block).enumerate() {
        let amax = values.iter().fold(0f32, |acc, v| acc.max(v.abs()));
        let first = block_index * block;
        match scheme.weight_format {
            NumericFormat::Fp8E4m3 => {
                let exponent = if amax > 0.0 { amax.log2().floor() as i32 - 8 } else { 0 };
                let code = minifloat::ue8m0_from_exponent(exponent);
                let scale = minifloat::ue8m0_to_f32(code);
                scales.push(code);
                for (i, &value) in values.iter().enumerate() {
                    packed[first + i] = minifloat::f32_to_e4m3(value / scale);
                }
            }
            NumericFormat::Fp4E2m1 => {
                let code = minifloat::f32_to_e4m3(amax / minifloat::E2M1_MAX);
                let scale = minifloat::e4m3_to_f32(code);
                scales.push(code);
                for (i, &value) in values.iter().enumerate() {
                    let nibble = if scale > 0.0 { minifloat::f32_to_e2m1(value / scale) } else { 0 };
                    let element = first + i;
                    packed[element / 2] |= if element % 2 == 0 { nibble } else { nibble << 4 };
                }
            }
            other => return Err(QmmError::InvalidOperation(format!("{other} is not a block-scaled weight format"))),
        }
    }

    Ok(QuantizedWeights {
        mode,
        rows,
        cols,
        packed,
        scales,
    })
}

/// Expand quantized weights back to row-major f32.
pub fn dequantize(weights: &QuantizedWeights) -> Result<Vec<f32>, QmmError> {
    let scheme = resolve(weights.mode)?;
    let block = scheme.block_size();
    let scale_format = scheme.scale_mode.scale_format();
    let count = weights.rows * weights.cols;
    let mut out = Vec::with_capacity(count);
    for element in 0..count {
        let raw = match scheme.weight_format {
            NumericFormat::Fp8E4m3 => minifloat::e4m3_to_f32(weights.packed[element]),
            NumericFormat::Fp4E2m1 => {
                let byte = weights.packed[element / 2];
                minifloat::e2m1_to_f32(if element % 2 == 0 { byte & 0x0F } else { byte >> 4 })
            }
            other => return Err(QmmError::InvalidOperation(format!("{other} is not a block-scaled weight format"))),
        };
        out.push(raw * scale_format.decode(weights.scales[element / block]));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mxfp8_blocks_share_a_power_of_two_scale() {
        let mut weights = vec![0.0f32; 32];
        weights[0] = 3.0;
        weights[1] = -1.5;
        weights[2] = 0.25;
        let quantized = quantize(&weights, 1, 32, QuantizationMode::Mxfp8).expect("quantize");
        // floor(log2(3)) - 8 = -7
        assert_eq!(quantized.scales, vec![120]);
        let restored = dequantize(&quantized).expect("dequantize");
        assert_eq!(&restored[..3], &[3.0, -1.5, 0.25]);
        assert!(restored[3..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn nvfp4_packs_two_elements_per_byte() {
        let mut weights = vec![0.0f32; 16];
        weights[0] = 6.0;
        weights[1] = -3.0;
        weights[2] = 1.0;
        let quantized = quantize(&weights, 1, 16, QuantizationMode::Nvfp4).expect("quantize");
        assert_eq!(quantized.packed.len(), 8);
        assert_eq!(quantized.scales, vec![0x38]);
        assert_eq!(quantized.packed[0], 0xD7);
        let restored = dequantize(&quantized).expect("dequantize");
        assert_eq!(&restored[..3], &[6.0, -3.0, 1.0]);
    }

    #[test]
    fn all_zero_blocks_round_trip_to_zero() {
        for mode in [QuantizationMode::Mxfp8, QuantizationMode::Nvfp4] {
            let quantized = quantize(&[0.0; 64], 2, 32, mode).expect("quantize");
            assert!(dequantize(&quantized).expect("dequantize").iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn ragged_rows_are_rejected() {
        match quantize(&[0.0; 40], 2, 20, QuantizationMode::Nvfp4) {
            Err(QmmError::UnsupportedShape(message)) => assert!(message.contains("20"), "{message}"),
            other => panic!("expected shape error, got {other:?}"),
        }
        assert!(matches!(
            quantize(&[0.0; 32], 1, 32, QuantizationMode::Affine),
            Err(QmmError::UnsupportedQuantizationMode { .. })
        ));
    }
}
