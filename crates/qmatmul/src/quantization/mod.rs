//! Quantization schemes and the numeric formats they store weights in.

pub mod minifloat;
pub mod registry;

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub use registry::{QuantizationScheme, resolve};

use crate::{error::QmmError, tensor::Dtype};

/// Weight quantization schemes known to the framework.
///
/// Only [`QuantizationMode::Mxfp8`] and [`QuantizationMode::Nvfp4`] run on the
/// block-scaled path; the others are served elsewhere and rejected here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuantizationMode {
    Affine,
    Mxfp4,
    Mxfp8,
    Nvfp4,
}

impl QuantizationMode {
    pub const ALL: [QuantizationMode; 4] = [
        QuantizationMode::Affine,
        QuantizationMode::Mxfp4,
        QuantizationMode::Mxfp8,
        QuantizationMode::Nvfp4,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            QuantizationMode::Affine => "affine",
            QuantizationMode::Mxfp4 => "mxfp4",
            QuantizationMode::Mxfp8 => "mxfp8",
            QuantizationMode::Nvfp4 => "nvfp4",
        }
    }
}

impl fmt::Display for QuantizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a mode name, attributing failures to the calling operation `tag`.
pub fn parse_quantization_mode(value: &str, tag: &'static str) -> Result<QuantizationMode, QmmError> {
    QuantizationMode::ALL
        .into_iter()
        .find(|mode| value.eq_ignore_ascii_case(mode.as_str()))
        .ok_or_else(|| QmmError::InvalidQuantizationMode {
            value: value.to_string(),
            tag,
        })
}

impl FromStr for QuantizationMode {
    type Err = QmmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_quantization_mode(s, "quantization_mode")
    }
}

/// Storage encoding of a matmul operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumericFormat {
    F16,
    BF16,
    F32,
    /// 4-bit float, 1 sign / 2 exponent / 1 mantissa bit.
    Fp4E2m1,
    /// 8-bit float, 1 sign / 4 exponent / 3 mantissa bits.
    Fp8E4m3,
}

impl NumericFormat {
    /// Activation and output format for an array dtype.
    pub fn from_dtype(dtype: Dtype, operation: &'static str) -> Result<Self, QmmError> {
        match dtype {
            Dtype::F16 => Ok(NumericFormat::F16),
            Dtype::BF16 => Ok(NumericFormat::BF16),
            Dtype::F32 => Ok(NumericFormat::F32),
            Dtype::U8 | Dtype::U32 => Err(QmmError::UnsupportedDtype { operation, dtype }),
        }
    }

    pub const fn bits(self) -> usize {
        match self {
            NumericFormat::F16 | NumericFormat::BF16 => 16,
            NumericFormat::F32 => 32,
            NumericFormat::Fp4E2m1 => 4,
            NumericFormat::Fp8E4m3 => 8,
        }
    }
}

impl fmt::Display for NumericFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericFormat::F16 => write!(f, "f16"),
            NumericFormat::BF16 => write!(f, "bf16"),
            NumericFormat::F32 => write!(f, "f32"),
            NumericFormat::Fp4E2m1 => write!(f, "fp4_e2m1"),
            NumericFormat::Fp8E4m3 => write!(f, "fp8_e4m3"),
        }
    }
}

/// Encoding of a single per-block scale value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScaleFormat {
    /// Unsigned 8-bit biased exponent, value `2^(e - 127)`.
    Ue8m0,
    /// Unsigned e4m3 minifloat.
    Ue4m3,
}

impl ScaleFormat {
    /// Decode one scale byte.
    pub fn decode(self, bits: u8) -> f32 {
        match self {
            ScaleFormat::Ue8m0 => minifloat::ue8m0_to_f32(bits),
            ScaleFormat::Ue4m3 => minifloat::e4m3_to_f32(bits & 0x7F),
        }
    }
}

/// How per-block scales multiply into the weight operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScaleApplicationMode {
    /// One ue8m0 scale per 32 consecutive elements.
    Vec32Ue8m0,
    /// One ue4m3 scale per 16 consecutive elements.
    Vec16Ue4m3,
}

impl ScaleApplicationMode {
    pub const fn block_size(self) -> usize {
        match self {
            ScaleApplicationMode::Vec32Ue8m0 => 32,
            ScaleApplicationMode::Vec16Ue4m3 => 16,
        }
    }

    pub const fn scale_format(self) -> ScaleFormat {
        match self {
            ScaleApplicationMode::Vec32Ue8m0 => ScaleFormat::Ue8m0,
            ScaleApplicationMode::Vec16Ue4m3 => ScaleFormat::Ue4m3,
        }
    }
}

impl fmt::Display for ScaleApplicationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaleApplicationMode::Vec32Ue8m0 => write!(f, "vec32_ue8m0"),
            ScaleApplicationMode::Vec16Ue4m3 => write!(f, "vec16_ue4m3"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_names_parse_back() {
        for mode in QuantizationMode::ALL {
            assert_eq!(mode.to_string().parse::<QuantizationMode>().ok(), Some(mode));
        }
        assert_eq!("NVFP4".parse::<QuantizationMode>().ok(), Some(QuantizationMode::Nvfp4));
    }

    #[test]
    fn unknown_mode_names_carry_the_tag() {
        match parse_quantization_mode("int4", "quantized_matmul") {
            Err(err @ QmmError::InvalidQuantizationMode { .. }) => {
                let message = err.to_string();
                assert!(message.contains("int4"), "{message}");
                assert!(message.contains("quantized_matmul"), "{message}");
            }
            other => panic!("expected invalid mode error, got {other:?}"),
        }
    }

    #[test]
    fn integer_dtypes_are_not_activation_formats() {
        assert_eq!(NumericFormat::from_dtype(Dtype::BF16, "test").ok(), Some(NumericFormat::BF16));
        match NumericFormat::from_dtype(Dtype::U8, "test") {
            Err(QmmError::UnsupportedDtype { dtype, .. }) => assert_eq!(dtype, Dtype::U8),
            other => panic!("expected unsupported dtype, got {other:?}"),
        }
    }
}
