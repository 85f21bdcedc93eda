use serde::{Deserialize, Serialize};

use super::{NumericFormat, QuantizationMode, ScaleApplicationMode};
use crate::error::QmmError;

/// Weight encoding and block-scale policy of a block-scaled mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuantizationScheme {
    pub weight_format: NumericFormat,
    pub scale_mode: ScaleApplicationMode,
}

impl QuantizationScheme {
    /// Elements sharing one scale.
    #[inline]
    pub const fn block_size(&self) -> usize {
        self.scale_mode.block_size()
    }
}

const MXFP8: QuantizationScheme = QuantizationScheme {
    weight_format: NumericFormat::Fp8E4m3,
    scale_mode: ScaleApplicationMode::Vec32Ue8m0,
};

const NVFP4: QuantizationScheme = QuantizationScheme {
    weight_format: NumericFormat::Fp4E2m1,
    scale_mode: ScaleApplicationMode::Vec16Ue4m3,
};

/// Scheme table lookup; `None` for modes served outside this engine.
pub const fn scheme_for(mode: QuantizationMode) -> Option<QuantizationScheme> {
    match mode {
        QuantizationMode::Mxfp8 => Some(MXFP8),
        QuantizationMode::Nvfp4 => Some(NVFP4),
        QuantizationMode::Affine | QuantizationMode::Mxfp4 => None,
    }
}

/// Resolve the weight format and scale application mode for `mode`.
pub fn resolve(mode: QuantizationMode) -> Result<QuantizationScheme, QmmError> {
    scheme_for(mode).ok_or(QmmError::UnsupportedQuantizationMode { mode })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantization::ScaleFormat;

    #[test]
    fn mxfp8_uses_e4m3_with_32_element_exponent_scales() {
        let scheme = resolve(QuantizationMode::Mxfp8).expect("mxfp8 resolves");
        assert_eq!(scheme.weight_format, NumericFormat::Fp8E4m3);
        assert_eq!(scheme.scale_mode, ScaleApplicationMode::Vec32Ue8m0);
        assert_eq!(scheme.block_size(), 32);
        assert_eq!(scheme.scale_mode.scale_format(), ScaleFormat::Ue8m0);
    }

    #[test]
    fn nvfp4_uses_e2m1_with_16_element_e4m3_scales() {
        let scheme = resolve(QuantizationMode::Nvfp4).expect("nvfp4 resolves");
        assert_eq!(scheme.weight_format, NumericFormat::Fp4E2m1);
        assert_eq!(scheme.scale_mode, ScaleApplicationMode::Vec16Ue4m3);
        assert_eq!(scheme.block_size(), 16);
        assert_eq!(scheme.scale_mode.scale_format(), ScaleFormat::Ue4m3);
    }

    #[test]
    fn resolution_is_idempotent() {
        for mode in [QuantizationMode::Mxfp8, QuantizationMode::Nvfp4] {
            let first = resolve(mode).expect("supported");
            for _ in 0..8 {
                assert_eq!(resolve(mode).expect("supported"), first);
            }
        }
    }

    #[test]
    fn unsupported_modes_name_the_mode() {
        for mode in [QuantizationMode::Affine, QuantizationMode::Mxfp4] {
            match resolve(mode) {
                Err(err @ QmmError::UnsupportedQuantizationMode { .. }) => {
                    let message = err.to_string();
                    assert!(message.contains(&format!("{mode:?}")), "{message}");
                }
                other => panic!("expected unsupported mode for {mode}, got {other:?}"),
            }
        }
    }
}
