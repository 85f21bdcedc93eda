use serde::{Deserialize, Serialize};

/// Represents the data type of array elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum Dtype {
    F32,
    F16,
    BF16,
    U8,
    U32,
}

impl Dtype {
    pub fn size_bytes(&self) -> usize {
        match self {
            Dtype::F32 => std::mem::size_of::<f32>(),
            Dtype::F16 => std::mem::size_of::<half::f16>(),
            Dtype::BF16 => std::mem::size_of::<half::bf16>(),
            Dtype::U8 => std::mem::size_of::<u8>(),
            Dtype::U32 => std::mem::size_of::<u32>(),
        }
    }

    /// Decode one element from its little-endian byte representation.
    ///
    /// `bytes` must hold at least `size_bytes()` bytes.
    pub fn read_f32(&self, bytes: &[u8]) -> f32 {
        match self {
            Dtype::F32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            Dtype::F16 => half::f16::from_le_bytes([bytes[0], bytes[1]]).to_f32(),
            Dtype::BF16 => half::bf16::from_le_bytes([bytes[0], bytes[1]]).to_f32(),
            Dtype::U8 => bytes[0] as f32,
            Dtype::U32 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32,
        }
    }

    /// Encode one element into `out`, saturating for the integer types.
    pub fn write_f32(&self, value: f32, out: &mut [u8]) {
        match self {
            Dtype::F32 => out[..4].copy_from_slice(&value.to_le_bytes()),
            Dtype::F16 => out[..2].copy_from_slice(&half::f16::from_f32(value).to_le_bytes()),
            Dtype::BF16 => out[..2].copy_from_slice(&half::bf16::from_f32(value).to_le_bytes()),
            Dtype::U8 => out[0] = value.clamp(0.0, 255.0) as u8,
            Dtype::U32 => out[..4].copy_from_slice(&(value.max(0.0) as u32).to_le_bytes()),
        }
    }
}
