//! Bit-level codecs for the minifloat formats used by block-scaled weights.

/// Magnitudes of the eight non-negative e2m1 codes.
pub const E2M1_VALUES: [f32; 8] = [0.0, 0.5, 1.0, 1.5, 2.0, 3.0, 4.0, 6.0];

/// Largest finite e4m3 magnitude.
pub const E4M3_MAX: f32 = 448.0;
/// Largest e2m1 magnitude.
pub const E2M1_MAX: f32 = 6.0;

const E4M3_NAN: u8 = 0x7F;
const E4M3_MAX_CODE: u8 = 0x7E;

/// Decode an e4m3 byte (bias 7, no infinities, `S.1111.111` is NaN).
pub fn e4m3_to_f32(bits: u8) -> f32 {
    let sign = if bits & 0x80 != 0 { -1.0 } else { 1.0 };
    let exp = (bits >> 3) & 0x0F;
    let man = bits & 0x07;

    if exp == 0x0F && man == 0x07 {
        return f32::NAN;
    }
    if exp == 0 {
        sign * 2.0f32.powi(-6) * (man as f32 / 8.0)
    } else {
        sign * 2.0f32.powi(exp as i32 - 7) * (1.0 + man as f32 / 8.0)
    }
}

/// Round to the nearest e4m3 value, ties to even, saturating at ±448.
pub fn f32_to_e4m3(value: f32) -> u8 {
    if value.is_nan() {
        return E4M3_NAN;
    }
    let sign = if value.is_sign_negative() { 0x80 } else { 0x00 };
    let magnitude = value.abs();
    if magnitude >= E4M3_MAX {
        return sign | E4M3_MAX_CODE;
    }
    // Positive codes decode monotonically, so the nearest one brackets `magnitude`.
    let upper = (0..=E4M3_MAX_CODE).find(|&code| e4m3_to_f32(code) >= magnitude).unwrap_or(E4M3_MAX_CODE);
    let code = if upper == 0 {
        0
    } else {
        let lower = upper - 1;
        let below = magnitude - e4m3_to_f32(lower);
        let above = e4m3_to_f32(upper) - magnitude;
        if below < above || (below == above && lower % 2 == 0) { lower } else { upper }
    };
    if code == 0 { 0 } else { sign | code }
}

/// Decode the low nibble of `bits` as e2m1.
pub fn e2m1_to_f32(bits: u8) -> f32 {
    let magnitude = E2M1_VALUES[(bits & 0x07) as usize];
    if bits & 0x08 != 0 { -magnitude } else { magnitude }
}

/// Round to the nearest e2m1 value, ties to even, saturating at ±6.
pub fn f32_to_e2m1(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    let magnitude = value.abs().min(E2M1_MAX);
    let mut best = 0usize;
    for (code, &candidate) in E2M1_VALUES.iter().enumerate().skip(1) {
        let current = (E2M1_VALUES[best] - magnitude).abs();
        let distance = (candidate - magnitude).abs();
        if distance < current || (distance == current && code % 2 == 0) {
            best = code;
        }
    }
    if best != 0 && value.is_sign_negative() { 0x08 | best as u8 } else { best as u8 }
}

/// Decode a ue8m0 scale: `2^(bits - 127)`, with `0xFF` reserved for NaN.
pub fn ue8m0_to_f32(bits: u8) -> f32 {
    if bits == 0xFF {
        return f32::NAN;
    }
    2.0f32.powi(bits as i32 - 127)
}

/// Encode the power-of-two `2^exponent`, clamping to the representable range.
pub fn ue8m0_from_exponent(exponent: i32) -> u8 {
    (exponent.clamp(-127, 127) + 127) as u8
}

/// Split a packed fp4 byte into its (low, high) element values.
#[inline]
pub fn unpack_e2m1_pair(byte: u8) -> (f32, f32) {
    (e2m1_to_f32(byte & 0x0F), e2m1_to_f32(byte >> 4))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn e4m3_known_codes() {
        assert_eq!(e4m3_to_f32(0x00), 0.0);
        assert_eq!(e4m3_to_f32(0x38), 1.0);
        assert_eq!(e4m3_to_f32(0xB8), -1.0);
        assert_eq!(e4m3_to_f32(0x7E), 448.0);
        assert_eq!(e4m3_to_f32(0x01), 2.0f32.powi(-9));
        assert!(e4m3_to_f32(0x7F).is_nan());
        assert!(e4m3_to_f32(0xFF).is_nan());
    }

    #[test]
    fn e4m3_rounding_saturates_and_ties_to_even() {
        assert_eq!(f32_to_e4m3(1000.0), 0x7E);
        assert_eq!(f32_to_e4m3(-1000.0), 0xFE);
        assert_eq!(f32_to_e4m3(1.0), 0x38);
        // 1.0625 sits halfway between 1.0 (0x38) and 1.125 (0x39).
        assert_eq!(f32_to_e4m3(1.0625), 0x38);
        assert_eq!(f32_to_e4m3(1.1), 0x39);
        assert_eq!(f32_to_e4m3(-0.0), 0x00);
        assert_eq!(f32_to_e4m3(f32::NAN), 0x7F);
    }

    #[test]
    fn e2m1_table_and_signs() {
        assert_eq!(e2m1_to_f32(0x7), 6.0);
        assert_eq!(e2m1_to_f32(0xF), -6.0);
        assert_eq!(e2m1_to_f32(0x3), 1.5);
        assert_eq!(f32_to_e2m1(5.0), 0x6);
        assert_eq!(f32_to_e2m1(2.4), 0x4);
        assert_eq!(f32_to_e2m1(-10.0), 0xF);
        // 2.5 ties between 2.0 (code 4) and 3.0 (code 5).
        assert_eq!(f32_to_e2m1(2.5), 0x4);
    }

    #[test]
    fn packed_fp4_is_low_nibble_first() {
        let (low, high) = unpack_e2m1_pair(0x92);
        assert_eq!(low, 1.0);
        assert_eq!(high, -0.5);
    }

    #[test]
    fn ue8m0_is_a_biased_power_of_two() {
        assert_eq!(ue8m0_to_f32(127), 1.0);
        assert_eq!(ue8m0_to_f32(130), 8.0);
        assert_eq!(ue8m0_to_f32(125), 0.25);
        assert!(ue8m0_to_f32(0xFF).is_nan());
        assert_eq!(ue8m0_from_exponent(-3), 124);
        assert_eq!(ue8m0_from_exponent(500), 254);
    }
}
