//! Fixed-point codec for the accelerator's stream formats.
//!
//! Input samples are quantized to 8-bit lanes (`floor(x * 128) mod 256`)
//! and packed four to a 32-bit word, lane 0 in the low byte. There is no
//! saturation: out-of-range samples wrap silently, matching the
//! synthesized core's input stage.
//!
//! Output words are 32-bit two's complement slices of a wider accumulator;
//! see [`FixedFormat`] for the decode scale.

use crate::error::{Result, XcorrError};
use xcorr_fifo::{FixedFormat, DIN_SCALE};

/// Quantize one sample to an 8-bit input lane.
///
/// Truncation is toward negative infinity; overflow wraps, exactly like
/// the hardware's input stage. Defined for all finite inputs.
#[allow(clippy::cast_possible_truncation)]
pub fn encode_sample(x: f32) -> u8 {
    ((x * DIN_SCALE).floor() as i64 & 0xFF) as u8
}

/// Decode one 8-bit input lane back to its sample value.
///
/// Lanes are two's complement at the input scale; used by the software
/// device model and the quantization tests.
#[allow(clippy::cast_possible_wrap)]
pub fn decode_sample(lane: u8) -> f32 {
    f32::from(lane as i8) / DIN_SCALE
}

/// Pack four lanes into one stream word, lane 0 in the low byte.
pub fn pack_word(s0: u8, s1: u8, s2: u8, s3: u8) -> u32 {
    u32::from(s0) | u32::from(s1) << 8 | u32::from(s2) << 16 | u32::from(s3) << 24
}

/// Unpack a stream word into its four lanes.
#[allow(clippy::cast_possible_truncation)]
pub fn unpack_word(word: u32) -> [u8; 4] {
    [
        word as u8,
        (word >> 8) as u8,
        (word >> 16) as u8,
        (word >> 24) as u8,
    ]
}

/// Encode and pack a sample vector into stream words.
///
/// # Errors
///
/// Returns [`XcorrError::UnalignedPayload`] if the length is not a
/// multiple of 4. Trailing samples are never silently dropped; a bad
/// test vector fails loudly instead of desynchronizing the protocol.
pub fn pack_samples(vector: &'static str, samples: &[f32]) -> Result<Vec<u32>> {
    if samples.len() % 4 != 0 {
        return Err(XcorrError::UnalignedPayload {
            vector,
            len: samples.len(),
        });
    }

    Ok(samples
        .chunks_exact(4)
        .map(|c| {
            pack_word(
                encode_sample(c[0]),
                encode_sample(c[1]),
                encode_sample(c[2]),
                encode_sample(c[3]),
            )
        })
        .collect())
}

/// Decode one raw output word for the given fixed-point format.
#[allow(clippy::cast_possible_wrap, clippy::cast_precision_loss)]
pub fn decode_output(word: u32, format: FixedFormat) -> f32 {
    (word as i32) as f32 / format.output_divisor()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_bit_exact() {
        for &(a, b, c, d) in &[
            (0u8, 0u8, 0u8, 0u8),
            (255, 255, 255, 255),
            (1, 2, 3, 4),
            (0x80, 0x7F, 0xFF, 0x01),
        ] {
            assert_eq!(unpack_word(pack_word(a, b, c, d)), [a, b, c, d]);
        }
    }

    #[test]
    fn encode_truncates_toward_negative_infinity() {
        // floor(-0.004 * 128) = floor(-0.512) = -1 -> 0xFF
        assert_eq!(encode_sample(-0.004), 0xFF);
        assert_eq!(encode_sample(0.0), 0x00);
        // floor(0.999 * 128) = 127
        assert_eq!(encode_sample(0.999), 0x7F);
    }

    #[test]
    fn encode_wraps_silently() {
        // 2.0 * 128 = 256 -> wraps to 0, matching the hardware input stage
        assert_eq!(encode_sample(2.0), 0x00);
        assert_eq!(encode_sample(2.5), 0x40);
    }

    #[test]
    fn quantization_bound_within_one_lsb() {
        for i in -100..100 {
            #[allow(clippy::cast_precision_loss)]
            let x = f32::from(i16::try_from(i).unwrap()) / 101.0;
            let roundtrip = decode_sample(encode_sample(x));
            assert!(
                (roundtrip - x).abs() <= 1.0 / DIN_SCALE,
                "|{roundtrip} - {x}| > 1/{DIN_SCALE}"
            );
        }
    }

    #[test]
    fn decode_output_linearity() {
        // -1 two's complement, INT=8 FRAC=24: shift 0, decodes to -1.0
        let fmt = FixedFormat::new(8, 24);
        assert_eq!(decode_output(0xFFFF_FFFF, fmt), -1.0);
        assert_eq!(decode_output(0x0000_0001, fmt), 1.0);

        // Same words with 8 fractional wire bits
        let fmt = FixedFormat::new(8, 32);
        assert_eq!(decode_output(0xFFFF_FFFF, fmt), -1.0 / 256.0);
        assert_eq!(decode_output(0x0000_0100, fmt), 1.0);
    }

    #[test]
    fn pack_samples_rejects_unaligned() {
        let err = pack_samples("A", &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(
            err,
            crate::error::XcorrError::UnalignedPayload { vector: "A", len: 3 }
        ));
    }

    #[test]
    fn pack_samples_matches_manual_packing() {
        let samples = [0.5f32, -0.5, 0.25, 1.0 / 128.0];
        let words = pack_samples("A", &samples).unwrap();
        assert_eq!(words.len(), 1);
        assert_eq!(
            words[0],
            pack_word(
                encode_sample(0.5),
                encode_sample(-0.5),
                encode_sample(0.25),
                encode_sample(1.0 / 128.0)
            )
        );
    }
}
