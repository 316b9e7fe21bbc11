//! Fixed-point formats used on the accelerator's stream interfaces.
//!
//! Input samples are quantized to 8-bit lanes with an implicit scale of
//! [`DIN_SCALE`] (1 integer bit, 7 fractional). Output words are 32-bit
//! two's complement in an `INT.FRAC` format wider than 32 bits in total;
//! the hardware ships the top 32 bits, so the real value of a word is
//! `signed(word) / 2^(int_bits + frac_bits - 32)`.

/// Input quantization scale: lane value = `floor(sample * DIN_SCALE) mod 256`.
pub const DIN_SCALE: f32 = 128.0;

/// Output fixed-point format of the accelerator.
///
/// These widths come from the synthesized core's configuration, not from
/// this crate; they are runtime parameters everywhere they are consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedFormat {
    /// Integer bits of the output accumulator.
    pub int_bits: u32,
    /// Fractional bits of the output accumulator.
    pub frac_bits: u32,
}

impl FixedFormat {
    /// Create a format description.
    pub const fn new(int_bits: u32, frac_bits: u32) -> Self {
        Self {
            int_bits,
            frac_bits,
        }
    }

    /// Binary point shift applied when decoding a 32-bit output word.
    ///
    /// The hardware truncates the accumulator to its top 32 bits, leaving
    /// `int_bits + frac_bits - 32` fractional bits in the wire word.
    pub const fn output_shift(self) -> u32 {
        self.int_bits + self.frac_bits - 32
    }

    /// Divisor corresponding to [`output_shift`](Self::output_shift).
    #[allow(clippy::cast_precision_loss)]
    pub fn output_divisor(self) -> f32 {
        (1u64 << self.output_shift()) as f32
    }
}

impl Default for FixedFormat {
    /// Format of the shipped bitstream (8 integer, 32 fractional bits).
    fn default() -> Self {
        Self::new(8, 32)
    }
}
