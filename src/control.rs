//! MMDB control byte layout
//!
//! Every value in an MMDB data section starts with a control byte:
//!
//! ```text
//!   7   6   5   4   3   2   1   0
//! ┌───────────┬───────────────────┐
//! │  type tag │   short length    │
//! └───────────┴───────────────────┘
//! ```
//!
//! - Type tag 0 escapes to an extended type stored in the next byte.
//! - Short lengths 29, 30 and 31 are sentinels: 1, 2 or 3 big-endian
//!   bytes follow and extend the length with a fixed bias.
//! - Pointers (tag 1) reuse bits 3-4 as a width selector.
//!
//! See: https://maxmind.github.io/MaxMind-DB/

/// Largest length that fits directly in the control byte
pub const MAX_INLINE_LENGTH: u8 = 28;

/// Bias added to a one-byte length extension (sentinel 29)
pub const ONE_BYTE_BIAS: usize = 29;

/// Bias added to a two-byte length extension (sentinel 30)
pub const TWO_BYTE_BIAS: usize = 285;

/// Bias added to a three-byte length extension (sentinel 31)
pub const THREE_BYTE_BIAS: usize = 65_821;

/// Decoded view of a single control byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlByte(u8);

impl ControlByte {
    /// Wrap a raw control byte
    pub fn new(byte: u8) -> Self {
        ControlByte(byte)
    }

    /// The raw byte value
    pub fn raw(self) -> u8 {
        self.0
    }

    /// Type tag from the three most significant bits
    pub fn type_tag(self) -> u8 {
        (self.0 >> 5) & 0b111
    }

    /// Length (or length sentinel) from the five least significant bits
    pub fn short_length(self) -> u8 {
        self.0 & 0b1_1111
    }

    /// True when the real type lives in the following byte
    pub fn is_extended(self) -> bool {
        self.type_tag() == 0
    }

    /// Pointer width selector from bits 3-4 (only meaningful for tag 1)
    pub fn pointer_size_selector(self) -> u8 {
        (self.0 >> 3) & 0b11
    }
}

/// Number of length-extension bytes that follow a given short length
pub fn extension_width(short_length: u8) -> usize {
    match short_length {
        0..=MAX_INLINE_LENGTH => 0,
        29 => 1,
        30 => 2,
        _ => 3,
    }
}

/// Resolve a payload length from its short length and extension bytes
///
/// `extension` must hold exactly [`extension_width`] bytes for `short_length`,
/// most significant byte first. Inline lengths ignore it.
pub fn resolve_length(short_length: u8, extension: &[u8]) -> usize {
    debug_assert_eq!(extension.len(), extension_width(short_length));

    let be = |bytes: &[u8]| {
        bytes
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | b as usize)
    };

    match short_length {
        0..=MAX_INLINE_LENGTH => short_length as usize,
        29 => be(extension) + ONE_BYTE_BIAS,
        30 => be(extension) + TWO_BYTE_BIAS,
        _ => be(extension) + THREE_BYTE_BIAS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_control_byte_fields() {
        // Map (tag 7) with 29-sentinel
        let ctrl = ControlByte::new(0b1111_1101);
        assert_eq!(ctrl.type_tag(), 7);
        assert_eq!(ctrl.short_length(), 29);
        assert!(!ctrl.is_extended());

        let ctrl = ControlByte::new(0x04);
        assert!(ctrl.is_extended());
        assert_eq!(ctrl.short_length(), 4);
    }

    #[test]
    fn test_pointer_selector_bits() {
        for selector in 0..4u8 {
            let ctrl = ControlByte::new(0x20 | (selector << 3) | 0b101);
            assert_eq!(ctrl.type_tag(), 1);
            assert_eq!(ctrl.pointer_size_selector(), selector);
        }
    }

    #[test]
    fn test_known_extension_values() {
        assert_eq!(resolve_length(29, &[0x00]), 29);
        assert_eq!(resolve_length(29, &[0xFF]), 284);
        assert_eq!(resolve_length(30, &[0x01, 0x00]), 541);
        assert_eq!(resolve_length(31, &[0x00, 0x01, 0x00]), 66_077);
        assert_eq!(resolve_length(31, &[0xFF, 0xFF, 0xFF]), 16_843_036);
    }

    #[test]
    fn test_extension_ranges_are_contiguous() {
        assert_eq!(resolve_length(28, &[]) + 1, resolve_length(29, &[0x00]));
        assert_eq!(
            resolve_length(29, &[0xFF]) + 1,
            resolve_length(30, &[0x00, 0x00])
        );
        assert_eq!(
            resolve_length(30, &[0xFF, 0xFF]) + 1,
            resolve_length(31, &[0x00, 0x00, 0x00])
        );
    }

    proptest! {
        #[test]
        fn prop_inline_length_is_identity(len in 0u8..29) {
            prop_assert_eq!(extension_width(len), 0);
            prop_assert_eq!(resolve_length(len, &[]), len as usize);
        }

        #[test]
        fn prop_one_byte_extension(x in any::<u8>()) {
            prop_assert_eq!(resolve_length(29, &[x]), x as usize + 29);
        }

        #[test]
        fn prop_two_byte_extension(hi in any::<u8>(), lo in any::<u8>()) {
            let expected = ((hi as usize) << 8 | lo as usize) + 285;
            prop_assert_eq!(resolve_length(30, &[hi, lo]), expected);
        }

        #[test]
        fn prop_three_byte_extension(b0 in any::<u8>(), b1 in any::<u8>(), b2 in any::<u8>()) {
            let expected = ((b0 as usize) << 16 | (b1 as usize) << 8 | b2 as usize) + 65_821;
            prop_assert_eq!(resolve_length(31, &[b0, b1, b2]), expected);
        }
    }
}
