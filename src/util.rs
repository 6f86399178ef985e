//! General stuff.

/// Brings [unlikely](core::intrinsics::unlikely) to stable rust.
#[inline(always)]
pub(crate) const fn unlikely(b: bool) -> bool {
    #[allow(clippy::needless_bool, clippy::bool_to_int_with_if)]
    if (1i32).checked_div(if b { 0 } else { 1 }).is_none() {
        true
    } else {
        false
    }
}

/// Reads a big-endian unsigned integer of `bytes.len()` (up to 8) bytes.
#[inline]
pub(crate) fn read_be_uint(bytes: &[u8]) -> u64 {
    debug_assert!(bytes.len() <= 8);
    bytes.iter().fold(0u64, |acc, byte| (acc << 8) | *byte as u64)
}

#[cfg(any(feature = "base64", test))]
#[inline]
pub(crate) fn encode_base64<T: AsRef<[u8]>>(data: T) -> String {
    use base64::Engine;
    fn encode_base64_impl(data: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(data)
    }
    encode_base64_impl(data.as_ref())
}

#[cfg(any(feature = "base64", test))]
#[inline]
pub(crate) fn decode_base64<T: AsRef<[u8]>>(data: T) -> Result<Vec<u8>, base64::DecodeError> {
    use base64::Engine;
    fn decode_base64_impl(data: &[u8]) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(data)
    }
    decode_base64_impl(data.as_ref())
}

#[cfg(feature = "base64")]
#[inline]
pub(crate) fn decode_base64_slice<T: AsRef<[u8]>>(
    data: T,
    target: &mut [u8],
) -> Result<(), base64::DecodeSliceError> {
    use base64::Engine;
    fn decode_base64_slice_impl(
        data: &[u8],
        target: &mut [u8],
    ) -> Result<(), base64::DecodeSliceError> {
        base64::engine::general_purpose::STANDARD
            .decode_slice(data, target)
            .map(|_| ())
    }
    decode_base64_slice_impl(data.as_ref(), target)
}

/// A wrapper around arbitrary data with the specified bit length.
///
/// Displayed as hex with a `_` completion tag for non-aligned lengths.
pub struct Bitstring<'a> {
    /// Underlying bytes (with or without termination bit).
    pub bytes: &'a [u8],
    /// Length of data in bits.
    pub bit_len: u16,
}

impl std::fmt::Display for Bitstring<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bit_len = std::cmp::min(self.bit_len as usize, self.bytes.len() * 8) as u16;
        let byte_len = ((bit_len + 7) / 8) as usize;
        let bytes = &self.bytes[..byte_len];

        let rem = bit_len % 8;
        let (bytes, last_byte) = match bytes.split_last() {
            Some((last_byte, bytes)) if rem != 0 => {
                let tag_mask: u8 = 1 << (7 - rem);
                let data_mask = !(tag_mask - 1);
                (bytes, Some((*last_byte & data_mask) | tag_mask))
            }
            _ => (bytes, None),
        };

        for byte in bytes {
            ok!(write!(f, "{byte:02x}"));
        }

        if let Some(mut last_byte) = last_byte {
            // Half-byte remainders with a tag fit into a single hex digit
            let tag = if rem != 4 { "_" } else { "" };
            let width = 1 + (rem > 4) as usize;
            if width == 1 {
                last_byte >>= 4;
            }
            ok!(write!(f, "{last_byte:0width$x}{tag}"));
        }

        Ok(())
    }
}

impl std::fmt::Binary for Bitstring<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bit_len = std::cmp::min(self.bit_len as usize, self.bytes.len() * 8);
        for i in 0..bit_len {
            let bit = (self.bytes[i / 8] >> (7 - i % 8)) & 1;
            ok!(write!(f, "{bit}"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitstring_display() {
        let display = |bytes: &[u8], bit_len: u16| format!("{}", Bitstring { bytes, bit_len });

        assert_eq!(display(&[], 0), "");
        assert_eq!(display(&[0xde, 0xad], 16), "dead");
        assert_eq!(display(&[0b_0011_0000], 4), "3");
        assert_eq!(display(&[0b_0100_0000], 2), "6_");
        assert_eq!(display(&[0b_0000_1000], 5), "0c_");
        assert_eq!(display(&[0b_0000_1000, 0b_0100_0000], 10), "086_");
    }

    #[test]
    fn bitstring_binary() {
        let bitstring = Bitstring {
            bytes: &[0b1010_0000],
            bit_len: 3,
        };
        assert_eq!(format!("{bitstring:b}"), "101");
    }

    #[test]
    fn be_uint() {
        assert_eq!(read_be_uint(&[]), 0);
        assert_eq!(read_be_uint(&[0x01, 0x02]), 0x0102);
        assert_eq!(read_be_uint(&[0xff; 8]), u64::MAX);
    }
}
