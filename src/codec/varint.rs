//! Base-128 variable-length unsigned integers.
//!
//! Each byte carries seven data bits, least significant group first, with the
//! high bit set on every byte except the last. Frame lengths and fragment
//! header fields share this encoding so that small values cost one byte.

use bytes::BufMut;

use super::FramingError;

/// Longest encoding of a `u64` value.
pub const MAX_VARINT_LEN: usize = 10;

const CONTINUATION: u8 = 0x80;
const DATA_BITS: u8 = 0x7F;

/// Number of bytes `value` occupies once encoded.
///
/// # Examples
///
/// ```
/// use wirelink::codec::varint::varint_len;
///
/// assert_eq!(varint_len(0), 1);
/// assert_eq!(varint_len(127), 1);
/// assert_eq!(varint_len(128), 2);
/// assert_eq!(varint_len(u64::MAX), 10);
/// ```
#[must_use]
pub const fn varint_len(value: u64) -> usize {
    let mut len = 1;
    let mut rest = value >> 7;
    while rest != 0 {
        len += 1;
        rest >>= 7;
    }
    len
}

/// Append the encoding of `value` to `dst`.
///
/// # Examples
///
/// ```
/// use wirelink::codec::varint::put_varint;
///
/// let mut buf = Vec::new();
/// put_varint(&mut buf, 300);
/// assert_eq!(buf, [0xAC, 0x02]);
/// ```
#[expect(
    clippy::cast_possible_truncation,
    reason = "each emitted byte is masked to seven data bits"
)]
pub fn put_varint<B: BufMut>(dst: &mut B, value: u64) {
    let mut rest = value;
    while rest >= u64::from(CONTINUATION) {
        dst.put_u8((rest as u8 & DATA_BITS) | CONTINUATION);
        rest >>= 7;
    }
    dst.put_u8(rest as u8);
}

/// Decode a value from the front of `src`.
///
/// Returns `Ok(Some((value, consumed)))` once a terminating byte is found and
/// `Ok(None)` when `src` ends mid-encoding.
///
/// # Errors
///
/// Returns [`FramingError::InvalidLengthEncoding`] when the encoding runs past
/// [`MAX_VARINT_LEN`] bytes or overflows `u64`.
///
/// # Examples
///
/// ```
/// use wirelink::codec::varint::decode_varint;
///
/// assert_eq!(decode_varint(&[0xAC, 0x02, 0xFF]), Ok(Some((300, 2))));
/// assert_eq!(decode_varint(&[0xAC]), Ok(None));
/// ```
pub fn decode_varint(src: &[u8]) -> Result<Option<(u64, usize)>, FramingError> {
    let mut value = 0_u64;
    for (position, byte) in src.iter().copied().enumerate() {
        if position == MAX_VARINT_LEN - 1 && byte > 1 {
            return Err(FramingError::InvalidLengthEncoding);
        }
        value |= u64::from(byte & DATA_BITS) << (7 * position);
        if byte & CONTINUATION == 0 {
            return Ok(Some((value, position + 1)));
        }
    }
    Ok(None)
}
