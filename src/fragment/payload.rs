//! Wire layout of fragment envelopes.
//!
//! A fragment travels as an ordinary envelope whose kind tag is
//! [`MessageKind::FRAGMENT`]:
//!
//! `[0xFF][group id varint][index varint][count varint][payload]`
//!
//! Small groups therefore cost one byte each for the index and count fields.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{FragmentError, FragmentFrame, FragmentHeader, FragmentIndex, GroupId};
use crate::{
    codec::varint::{MAX_VARINT_LEN, decode_varint, put_varint},
    envelope::MessageKind,
};

/// Encode a fragment as a complete envelope, kind tag included.
#[must_use]
pub fn encode_fragment(header: &FragmentHeader, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(1 + 3 * MAX_VARINT_LEN + payload.len());
    buf.put_u8(MessageKind::FRAGMENT.get());
    put_varint(&mut buf, header.group_id().get());
    put_varint(&mut buf, u64::from(header.index().get()));
    put_varint(&mut buf, u64::from(header.count()));
    buf.put_slice(payload);
    buf.freeze()
}

/// Decode a fragment from the envelope body following the kind tag.
///
/// The payload is sliced out of `body` without copying.
///
/// # Errors
///
/// Returns [`FragmentError::Malformed`] when a header field is truncated,
/// overlong, or too large for its type.
pub fn decode_fragment(mut body: Bytes) -> Result<FragmentFrame, FragmentError> {
    let group_id = take_varint(&mut body, "group id")?;
    let index = take_u32(&mut body, "index")?;
    let count = take_u32(&mut body, "count")?;
    let header = FragmentHeader::new(GroupId::new(group_id), FragmentIndex::new(index), count);
    Ok(FragmentFrame::new(header, body))
}

fn take_varint(body: &mut Bytes, field: &'static str) -> Result<u64, FragmentError> {
    match decode_varint(body) {
        Ok(Some((value, used))) => {
            body.advance(used);
            Ok(value)
        }
        Ok(None) | Err(_) => Err(FragmentError::Malformed { field }),
    }
}

fn take_u32(body: &mut Bytes, field: &'static str) -> Result<u32, FragmentError> {
    let value = take_varint(body, field)?;
    u32::try_from(value).map_err(|_| FragmentError::Malformed { field })
}
