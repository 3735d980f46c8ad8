// ABOUTME: Splits long message bodies into concatenated short message parts with a 6-octet UDH
// ABOUTME: Part sizes follow the data_coding of the message (GSM default, 8-bit, UCS2)

use crate::codec::CodecError;
use crate::session::error::{SessionError, SessionResult};
use crate::session::ledger::MessageId;
use bytes::{BufMut, Bytes, BytesMut};

/// Length of the concatenation User Data Header, length octet included
pub const CONCAT_HEADER_LENGTH: usize = 6;

/// Largest payload of one part of a concatenated message for `data_coding`
pub fn max_part_size(data_coding: Option<u8>) -> usize {
    match data_coding {
        None | Some(0) | Some(3) => 153,
        Some(5..=7) => 134,
        Some(8) => 67,
        Some(_) => 153,
    }
}

/// Largest body that still fits a single, unsegmented short message
pub fn single_part_limit(data_coding: Option<u8>) -> usize {
    match data_coding {
        Some(5..=7) => 140,
        Some(8) => 70,
        _ => 160,
    }
}

/// Concatenated short message information element, 8-bit reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcatHeader {
    pub reference_tag: u8,
    pub total_parts: u8,
    /// 1-based
    pub part_index: u8,
}

impl ConcatHeader {
    pub fn to_bytes(&self) -> [u8; CONCAT_HEADER_LENGTH] {
        [
            0x05, // UDH length
            0x00, // IEI: concatenated short messages, 8-bit reference
            0x03, // IE length
            self.reference_tag,
            self.total_parts,
            self.part_index,
        ]
    }
}

/// One part of a segmented message
#[derive(Debug, Clone, PartialEq)]
pub struct MessagePart {
    pub header: ConcatHeader,
    pub payload: Bytes,
}

impl MessagePart {
    /// UDH followed by the payload, ready for short_message
    pub fn short_message(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(CONCAT_HEADER_LENGTH + self.payload.len());
        buf.put_slice(&self.header.to_bytes());
        buf.put_slice(&self.payload);
        buf.freeze()
    }
}

/// Split `body` into ordered parts of at most `max_part_size(data_coding)` octets.
///
/// Every part carries the reference tag of `message_id`. At most 255 parts
/// can be addressed by the one-octet counters.
pub fn segment(
    message_id: &MessageId,
    body: &[u8],
    data_coding: Option<u8>,
) -> SessionResult<Vec<MessagePart>> {
    if body.is_empty() {
        return Err(SessionError::EmptyMessage);
    }

    let chunk_size = max_part_size(data_coding);
    let total_parts = u8::try_from(body.len().div_ceil(chunk_size)).map_err(|_| {
        SessionError::Codec(CodecError::FieldValidation {
            field: "short_message",
            reason: format!(
                "{} octets needs more than 255 parts of {} octets",
                body.len(),
                chunk_size
            ),
        })
    })?;
    let reference_tag = message_id.reference_tag();

    Ok(body
        .chunks(chunk_size)
        .zip(1..=total_parts)
        .map(|(chunk, part_index)| MessagePart {
            header: ConcatHeader {
                reference_tag,
                total_parts,
                part_index,
            },
            payload: Bytes::copy_from_slice(chunk),
        })
        .collect())
}
