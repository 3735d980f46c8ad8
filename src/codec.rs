// SMPP v3.4 Codec - Separates parsing/encoding logic from domain models
//
// The session layer only ever sees typed `Frame` values. This module turns a
// byte buffer into a `Frame` (through a command_id -> decoder table built once)
// and a `Frame` back into bytes.

use crate::datatypes::{
    BindRequest, BindResponse, BindType, CommandId, CommandStatus, DeliverSm, DeliverSmResponse,
    EnquireLink, EnquireLinkResponse, GenericNack, SubmitSm, SubmitSmResponse, Unbind,
    UnbindResponse,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::LazyLock;
use thiserror::Error;

/// Maximum allowed PDU size to prevent memory exhaustion attacks
pub const MAX_PDU_SIZE: u32 = 65536; // 64KB

/// SMPP v3.4 PDU Header (16 bytes, common to all PDUs)
#[derive(Debug, Clone, PartialEq)]
pub struct PduHeader {
    pub command_length: u32,
    pub command_id: CommandId,
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl PduHeader {
    pub const SIZE: usize = 16;

    /// Decode PDU header from buffer with validation
    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        if buf.remaining() < Self::SIZE {
            return Err(CodecError::Incomplete);
        }

        let command_length = buf.get_u32();
        let command_id_raw = buf.get_u32();
        let command_id = CommandId::try_from(command_id_raw)
            .map_err(|_| CodecError::InvalidCommandId(command_id_raw))?;
        let command_status_raw = buf.get_u32();
        let sequence_number = buf.get_u32();

        if !(Self::SIZE as u32..=MAX_PDU_SIZE).contains(&command_length) {
            return Err(CodecError::InvalidPduLength {
                length: command_length,
                min: Self::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }

        // Requests must have command_status = 0
        if !command_id.is_response() && command_status_raw != 0 {
            return Err(CodecError::InvalidRequestStatus {
                command_id,
                command_status: command_status_raw,
            });
        }

        // generic_nack may carry 0 when the offending PDU's sequence was unreadable
        if command_id != CommandId::GenericNack
            && (sequence_number == 0 || sequence_number == 0xFFFF_FFFF)
        {
            return Err(CodecError::ReservedSequenceNumber(sequence_number));
        }

        Ok(PduHeader {
            command_length,
            command_id,
            command_status: CommandStatus::from_wire(command_status_raw),
            sequence_number,
        })
    }

    /// Encode PDU header to buffer
    pub fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.command_length);
        buf.put_u32(self.command_id as u32);
        buf.put_u32(self.command_status as u32);
        buf.put_u32(self.sequence_number);
    }
}

/// Trait for PDUs that can be encoded to bytes.
///
/// Implementors describe their header fields and write their body; the
/// provided `encode` takes care of the header and the command_length patch.
pub trait Encodable {
    fn command_id(&self) -> CommandId;

    fn command_status(&self) -> CommandStatus;

    fn sequence_number(&self) -> u32;

    /// Write the PDU body (everything after the 16 byte header)
    fn encode_body(&self, buf: &mut BytesMut) -> Result<(), CodecError>;

    /// Encode this PDU, header included, to the buffer
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let start = buf.len();
        PduHeader {
            command_length: 0,
            command_id: self.command_id(),
            command_status: self.command_status(),
            sequence_number: self.sequence_number(),
        }
        .encode(buf);
        self.encode_body(buf)?;

        let length = (buf.len() - start) as u32;
        if length > MAX_PDU_SIZE {
            return Err(CodecError::InvalidPduLength {
                length,
                min: PduHeader::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }
        buf[start..start + 4].copy_from_slice(&length.to_be_bytes());
        Ok(())
    }

    /// Convert this PDU to bytes (convenience method)
    fn to_bytes(&self) -> Result<Bytes, CodecError> {
        let mut buf = BytesMut::with_capacity(PduHeader::SIZE);
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }
}

/// Trait for PDUs that can be decoded from a header and the PDU body
pub trait Decodable: Sized {
    /// Decode this PDU from the body that follows `header`
    fn decode(header: PduHeader, body: &mut Cursor<&[u8]>) -> Result<Self, CodecError>;
}

/// Codec errors with detailed context for debugging
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Incomplete PDU: need more data")]
    Incomplete,

    #[error("Invalid command_id: {0:#x}")]
    InvalidCommandId(u32),

    #[error("Invalid PDU length: {length}, must be {min}-{max}")]
    InvalidPduLength { length: u32, min: u32, max: u32 },

    #[error("Request PDU {command_id:?} has non-zero status: {command_status:#x}")]
    InvalidRequestStatus {
        command_id: CommandId,
        command_status: u32,
    },

    #[error("Reserved sequence number: {0} (0 and 0xFFFFFFFF are reserved)")]
    ReservedSequenceNumber(u32),

    #[error("Field '{field}' validation failed: {reason}")]
    FieldValidation { field: &'static str, reason: String },

    #[error("UTF-8 decoding error in field '{field}': {source}")]
    Utf8Error {
        field: &'static str,
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// A PDU whose header was readable but whose body was not. Carries the
    /// raw header fields so the peer can still be answered.
    #[error("Malformed PDU {command_id:#x} (sequence {sequence_number}): {source}")]
    MalformedPdu {
        command_id: u32,
        sequence_number: u32,
        #[source]
        source: Box<CodecError>,
    },

    #[error("Connection reset by peer")]
    ConnectionReset,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodecError {
    /// Convert codec errors to appropriate SMPP command_status codes
    pub fn to_command_status(&self) -> CommandStatus {
        match self {
            CodecError::InvalidPduLength { .. } => CommandStatus::InvalidCommandLength,
            CodecError::InvalidCommandId(_) => CommandStatus::InvalidCommandId,
            CodecError::FieldValidation { field, .. } | CodecError::Utf8Error { field, .. } => {
                match *field {
                    "source_addr" => CommandStatus::InvalidSourceAddress,
                    "source_addr_ton" => CommandStatus::InvalidSourceAddrTon,
                    "source_addr_npi" => CommandStatus::InvalidSourceAddrNpi,
                    "destination_addr" => CommandStatus::InvalidDestinationAddress,
                    "dest_addr_ton" => CommandStatus::InvalidDestAddrTon,
                    "dest_addr_npi" => CommandStatus::InvalidDestAddrNpi,
                    "service_type" => CommandStatus::InvalidServiceType,
                    "short_message" => CommandStatus::InvalidMsgLength,
                    "message_id" => CommandStatus::InvalidMessageId,
                    "system_id" => CommandStatus::InvalidSystemId,
                    "password" => CommandStatus::InvalidPassword,
                    "system_type" => CommandStatus::InvalidSystemType,
                    "body" => CommandStatus::InvalidCommandLength,
                    _ => CommandStatus::SystemError,
                }
            }
            CodecError::MalformedPdu { source, .. } => source.to_command_status(),
            _ => CommandStatus::SystemError,
        }
    }
}

/// Decode a C-Octet string: bytes up to a NUL terminator, at most `max_len`
/// octets including the terminator.
pub fn decode_cstring(
    buf: &mut Cursor<&[u8]>,
    max_len: usize,
    field: &'static str,
) -> Result<String, CodecError> {
    let chunk = buf.chunk();
    let window = &chunk[..chunk.len().min(max_len)];

    let Some(end) = window.iter().position(|&b| b == 0) else {
        return Err(if chunk.len() < max_len {
            CodecError::Incomplete
        } else {
            CodecError::FieldValidation {
                field,
                reason: format!("missing NUL terminator within {max_len} octets"),
            }
        });
    };

    let value = String::from_utf8(window[..end].to_vec())
        .map_err(|source| CodecError::Utf8Error { field, source })?;
    buf.advance(end + 1);
    Ok(value)
}

/// Encode a C-Octet string, rejecting values that do not fit `max_len`
/// octets including the terminator.
pub fn encode_cstring(
    buf: &mut BytesMut,
    value: &str,
    max_len: usize,
    field: &'static str,
) -> Result<(), CodecError> {
    if value.len() >= max_len {
        return Err(CodecError::FieldValidation {
            field,
            reason: format!(
                "{} octets exceeds maximum of {} (with NUL terminator)",
                value.len() + 1,
                max_len
            ),
        });
    }
    buf.put_slice(value.as_bytes());
    buf.put_u8(0);
    Ok(())
}

/// Decode a single byte
pub fn decode_u8(buf: &mut Cursor<&[u8]>) -> Result<u8, CodecError> {
    if buf.remaining() < 1 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u8())
}

/// Decode exactly `len` octets
pub fn decode_octets(buf: &mut Cursor<&[u8]>, len: usize) -> Result<Bytes, CodecError> {
    if buf.remaining() < len {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.copy_to_bytes(len))
}

/// Decode a single byte into one of the `num_enum` wire enums
pub fn decode_enum<T>(buf: &mut Cursor<&[u8]>, field: &'static str) -> Result<T, CodecError>
where
    T: TryFrom<u8>,
{
    let raw = decode_u8(buf)?;
    T::try_from(raw).map_err(|_| CodecError::FieldValidation {
        field,
        reason: format!("unsupported value {raw:#04x}"),
    })
}

/// Generic frame type that can hold any PDU the session layer understands
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    // Bind PDUs (the flavor is carried in the PDU)
    Bind(BindRequest),
    BindResp(BindResponse),

    // Message PDUs
    SubmitSm(Box<SubmitSm>),
    SubmitSmResp(SubmitSmResponse),
    DeliverSm(Box<DeliverSm>),
    DeliverSmResp(DeliverSmResponse),

    // Session management PDUs
    Unbind(Unbind),
    UnbindResp(UnbindResponse),
    EnquireLink(EnquireLink),
    EnquireLinkResp(EnquireLinkResponse),
    GenericNack(GenericNack),

    // For PDUs without a registered decoder (forward compatibility)
    Unknown { header: PduHeader, body: Bytes },
}

/// Registry of PDU decoders keyed by command_id
type DecoderFn = Box<dyn Fn(PduHeader, &mut Cursor<&[u8]>) -> Result<Frame, CodecError> + Send + Sync>;

pub struct PduRegistry {
    decoders: HashMap<CommandId, DecoderFn>,
}

static REGISTRY: LazyLock<PduRegistry> = LazyLock::new(PduRegistry::new);

impl PduRegistry {
    /// Create a new registry with every PDU the session layer handles
    pub fn new() -> Self {
        let mut registry = Self {
            decoders: HashMap::new(),
        };

        registry.register::<BindRequest, _>(
            &[
                CommandId::BindTransmitter,
                CommandId::BindReceiver,
                CommandId::BindTransceiver,
            ],
            Frame::Bind,
        );
        registry.register::<BindResponse, _>(
            &[
                CommandId::BindTransmitterResp,
                CommandId::BindReceiverResp,
                CommandId::BindTransceiverResp,
            ],
            Frame::BindResp,
        );

        // Message PDUs are boxed to keep Frame small
        registry.register::<SubmitSm, _>(&[CommandId::SubmitSm], |pdu| {
            Frame::SubmitSm(Box::new(pdu))
        });
        registry.register::<SubmitSmResponse, _>(&[CommandId::SubmitSmResp], Frame::SubmitSmResp);
        registry.register::<DeliverSm, _>(&[CommandId::DeliverSm], |pdu| {
            Frame::DeliverSm(Box::new(pdu))
        });
        registry
            .register::<DeliverSmResponse, _>(&[CommandId::DeliverSmResp], Frame::DeliverSmResp);

        registry.register::<Unbind, _>(&[CommandId::Unbind], Frame::Unbind);
        registry.register::<UnbindResponse, _>(&[CommandId::UnbindResp], Frame::UnbindResp);
        registry.register::<EnquireLink, _>(&[CommandId::EnquireLink], Frame::EnquireLink);
        registry.register::<EnquireLinkResponse, _>(
            &[CommandId::EnquireLinkResp],
            Frame::EnquireLinkResp,
        );
        registry.register::<GenericNack, _>(&[CommandId::GenericNack], Frame::GenericNack);

        registry
    }

    fn register<T, F>(&mut self, command_ids: &[CommandId], frame_constructor: F)
    where
        T: Decodable + 'static,
        F: Fn(T) -> Frame + Copy + Send + Sync + 'static,
    {
        for &command_id in command_ids {
            let decoder = Box::new(move |header: PduHeader, buf: &mut Cursor<&[u8]>| {
                let pdu = T::decode(header, buf)?;
                Ok(frame_constructor(pdu))
            });
            self.decoders.insert(command_id, decoder);
        }
    }

    /// Decode a PDU given its header and the buffer positioned at its body.
    ///
    /// The body is bounded by command_length; bytes a decoder leaves unread
    /// (optional parameters) are skipped.
    pub fn decode_pdu(
        &self,
        header: PduHeader,
        buf: &mut Cursor<&[u8]>,
    ) -> Result<Frame, CodecError> {
        let body_size = header.command_length as usize - PduHeader::SIZE;
        if buf.remaining() < body_size {
            return Err(CodecError::Incomplete);
        }
        let body = buf.copy_to_bytes(body_size);

        match self.decoders.get(&header.command_id) {
            Some(decoder) => {
                let mut body = Cursor::new(body.as_ref());
                let frame = decoder(header, &mut body).map_err(|err| match err {
                    // The whole PDU is buffered, so a short body is malformed
                    CodecError::Incomplete => CodecError::FieldValidation {
                        field: "body",
                        reason: "PDU body shorter than its mandatory parameters".to_string(),
                    },
                    other => other,
                })?;
                if body.has_remaining() {
                    tracing::trace!(
                        "skipping {} octets of optional parameters",
                        body.remaining()
                    );
                }
                Ok(frame)
            }
            None => {
                tracing::warn!(
                    "Unknown PDU command_id: {:#x}, treating as opaque data",
                    header.command_id as u32
                );
                Ok(Frame::Unknown { header, body })
            }
        }
    }

    /// Check if a command_id is registered
    pub fn is_registered(&self, command_id: CommandId) -> bool {
        self.decoders.contains_key(&command_id)
    }
}

impl Default for PduRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Frame {
    /// Get the command_id for this frame
    pub fn command_id(&self) -> CommandId {
        match self {
            Frame::Bind(pdu) => pdu.command_id(),
            Frame::BindResp(pdu) => pdu.command_id(),
            Frame::SubmitSm(pdu) => pdu.command_id(),
            Frame::SubmitSmResp(pdu) => pdu.command_id(),
            Frame::DeliverSm(pdu) => pdu.command_id(),
            Frame::DeliverSmResp(pdu) => pdu.command_id(),
            Frame::Unbind(pdu) => pdu.command_id(),
            Frame::UnbindResp(pdu) => pdu.command_id(),
            Frame::EnquireLink(pdu) => pdu.command_id(),
            Frame::EnquireLinkResp(pdu) => pdu.command_id(),
            Frame::GenericNack(pdu) => pdu.command_id(),
            Frame::Unknown { header, .. } => header.command_id,
        }
    }

    /// Get the sequence number for this frame
    pub fn sequence_number(&self) -> u32 {
        match self {
            Frame::Bind(pdu) => pdu.sequence_number,
            Frame::BindResp(pdu) => pdu.sequence_number,
            Frame::SubmitSm(pdu) => pdu.sequence_number,
            Frame::SubmitSmResp(pdu) => pdu.sequence_number,
            Frame::DeliverSm(pdu) => pdu.sequence_number,
            Frame::DeliverSmResp(pdu) => pdu.sequence_number,
            Frame::Unbind(pdu) => pdu.sequence_number,
            Frame::UnbindResp(pdu) => pdu.sequence_number,
            Frame::EnquireLink(pdu) => pdu.sequence_number,
            Frame::EnquireLinkResp(pdu) => pdu.sequence_number,
            Frame::GenericNack(pdu) => pdu.sequence_number,
            Frame::Unknown { header, .. } => header.sequence_number,
        }
    }

    /// Check if this frame is a response PDU
    pub fn is_response(&self) -> bool {
        self.command_id().is_response()
    }

    /// Build the response that rejects this request with `status`.
    ///
    /// Requests without a decoder are answered with a generic_nack. Returns
    /// `None` for responses, which are never answered.
    pub fn reject_with(&self, status: CommandStatus) -> Option<Frame> {
        Frame::rejection_for(self.command_id(), self.sequence_number(), status)
    }

    /// The rejection for a request known only by its header fields
    pub fn rejection_for(
        command_id: CommandId,
        sequence_number: u32,
        status: CommandStatus,
    ) -> Option<Frame> {
        if command_id.is_response() {
            return None;
        }
        if let Some(bind_type) = bind_type_of(command_id) {
            return Some(Frame::BindResp(BindResponse {
                bind_type,
                command_status: status,
                sequence_number,
                system_id: String::new(),
            }));
        }
        Some(match command_id {
            CommandId::SubmitSm => {
                Frame::SubmitSmResp(SubmitSmResponse::error(sequence_number, status))
            }
            CommandId::DeliverSm => {
                Frame::DeliverSmResp(DeliverSmResponse::error(sequence_number, status))
            }
            CommandId::Unbind => Frame::UnbindResp(UnbindResponse::error(sequence_number, status)),
            CommandId::EnquireLink => {
                Frame::EnquireLinkResp(EnquireLinkResponse::error(sequence_number, status))
            }
            _ => Frame::GenericNack(GenericNack::new(status, sequence_number)),
        })
    }

    /// Encode this frame to the buffer
    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        match self {
            Frame::Bind(pdu) => pdu.encode(buf),
            Frame::BindResp(pdu) => pdu.encode(buf),
            Frame::SubmitSm(pdu) => pdu.encode(buf),
            Frame::SubmitSmResp(pdu) => pdu.encode(buf),
            Frame::DeliverSm(pdu) => pdu.encode(buf),
            Frame::DeliverSmResp(pdu) => pdu.encode(buf),
            Frame::Unbind(pdu) => pdu.encode(buf),
            Frame::UnbindResp(pdu) => pdu.encode(buf),
            Frame::EnquireLink(pdu) => pdu.encode(buf),
            Frame::EnquireLinkResp(pdu) => pdu.encode(buf),
            Frame::GenericNack(pdu) => pdu.encode(buf),
            Frame::Unknown { header, body } => {
                header.encode(buf);
                buf.put_slice(body);
                Ok(())
            }
        }
    }

    /// Check whether `buf` holds a complete PDU, returning its length.
    ///
    /// The cursor position is left untouched.
    pub fn check(buf: &mut Cursor<&[u8]>) -> Result<usize, CodecError> {
        if buf.remaining() < PduHeader::SIZE {
            return Err(CodecError::Incomplete);
        }

        let chunk = buf.chunk();
        let command_length = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);

        if !(PduHeader::SIZE as u32..=MAX_PDU_SIZE).contains(&command_length) {
            return Err(CodecError::InvalidPduLength {
                length: command_length,
                min: PduHeader::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }

        if buf.remaining() < command_length as usize {
            return Err(CodecError::Incomplete);
        }

        Ok(command_length as usize)
    }

    /// Parse one complete frame from the buffer
    pub fn parse(buf: &mut Cursor<&[u8]>) -> Result<Frame, CodecError> {
        let header = PduHeader::decode(buf)?;
        REGISTRY.decode_pdu(header, buf)
    }
}

/// Resolve the bind flavor of a bind or bind response command_id
pub(crate) fn bind_type_of(command_id: CommandId) -> Option<BindType> {
    match command_id {
        CommandId::BindTransmitter | CommandId::BindTransmitterResp => Some(BindType::Transmitter),
        CommandId::BindReceiver | CommandId::BindReceiverResp => Some(BindType::Receiver),
        CommandId::BindTransceiver | CommandId::BindTransceiverResp => Some(BindType::Transceiver),
        _ => None,
    }
}
