use crate::codec::{
    CodecError, Decodable, Encodable, PduHeader, bind_type_of, decode_cstring, decode_enum,
    encode_cstring,
};
use crate::datatypes::{
    CommandId, CommandStatus, InterfaceVersion, MAX_ADDRESS_RANGE_LENGTH, MAX_PASSWORD_LENGTH,
    MAX_SYSTEM_ID_LENGTH, MAX_SYSTEM_TYPE_LENGTH, NumericPlanIndicator, TypeOfNumber,
};
use bytes::{Buf, BufMut, BytesMut};
use std::io::Cursor;

/// The three bind flavors of SMPP v3.4 (sections 4.1.1, 4.1.3, 4.1.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindType {
    /// Bind as transmitter (can send submit_sm)
    Transmitter,
    /// Bind as receiver (can receive deliver_sm)
    Receiver,
    /// Bind as transceiver (both transmitter and receiver capabilities)
    Transceiver,
}

impl BindType {
    pub fn command_id(&self) -> CommandId {
        match self {
            BindType::Transmitter => CommandId::BindTransmitter,
            BindType::Receiver => CommandId::BindReceiver,
            BindType::Transceiver => CommandId::BindTransceiver,
        }
    }

    pub fn response_command_id(&self) -> CommandId {
        match self {
            BindType::Transmitter => CommandId::BindTransmitterResp,
            BindType::Receiver => CommandId::BindReceiverResp,
            BindType::Transceiver => CommandId::BindTransceiverResp,
        }
    }
}

/// bind_transmitter, bind_receiver or bind_transceiver, selected by `bind_type`.
///
/// All three carry the same body.
#[derive(Clone, Debug, PartialEq)]
pub struct BindRequest {
    pub bind_type: BindType,
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    /// 5.2.1 system_id: identifies the ESME requesting to bind (max 15 octets).
    pub system_id: String,

    /// 5.2.2 password: empty when the message center requires none (max 8 octets).
    pub password: String,

    /// 5.2.3 system_type: categorizes the ESME, e.g. "VMS" or "OTA" (max 12 octets).
    pub system_type: String,

    /// 5.2.4 interface_version: SMPP version supported by the ESME.
    pub interface_version: InterfaceVersion,

    /// 5.2.5 addr_ton: Type of Number of the ESME address(es) served.
    pub addr_ton: TypeOfNumber,

    /// 5.2.6 addr_npi: Numbering Plan Indicator of the ESME address(es) served.
    pub addr_npi: NumericPlanIndicator,

    /// 5.2.7 address_range: range of SME addresses served (max 40 octets).
    pub address_range: String,
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum BindValidationError {
    #[error("system_id exceeds maximum length of 15 characters (16 with null terminator): {actual}")]
    SystemIdTooLong { actual: usize },

    #[error("password exceeds maximum length of 8 characters (9 with null terminator): {actual}")]
    PasswordTooLong { actual: usize },

    #[error("system_type exceeds maximum length of 12 characters (13 with null terminator): {actual}")]
    SystemTypeTooLong { actual: usize },

    #[error("address_range exceeds maximum length of 40 characters (41 with null terminator): {actual}")]
    AddressRangeTooLong { actual: usize },
}

/// Check the bind identity fields against the SMPP v3.4 length limits
pub fn validate_bind_fields(
    system_id: &str,
    password: &str,
    system_type: &str,
    address_range: &str,
) -> Result<(), BindValidationError> {
    if system_id.len() > MAX_SYSTEM_ID_LENGTH {
        return Err(BindValidationError::SystemIdTooLong {
            actual: system_id.len(),
        });
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(BindValidationError::PasswordTooLong {
            actual: password.len(),
        });
    }
    if system_type.len() > MAX_SYSTEM_TYPE_LENGTH {
        return Err(BindValidationError::SystemTypeTooLong {
            actual: system_type.len(),
        });
    }
    if address_range.len() > MAX_ADDRESS_RANGE_LENGTH {
        return Err(BindValidationError::AddressRangeTooLong {
            actual: address_range.len(),
        });
    }
    Ok(())
}

impl BindRequest {
    /// Validates the bind PDU according to SMPP v3.4 specification
    pub fn validate(&self) -> Result<(), BindValidationError> {
        validate_bind_fields(
            &self.system_id,
            &self.password,
            &self.system_type,
            &self.address_range,
        )
    }

    /// Creates a builder for constructing bind PDUs with validation
    pub fn builder(bind_type: BindType) -> BindRequestBuilder {
        BindRequestBuilder::new(bind_type)
    }
}

/// Builder for bind PDUs with validation and sensible defaults
pub struct BindRequestBuilder {
    request: BindRequest,
}

impl BindRequestBuilder {
    pub fn new(bind_type: BindType) -> Self {
        Self {
            request: BindRequest {
                bind_type,
                command_status: CommandStatus::Ok,
                sequence_number: 1,
                system_id: String::new(),
                password: String::new(),
                system_type: String::new(),
                interface_version: InterfaceVersion::SmppV34,
                addr_ton: TypeOfNumber::Unknown,
                addr_npi: NumericPlanIndicator::Unknown,
                address_range: String::new(),
            },
        }
    }

    pub fn sequence_number(mut self, seq: u32) -> Self {
        self.request.sequence_number = seq;
        self
    }

    pub fn system_id(mut self, system_id: impl Into<String>) -> Self {
        self.request.system_id = system_id.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.request.password = password.into();
        self
    }

    pub fn system_type(mut self, system_type: impl Into<String>) -> Self {
        self.request.system_type = system_type.into();
        self
    }

    pub fn interface_version(mut self, version: InterfaceVersion) -> Self {
        self.request.interface_version = version;
        self
    }

    pub fn addr_ton(mut self, ton: TypeOfNumber) -> Self {
        self.request.addr_ton = ton;
        self
    }

    pub fn addr_npi(mut self, npi: NumericPlanIndicator) -> Self {
        self.request.addr_npi = npi;
        self
    }

    pub fn address_range(mut self, range: impl Into<String>) -> Self {
        self.request.address_range = range.into();
        self
    }

    /// Build the bind PDU, performing validation
    pub fn build(self) -> Result<BindRequest, BindValidationError> {
        self.request.validate()?;
        Ok(self.request)
    }
}

impl Decodable for BindRequest {
    fn decode(header: PduHeader, body: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let bind_type = bind_type_of(header.command_id)
            .filter(|_| !header.command_id.is_response())
            .ok_or(CodecError::InvalidCommandId(header.command_id as u32))?;

        Ok(BindRequest {
            bind_type,
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            system_id: decode_cstring(body, MAX_SYSTEM_ID_LENGTH + 1, "system_id")?,
            password: decode_cstring(body, MAX_PASSWORD_LENGTH + 1, "password")?,
            system_type: decode_cstring(body, MAX_SYSTEM_TYPE_LENGTH + 1, "system_type")?,
            interface_version: decode_enum(body, "interface_version")?,
            addr_ton: decode_enum(body, "addr_ton")?,
            addr_npi: decode_enum(body, "addr_npi")?,
            address_range: decode_cstring(body, MAX_ADDRESS_RANGE_LENGTH + 1, "address_range")?,
        })
    }
}

impl Encodable for BindRequest {
    fn command_id(&self) -> CommandId {
        self.bind_type.command_id()
    }

    fn command_status(&self) -> CommandStatus {
        self.command_status
    }

    fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    fn encode_body(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        encode_cstring(buf, &self.system_id, MAX_SYSTEM_ID_LENGTH + 1, "system_id")?;
        encode_cstring(buf, &self.password, MAX_PASSWORD_LENGTH + 1, "password")?;
        encode_cstring(buf, &self.system_type, MAX_SYSTEM_TYPE_LENGTH + 1, "system_type")?;
        buf.put_u8(self.interface_version as u8);
        buf.put_u8(self.addr_ton as u8);
        buf.put_u8(self.addr_npi as u8);
        encode_cstring(
            buf,
            &self.address_range,
            MAX_ADDRESS_RANGE_LENGTH + 1,
            "address_range",
        )
    }
}

/// bind_transmitter_resp, bind_receiver_resp or bind_transceiver_resp.
///
/// The sc_interface_version optional parameter is not carried.
#[derive(Clone, Debug, PartialEq)]
pub struct BindResponse {
    pub bind_type: BindType,
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    /// system_id of the message center (max 15 octets)
    pub system_id: String,
}

impl Decodable for BindResponse {
    fn decode(header: PduHeader, body: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let bind_type = bind_type_of(header.command_id)
            .filter(|_| header.command_id.is_response())
            .ok_or(CodecError::InvalidCommandId(header.command_id as u32))?;

        // Error responses may omit the body entirely
        let system_id = if body.has_remaining() {
            decode_cstring(body, MAX_SYSTEM_ID_LENGTH + 1, "system_id")?
        } else {
            String::new()
        };

        Ok(BindResponse {
            bind_type,
            command_status: header.command_status,
            sequence_number: header.sequence_number,
            system_id,
        })
    }
}

impl Encodable for BindResponse {
    fn command_id(&self) -> CommandId {
        self.bind_type.response_command_id()
    }

    fn command_status(&self) -> CommandStatus {
        self.command_status
    }

    fn sequence_number(&self) -> u32 {
        self.sequence_number
    }

    fn encode_body(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        encode_cstring(buf, &self.system_id, MAX_SYSTEM_ID_LENGTH + 1, "system_id")
    }
}
