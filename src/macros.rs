// ABOUTME: Macros that remove boilerplate from the SMPP PDU definitions
// ABOUTME: Covers header-only PDUs, message_id responses and builder setters

/// Define a PDU that only contains the standard SMPP header.
///
/// Generates the struct, its Encodable/Decodable implementations and the
/// `new` / `error` constructors.
///
/// # Arguments
/// * `$pdu_type` - The PDU struct name (e.g., EnquireLink)
/// * `$command_id` - The CommandId variant (e.g., CommandId::EnquireLink)
macro_rules! header_only_pdu {
    ($(#[$meta:meta])* $pdu_type:ident, $command_id:expr) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        pub struct $pdu_type {
            pub command_status: $crate::datatypes::CommandStatus,
            pub sequence_number: u32,
        }

        impl $pdu_type {
            /// Create a new PDU with Ok status
            pub fn new(sequence_number: u32) -> Self {
                Self {
                    command_status: $crate::datatypes::CommandStatus::Ok,
                    sequence_number,
                }
            }

            /// Create a PDU with error status
            pub fn error(sequence_number: u32, status: $crate::datatypes::CommandStatus) -> Self {
                Self {
                    command_status: status,
                    sequence_number,
                }
            }
        }

        impl $crate::codec::Decodable for $pdu_type {
            fn decode(
                header: $crate::codec::PduHeader,
                _body: &mut std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::codec::CodecError> {
                Ok($pdu_type {
                    command_status: header.command_status,
                    sequence_number: header.sequence_number,
                })
            }
        }

        impl $crate::codec::Encodable for $pdu_type {
            fn command_id(&self) -> $crate::datatypes::CommandId {
                $command_id
            }

            fn command_status(&self) -> $crate::datatypes::CommandStatus {
                self.command_status
            }

            fn sequence_number(&self) -> u32 {
                self.sequence_number
            }

            fn encode_body(
                &self,
                _buf: &mut bytes::BytesMut,
            ) -> Result<(), $crate::codec::CodecError> {
                Ok(())
            }
        }
    };
}

/// Define a response PDU whose body is a single message_id C-Octet string
/// (submit_sm_resp, deliver_sm_resp).
///
/// A body may be absent when the response carries an error status.
macro_rules! message_id_response_pdu {
    ($(#[$meta:meta])* $pdu_type:ident, $command_id:expr) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        pub struct $pdu_type {
            pub command_status: $crate::datatypes::CommandStatus,
            pub sequence_number: u32,
            /// Message center assigned identifier of the message (max 64 octets)
            pub message_id: String,
        }

        impl $pdu_type {
            /// Create a successful response carrying `message_id`
            pub fn new(sequence_number: u32, message_id: impl Into<String>) -> Self {
                Self {
                    command_status: $crate::datatypes::CommandStatus::Ok,
                    sequence_number,
                    message_id: message_id.into(),
                }
            }

            /// Create a response with error status and no message_id
            pub fn error(sequence_number: u32, status: $crate::datatypes::CommandStatus) -> Self {
                Self {
                    command_status: status,
                    sequence_number,
                    message_id: String::new(),
                }
            }
        }

        impl $crate::codec::Decodable for $pdu_type {
            fn decode(
                header: $crate::codec::PduHeader,
                body: &mut std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::codec::CodecError> {
                use bytes::Buf;

                let message_id = if body.has_remaining() {
                    $crate::codec::decode_cstring(
                        body,
                        $crate::datatypes::MAX_MESSAGE_ID_LENGTH + 1,
                        "message_id",
                    )?
                } else {
                    String::new()
                };

                Ok($pdu_type {
                    command_status: header.command_status,
                    sequence_number: header.sequence_number,
                    message_id,
                })
            }
        }

        impl $crate::codec::Encodable for $pdu_type {
            fn command_id(&self) -> $crate::datatypes::CommandId {
                $command_id
            }

            fn command_status(&self) -> $crate::datatypes::CommandStatus {
                self.command_status
            }

            fn sequence_number(&self) -> u32 {
                self.sequence_number
            }

            fn encode_body(
                &self,
                buf: &mut bytes::BytesMut,
            ) -> Result<(), $crate::codec::CodecError> {
                $crate::codec::encode_cstring(
                    buf,
                    &self.message_id,
                    $crate::datatypes::MAX_MESSAGE_ID_LENGTH + 1,
                    "message_id",
                )
            }
        }
    };
}

/// Macro for generating builder setter methods
///
/// Each generated method takes a value, sets the corresponding field, and
/// returns self for method chaining.
macro_rules! builder_setters {
    ($($field:ident: $type:ty),* $(,)?) => {
        $(
            pub fn $field(mut self, $field: $type) -> Self {
                self.$field = $field;
                self
            }
        )*
    };
}

/// Define a message PDU carrying the submit_sm / deliver_sm mandatory
/// parameters (sections 4.4.1 and 4.6.1 share the same layout).
///
/// Generates the struct, a builder with defaults, and the codec. Optional
/// parameters are not modelled; trailing TLVs are skipped by the registry.
macro_rules! short_message_pdu {
    ($(#[$meta:meta])* $pdu_type:ident, $builder:ident, $command_id:expr) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq)]
        pub struct $pdu_type {
            pub command_status: $crate::datatypes::CommandStatus,
            pub sequence_number: u32,

            /// service_type: SMS application service, empty for the default
            pub service_type: String,
            pub source_addr_ton: $crate::datatypes::TypeOfNumber,
            pub source_addr_npi: $crate::datatypes::NumericPlanIndicator,
            /// source_addr: originating SME address (max 20 octets)
            pub source_addr: String,
            pub dest_addr_ton: $crate::datatypes::TypeOfNumber,
            pub dest_addr_npi: $crate::datatypes::NumericPlanIndicator,
            /// destination_addr: recipient SME address (max 20 octets)
            pub destination_addr: String,
            /// esm_class: message mode, type and GSM features (bit 6 = UDHI)
            pub esm_class: u8,
            pub protocol_id: u8,
            pub priority_flag: u8,
            /// schedule_delivery_time: empty for immediate delivery
            pub schedule_delivery_time: String,
            /// validity_period: empty for the message center default
            pub validity_period: String,
            pub registered_delivery: u8,
            pub replace_if_present_flag: u8,
            /// data_coding: encoding scheme of short_message
            pub data_coding: u8,
            pub sm_default_msg_id: u8,
            /// short_message: up to 254 octets of user data, sm_length is derived
            pub short_message: bytes::Bytes,
        }

        impl $pdu_type {
            /// Creates a builder with SMPP defaults (empty addresses, default coding)
            pub fn builder() -> $builder {
                $builder::default()
            }

            /// Whether short_message starts with a User Data Header
            pub fn has_udh(&self) -> bool {
                self.esm_class & $crate::datatypes::ESM_CLASS_UDHI != 0
            }
        }

        /// Builder for the message PDU; encoding enforces field lengths.
        #[derive(Debug, Default)]
        pub struct $builder {
            sequence_number: u32,
            service_type: String,
            source_addr_ton: $crate::datatypes::TypeOfNumber,
            source_addr_npi: $crate::datatypes::NumericPlanIndicator,
            source_addr: String,
            dest_addr_ton: $crate::datatypes::TypeOfNumber,
            dest_addr_npi: $crate::datatypes::NumericPlanIndicator,
            destination_addr: String,
            esm_class: u8,
            protocol_id: u8,
            priority_flag: u8,
            registered_delivery: u8,
            data_coding: u8,
            short_message: bytes::Bytes,
        }

        impl $builder {
            $crate::macros::builder_setters! {
                sequence_number: u32,
                source_addr_ton: $crate::datatypes::TypeOfNumber,
                source_addr_npi: $crate::datatypes::NumericPlanIndicator,
                dest_addr_ton: $crate::datatypes::TypeOfNumber,
                dest_addr_npi: $crate::datatypes::NumericPlanIndicator,
                esm_class: u8,
                protocol_id: u8,
                priority_flag: u8,
                registered_delivery: u8,
                data_coding: u8,
            }

            pub fn service_type(mut self, service_type: impl Into<String>) -> Self {
                self.service_type = service_type.into();
                self
            }

            pub fn source_addr(mut self, addr: impl Into<String>) -> Self {
                self.source_addr = addr.into();
                self
            }

            pub fn destination_addr(mut self, addr: impl Into<String>) -> Self {
                self.destination_addr = addr.into();
                self
            }

            pub fn short_message(mut self, message: impl Into<bytes::Bytes>) -> Self {
                self.short_message = message.into();
                self
            }

            pub fn build(self) -> $pdu_type {
                $pdu_type {
                    command_status: $crate::datatypes::CommandStatus::Ok,
                    sequence_number: self.sequence_number,
                    service_type: self.service_type,
                    source_addr_ton: self.source_addr_ton,
                    source_addr_npi: self.source_addr_npi,
                    source_addr: self.source_addr,
                    dest_addr_ton: self.dest_addr_ton,
                    dest_addr_npi: self.dest_addr_npi,
                    destination_addr: self.destination_addr,
                    esm_class: self.esm_class,
                    protocol_id: self.protocol_id,
                    priority_flag: self.priority_flag,
                    schedule_delivery_time: String::new(),
                    validity_period: String::new(),
                    registered_delivery: self.registered_delivery,
                    replace_if_present_flag: 0,
                    data_coding: self.data_coding,
                    sm_default_msg_id: 0,
                    short_message: self.short_message,
                }
            }
        }

        impl $crate::codec::Decodable for $pdu_type {
            fn decode(
                header: $crate::codec::PduHeader,
                body: &mut std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::codec::CodecError> {
                use $crate::codec::{decode_cstring, decode_enum, decode_octets, decode_u8};
                use $crate::datatypes::{MAX_ADDRESS_LENGTH, MAX_SERVICE_TYPE_LENGTH, MAX_TIME_LENGTH};

                let service_type = decode_cstring(body, MAX_SERVICE_TYPE_LENGTH + 1, "service_type")?;
                let source_addr_ton = decode_enum(body, "source_addr_ton")?;
                let source_addr_npi = decode_enum(body, "source_addr_npi")?;
                let source_addr = decode_cstring(body, MAX_ADDRESS_LENGTH + 1, "source_addr")?;
                let dest_addr_ton = decode_enum(body, "dest_addr_ton")?;
                let dest_addr_npi = decode_enum(body, "dest_addr_npi")?;
                let destination_addr =
                    decode_cstring(body, MAX_ADDRESS_LENGTH + 1, "destination_addr")?;
                let esm_class = decode_u8(body)?;
                let protocol_id = decode_u8(body)?;
                let priority_flag = decode_u8(body)?;
                let schedule_delivery_time =
                    decode_cstring(body, MAX_TIME_LENGTH + 1, "schedule_delivery_time")?;
                let validity_period = decode_cstring(body, MAX_TIME_LENGTH + 1, "validity_period")?;
                let registered_delivery = decode_u8(body)?;
                let replace_if_present_flag = decode_u8(body)?;
                let data_coding = decode_u8(body)?;
                let sm_default_msg_id = decode_u8(body)?;
                let sm_length = decode_u8(body)?;
                let short_message = decode_octets(body, sm_length as usize)?;

                Ok($pdu_type {
                    command_status: header.command_status,
                    sequence_number: header.sequence_number,
                    service_type,
                    source_addr_ton,
                    source_addr_npi,
                    source_addr,
                    dest_addr_ton,
                    dest_addr_npi,
                    destination_addr,
                    esm_class,
                    protocol_id,
                    priority_flag,
                    schedule_delivery_time,
                    validity_period,
                    registered_delivery,
                    replace_if_present_flag,
                    data_coding,
                    sm_default_msg_id,
                    short_message,
                })
            }
        }

        impl $crate::codec::Encodable for $pdu_type {
            fn command_id(&self) -> $crate::datatypes::CommandId {
                $command_id
            }

            fn command_status(&self) -> $crate::datatypes::CommandStatus {
                self.command_status
            }

            fn sequence_number(&self) -> u32 {
                self.sequence_number
            }

            fn encode_body(
                &self,
                buf: &mut bytes::BytesMut,
            ) -> Result<(), $crate::codec::CodecError> {
                use bytes::BufMut;
                use $crate::codec::encode_cstring;
                use $crate::datatypes::{
                    MAX_ADDRESS_LENGTH, MAX_SERVICE_TYPE_LENGTH, MAX_SHORT_MESSAGE_LENGTH,
                    MAX_TIME_LENGTH,
                };

                if self.short_message.len() > MAX_SHORT_MESSAGE_LENGTH {
                    return Err($crate::codec::CodecError::FieldValidation {
                        field: "short_message",
                        reason: format!(
                            "{} octets exceeds maximum of {}",
                            self.short_message.len(),
                            MAX_SHORT_MESSAGE_LENGTH
                        ),
                    });
                }

                encode_cstring(buf, &self.service_type, MAX_SERVICE_TYPE_LENGTH + 1, "service_type")?;
                buf.put_u8(self.source_addr_ton as u8);
                buf.put_u8(self.source_addr_npi as u8);
                encode_cstring(buf, &self.source_addr, MAX_ADDRESS_LENGTH + 1, "source_addr")?;
                buf.put_u8(self.dest_addr_ton as u8);
                buf.put_u8(self.dest_addr_npi as u8);
                encode_cstring(
                    buf,
                    &self.destination_addr,
                    MAX_ADDRESS_LENGTH + 1,
                    "destination_addr",
                )?;
                buf.put_u8(self.esm_class);
                buf.put_u8(self.protocol_id);
                buf.put_u8(self.priority_flag);
                encode_cstring(
                    buf,
                    &self.schedule_delivery_time,
                    MAX_TIME_LENGTH + 1,
                    "schedule_delivery_time",
                )?;
                encode_cstring(buf, &self.validity_period, MAX_TIME_LENGTH + 1, "validity_period")?;
                buf.put_u8(self.registered_delivery);
                buf.put_u8(self.replace_if_present_flag);
                buf.put_u8(self.data_coding);
                buf.put_u8(self.sm_default_msg_id);
                buf.put_u8(self.short_message.len() as u8);
                buf.put_slice(&self.short_message);
                Ok(())
            }
        }
    };
}

pub(crate) use {builder_setters, header_only_pdu, message_id_response_pdu, short_message_pdu};
