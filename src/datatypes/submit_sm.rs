use crate::datatypes::CommandId;
use crate::macros::{message_id_response_pdu, short_message_pdu};

short_message_pdu!(
    /// submit_sm (section 4.4.1): an ESME submits a short message to the
    /// message center for onward transmission to a specified SME.
    SubmitSm,
    SubmitSmBuilder,
    CommandId::SubmitSm
);

message_id_response_pdu!(
    /// submit_sm_resp (section 4.4.2): carries the message center's id for
    /// the accepted message.
    SubmitSmResponse,
    CommandId::SubmitSmResp
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CodecError, Encodable, Frame};
    use crate::datatypes::{
        CommandStatus, ESM_CLASS_UDHI, NumericPlanIndicator, TypeOfNumber,
    };
    use std::io::Cursor;

    fn hello() -> SubmitSm {
        SubmitSm::builder()
            .sequence_number(1)
            .source_addr_ton(TypeOfNumber::International)
            .source_addr_npi(NumericPlanIndicator::Isdn)
            .source_addr("1234")
            .dest_addr_ton(TypeOfNumber::International)
            .dest_addr_npi(NumericPlanIndicator::Isdn)
            .destination_addr("5678")
            .short_message("Hi")
            .build()
    }

    #[test]
    fn submit_sm_to_bytes() {
        let bytes = hello().to_bytes().unwrap();

        let expected: Vec<u8> = vec![
            // Header:
            0x00, 0x00, 0x00, 0x2B, // command_length
            0x00, 0x00, 0x00, 0x04, // command_id
            0x00, 0x00, 0x00, 0x00, // command_status
            0x00, 0x00, 0x00, 0x01, // sequence_number
            // Body:
            0x00, // service_type
            0x01, // source_addr_ton
            0x01, // source_addr_npi
            0x31, 0x32, 0x33, 0x34, 0x00, // source_addr
            0x01, // dest_addr_ton
            0x01, // dest_addr_npi
            0x35, 0x36, 0x37, 0x38, 0x00, // destination_addr
            0x00, // esm_class
            0x00, // protocol_id
            0x00, // priority_flag
            0x00, // schedule_delivery_time
            0x00, // validity_period
            0x00, // registered_delivery
            0x00, // replace_if_present_flag
            0x00, // data_coding
            0x00, // sm_default_msg_id
            0x02, // sm_length
            0x48, 0x69, // short_message
        ];

        assert_eq!(bytes.as_ref(), expected.as_slice());
    }

    #[test]
    fn submit_sm_parses_back_and_skips_optional_parameters() {
        let original = hello();
        let mut bytes = original.to_bytes().unwrap().to_vec();

        // Append a TLV (message_payload tag, 2 octets) and patch command_length
        bytes.extend_from_slice(&[0x04, 0x24, 0x00, 0x02, 0xAB, 0xCD]);
        let length = bytes.len() as u32;
        bytes[0..4].copy_from_slice(&length.to_be_bytes());

        let mut cursor = Cursor::new(bytes.as_slice());
        match Frame::parse(&mut cursor).unwrap() {
            Frame::SubmitSm(parsed) => assert_eq!(*parsed, original),
            other => panic!("Expected SubmitSm frame, got {other:?}"),
        }
        assert_eq!(cursor.position() as usize, bytes.len());
    }

    #[test]
    fn short_message_limit_is_enforced() {
        let pdu = SubmitSm::builder()
            .sequence_number(1)
            .short_message(vec![b'A'; 255])
            .build();
        assert!(matches!(
            pdu.to_bytes(),
            Err(CodecError::FieldValidation {
                field: "short_message",
                ..
            })
        ));

        let pdu = SubmitSm::builder()
            .sequence_number(1)
            .short_message(vec![b'A'; 254])
            .build();
        assert!(pdu.to_bytes().is_ok());
    }

    #[test]
    fn destination_addr_limit_is_enforced() {
        let pdu = SubmitSm::builder()
            .sequence_number(1)
            .destination_addr("1".repeat(21))
            .build();
        let err = pdu.to_bytes().unwrap_err();
        assert_eq!(err.to_command_status(), CommandStatus::InvalidDestinationAddress);
    }

    #[test]
    fn udh_indicator() {
        assert!(!hello().has_udh());
        let pdu = SubmitSm::builder().esm_class(ESM_CLASS_UDHI).build();
        assert!(pdu.has_udh());
    }

    #[test]
    fn submit_sm_resp_to_bytes() {
        let bytes = SubmitSmResponse::new(7, "1a").to_bytes().unwrap();
        assert_eq!(
            bytes.as_ref(),
            &[
                0x00, 0x00, 0x00, 0x13, // command_length
                0x80, 0x00, 0x00, 0x04, // command_id
                0x00, 0x00, 0x00, 0x00, // command_status
                0x00, 0x00, 0x00, 0x07, // sequence_number
                0x31, 0x61, 0x00, // message_id
            ]
        );
    }

    #[test]
    fn submit_sm_resp_error_without_body() {
        let data: &[u8] = &[
            0x00, 0x00, 0x00, 0x10, // command_length
            0x80, 0x00, 0x00, 0x04, // submit_sm_resp
            0x00, 0x00, 0x00, 0x58, // ESME_RTHROTTLED
            0x00, 0x00, 0x00, 0x02, // sequence_number
        ];
        let mut cursor = Cursor::new(data);
        assert_eq!(
            Frame::parse(&mut cursor).unwrap(),
            Frame::SubmitSmResp(SubmitSmResponse::error(2, CommandStatus::ThrottlingError))
        );
    }
}
