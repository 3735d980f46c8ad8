// ABOUTME: ESME side of a session: binds with the configured identity and submits mobile-terminated messages
// ABOUTME: Long bodies are split into concatenated parts, each part tracked in the ledger under one message id

use crate::codec::{CodecError, Encodable, Frame};
use crate::datatypes::{
    BindRequest, BindResponse, BindType, DeliverSm, DeliverSmResponse, ESM_CLASS_UDHI,
    MAX_SHORT_MESSAGE_LENGTH, SubmitSm, SubmitSmResponse,
};
use crate::session::config::SessionConfig;
use crate::session::dispatcher::{Dispatched, SessionRole};
use crate::session::error::{SessionError, SessionResult};
use crate::session::ledger::{Acknowledgement, MessageId, OrphanAcknowledgement, OutboundLedger};
use crate::session::options::MessageOptions;
use crate::session::segmenter::{segment, single_part_limit};
use crate::session::sequence::SequenceGenerator;
use crate::session::sink::FrameSink;
use crate::session::state::{BindState, Session};
use bytes::Bytes;
use tracing::{debug, info, warn};

/// Client role of one SMPP connection.
///
/// Binds as a transmitter unless another flavor is chosen with
/// [`Transmitter::with_bind_type`]. The bind state changes only when the
/// matching bind response arrives.
#[derive(Debug)]
pub struct Transmitter {
    config: SessionConfig,
    bind_type: BindType,
    session: Session,
    sequence: SequenceGenerator,
    ack_ids: OutboundLedger,
    pending_bind: Option<u32>,
}

impl Transmitter {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            bind_type: BindType::Transmitter,
            session: Session::new(),
            sequence: SequenceGenerator::new(),
            ack_ids: OutboundLedger::new(),
            pending_bind: None,
        }
    }

    pub fn with_bind_type(mut self, bind_type: BindType) -> Self {
        self.bind_type = bind_type;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> BindState {
        self.session.state()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Submissions awaiting submit_sm_resp
    pub fn ack_ids(&self) -> &OutboundLedger {
        &self.ack_ids
    }

    pub fn ack_ids_mut(&mut self) -> &mut OutboundLedger {
        &mut self.ack_ids
    }

    /// Sequence number of the bind request still awaiting its response
    pub fn pending_bind(&self) -> Option<u32> {
        self.pending_bind
    }

    /// Write a bind request built from the configuration.
    ///
    /// Only legal while closed. Sending again before the response arrives
    /// replaces the outstanding bind.
    pub fn send_bind<S: FrameSink>(&mut self, sink: &mut S) -> SessionResult<BindRequest> {
        self.session.require_closed()?;

        let request = self
            .config
            .bind_request(self.bind_type, self.sequence.next_sequence_number());
        request
            .validate()
            .map_err(|err| SessionError::Config(err.into()))?;

        sink.send_frame(Frame::Bind(request.clone()))?;
        if let Some(previous) = self.pending_bind.replace(request.sequence_number) {
            debug!("bind {} superseded by {}", previous, request.sequence_number);
        }
        info!(
            "sent {:?} bind as {} (sequence {})",
            self.bind_type, request.system_id, request.sequence_number
        );
        Ok(request)
    }

    /// Complete the bind exchange with the peer's response.
    ///
    /// A response that does not answer the outstanding bind, by sequence
    /// number or by flavor, is an orphan and the bind stays outstanding. An
    /// error status leaves the session closed.
    pub fn accept_bind_response(&mut self, response: &BindResponse) -> SessionResult<BindState> {
        let orphan = OrphanAcknowledgement {
            sequence_number: response.sequence_number,
        };
        if self.pending_bind != Some(response.sequence_number) {
            warn!(
                "{:?} bind_resp sequence {} answers no outstanding bind",
                response.bind_type, response.sequence_number
            );
            return Err(orphan.into());
        }
        if response.bind_type != self.bind_type {
            warn!(
                "{:?} bind_resp sequence {} does not answer our {:?} bind",
                response.bind_type, response.sequence_number, self.bind_type
            );
            return Err(orphan.into());
        }
        self.pending_bind = None;

        if !response.command_status.is_ok() {
            warn!("bind rejected: {:?}", response.command_status);
            return Err(SessionError::BindRejected(response.command_status));
        }

        let state = self.session.bind(response.bind_type)?;
        info!("bound to {} as {:?}", response.system_id, state);
        Ok(state)
    }

    /// Submit a single-part message. Returns the sequence number written.
    pub fn send_mt<S: FrameSink>(
        &mut self,
        message_id: impl Into<MessageId>,
        source_addr: &str,
        destination_addr: &str,
        body: impl Into<Bytes>,
        options: &MessageOptions,
        sink: &mut S,
    ) -> SessionResult<u32> {
        self.session.require_transmitting()?;

        let body = body.into();
        if body.len() > MAX_SHORT_MESSAGE_LENGTH {
            return Err(CodecError::FieldValidation {
                field: "short_message",
                reason: format!(
                    "{} octets exceeds maximum of {}, use send_concat_mt",
                    body.len(),
                    MAX_SHORT_MESSAGE_LENGTH
                ),
            }
            .into());
        }

        debug!("sending MT of {} octets to {}", body.len(), destination_addr);
        let esm_class = options.esm_class.unwrap_or(0);
        self.submit(
            message_id.into(),
            source_addr,
            destination_addr,
            body,
            esm_class,
            options,
            sink,
        )
    }

    /// Submit `body` as concatenated parts, one submit_sm each.
    ///
    /// Every part's sequence number maps to the same message id. Returns the
    /// sequence numbers in part order.
    pub fn send_concat_mt<S: FrameSink>(
        &mut self,
        message_id: impl Into<MessageId>,
        source_addr: &str,
        destination_addr: &str,
        body: &[u8],
        options: &MessageOptions,
        sink: &mut S,
    ) -> SessionResult<Vec<u32>> {
        self.session.require_transmitting()?;

        let message_id = message_id.into();
        let parts = segment(&message_id, body, options.data_coding)?;
        debug!(
            "sending concatenated MT {} in {} parts to {}",
            message_id,
            parts.len(),
            destination_addr
        );

        let esm_class = options.esm_class.unwrap_or(0) | ESM_CLASS_UDHI;
        parts
            .iter()
            .map(|part| {
                self.submit(
                    message_id.clone(),
                    source_addr,
                    destination_addr,
                    part.short_message(),
                    esm_class,
                    options,
                    sink,
                )
            })
            .collect()
    }

    /// Submit `body` whole when it fits one short message, concatenated otherwise
    pub fn send_message<S: FrameSink>(
        &mut self,
        message_id: impl Into<MessageId>,
        source_addr: &str,
        destination_addr: &str,
        body: &[u8],
        options: &MessageOptions,
        sink: &mut S,
    ) -> SessionResult<Vec<u32>> {
        if body.len() <= single_part_limit(options.data_coding) {
            let sequence_number = self.send_mt(
                message_id,
                source_addr,
                destination_addr,
                Bytes::copy_from_slice(body),
                options,
                sink,
            )?;
            Ok(vec![sequence_number])
        } else {
            self.send_concat_mt(message_id, source_addr, destination_addr, body, options, sink)
        }
    }

    /// Resolve the ledger entry a submit_sm_resp acknowledges
    pub fn accept_submit_sm_response(
        &mut self,
        response: &SubmitSmResponse,
    ) -> Result<Acknowledgement, OrphanAcknowledgement> {
        let ack = self
            .ack_ids
            .resolve(
                response.sequence_number,
                response.command_status,
                &response.message_id,
            )
            .inspect_err(|orphan| {
                warn!(
                    "submit_sm_resp for sequence {} matches no submitted message",
                    orphan.sequence_number
                )
            })?;
        match &ack {
            Acknowledgement::Accepted {
                message_id,
                remote_message_id,
                ..
            } => info!("message {} accepted as {}", message_id, remote_message_id),
            Acknowledgement::Rejected {
                message_id, status, ..
            } => warn!("message {} rejected: {:?}", message_id, status),
        }
        Ok(ack)
    }

    /// Answer a deliver_sm on a receiver or transceiver bind
    pub fn receive_deliver_sm<S: FrameSink>(
        &mut self,
        pdu: &DeliverSm,
        sink: &mut S,
    ) -> SessionResult<()> {
        self.session.require_receiving()?;
        sink.send_frame(Frame::DeliverSmResp(DeliverSmResponse::new(
            pdu.sequence_number,
            "",
        )))?;
        info!(
            "received deliver_sm {} from {}",
            pdu.sequence_number, pdu.source_addr
        );
        Ok(())
    }

    /// Close the session. Unacknowledged submissions stay in the ledger.
    pub fn unbind(&mut self) -> BindState {
        self.pending_bind = None;
        if !self.ack_ids.is_empty() {
            debug!("unbinding with {} unacknowledged parts", self.ack_ids.len());
        }
        self.session.unbind()
    }

    #[allow(clippy::too_many_arguments)]
    fn submit<S: FrameSink>(
        &mut self,
        message_id: MessageId,
        source_addr: &str,
        destination_addr: &str,
        short_message: Bytes,
        esm_class: u8,
        options: &MessageOptions,
        sink: &mut S,
    ) -> SessionResult<u32> {
        let sequence_number = self.sequence.next_sequence_number();
        let pdu = SubmitSm::builder()
            .sequence_number(sequence_number)
            .service_type(options.service_type.clone())
            .source_addr_ton(options.source_addr_ton)
            .source_addr_npi(options.source_addr_npi)
            .source_addr(source_addr)
            .dest_addr_ton(options.dest_addr_ton)
            .dest_addr_npi(options.dest_addr_npi)
            .destination_addr(destination_addr)
            .esm_class(esm_class)
            .protocol_id(options.protocol_id)
            .priority_flag(options.priority_flag)
            .registered_delivery(options.registered_delivery)
            .data_coding(options.data_coding_octet())
            .short_message(short_message)
            .build();

        pdu.to_bytes()?;
        sink.send_frame(Frame::SubmitSm(Box::new(pdu)))?;
        self.ack_ids.record(sequence_number, message_id);
        Ok(sequence_number)
    }
}

impl SessionRole for Transmitter {
    fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    fn ledger_mut(&mut self) -> &mut OutboundLedger {
        &mut self.ack_ids
    }

    fn next_sequence_number(&mut self) -> u32 {
        self.sequence.next_sequence_number()
    }

    fn close(&mut self) -> BindState {
        self.unbind()
    }

    fn handle_role_frame<S: FrameSink>(
        &mut self,
        frame: &Frame,
        sink: &mut S,
    ) -> SessionResult<Option<Dispatched>> {
        let dispatched = match frame {
            Frame::BindResp(response) => Dispatched::Bound(self.accept_bind_response(response)?),
            Frame::SubmitSmResp(response) => {
                Dispatched::Acknowledged(self.accept_submit_sm_response(response)?)
            }
            Frame::DeliverSm(pdu) => {
                self.receive_deliver_sm(pdu, sink)?;
                Dispatched::MessageReceived(pdu.clone())
            }
            _ => return Ok(None),
        };
        Ok(Some(dispatched))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{CommandStatus, NumericPlanIndicator, TypeOfNumber};
    use crate::session::dispatcher::dispatch;

    fn config() -> SessionConfig {
        SessionConfig::builder("esme01")
            .password("secret")
            .system_type("VMA")
            .source_ton(TypeOfNumber::International)
            .source_npi(NumericPlanIndicator::Isdn)
            .source_address_range("4477")
            .build()
            .unwrap()
    }

    fn bound(bind_type: BindType) -> Transmitter {
        let mut transmitter = Transmitter::new(config()).with_bind_type(bind_type);
        let request = transmitter.send_bind(&mut Vec::<Frame>::new()).unwrap();
        transmitter
            .accept_bind_response(&BindResponse {
                bind_type,
                command_status: CommandStatus::Ok,
                sequence_number: request.sequence_number,
                system_id: "SMSC".to_string(),
            })
            .unwrap();
        transmitter
    }

    fn submitted(sink: &[Frame]) -> Vec<&SubmitSm> {
        sink.iter()
            .filter_map(|frame| match frame {
                Frame::SubmitSm(pdu) => Some(pdu.as_ref()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn send_bind_carries_configured_identity() {
        let mut transmitter = Transmitter::new(config());
        let mut sink: Vec<Frame> = Vec::new();
        let request = transmitter.send_bind(&mut sink).unwrap();

        assert_eq!(sink, vec![Frame::Bind(request.clone())]);
        assert_eq!(request.bind_type, BindType::Transmitter);
        assert_eq!(request.system_id, "esme01");
        assert_eq!(request.password, "secret");
        assert_eq!(request.system_type, "VMA");
        assert_eq!(request.addr_ton, TypeOfNumber::International);
        assert_eq!(request.address_range, "4477");

        // Still closed until the response arrives
        assert_eq!(transmitter.state(), BindState::Closed);
        assert_eq!(transmitter.pending_bind(), Some(request.sequence_number));
    }

    #[test]
    fn send_bind_while_bound_fails() {
        let mut transmitter = bound(BindType::Transmitter);
        let mut sink: Vec<Frame> = Vec::new();
        assert!(matches!(
            transmitter.send_bind(&mut sink),
            Err(SessionError::AlreadyBound(BindState::BoundTx))
        ));
        assert!(sink.is_empty());
    }

    #[test]
    fn rejected_bind_leaves_session_closed() {
        let mut transmitter = Transmitter::new(config());
        let request = transmitter.send_bind(&mut Vec::<Frame>::new()).unwrap();

        let result = transmitter.accept_bind_response(&BindResponse {
            bind_type: BindType::Transmitter,
            command_status: CommandStatus::InvalidPassword,
            sequence_number: request.sequence_number,
            system_id: String::new(),
        });
        assert!(matches!(
            result,
            Err(SessionError::BindRejected(CommandStatus::InvalidPassword))
        ));
        assert_eq!(transmitter.state(), BindState::Closed);
        assert_eq!(transmitter.pending_bind(), None);
    }

    #[test]
    fn unmatched_bind_response_is_orphan() {
        let mut transmitter = Transmitter::new(config());
        let response = BindResponse {
            bind_type: BindType::Transmitter,
            command_status: CommandStatus::Ok,
            sequence_number: 99,
            system_id: String::new(),
        };

        assert_eq!(
            dispatch(&mut transmitter, Frame::BindResp(response), &mut Vec::<Frame>::new()).unwrap(),
            Dispatched::Orphaned(OrphanAcknowledgement { sequence_number: 99 })
        );
        assert_eq!(transmitter.state(), BindState::Closed);
    }

    #[test]
    fn bind_response_of_another_flavor_is_orphan() {
        let mut transmitter = Transmitter::new(config());
        let mut sink: Vec<Frame> = Vec::new();
        let request = transmitter.send_bind(&mut sink).unwrap();

        let wrong_flavor = BindResponse {
            bind_type: BindType::Receiver,
            command_status: CommandStatus::Ok,
            sequence_number: request.sequence_number,
            system_id: "SMSC".to_string(),
        };
        assert_eq!(
            dispatch(&mut transmitter, Frame::BindResp(wrong_flavor), &mut sink).unwrap(),
            Dispatched::Orphaned(OrphanAcknowledgement {
                sequence_number: request.sequence_number
            })
        );
        assert_eq!(transmitter.state(), BindState::Closed);
        assert_eq!(transmitter.pending_bind(), Some(request.sequence_number));

        // The real answer still completes the bind
        let answer = BindResponse {
            bind_type: BindType::Transmitter,
            command_status: CommandStatus::Ok,
            sequence_number: request.sequence_number,
            system_id: "SMSC".to_string(),
        };
        assert_eq!(
            transmitter.accept_bind_response(&answer).unwrap(),
            BindState::BoundTx
        );
    }

    #[test]
    fn send_while_closed_is_not_bound() {
        let mut transmitter = Transmitter::new(config());
        let mut sink: Vec<Frame> = Vec::new();
        let options = MessageOptions::default();

        assert!(matches!(
            transmitter.send_mt("1", "a", "b", "hi", &options, &mut sink),
            Err(SessionError::NotBound)
        ));
        assert!(matches!(
            transmitter.send_concat_mt("1", "a", "b", &[b'x'; 300], &options, &mut sink),
            Err(SessionError::NotBound)
        ));
        assert!(sink.is_empty());
        assert!(transmitter.ack_ids().is_empty());
    }

    #[test]
    fn receiver_bind_cannot_transmit() {
        let mut transmitter = bound(BindType::Receiver);
        let mut sink: Vec<Frame> = Vec::new();
        assert!(matches!(
            transmitter.send_message("1", "a", "b", b"hi", &MessageOptions::default(), &mut sink),
            Err(SessionError::NotTransmitting(BindState::BoundRx))
        ));
        assert!(transmitter.ack_ids().is_empty());
    }

    #[test]
    fn send_mt_records_ledger_entry() {
        let mut transmitter = bound(BindType::Transmitter);
        let mut sink: Vec<Frame> = Vec::new();
        let options = MessageOptions::new().registered_delivery(1);

        let sequence_number = transmitter
            .send_mt("mt-5", "88000", "447700900123", "hello", &options, &mut sink)
            .unwrap();

        let pdus = submitted(&sink);
        assert_eq!(pdus.len(), 1);
        assert_eq!(pdus[0].sequence_number, sequence_number);
        assert_eq!(pdus[0].registered_delivery, 1);
        assert_eq!(pdus[0].short_message.as_ref(), b"hello");
        assert!(!pdus[0].has_udh());
        assert_eq!(
            transmitter.ack_ids().get(sequence_number),
            Some(&MessageId::from("mt-5"))
        );
    }

    #[test]
    fn concatenated_parts_share_message_id_and_tag() {
        let mut transmitter = bound(BindType::Transmitter);
        let mut sink: Vec<Frame> = Vec::new();
        let body = vec![b'a'; 306];

        let sequence_numbers = transmitter
            .send_concat_mt("order-1042", "88000", "447700900123", &body, &MessageOptions::default(), &mut sink)
            .unwrap();
        assert_eq!(sequence_numbers.len(), 2);

        let pdus = submitted(&sink);
        for (i, pdu) in pdus.iter().enumerate() {
            assert!(pdu.has_udh());
            assert_eq!(pdu.short_message[..6], [0x05, 0x00, 0x03, 42, 2, (i + 1) as u8]);
            assert!(pdu.short_message.len() - 6 <= 153);
            assert_eq!(
                transmitter.ack_ids().get(pdu.sequence_number),
                Some(&MessageId::from("order-1042"))
            );
        }

        // Acknowledging one part leaves the other outstanding
        let ack = transmitter
            .accept_submit_sm_response(&SubmitSmResponse::new(sequence_numbers[0], "abc"))
            .unwrap();
        assert_eq!(ack.message_id(), &MessageId::from("order-1042"));
        assert!(transmitter.ack_ids().contains(sequence_numbers[1]));
    }

    #[test]
    fn send_message_picks_single_or_concatenated() {
        let mut transmitter = bound(BindType::Transceiver);
        let mut sink: Vec<Frame> = Vec::new();
        let ucs2 = MessageOptions::new().data_coding(8);

        let single = transmitter
            .send_message("1", "a", "b", &[0u8; 70], &ucs2, &mut sink)
            .unwrap();
        assert_eq!(single.len(), 1);

        let multi = transmitter
            .send_message("2", "a", "b", &[0u8; 140], &ucs2, &mut sink)
            .unwrap();
        assert_eq!(multi.len(), 3);
        assert_eq!(transmitter.ack_ids().len(), 4);
    }

    #[test]
    fn oversized_single_part_is_refused() {
        let mut transmitter = bound(BindType::Transmitter);
        let mut sink: Vec<Frame> = Vec::new();
        assert!(matches!(
            transmitter.send_mt("1", "a", "b", vec![0u8; 255], &MessageOptions::default(), &mut sink),
            Err(SessionError::Codec(_))
        ));
        assert!(sink.is_empty());
    }

    #[test]
    fn submit_sm_resp_statuses() {
        let mut transmitter = bound(BindType::Transmitter);
        let mut sink: Vec<Frame> = Vec::new();
        let options = MessageOptions::default();
        let ok = transmitter.send_mt("a", "1", "2", "x", &options, &mut sink).unwrap();
        let bad = transmitter.send_mt("b", "1", "2", "y", &options, &mut sink).unwrap();

        match dispatch(&mut transmitter, Frame::SubmitSmResp(SubmitSmResponse::new(ok, "smsc-1")), &mut sink).unwrap() {
            Dispatched::Acknowledged(Acknowledgement::Accepted { remote_message_id, .. }) => {
                assert_eq!(remote_message_id, "smsc-1")
            }
            other => panic!("unexpected outcome {other:?}"),
        }

        let rejected = SubmitSmResponse::error(bad, CommandStatus::ThrottlingError);
        assert!(matches!(
            dispatch(&mut transmitter, Frame::SubmitSmResp(rejected.clone()), &mut sink).unwrap(),
            Dispatched::Acknowledged(Acknowledgement::Rejected {
                status: CommandStatus::ThrottlingError,
                ..
            })
        ));

        // A second response for the same sequence number is an orphan
        assert!(matches!(
            dispatch(&mut transmitter, Frame::SubmitSmResp(rejected), &mut sink).unwrap(),
            Dispatched::Orphaned(_)
        ));
    }

    #[test]
    fn stray_responses_are_orphans() {
        let mut transmitter = bound(BindType::Transmitter);
        assert_eq!(
            transmitter.accept_submit_sm_response(&SubmitSmResponse::new(77, "x")),
            Err(OrphanAcknowledgement { sequence_number: 77 })
        );

        let stray_bind = BindResponse {
            bind_type: BindType::Transmitter,
            command_status: CommandStatus::Ok,
            sequence_number: 78,
            system_id: String::new(),
        };
        assert!(matches!(
            transmitter.accept_bind_response(&stray_bind),
            Err(SessionError::Orphan(OrphanAcknowledgement { sequence_number: 78 }))
        ));
        assert_eq!(transmitter.state(), BindState::BoundTx);
    }

    #[test]
    fn deliver_sm_on_transmitter_bind_is_rejected() {
        let mut transmitter = bound(BindType::Transmitter);
        let mut sink: Vec<Frame> = Vec::new();
        let frame = Frame::DeliverSm(Box::new(DeliverSm::builder().sequence_number(4).build()));

        assert!(matches!(
            dispatch(&mut transmitter, frame, &mut sink),
            Err(SessionError::NotReceiving(BindState::BoundTx))
        ));
        assert_eq!(
            sink,
            vec![Frame::DeliverSmResp(DeliverSmResponse::error(
                4,
                CommandStatus::IncorrectBindStatus
            ))]
        );
    }

    #[test]
    fn deliver_sm_on_transceiver_bind_is_answered() {
        let mut transmitter = bound(BindType::Transceiver);
        let mut sink: Vec<Frame> = Vec::new();
        let pdu = DeliverSm::builder().sequence_number(4).short_message("mo").build();

        assert_eq!(
            dispatch(&mut transmitter, Frame::DeliverSm(Box::new(pdu.clone())), &mut sink).unwrap(),
            Dispatched::MessageReceived(Box::new(pdu))
        );
        assert_eq!(sink, vec![Frame::DeliverSmResp(DeliverSmResponse::new(4, ""))]);
    }
}
