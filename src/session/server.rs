// ABOUTME: Message-center side of a session: answers binds, accepts submissions, delivers MO messages
// ABOUTME: Deliveries are tracked in the outbound ledger until the ESME acknowledges them

use crate::codec::{Encodable, Frame};
use crate::datatypes::{
    BindRequest, BindResponse, CommandStatus, DeliverSm, DeliverSmResponse, SubmitSm,
    SubmitSmResponse,
};
use crate::session::dispatcher::{Dispatched, SessionRole};
use crate::session::error::SessionResult;
use crate::session::ledger::{
    Acknowledgement, MessageId, OrphanAcknowledgement, OutboundLedger, PendingSet,
};
use crate::session::options::MessageOptions;
use crate::session::sequence::SequenceGenerator;
use crate::session::sink::FrameSink;
use crate::session::state::{BindState, Session, bind_type_for};
use bytes::Bytes;
use tracing::{debug, info, warn};

/// Server role of one SMPP connection.
///
/// Credentials are not checked: every bind on a closed session succeeds.
#[derive(Debug, Default)]
pub struct ServerSession {
    session: Session,
    sequence: SequenceGenerator,
    sent_messages: OutboundLedger,
    received_messages: PendingSet,
    last_message_id: u64,
}

impl ServerSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> BindState {
        self.session.state()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Deliveries awaiting deliver_sm_resp
    pub fn sent_messages(&self) -> &OutboundLedger {
        &self.sent_messages
    }

    pub fn sent_messages_mut(&mut self) -> &mut OutboundLedger {
        &mut self.sent_messages
    }

    /// Inbound submissions whose response has not been written
    pub fn received_messages(&self) -> &PendingSet {
        &self.received_messages
    }

    /// Answer a bind request and take the requested bind state.
    ///
    /// The response echoes the request's sequence number and system_id and is
    /// handed to the sink before the state changes.
    pub fn bind_session<S: FrameSink>(
        &mut self,
        request: &BindRequest,
        sink: &mut S,
    ) -> SessionResult<BindState> {
        self.session.require_closed()?;
        let bind_type = bind_type_for(request.command_id())?;

        sink.send_frame(Frame::BindResp(BindResponse {
            bind_type,
            command_status: CommandStatus::Ok,
            sequence_number: request.sequence_number,
            system_id: request.system_id.clone(),
        }))?;

        let state = self.session.bind(bind_type)?;
        info!(
            "bound {} as {:?} (sequence {})",
            request.system_id, state, request.sequence_number
        );
        Ok(state)
    }

    /// Accept a submit_sm for onward delivery.
    ///
    /// Any bind flavor may submit. The response reuses the request's sequence
    /// number and carries a newly assigned message id, which is returned.
    pub fn receive_submit_sm<S: FrameSink>(
        &mut self,
        pdu: &SubmitSm,
        sink: &mut S,
    ) -> SessionResult<String> {
        self.session.require_bound()?;

        let sequence_number = pdu.sequence_number;
        self.received_messages.begin(sequence_number);

        let message_id = self.next_message_id();
        let written = sink.send_frame(Frame::SubmitSmResp(SubmitSmResponse::new(
            sequence_number,
            message_id.clone(),
        )));
        self.received_messages.complete(sequence_number);
        written?;

        info!(
            "received submit_sm {} for {}, assigned message id {}",
            sequence_number, pdu.destination_addr, message_id
        );
        Ok(message_id)
    }

    /// Deliver a mobile-originated message to the bound ESME.
    ///
    /// The delivery's own sequence number is recorded against `message_id`.
    pub fn deliver_sm<S: FrameSink>(
        &mut self,
        message_id: impl Into<MessageId>,
        source_addr: &str,
        destination_addr: &str,
        body: impl Into<Bytes>,
        options: &MessageOptions,
        sink: &mut S,
    ) -> SessionResult<DeliverSm> {
        self.session.require_receiving()?;

        let message_id = message_id.into();
        let sequence_number = self.sequence.next_sequence_number();
        let pdu = DeliverSm::builder()
            .sequence_number(sequence_number)
            .service_type(options.service_type.clone())
            .source_addr_ton(options.source_addr_ton)
            .source_addr_npi(options.source_addr_npi)
            .source_addr(source_addr)
            .dest_addr_ton(options.dest_addr_ton)
            .dest_addr_npi(options.dest_addr_npi)
            .destination_addr(destination_addr)
            .esm_class(options.esm_class.unwrap_or(0))
            .protocol_id(options.protocol_id)
            .priority_flag(options.priority_flag)
            .registered_delivery(options.registered_delivery)
            .data_coding(options.data_coding_octet())
            .short_message(body)
            .build();

        // Catch oversized fields here rather than in the writer task
        pdu.to_bytes()?;
        sink.send_frame(Frame::DeliverSm(Box::new(pdu.clone())))?;
        info!("delivered message {} as sequence {}", message_id, sequence_number);
        self.sent_messages.record(sequence_number, message_id);

        Ok(pdu)
    }

    /// Resolve the ledger entry a deliver_sm_resp acknowledges
    pub fn accept_deliver_sm_response(
        &mut self,
        response: &DeliverSmResponse,
    ) -> Result<Acknowledgement, OrphanAcknowledgement> {
        match self.sent_messages.resolve(
            response.sequence_number,
            response.command_status,
            &response.message_id,
        ) {
            Ok(ack) => {
                info!(
                    "delivery of message {} acknowledged ({:?})",
                    ack.message_id(),
                    response.command_status
                );
                Ok(ack)
            }
            Err(orphan) => {
                warn!(
                    "deliver_sm_resp for sequence {} matches no delivered message",
                    orphan.sequence_number
                );
                Err(orphan)
            }
        }
    }

    /// Close the session. Unacknowledged deliveries stay in the ledger.
    pub fn unbind(&mut self) -> BindState {
        if !self.sent_messages.is_empty() {
            debug!(
                "unbinding with {} unacknowledged deliveries",
                self.sent_messages.len()
            );
        }
        self.session.unbind()
    }

    fn next_message_id(&mut self) -> String {
        self.last_message_id += 1;
        format!("{:x}", self.last_message_id)
    }
}

impl SessionRole for ServerSession {
    fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    fn ledger_mut(&mut self) -> &mut OutboundLedger {
        &mut self.sent_messages
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
            Frame::Bind(request) => Dispatched::Bound(self.bind_session(request, sink)?),
            Frame::SubmitSm(pdu) => Dispatched::SubmissionAccepted {
                sequence_number: pdu.sequence_number,
                message_id: self.receive_submit_sm(pdu, sink)?,
            },
            Frame::DeliverSmResp(response) => {
                Dispatched::Acknowledged(self.accept_deliver_sm_response(response)?)
            }
            _ => return Ok(None),
        };
        Ok(Some(dispatched))
    }
}
