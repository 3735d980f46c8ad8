// ABOUTME: Routes decoded frames to the session-management handlers shared by both roles or to the role itself
// ABOUTME: Rejected requests are answered with the matching response kind; orphans become reportable outcomes

use crate::codec::{CodecError, Frame};
use crate::datatypes::{
    CommandId, CommandStatus, DeliverSm, EnquireLinkResponse, GenericNack, Unbind,
    UnbindResponse,
};
use crate::session::error::{SessionError, SessionResult};
use crate::session::ledger::{Acknowledgement, OrphanAcknowledgement, OutboundLedger};
use crate::session::sink::FrameSink;
use crate::session::state::{BindState, Session};
use tracing::{debug, warn};

// Set in the command_id of every response
const RESPONSE_BIT: u32 = 0x8000_0000;

/// What handling one inbound frame amounted to
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatched {
    /// A bind request was answered, or our bind was accepted
    Bound(BindState),
    Unbound,
    /// An inbound submit_sm was answered with `message_id`
    SubmissionAccepted {
        sequence_number: u32,
        message_id: String,
    },
    /// An inbound deliver_sm was answered
    MessageReceived(Box<DeliverSm>),
    Acknowledged(Acknowledgement),
    /// A response matched nothing outstanding
    Orphaned(OrphanAcknowledgement),
    KeepAlive,
    /// A request this role does not implement, answered with generic_nack
    Unsupported {
        command_id: CommandId,
        sequence_number: u32,
    },
    /// A response nobody was waiting for in a way that matters
    Ignored,
}

/// A side of the session that the dispatcher can drive.
pub trait SessionRole {
    fn session_mut(&mut self) -> &mut Session;

    /// Requests this role wrote and still expects a response to
    fn ledger_mut(&mut self) -> &mut OutboundLedger;

    /// Sequence number for the next request this role originates
    fn next_sequence_number(&mut self) -> u32;

    /// Handle the frames specific to this role; `None` means not handled.
    fn handle_role_frame<S: FrameSink>(
        &mut self,
        frame: &Frame,
        sink: &mut S,
    ) -> SessionResult<Option<Dispatched>>;

    /// Close the session after an unbind exchange
    fn close(&mut self) -> BindState {
        self.session_mut().unbind()
    }

    /// A generic_nack rejects whichever request carried its sequence number
    fn resolve_nack(&mut self, nack: &GenericNack) -> SessionResult<Dispatched> {
        self.reject_outstanding(nack.sequence_number, nack.command_status)
    }

    /// Resolve the outstanding request `sequence_number` as rejected.
    ///
    /// An Ok `status` is reported as `UnknownError`, since the request did
    /// not get a usable answer.
    fn reject_outstanding(
        &mut self,
        sequence_number: u32,
        status: CommandStatus,
    ) -> SessionResult<Dispatched> {
        let reported = if status.is_ok() {
            CommandStatus::UnknownError
        } else {
            status
        };
        let ack = match self.ledger_mut().resolve(sequence_number, reported, "") {
            Ok(ack) => ack,
            Err(orphan) => {
                warn!("{} (rejected with {:?})", orphan, status);
                return Err(orphan.into());
            }
        };
        warn!("message {} rejected with {:?}", ack.message_id(), status);
        Ok(Dispatched::Acknowledged(ack))
    }
}

/// Handle one inbound frame for `role`, writing any response to `sink`.
///
/// A request rejected by a session error is answered with the matching
/// response kind and the error is returned. Orphan acknowledgements are
/// reported as [`Dispatched::Orphaned`] and never fail.
pub fn dispatch<R, S>(role: &mut R, frame: Frame, sink: &mut S) -> SessionResult<Dispatched>
where
    R: SessionRole,
    S: FrameSink,
{
    debug!(
        "dispatching {:?} sequence {}",
        frame.command_id(),
        frame.sequence_number()
    );

    match handle_frame(role, &frame, sink) {
        Ok(dispatched) => Ok(dispatched),
        Err(SessionError::Orphan(orphan)) => {
            debug!("{} ({:?})", orphan, frame.command_id());
            Ok(Dispatched::Orphaned(orphan))
        }
        Err(err @ SessionError::SinkClosed) => Err(err),
        Err(err) => {
            if let Some(reject) = frame.reject_with(err.to_command_status()) {
                warn!(
                    "rejecting {:?} sequence {}: {}",
                    frame.command_id(),
                    frame.sequence_number(),
                    err
                );
                sink.send_frame(reject)?;
            }
            Err(err)
        }
    }
}

/// Answer a PDU that arrived whole but could not be decoded.
///
/// `command_id` and `sequence_number` are the raw header fields. A request is
/// rejected with its own response kind (generic_nack when the command_id is
/// unknown) carrying the mapped status, and `err` is returned. A response
/// resolves the outstanding request it answers as rejected.
pub fn dispatch_malformed<R, S>(
    role: &mut R,
    command_id: u32,
    sequence_number: u32,
    err: CodecError,
    sink: &mut S,
) -> SessionResult<Dispatched>
where
    R: SessionRole,
    S: FrameSink,
{
    let status = err.to_command_status();
    warn!(
        "undecodable PDU {:#x} sequence {}: {}",
        command_id, sequence_number, err
    );

    if command_id & RESPONSE_BIT != 0 {
        return match role.reject_outstanding(sequence_number, status) {
            Err(SessionError::Orphan(orphan)) => Ok(Dispatched::Orphaned(orphan)),
            outcome => outcome,
        };
    }

    let reject = CommandId::try_from(command_id)
        .ok()
        .and_then(|command_id| Frame::rejection_for(command_id, sequence_number, status))
        .unwrap_or_else(|| Frame::GenericNack(GenericNack::new(status, sequence_number)));
    sink.send_frame(reject)?;
    Err(err.into())
}

/// Ask the peer to end a bound session; the state closes when unbind_resp arrives
pub fn send_unbind<R, S>(role: &mut R, sink: &mut S) -> SessionResult<u32>
where
    R: SessionRole,
    S: FrameSink,
{
    role.session_mut().require_bound()?;
    let sequence_number = role.next_sequence_number();
    sink.send_frame(Frame::Unbind(Unbind::new(sequence_number)))?;
    role.session_mut().begin_unbind(sequence_number);
    debug!("sent unbind sequence {}", sequence_number);
    Ok(sequence_number)
}

fn handle_frame<R, S>(role: &mut R, frame: &Frame, sink: &mut S) -> SessionResult<Dispatched>
where
    R: SessionRole,
    S: FrameSink,
{
    match frame {
        Frame::EnquireLink(pdu) => {
            sink.send_frame(Frame::EnquireLinkResp(EnquireLinkResponse::new(
                pdu.sequence_number,
            )))?;
            return Ok(Dispatched::KeepAlive);
        }
        Frame::EnquireLinkResp(_) => return Ok(Dispatched::KeepAlive),
        Frame::Unbind(pdu) => {
            sink.send_frame(Frame::UnbindResp(UnbindResponse::new(pdu.sequence_number)))?;
            role.close();
            return Ok(Dispatched::Unbound);
        }
        Frame::UnbindResp(pdu) => {
            if !role.session_mut().is_unbind_answer(pdu.sequence_number) {
                warn!("unbind_resp sequence {} answers no unbind we sent", pdu.sequence_number);
                return Err(OrphanAcknowledgement {
                    sequence_number: pdu.sequence_number,
                }
                .into());
            }
            role.close();
            return Ok(Dispatched::Unbound);
        }
        Frame::GenericNack(nack) => return role.resolve_nack(nack),
        _ => {}
    }

    if let Some(dispatched) = role.handle_role_frame(frame, sink)? {
        return Ok(dispatched);
    }

    let command_id = frame.command_id();
    let sequence_number = frame.sequence_number();
    if frame.is_response() {
        debug!("ignoring unexpected {:?} sequence {}", command_id, sequence_number);
        return Ok(Dispatched::Ignored);
    }

    warn!("unsupported request {:?} sequence {}", command_id, sequence_number);
    sink.send_frame(Frame::GenericNack(GenericNack::invalid_command_id(
        sequence_number,
    )))?;
    Ok(Dispatched::Unsupported {
        command_id,
        sequence_number,
    })
}
