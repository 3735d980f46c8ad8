// ABOUTME: Session error types for bind-state violations, rejected binds and transport handoff failures
// ABOUTME: Maps each condition to the SMPP command_status used when rejecting a peer request

use crate::codec::CodecError;
use crate::datatypes::{CommandId, CommandStatus};
use crate::session::config::ConfigError;
use crate::session::ledger::OrphanAcknowledgement;
use crate::session::state::BindState;
use std::io;
use thiserror::Error;

/// Errors surfaced by session operations.
///
/// State and capability violations fail fast; nothing in the session layer
/// retries or reconnects.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The operation requires a bind the session does not hold
    #[error("Session is not bound")]
    NotBound,

    /// A bind was attempted on a session that is already bound
    #[error("Session is already bound ({0:?})")]
    AlreadyBound(BindState),

    /// Bound, but the bind flavor cannot receive deliveries
    #[error("Session bound as {0:?} cannot receive")]
    NotReceiving(BindState),

    /// Bound, but the bind flavor cannot submit messages
    #[error("Session bound as {0:?} cannot transmit")]
    NotTransmitting(BindState),

    /// The PDU is not one of the three bind flavors
    #[error("Unknown bind type: {0:?}")]
    UnknownBindType(CommandId),

    /// The message center answered our bind with an error status
    #[error("Bind rejected by peer: {0:?}")]
    BindRejected(CommandStatus),

    /// A message body with no octets cannot be sent or segmented
    #[error("Message body is empty")]
    EmptyMessage,

    /// A response matched no outstanding request; reported, never fatal
    #[error(transparent)]
    Orphan(#[from] OrphanAcknowledgement),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The transport side of the frame sink has gone away
    #[error("Frame sink closed")]
    SinkClosed,

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Connection error: {0}")]
    Connection(#[from] io::Error),
}

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;

impl SessionError {
    /// The command_status a response carries when this error rejects a request
    pub fn to_command_status(&self) -> CommandStatus {
        match self {
            SessionError::NotBound
            | SessionError::NotReceiving(_)
            | SessionError::NotTransmitting(_) => CommandStatus::IncorrectBindStatus,
            SessionError::AlreadyBound(_) => CommandStatus::AlreadyBoundState,
            SessionError::UnknownBindType(_) => CommandStatus::InvalidCommandId,
            SessionError::EmptyMessage => CommandStatus::InvalidMsgLength,
            SessionError::Codec(err) => err.to_command_status(),
            _ => CommandStatus::SystemError,
        }
    }
}
