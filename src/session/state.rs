// ABOUTME: Bind-state machine for one SMPP session: closed, or bound as transmitter, receiver or transceiver
// ABOUTME: Answers the capability queries every send and receive path checks before acting

use crate::datatypes::{BindType, CommandId};
use crate::session::error::{SessionError, SessionResult};

/// Current bind state of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BindState {
    #[default]
    Closed,
    BoundTx,
    BoundRx,
    BoundTrx,
}

impl BindState {
    pub fn is_bound(&self) -> bool {
        *self != BindState::Closed
    }

    /// True for transmitter and transceiver binds
    pub fn is_transmitting(&self) -> bool {
        matches!(self, BindState::BoundTx | BindState::BoundTrx)
    }

    /// True for receiver and transceiver binds
    pub fn is_receiving(&self) -> bool {
        matches!(self, BindState::BoundRx | BindState::BoundTrx)
    }

    /// The bind flavor that produced this state, `None` when closed
    pub fn bind_type(&self) -> Option<BindType> {
        match self {
            BindState::Closed => None,
            BindState::BoundTx => Some(BindType::Transmitter),
            BindState::BoundRx => Some(BindType::Receiver),
            BindState::BoundTrx => Some(BindType::Transceiver),
        }
    }
}

impl From<BindType> for BindState {
    fn from(bind_type: BindType) -> Self {
        match bind_type {
            BindType::Transmitter => BindState::BoundTx,
            BindType::Receiver => BindState::BoundRx,
            BindType::Transceiver => BindState::BoundTrx,
        }
    }
}

/// Resolve the bind flavor requested by a bind command_id.
///
/// Anything other than the three bind requests is an `UnknownBindType`.
pub fn bind_type_for(command_id: CommandId) -> SessionResult<BindType> {
    match command_id {
        CommandId::BindTransmitter => Ok(BindType::Transmitter),
        CommandId::BindReceiver => Ok(BindType::Receiver),
        CommandId::BindTransceiver => Ok(BindType::Transceiver),
        other => Err(SessionError::UnknownBindType(other)),
    }
}

/// Bind state of one transport connection.
///
/// Starts closed. A bound session never accepts a second bind; unbind
/// returns it to closed from any state.
#[derive(Debug, Default)]
pub struct Session {
    state: BindState,
    // Sequence of the unbind we sent and are waiting to see answered
    pending_unbind: Option<u32>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> BindState {
        self.state
    }

    /// Transition a closed session to the state matching `bind_type`
    pub fn bind(&mut self, bind_type: BindType) -> SessionResult<BindState> {
        self.require_closed()?;
        self.state = BindState::from(bind_type);
        tracing::debug!("session bound as {:?}", self.state);
        Ok(self.state)
    }

    /// Reset to closed, returning the state that was left
    pub fn unbind(&mut self) -> BindState {
        self.pending_unbind = None;
        let previous = std::mem::take(&mut self.state);
        if previous.is_bound() {
            tracing::debug!("session unbound from {:?}", previous);
        }
        previous
    }

    /// Remember the sequence number of an unbind we originated
    pub fn begin_unbind(&mut self, sequence_number: u32) {
        self.pending_unbind = Some(sequence_number);
    }

    pub fn pending_unbind(&self) -> Option<u32> {
        self.pending_unbind
    }

    /// True when `sequence_number` answers the unbind we sent. The pending
    /// unbind is kept on a mismatch.
    pub fn is_unbind_answer(&self, sequence_number: u32) -> bool {
        self.pending_unbind == Some(sequence_number)
    }

    pub fn is_bound(&self) -> bool {
        self.state.is_bound()
    }

    pub fn is_transmitting(&self) -> bool {
        self.state.is_transmitting()
    }

    pub fn is_receiving(&self) -> bool {
        self.state.is_receiving()
    }

    pub fn require_closed(&self) -> SessionResult<()> {
        if self.state.is_bound() {
            return Err(SessionError::AlreadyBound(self.state));
        }
        Ok(())
    }

    pub fn require_bound(&self) -> SessionResult<()> {
        if !self.state.is_bound() {
            return Err(SessionError::NotBound);
        }
        Ok(())
    }

    /// `NotBound` when closed, `NotTransmitting` for a receiver bind
    pub fn require_transmitting(&self) -> SessionResult<()> {
        self.require_bound()?;
        if !self.state.is_transmitting() {
            return Err(SessionError::NotTransmitting(self.state));
        }
        Ok(())
    }

    /// `NotBound` when closed, `NotReceiving` for a transmitter bind
    pub fn require_receiving(&self) -> SessionResult<()> {
        self.require_bound()?;
        if !self.state.is_receiving() {
            return Err(SessionError::NotReceiving(self.state));
        }
        Ok(())
    }
}
