// ABOUTME: SMPP session layer: bind-state machine, bind negotiation, acknowledgement ledger and dispatch
// ABOUTME: Consumes decoded frames and hands response frames to a FrameSink; performs no I/O itself

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod ledger;
pub mod options;
pub mod segmenter;
pub mod sequence;
pub mod server;
pub mod sink;
pub mod state;
pub mod transmitter;

pub use config::{ConfigError, SessionConfig, SessionConfigBuilder};
pub use dispatcher::{Dispatched, SessionRole, dispatch, dispatch_malformed, send_unbind};
pub use error::{SessionError, SessionResult};
pub use ledger::{Acknowledgement, MessageId, OrphanAcknowledgement, OutboundLedger, PendingSet};
pub use options::MessageOptions;
pub use segmenter::{ConcatHeader, MessagePart, max_part_size, segment, single_part_limit};
pub use sequence::SequenceGenerator;
pub use server::ServerSession;
pub use sink::FrameSink;
pub use state::{BindState, Session, bind_type_for};
pub use transmitter::Transmitter;
