//! SMPP v3.4 session endpoint.
//!
//! The crate is layered:
//!
//! * [`codec`] and [`datatypes`] encode and decode the PDUs a session uses
//! * [`session`] holds the bind-state machine, the bind negotiator
//!   ([`session::Transmitter`]), the server side ([`session::ServerSession`]),
//!   the outbound acknowledgement ledger, the message segmenter and the
//!   dispatcher that routes inbound frames
//! * [`connection`] and [`service`] run a session over TCP with tokio
//!
//! The session layer does no I/O. Every operation takes a [`session::FrameSink`]
//! and pushes the frames it wants written; the service drains them.
//!
//! # Example
//!
//! Binding as a transmitter and submitting a long message:
//!
//! ```rust,no_run
//! use smpp_session::connection::Connection;
//! use smpp_session::service::SessionRunner;
//! use smpp_session::session::{Dispatched, MessageOptions, SessionConfig, Transmitter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SessionConfig::builder("system_id")
//!         .password("password")
//!         .build()?;
//!
//!     let connection = Connection::connect("localhost:2775").await?;
//!     let mut runner = SessionRunner::new(connection, Transmitter::new(config));
//!     let mut events = runner.subscribe();
//!     let handle = runner.handle();
//!     let session = tokio::spawn(runner.run());
//!
//!     handle.call(|esme, sink| esme.send_bind(sink)).await?;
//!     while let Some(event) = events.recv().await {
//!         if let Dispatched::Bound(_) = event {
//!             break;
//!         }
//!     }
//!
//!     let body = "A".repeat(306);
//!     handle
//!         .call(|esme, sink| {
//!             esme.send_message("1001", "12345", "67890", body.as_bytes(), &MessageOptions::new(), sink)
//!         })
//!         .await?;
//!
//!     handle.unbind().await?;
//!     session.await??;
//!     Ok(())
//! }
//! ```

mod macros;

pub mod codec;
pub mod connection;
pub mod datatypes;
pub mod service;
pub mod session;

#[cfg(test)]
mod tests;

pub use codec::{CodecError, Decodable, Encodable, Frame, PduHeader, PduRegistry};
pub use connection::Connection;
pub use service::{SessionHandle, SessionRunner, run_session};
pub use session::{
    BindState, Dispatched, FrameSink, MessageId, MessageOptions, ServerSession, SessionConfig,
    SessionError, SessionResult, SessionRole, Transmitter, dispatch, dispatch_malformed,
};
