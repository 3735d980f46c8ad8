use crate::codec::Frame;
use crate::session::error::{SessionError, SessionResult};
use tokio::sync::mpsc;

/// Hand-off point between session logic and the transport.
///
/// Sending never blocks; the transport encodes and writes frames later.
pub trait FrameSink {
    fn send_frame(&mut self, frame: Frame) -> SessionResult<()>;
}

/// Collects frames in memory, used by tests and by callers that flush in batches
impl FrameSink for Vec<Frame> {
    fn send_frame(&mut self, frame: Frame) -> SessionResult<()> {
        self.push(frame);
        Ok(())
    }
}

impl FrameSink for mpsc::UnboundedSender<Frame> {
    fn send_frame(&mut self, frame: Frame) -> SessionResult<()> {
        self.send(frame).map_err(|_| SessionError::SinkClosed)
    }
}
