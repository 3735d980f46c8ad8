// ABOUTME: TCP transport for SMPP sessions: reads whole frames from a buffered socket and writes encoded frames
// ABOUTME: Knows nothing about bind state; the session layer decides what may be sent when

use crate::codec::{CodecError, Frame};
use bytes::{Buf, BytesMut};
use std::io::Cursor;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;

/// Frame based I/O over one TCP connection.
///
/// Reads are buffered in `buffer` until a complete PDU (per its
/// command_length) is available; writes go through a `BufWriter` and are
/// flushed per frame.
#[derive(Debug)]
pub struct Connection {
    stream: BufWriter<TcpStream>,
    buffer: BytesMut,
    // Reused encode buffer
    out: BytesMut,
}

impl Connection {
    pub fn new(socket: TcpStream) -> Connection {
        Connection {
            stream: BufWriter::new(socket),
            buffer: BytesMut::with_capacity(4 * 1024),
            out: BytesMut::with_capacity(512),
        }
    }

    /// Connect to `addr` and wrap the socket
    pub async fn connect(addr: &str) -> Result<Connection, CodecError> {
        let socket = TcpStream::connect(addr).await?;
        Ok(Connection::new(socket))
    }

    pub fn peer_addr(&self) -> Result<SocketAddr, CodecError> {
        Ok(self.stream.get_ref().peer_addr()?)
    }

    /// Read a single `Frame` from the stream.
    ///
    /// Waits until a whole PDU is buffered. Returns `None` when the peer
    /// closes the socket on a frame boundary, `ConnectionReset` when it closes
    /// mid-frame.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, CodecError> {
        loop {
            if let Some(frame) = self.parse_frame()? {
                return Ok(Some(frame));
            }

            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                return if self.buffer.is_empty() {
                    Ok(None)
                } else {
                    Err(CodecError::ConnectionReset)
                };
            }
        }
    }

    /// Parse one frame from the read buffer, `Ok(None)` if more data is needed.
    ///
    /// A complete PDU that fails to decode is reported as
    /// [`CodecError::MalformedPdu`] with its raw command_id and sequence
    /// number, and is dropped from the buffer so reading can continue.
    fn parse_frame(&mut self) -> Result<Option<Frame>, CodecError> {
        let mut buf = Cursor::new(&self.buffer[..]);

        let len = match Frame::check(&mut buf) {
            Ok(len) => len,
            Err(CodecError::Incomplete) => return Ok(None),
            Err(e) => return Err(e),
        };

        // `check` leaves the cursor at the start of the PDU
        let frame = Frame::parse(&mut buf).map_err(|source| {
            let header = &self.buffer[..len];
            CodecError::MalformedPdu {
                command_id: u32::from_be_bytes([header[4], header[5], header[6], header[7]]),
                sequence_number: u32::from_be_bytes([header[12], header[13], header[14], header[15]]),
                source: Box::new(source),
            }
        });

        self.buffer.advance(len);
        frame.map(Some)
    }

    /// Encode and write one frame, flushing it to the socket
    pub async fn write_frame(&mut self, frame: &Frame) -> Result<(), CodecError> {
        self.out.clear();
        frame.encode(&mut self.out)?;
        self.stream.write_all(&self.out).await?;
        self.stream.flush().await?;
        tracing::trace!(
            "wrote {:?} sequence {} ({} octets)",
            frame.command_id(),
            frame.sequence_number(),
            self.out.len()
        );
        Ok(())
    }

    /// Flush and close the write half
    pub async fn shutdown(&mut self) -> Result<(), CodecError> {
        self.stream.flush().await?;
        self.stream.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Encodable;
    use crate::datatypes::{CommandId, CommandStatus, EnquireLink, SubmitSm};
    use tokio::net::TcpListener;

    async fn pair() -> (Connection, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (Connection::new(server), client)
    }

    #[tokio::test]
    async fn malformed_pdu_keeps_header_and_stream_position() {
        let (mut connection, mut peer) = pair().await;

        let mut bad = SubmitSm::builder()
            .sequence_number(4242)
            .build()
            .to_bytes()
            .unwrap()
            .to_vec();
        bad[17] = 0x09; // source_addr_ton
        peer.write_all(&bad).await.unwrap();
        peer.write_all(&EnquireLink::new(43).to_bytes().unwrap())
            .await
            .unwrap();

        let err = connection.read_frame().await.unwrap_err();
        match &err {
            CodecError::MalformedPdu {
                command_id,
                sequence_number,
                ..
            } => {
                assert_eq!(*command_id, CommandId::SubmitSm as u32);
                assert_eq!(*sequence_number, 4242);
            }
            other => panic!("expected a malformed PDU, got {other:?}"),
        }
        assert_eq!(err.to_command_status(), CommandStatus::InvalidSourceAddrTon);

        // The bad PDU was consumed; the next one still decodes
        match connection.read_frame().await.unwrap() {
            Some(Frame::EnquireLink(pdu)) => assert_eq!(pdu.sequence_number, 43),
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[tokio::test]
    async fn close_mid_frame_is_a_reset() {
        let (mut connection, mut peer) = pair().await;

        let bytes = EnquireLink::new(9).to_bytes().unwrap();
        peer.write_all(&bytes[..10]).await.unwrap();
        drop(peer);

        assert!(matches!(
            connection.read_frame().await,
            Err(CodecError::ConnectionReset)
        ));
    }

    #[tokio::test]
    async fn close_on_frame_boundary_is_clean() {
        let (mut connection, peer) = pair().await;
        drop(peer);
        assert!(connection.read_frame().await.unwrap().is_none());
    }
}
