// ABOUTME: Drives one session role over a TCP connection: reads frames, dispatches them and writes responses
// ABOUTME: Application code reaches the role through a SessionHandle while the loop runs

use crate::codec::{CodecError, Frame};
use crate::connection::Connection;
use crate::session::{
    Dispatched, SessionError, SessionResult, SessionRole, dispatch, dispatch_malformed,
    send_unbind,
};
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};

/// Shared access to a role owned by a running [`SessionRunner`].
///
/// Frames written through the handle are queued and sent by the runner in
/// the order they were produced.
#[derive(Debug)]
pub struct SessionHandle<R> {
    role: Arc<Mutex<R>>,
    sink: mpsc::UnboundedSender<Frame>,
}

impl<R> Clone for SessionHandle<R> {
    fn clone(&self) -> Self {
        SessionHandle {
            role: Arc::clone(&self.role),
            sink: self.sink.clone(),
        }
    }
}

impl<R: SessionRole> SessionHandle<R> {
    /// Run `f` against the role with the runner's outbound queue as sink
    pub async fn call<T, F>(&self, f: F) -> SessionResult<T>
    where
        F: FnOnce(&mut R, &mut mpsc::UnboundedSender<Frame>) -> SessionResult<T>,
    {
        let mut role = self.role.lock().await;
        let mut sink = self.sink.clone();
        f(&mut role, &mut sink)
    }

    pub async fn unbind(&self) -> SessionResult<u32> {
        self.call(|role, sink| send_unbind(role, sink)).await
    }
}

/// Owns the connection and the inbound half of the outbound queue.
#[derive(Debug)]
pub struct SessionRunner<R> {
    connection: Connection,
    role: Arc<Mutex<R>>,
    tx: mpsc::UnboundedSender<Frame>,
    rx: mpsc::UnboundedReceiver<Frame>,
    events: Option<mpsc::UnboundedSender<Dispatched>>,
}

impl<R: SessionRole> SessionRunner<R> {
    pub fn new(connection: Connection, role: R) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        SessionRunner {
            connection,
            role: Arc::new(Mutex::new(role)),
            tx,
            rx,
            events: None,
        }
    }

    pub fn handle(&self) -> SessionHandle<R> {
        SessionHandle {
            role: Arc::clone(&self.role),
            sink: self.tx.clone(),
        }
    }

    /// Receive every successful dispatch outcome, including orphans
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<Dispatched> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events = Some(tx);
        rx
    }

    /// Serve the connection until the peer closes it or an unbind completes.
    ///
    /// Requests rejected by the session, undecodable ones included, are
    /// answered and logged. The loop only stops early on transport failures
    /// and on a refused bind.
    pub async fn run(mut self) -> SessionResult<()> {
        loop {
            tokio::select! {
                read = self.connection.read_frame() => {
                    let outcome = match read {
                        Ok(Some(frame)) => {
                            let mut role = self.role.lock().await;
                            dispatch(&mut *role, frame, &mut self.tx)
                        }
                        Ok(None) => {
                            info!("peer closed the connection");
                            return Ok(());
                        }
                        Err(CodecError::MalformedPdu {
                            command_id,
                            sequence_number,
                            source,
                        }) => {
                            let mut role = self.role.lock().await;
                            dispatch_malformed(
                                &mut *role,
                                command_id,
                                sequence_number,
                                *source,
                                &mut self.tx,
                            )
                        }
                        Err(err) => return Err(err.into()),
                    };
                    self.flush_queued().await?;

                    match outcome {
                        Ok(Dispatched::Unbound) => {
                            info!("session unbound");
                            self.publish(Dispatched::Unbound);
                            if let Err(err) = self.connection.shutdown().await {
                                debug!("shutdown after unbind: {}", err);
                            }
                            return Ok(());
                        }
                        Ok(dispatched) => self.publish(dispatched),
                        Err(err @ (SessionError::BindRejected(_) | SessionError::SinkClosed)) => {
                            return Err(err);
                        }
                        Err(err) => warn!("request rejected: {}", err),
                    }
                }
                Some(frame) = self.rx.recv() => {
                    self.connection.write_frame(&frame).await?;
                }
            }
        }
    }

    // Write everything the last dispatch queued before reading further
    async fn flush_queued(&mut self) -> SessionResult<()> {
        while let Ok(frame) = self.rx.try_recv() {
            self.connection.write_frame(&frame).await?;
        }
        Ok(())
    }

    fn publish(&mut self, dispatched: Dispatched) {
        if let Some(events) = &self.events {
            if events.send(dispatched).is_err() {
                debug!("event subscriber dropped");
                self.events = None;
            }
        }
    }
}

/// Serve `role` on `connection` until the session ends
pub async fn run_session<R: SessionRole>(connection: Connection, role: R) -> SessionResult<()> {
    SessionRunner::new(connection, role).run().await
}
