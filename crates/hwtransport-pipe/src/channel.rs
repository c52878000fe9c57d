//! Request/reply multiplexing over one framed pipe
//!
//! A reader task owns the read half and routes each reply to the request that
//! is waiting on its `id`. A writer task owns the write half and sends whole
//! frames taken from a queue, so a request abandoned by its caller never
//! leaves half a frame on the pipe. Any number of requests can be in flight
//! at once.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::error::PipeError;
use crate::frame::{read_frame, write_frame, MAX_FRAME_LEN};
use crate::protocol::{Op, RemoteError, Reply, Request};

type PendingMap = DashMap<u64, oneshot::Sender<Result<Value, RemoteError>>>;

/// Frames queued for the writer task before callers start waiting
const OUTGOING_FRAMES: usize = 64;

// ----------------------------------------------------------------------------
// Pipe Channel
// ----------------------------------------------------------------------------

pub struct PipeChannel {
    outgoing: mpsc::Sender<Vec<u8>>,
    pending: Arc<PendingMap>,
    next_id: AtomicU64,
    closed: Arc<AtomicBool>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl PipeChannel {
    /// Start routing replies read from `reader` and frames written to `writer`
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let pending = Arc::new(PendingMap::new());
        let closed = Arc::new(AtomicBool::new(false));
        let (outgoing, queue) = mpsc::channel(OUTGOING_FRAMES);
        let reader = tokio::spawn(route_replies(reader, pending.clone(), closed.clone()));
        let writer = tokio::spawn(write_frames(writer, queue, pending.clone(), closed.clone()));

        Self {
            outgoing,
            pending,
            next_id: AtomicU64::new(0),
            closed,
            reader,
            writer,
        }
    }

    /// Whether the peer has gone away
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Requests still waiting for a reply
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Send `op` and wait for its reply
    ///
    /// `timeout` bounds the whole exchange: queueing the frame, writing it and
    /// waiting for the reply.
    pub async fn request(&self, op: Op, timeout: Option<Duration>) -> Result<Value, PipeError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let name = op.name();
        let frame = serde_json::to_vec(&Request { id, op })?;
        if frame.len() > MAX_FRAME_LEN {
            return Err(PipeError::FrameTooLarge { len: frame.len() });
        }

        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);
        let _waiting = Waiting {
            pending: &self.pending,
            id,
        };
        // Both tasks mark the channel closed before they drop pending senders
        if self.is_closed() {
            return Err(PipeError::Closed);
        }

        let exchange = async {
            trace!("-> #{} {} ({} bytes)", id, name, frame.len());
            self.outgoing
                .send(frame)
                .await
                .map_err(|_| PipeError::Closed)?;
            match rx.await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(remote)) => Err(PipeError::Remote(remote)),
                Err(_) => Err(PipeError::Closed),
            }
        };

        match timeout {
            Some(limit) => match tokio::time::timeout(limit, exchange).await {
                Ok(reply) => reply,
                Err(_) => {
                    debug!("Request #{} {} timed out after {:?}", id, name, limit);
                    Err(PipeError::Timeout {
                        duration_ms: limit.as_millis() as u64,
                    })
                }
            },
            None => exchange.await,
        }
    }

    /// [`request`](Self::request) and decode the `ok` payload as `T`
    pub async fn request_as<T: DeserializeOwned>(
        &self,
        op: Op,
        timeout: Option<Duration>,
    ) -> Result<T, PipeError> {
        let value = self.request(op, timeout).await?;
        Ok(serde_json::from_value(value)?)
    }
}

impl Drop for PipeChannel {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

impl core::fmt::Debug for PipeChannel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PipeChannel")
            .field("pending", &self.pending.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Forgets a request once its caller stops waiting, however that happens
struct Waiting<'a> {
    pending: &'a PendingMap,
    id: u64,
}

impl Drop for Waiting<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.id);
    }
}

fn close(pending: &PendingMap, closed: &AtomicBool) {
    closed.store(true, Ordering::SeqCst);
    pending.clear();
}

async fn write_frames<W>(
    mut writer: W,
    mut queue: mpsc::Receiver<Vec<u8>>,
    pending: Arc<PendingMap>,
    closed: Arc<AtomicBool>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = queue.recv().await {
        if let Err(e) = write_frame(&mut writer, &frame).await {
            warn!("Pipe write failed: {}", e);
            close(&pending, &closed);
            return;
        }
    }
}

async fn route_replies<R>(mut reader: R, pending: Arc<PendingMap>, closed: Arc<AtomicBool>)
where
    R: AsyncRead + Unpin,
{
    loop {
        match read_frame(&mut reader).await {
            Ok(Some(frame)) => match serde_json::from_slice::<Reply>(&frame) {
                Ok(reply) => match pending.remove(&reply.id) {
                    Some((id, waiter)) => {
                        trace!("<- #{}", id);
                        let _ = waiter.send(reply.into_result());
                    }
                    None => debug!("Dropping reply for unknown request #{}", reply.id),
                },
                Err(e) => warn!("Ignoring malformed frame from peer: {}", e),
            },
            Ok(None) => {
                debug!("Peer closed the pipe");
                break;
            }
            Err(e) => {
                warn!("Pipe read failed: {}", e);
                break;
            }
        }
    }

    close(&pending, &closed);
}
