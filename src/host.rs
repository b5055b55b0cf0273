//! Native messaging transport
//!
//! Every message in either direction is a 4-byte length in native byte
//! order followed by that many bytes of UTF-8 JSON. Requests are handled
//! concurrently; all outbound frames go through one writer task so they
//! never interleave.

use std::io::ErrorKind;

use serde_json::Value;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::{
        broadcast,
        mpsc::{UnboundedReceiver, UnboundedSender},
    },
    task::JoinSet,
};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    client::GithubClient,
    dispatcher::Dispatcher,
    event::HostEvent,
    result::{Result, StarsError},
    router::{MessageRouter, Request, Response},
    storage::KeyValueStore,
};

/// Largest frame accepted from the extension
pub const MAX_INBOUND_FRAME: usize = 64 * 1024 * 1024;

/// Largest frame the browser accepts from a host
pub const MAX_OUTBOUND_FRAME: usize = 1024 * 1024;

/// Read one frame; `None` once the input is exhausted
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    match reader.read_exact(&mut header).await {
        Ok(_) => {},
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_ne_bytes(header) as usize;
    if len > MAX_INBOUND_FRAME {
        return Err(StarsError::FrameTooLarge { len, max: MAX_INBOUND_FRAME });
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let len = payload.len();
    if len > MAX_OUTBOUND_FRAME {
        return Err(StarsError::FrameTooLarge { len, max: MAX_OUTBOUND_FRAME });
    }

    // Bounded by MAX_OUTBOUND_FRAME above
    let header = (len as u32).to_ne_bytes();
    writer.write_all(&header).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Decode a frame, keeping whatever `id` it carried for the error reply
fn decode_request(frame: &[u8]) -> std::result::Result<Request, Response> {
    let value: Value =
        serde_json::from_slice(frame).map_err(|e| Response::failure(None, StarsError::from(e)))?;
    let id = value.get("id").cloned();

    serde_json::from_value(value).map_err(|e| Response::failure(id, StarsError::from(e)))
}

/// Serve requests from `reader` until it is exhausted.
///
/// In-flight requests are drained and their responses written before this
/// returns. A read error or an oversized inbound frame ends the session
/// after the drain and is returned.
#[instrument(skip_all)]
pub async fn run<R, W, C, S>(
    mut reader: R,
    writer: W,
    router: MessageRouter<C, S>,
    sender: UnboundedSender<HostEvent>,
    receiver: UnboundedReceiver<HostEvent>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
    C: GithubClient,
    S: KeyValueStore,
{
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let writer_task = tokio::spawn(write_events(writer, receiver, shutdown_rx));

    let mut in_flight = JoinSet::new();
    let outcome = loop {
        let frame = match read_frame(&mut reader).await {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                info!("Input closed");
                break Ok(());
            },
            Err(e) => {
                error!(error = %e, "Failed to read frame");
                break Err(e);
            },
        };

        match decode_request(&frame) {
            Ok(request) => {
                let router = router.clone();
                let sender = sender.clone();
                in_flight.spawn(async move {
                    sender.dispatch(router.handle(request).await.into());
                });
            },
            Err(response) => {
                warn!(error = ?response.error, "Rejected malformed request");
                sender.dispatch(response.into());
            },
        }

        while let Some(joined) = in_flight.try_join_next() {
            if let Err(e) = joined {
                error!(error = %e, "Request task failed");
            }
        }
    };

    debug!(pending = in_flight.len(), "Draining in-flight requests");
    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "Request task failed");
        }
    }

    let _ = shutdown_tx.send(());
    match writer_task.await {
        Ok(Ok(())) => {},
        Ok(Err(e)) => error!(error = %e, "Writer stopped"),
        Err(e) => error!(error = %e, "Writer task failed"),
    }

    outcome
}

async fn write_events<W>(
    mut writer: W,
    mut receiver: UnboundedReceiver<HostEvent>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            biased;

            event = receiver.recv() => match event {
                Some(event) => write_event(&mut writer, event).await?,
                None => return Ok(()),
            },
            _ = shutdown_rx.recv() => {
                while let Ok(event) = receiver.try_recv() {
                    write_event(&mut writer, event).await?;
                }
                debug!("Writer shut down");
                return Ok(());
            },
        }
    }
}

async fn write_event<W>(writer: &mut W, event: HostEvent) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let name = event.variant_name();
    let payload = serde_json::to_vec(&event)?;

    match write_frame(writer, &payload).await {
        Err(e @ StarsError::FrameTooLarge { .. }) => {
            warn!(event = name, error = %e, "Dropping oversized outbound frame");
            // A response still owes its caller an answer
            if let HostEvent::Response(response) = event {
                let fallback = Response::failure(response.id, e);
                write_frame(writer, &serde_json::to_vec(&HostEvent::from(fallback))?).await?;
            }
            Ok(())
        },
        other => other,
    }
}
