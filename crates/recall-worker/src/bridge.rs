//! JSON-lines bridge between a host stream and the worker.
//!
//! Requests are read from `input` one per line and replies are written to
//! `output` one per line. Reading and writing run concurrently, so a full
//! request queue never stops replies from draining.

use crate::protocol::{InboundEvent, OutboundEvent, ProtocolError};
use crate::worker::WorkerHandle;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("host stream i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("recognition engine failed to initialize: {0}")]
    EngineFailed(String),
}

/// Pump requests from `input` to the worker and replies from the worker to
/// `output` until both sides are done.
///
/// End of input closes the request queue; every reply already owed is still
/// written before this returns. If the worker stops, input is no longer read
/// and the reply side reports why. An unrecognized topic or an `error` reply
/// ends the bridge with an error. Malformed events of a known topic are
/// logged and dropped.
pub async fn run_bridge<R, W>(
    input: R,
    mut output: W,
    worker: WorkerHandle,
    mut events: mpsc::Receiver<OutboundEvent>,
) -> Result<(), BridgeError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let requests = async move {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            match InboundEvent::from_json(&line) {
                Ok(event) => {
                    if worker.send(event).await.is_err() {
                        tracing::warn!("worker stopped; no longer reading input");
                        break;
                    }
                }
                Err(e @ ProtocolError::UnrecognizedEvent(_)) => {
                    tracing::error!(error = %e, "aborting on unrecognized event");
                    return Err(e.into());
                }
                Err(e) => tracing::warn!(error = %e, "dropping malformed event"),
            }
        }
        drop(worker);
        tracing::info!("input done; draining worker");
        Ok::<_, BridgeError>(())
    };

    let replies = async {
        while let Some(event) = events.recv().await {
            let mut json = event.to_json()?;
            json.push('\n');
            output.write_all(json.as_bytes()).await?;
            output.flush().await?;

            if let OutboundEvent::Error { message } = event {
                return Err(BridgeError::EngineFailed(message));
            }
        }
        Ok::<_, BridgeError>(())
    };

    tokio::try_join!(requests, replies)?;
    Ok(())
}
