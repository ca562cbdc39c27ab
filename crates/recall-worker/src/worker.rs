use crate::protocol::{InboundEvent, OutboundEvent};
use crate::session::{Session, SessionConfig};
use recall_core::{EngineError, RecognitionEngine};
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("worker thread exited")]
    ChannelClosed,
    #[error("failed to start worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Clone-safe handle for posting requests to the worker thread.
#[derive(Clone)]
pub struct WorkerHandle {
    tx: mpsc::Sender<InboundEvent>,
}

impl WorkerHandle {
    pub async fn send(&self, event: InboundEvent) -> Result<(), WorkerError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| WorkerError::ChannelClosed)
    }
}

/// Spawn the recognition worker on a dedicated OS thread.
///
/// The engine is built on the worker thread by `load_engine`. On success the
/// first outbound event is `initialization-done`; on failure it is `error`
/// and the worker exits. Requests are handled strictly in arrival order.
pub fn spawn_worker<E, F>(
    config: SessionConfig,
    capacity: usize,
    load_engine: F,
) -> Result<(WorkerHandle, mpsc::Receiver<OutboundEvent>), WorkerError>
where
    E: RecognitionEngine + 'static,
    F: FnOnce() -> Result<E, EngineError> + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<InboundEvent>(capacity);
    let (events_tx, events_rx) = mpsc::channel::<OutboundEvent>(capacity);

    std::thread::Builder::new()
        .name("recall-worker".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    tracing::error!(error = %e, "failed to build worker runtime");
                    let _ = events_tx.blocking_send(OutboundEvent::Error {
                        message: format!("worker runtime: {e}"),
                    });
                    return;
                }
            };
            runtime.block_on(run(config, load_engine, rx, events_tx));
        })?;

    Ok((WorkerHandle { tx }, events_rx))
}

async fn run<E, F>(
    config: SessionConfig,
    load_engine: F,
    mut rx: mpsc::Receiver<InboundEvent>,
    events: mpsc::Sender<OutboundEvent>,
) where
    E: RecognitionEngine,
    F: FnOnce() -> Result<E, EngineError>,
{
    tracing::info!("worker thread started");
    let mut session = Session::new(config);

    let engine = match load_engine() {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!(error = %e, "recognition engine failed to initialize");
            rx.close();
            let _ = events
                .send(OutboundEvent::Error {
                    message: e.to_string(),
                })
                .await;
            return;
        }
    };

    if events.send(session.initialize(engine)).await.is_err() {
        return;
    }

    while let Some(event) = rx.recv().await {
        if let Some(reply) = session.handle(event).await {
            if events.send(reply).await.is_err() {
                break;
            }
        }
    }
    tracing::info!("worker thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{face, ScriptedEngine, ALICE};
    use recall_core::extractor::ExtractorError;

    fn config() -> SessionConfig {
        SessionConfig {
            frame_width: 1,
            frame_height: 1,
            ..SessionConfig::default()
        }
    }

    #[tokio::test]
    async fn test_initialization_done_comes_first() {
        let (worker, mut events) =
            spawn_worker(config(), 4, || Ok(ScriptedEngine::default())).unwrap();
        assert_eq!(events.recv().await, Some(OutboundEvent::InitializationDone));

        worker.send(InboundEvent::TrackStatus).await.unwrap();
        assert_eq!(events.recv().await, Some(OutboundEvent::RecognitionReset));
    }

    #[tokio::test]
    async fn test_requests_are_answered_in_order() {
        let (worker, mut events) =
            spawn_worker(config(), 16, || Ok(ScriptedEngine::default())).unwrap();
        assert_eq!(events.recv().await, Some(OutboundEvent::InitializationDone));

        for _ in 0..5 {
            worker
                .send(InboundEvent::SendFrame {
                    pixels: ALICE.to_vec(),
                    face_data: Some(face()),
                    freeze: false,
                })
                .await
                .unwrap();
        }
        worker.send(InboundEvent::SaveGallery).await.unwrap();

        let mut names = Vec::new();
        for _ in 0..5 {
            match events.recv().await {
                Some(OutboundEvent::Recognized { recognized_name }) => names.push(recognized_name),
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(names, vec!["?", "?", "?", "?", "Person1"]);
        assert_eq!(events.recv().await, Some(OutboundEvent::GallerySaved));
    }

    #[tokio::test]
    async fn test_resolution_produces_no_reply() {
        let (worker, mut events) =
            spawn_worker(config(), 4, || Ok(ScriptedEngine::default())).unwrap();
        assert_eq!(events.recv().await, Some(OutboundEvent::InitializationDone));

        worker
            .send(InboundEvent::Resolution {
                width: 2,
                height: 2,
            })
            .await
            .unwrap();
        worker.send(InboundEvent::ClearGallery).await.unwrap();
        assert_eq!(events.recv().await, Some(OutboundEvent::GalleryCleared));
    }

    #[tokio::test]
    async fn test_engine_failure_is_reported_and_worker_stops() {
        let (worker, mut events) = spawn_worker(config(), 4, || {
            Err::<ScriptedEngine, _>(EngineError::Extractor(ExtractorError::ModelNotFound(
                "/models/w600k_r50.onnx".into(),
            )))
        })
        .unwrap();

        match events.recv().await {
            Some(OutboundEvent::Error { message }) => assert!(message.contains("w600k_r50")),
            other => panic!("expected error event, got {other:?}"),
        }
        assert_eq!(events.recv().await, None);
        assert!(matches!(
            worker.send(InboundEvent::TrackStatus).await,
            Err(WorkerError::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn test_worker_exits_when_handle_dropped() {
        let (worker, mut events) =
            spawn_worker(config(), 4, || Ok(ScriptedEngine::default())).unwrap();
        assert_eq!(events.recv().await, Some(OutboundEvent::InitializationDone));
        drop(worker);
        assert_eq!(events.recv().await, None);
    }
}
