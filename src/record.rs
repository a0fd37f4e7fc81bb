//! Recording session state machine. There can only be one active capture
//! at a time and the machine owns it exclusively.

use std::sync::Arc;

use murmur_audio::{CaptureBackend, CaptureError, CaptureHandle, Clip};
use murmur_core::CaptureState;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

/// Coordinates microphone capture through the observable states
/// `Idle → Starting → Listening → Idle`.
///
/// `stop` releases the device as part of the call itself, even when the
/// `start` that requested it has not resolved yet: a grant arriving after
/// a stop is dropped on the spot, so a double-tap can never leave a live
/// stream behind.
pub struct RecordingSession {
    backend: Arc<dyn CaptureBackend>,
    inner: Mutex<Inner>,
}

struct Inner {
    state: CaptureState,
    active: Option<Box<dyn CaptureHandle>>,
    /// Bumped by every `stop`; a pending grant compares its epoch on
    /// resolution and discards the handle if a stop landed in between.
    epoch: u64,
}

impl RecordingSession {
    pub fn new(backend: Arc<dyn CaptureBackend>) -> Self {
        Self {
            backend,
            inner: Mutex::new(Inner {
                state: CaptureState::Idle,
                active: None,
                epoch: 0,
            }),
        }
    }

    /// Current observable state.
    pub fn state(&self) -> CaptureState {
        self.inner.lock().state
    }

    /// Request microphone access and begin capturing.
    ///
    /// A no-op when already listening or when another start is still
    /// resolving. Suspends while the platform resolves the grant; on
    /// failure the machine is back in `Idle` and the typed error is
    /// returned to the caller.
    pub async fn start(&self) -> Result<(), CaptureError> {
        let epoch = {
            let mut inner = self.inner.lock();
            if inner.state != CaptureState::Idle {
                debug!(state = ?inner.state, "start ignored");
                return Ok(());
            }
            inner.state = CaptureState::Starting;
            inner.epoch
        };

        let opened = self.backend.open().await;

        let handle = {
            let mut inner = self.inner.lock();
            match opened {
                Ok(handle) => {
                    if inner.epoch != epoch {
                        // A stop raced the grant. Releasing means dropping
                        // the handle; do that outside the lock.
                        warn!("stop arrived before the grant resolved; releasing device");
                        Some(handle)
                    } else {
                        inner.active = Some(handle);
                        inner.state = CaptureState::Listening;
                        info!("listening");
                        None
                    }
                }
                Err(err) => {
                    inner.state = CaptureState::Idle;
                    return Err(err);
                }
            }
        };
        drop(handle);
        Ok(())
    }

    /// Stop capturing.
    ///
    /// Returns the finalized clip when a live capture was stopped, `None`
    /// when there was nothing to stop. The device is released with this
    /// call in every case, including a stop that lands while the grant is
    /// still pending.
    pub fn stop(&self) -> Result<Option<Clip>, CaptureError> {
        let handle = {
            let mut inner = self.inner.lock();
            inner.epoch += 1;
            match inner.state {
                CaptureState::Idle => return Ok(None),
                CaptureState::Starting => {
                    // No stream yet; the bumped epoch makes the pending
                    // grant discard its handle on arrival.
                    inner.state = CaptureState::Idle;
                    debug!("stop during start; pending grant will be discarded");
                    return Ok(None);
                }
                CaptureState::Listening => {
                    inner.state = CaptureState::Idle;
                    inner.active.take()
                }
            }
        };

        match handle {
            Some(handle) => {
                let clip = handle.finish()?;
                info!(bytes = clip.len(), "recording finalized");
                Ok(Some(clip))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::oneshot;

    use super::*;

    struct FakeHandle {
        released: Arc<AtomicBool>,
    }

    impl CaptureHandle for FakeHandle {
        fn finish(self: Box<Self>) -> Result<Clip, CaptureError> {
            Ok(Clip::wav(vec![1, 2, 3]))
        }
    }

    impl Drop for FakeHandle {
        fn drop(&mut self) {
            self.released.store(true, Ordering::SeqCst);
        }
    }

    /// Backend whose grant optionally waits on a signal before resolving.
    struct FakeBackend {
        gate: tokio::sync::Mutex<Option<oneshot::Receiver<()>>>,
        released: Arc<AtomicBool>,
        opens: AtomicUsize,
    }

    impl FakeBackend {
        fn immediate() -> Self {
            Self {
                gate: tokio::sync::Mutex::new(None),
                released: Arc::new(AtomicBool::new(false)),
                opens: AtomicUsize::new(0),
            }
        }

        fn gated(rx: oneshot::Receiver<()>) -> Self {
            Self {
                gate: tokio::sync::Mutex::new(Some(rx)),
                ..Self::immediate()
            }
        }
    }

    #[async_trait]
    impl CaptureBackend for FakeBackend {
        async fn open(&self) -> Result<Box<dyn CaptureHandle>, CaptureError> {
            if let Some(rx) = self.gate.lock().await.take() {
                rx.await.ok();
            }
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeHandle {
                released: self.released.clone(),
            }))
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl CaptureBackend for FailingBackend {
        async fn open(&self) -> Result<Box<dyn CaptureHandle>, CaptureError> {
            Err(CaptureError::DeviceNotFound)
        }
    }

    #[tokio::test]
    async fn test_start_stop_round_trip() {
        let backend = Arc::new(FakeBackend::immediate());
        let session = RecordingSession::new(backend.clone());

        assert_eq!(session.state(), CaptureState::Idle);
        session.start().await.unwrap();
        assert_eq!(session.state(), CaptureState::Listening);

        let clip = session.stop().unwrap().unwrap();
        assert_eq!(clip.data(), &[1, 2, 3]);
        assert_eq!(session.state(), CaptureState::Idle);
        assert!(backend.released.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_start_while_listening_is_a_noop() {
        let backend = Arc::new(FakeBackend::immediate());
        let session = RecordingSession::new(backend.clone());

        session.start().await.unwrap();
        session.start().await.unwrap();
        assert_eq!(session.state(), CaptureState::Listening);
        assert_eq!(backend.opens.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_when_idle_yields_nothing() {
        let session = RecordingSession::new(Arc::new(FakeBackend::immediate()));
        assert!(session.stop().unwrap().is_none());
        assert_eq!(session.state(), CaptureState::Idle);
    }

    #[tokio::test]
    async fn test_failed_start_returns_to_idle() {
        let session = RecordingSession::new(Arc::new(FailingBackend));
        let err = session.start().await.unwrap_err();
        assert!(matches!(err, CaptureError::DeviceNotFound));
        assert_eq!(session.state(), CaptureState::Idle);
    }

    #[tokio::test]
    async fn test_stop_before_grant_resolves_releases_the_device() {
        let (grant_tx, grant_rx) = oneshot::channel();
        let backend = Arc::new(FakeBackend::gated(grant_rx));
        let session = Arc::new(RecordingSession::new(backend.clone()));

        let starter = {
            let session = session.clone();
            tokio::spawn(async move { session.start().await })
        };

        // Let the start reach the pending grant.
        while session.state() != CaptureState::Starting {
            tokio::task::yield_now().await;
        }

        // Double-tap: stop lands while the grant is still pending.
        assert!(session.stop().unwrap().is_none());
        assert_eq!(session.state(), CaptureState::Idle);

        // The grant resolves afterwards; the handle must be dropped.
        grant_tx.send(()).unwrap();
        starter.await.unwrap().unwrap();

        assert_eq!(session.state(), CaptureState::Idle);
        assert!(backend.released.load(Ordering::SeqCst));

        // The machine is reusable after the race.
        session.start().await.unwrap();
        assert_eq!(session.state(), CaptureState::Listening);
    }
}
