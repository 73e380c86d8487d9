//! Recording backend controller for dispatcher and responder tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use emu817_core::{BackendController, Error, Result, TransceiverState};

/// A [`BackendController`] that records every state it is handed.
///
/// Cloning shares the underlying log, so tests keep a clone and hand the
/// original to the dispatcher as `Box<dyn BackendController>`. Failures
/// can be injected one call at a time with [`fail_next_apply`].
///
/// [`fail_next_apply`]: MockBackend::fail_next_apply
#[derive(Clone, Default)]
pub struct MockBackend {
    applied: Arc<Mutex<Vec<TransceiverState>>>,
    stopped: Arc<AtomicBool>,
    fail_apply: Arc<AtomicBool>,
    fail_stop: Arc<AtomicBool>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every state snapshot `apply` has seen, in call order.
    pub fn applied(&self) -> Vec<TransceiverState> {
        self.applied.lock().expect("apply log poisoned").clone()
    }

    /// Whether `stop` has been called at least once.
    pub fn stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Make the next `apply` call fail. The state is still recorded so
    /// tests can assert what the backend was asked to do.
    pub fn fail_next_apply(&self) {
        self.fail_apply.store(true, Ordering::SeqCst);
    }

    /// Make the next `stop` call fail.
    pub fn fail_next_stop(&self) {
        self.fail_stop.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl BackendController for MockBackend {
    async fn apply(&mut self, state: &TransceiverState) -> Result<()> {
        self.applied
            .lock()
            .expect("apply log poisoned")
            .push(state.clone());
        if self.fail_apply.swap(false, Ordering::SeqCst) {
            return Err(Error::Backend("injected apply failure".into()));
        }
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.stopped.store(true, Ordering::SeqCst);
        if self.fail_stop.swap(false, Ordering::SeqCst) {
            return Err(Error::Backend("injected stop failure".into()));
        }
        Ok(())
    }
}
