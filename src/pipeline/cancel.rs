//! Cancellation for unbounded stages.
//!
//! Sources and samplers never run out of values, so they cannot stop by
//! closing a conduit. Each one holds a `CancelToken`; the supervisor holds the
//! matching `CancelHandle`. Cancelling drops the handle's sender, which
//! disconnects every token at once. A token is a plain crossbeam receiver, so
//! a stage can wait on it inside `select!` next to a blocked send or a timer
//! tick.

use crossbeam_channel::{bounded, never, Receiver, Sender, TryRecvError};

/// Owner side of a cancellation signal.
///
/// Dropping the handle cancels as well.
#[derive(Debug)]
pub struct CancelHandle {
    tx: Option<Sender<()>>,
    token: CancelToken,
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, rx) = bounded(0);
        Self {
            tx: Some(tx),
            token: CancelToken { rx },
        }
    }

    /// A token observing this handle.
    pub fn token(&self) -> CancelToken {
        self.token.clone()
    }

    /// Signal every token. Idempotent.
    pub fn cancel(&mut self) {
        if self.tx.take().is_some() {
            tracing::debug!("Cancellation signalled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.tx.is_none()
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side of a cancellation signal. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: Receiver<()>,
}

impl CancelToken {
    /// A token that is never cancelled, for stages run outside a supervisor.
    pub fn never() -> Self {
        Self { rx: never() }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Receiver that becomes ready (disconnected) once cancelled.
    #[inline]
    pub fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }
}
