//! Conduits: named, unbuffered rendezvous channels between stages.
//!
//! A conduit is a zero-capacity crossbeam channel, so every send blocks until
//! the next stage is ready to receive. That handoff is the pipeline's only
//! backpressure mechanism.
//!
//! The producer side owns the single "closed" flag. Closing is explicit and
//! happens at most once; sending after close or closing twice is a
//! [`PipelineError::ProtocolViolation`]. Dropping the sender also closes the
//! conduit, which is how a stage that fails mid-stream still releases its
//! consumers.

use crate::pipeline::cancel::CancelToken;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crossbeam_channel::{bounded, select, Receiver, RecvTimeoutError, Sender};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Create a new rendezvous conduit.
pub fn conduit<T>(name: impl Into<String>) -> (ConduitSender<T>, ConduitReceiver<T>) {
    let name: Arc<str> = Arc::from(name.into());
    let (tx, rx) = bounded(0);
    (
        ConduitSender {
            name: name.clone(),
            tx: Some(tx),
        },
        ConduitReceiver { name, rx },
    )
}

/// Producer end of a conduit. Not clonable: one producer per conduit.
pub struct ConduitSender<T> {
    name: Arc<str>,
    tx: Option<Sender<T>>,
}

impl<T> ConduitSender<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_none()
    }

    fn open_sender(&self) -> PipelineResult<&Sender<T>> {
        self.tx.as_ref().ok_or_else(|| {
            PipelineError::ProtocolViolation(format!("send on closed conduit '{}'", self.name))
        })
    }

    /// Hand `value` to the receiver, blocking until it takes it.
    pub fn send(&self, value: T) -> PipelineResult<()> {
        self.open_sender()?
            .send(value)
            .map_err(|_| PipelineError::Disconnected(self.name.to_string()))
    }

    /// Like [`send`](Self::send), but gives up with
    /// [`PipelineError::Cancelled`] if `cancel` fires while blocked.
    pub fn send_or_cancel(&self, value: T, cancel: &CancelToken) -> PipelineResult<()> {
        let tx = self.open_sender()?;
        select! {
            send(tx, value) -> res => {
                res.map_err(|_| PipelineError::Disconnected(self.name.to_string()))
            }
            recv(cancel.receiver()) -> _ => Err(PipelineError::Cancelled),
        }
    }

    /// Close the conduit. Receivers drain what was already handed over and
    /// then see end of stream.
    pub fn close(&mut self) -> PipelineResult<()> {
        match self.tx.take() {
            Some(_) => {
                tracing::trace!("Conduit '{}' closed", self.name);
                Ok(())
            }
            None => Err(PipelineError::ProtocolViolation(format!(
                "conduit '{}' closed twice",
                self.name
            ))),
        }
    }
}

impl<T> fmt::Debug for ConduitSender<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConduitSender")
            .field("name", &self.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Consumer end of a conduit.
pub struct ConduitReceiver<T> {
    name: Arc<str>,
    rx: Receiver<T>,
}

impl<T> ConduitReceiver<T> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Next value, or `None` once the conduit is closed and drained.
    #[inline]
    pub fn recv(&self) -> Option<T> {
        self.rx.recv().ok()
    }

    /// Like [`recv`](Self::recv) with an upper bound on the wait.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    /// Blocking iterator that ends when the conduit closes.
    pub fn iter(&self) -> crossbeam_channel::Iter<'_, T> {
        self.rx.iter()
    }

    /// The underlying channel, for use in `select!`.
    #[inline]
    pub fn inner(&self) -> &Receiver<T> {
        &self.rx
    }
}

impl<T> IntoIterator for ConduitReceiver<T> {
    type Item = T;
    type IntoIter = crossbeam_channel::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.rx.into_iter()
    }
}

impl<T> fmt::Debug for ConduitReceiver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConduitReceiver")
            .field("name", &self.name)
            .finish()
    }
}
