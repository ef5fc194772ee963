//! Completion handle of an asynchronous dispatch pass.

use std::future::Future;
use std::pin::Pin;
use std::task::Context;
use std::task::Poll;

use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::error::DispatchError;

/// Outcome of one asynchronous dispatch pass.
pub type PassOutcome<E> = Result<(), DispatchError<E>>;

/// Resolves once the scheduled dispatch pass has finished.
///
/// The future is runtime-agnostic: it can be awaited on any executor, polled with
/// [`try_result`](EventFuture::try_result), or waited on with
/// [`wait`](EventFuture::wait). Dropping it does not cancel the pass.
#[must_use = "the outcome of the dispatch pass is only observable through this future"]
pub struct EventFuture<E> {
    receiver: oneshot::Receiver<PassOutcome<E>>,
}

impl<E> EventFuture<E> {
    pub(crate) fn new(receiver: oneshot::Receiver<PassOutcome<E>>) -> Self {
        Self { receiver }
    }

    /// Blocks the current thread until the pass finishes.
    ///
    /// Must not be called from inside an async task; `.await` the future there.
    pub fn wait(self) -> PassOutcome<E> {
        futures::executor::block_on(self)
    }

    /// Returns the outcome if the pass has finished, without blocking.
    ///
    /// Once an outcome has been returned, later calls report `Cancelled`.
    pub fn try_result(&mut self) -> Option<PassOutcome<E>> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => Some(Err(DispatchError::Cancelled)),
        }
    }
}

impl<E> Unpin for EventFuture<E> {}

impl<E> Future for EventFuture<E> {
    type Output = PassOutcome<E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.get_mut().receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            // Sender dropped without a value: the executor discarded the job
            Poll::Ready(Err(_)) => Poll::Ready(Err(DispatchError::Cancelled)),
            Poll::Pending => Poll::Pending,
        }
    }
}
