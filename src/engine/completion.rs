//! Completion signal for transitions that may not have settled yet.

use crate::core::FsmError;
use futures::channel::oneshot;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Resolves once a transition has fully settled, or with the error that
/// stopped it.
///
/// A transition that ran to completion on the caller's thread yields an
/// already-finished signal. A transition that suspended, or a request queued
/// behind a running transition, yields a signal that finishes later.
///
/// # Example
///
/// ```rust
/// use settle::engine::Completion;
///
/// let done = Completion::done();
/// assert!(done.is_done());
/// assert!(futures::executor::block_on(done).is_ok());
/// ```
#[must_use = "a completion does nothing unless awaited or checked"]
#[derive(Debug)]
pub struct Completion {
    inner: Inner,
}

#[derive(Debug)]
enum Inner {
    Done,
    Waiting(oneshot::Receiver<Result<(), FsmError>>),
}

/// Sending half of a pending [`Completion`].
pub(crate) type Resolver = oneshot::Sender<Result<(), FsmError>>;

impl Completion {
    /// A signal for a transition that already settled.
    pub fn done() -> Self {
        Self { inner: Inner::Done }
    }

    pub(crate) fn pending() -> (Resolver, Self) {
        let (tx, rx) = oneshot::channel();
        (
            tx,
            Self {
                inner: Inner::Waiting(rx),
            },
        )
    }

    /// Whether the transition had already settled when this signal was
    /// created.
    pub fn is_done(&self) -> bool {
        matches!(self.inner, Inner::Done)
    }

    /// Collapse a signal whose result has already been sent. A sent error
    /// is returned directly; an unresolved or canceled signal is kept.
    pub(crate) fn resolved_now(self) -> Result<Self, FsmError> {
        match self.inner {
            Inner::Done => Ok(Self::done()),
            Inner::Waiting(mut rx) => match rx.try_recv() {
                Ok(Some(Ok(()))) => Ok(Self::done()),
                Ok(Some(Err(e))) => Err(e),
                Ok(None) | Err(oneshot::Canceled) => Ok(Self {
                    inner: Inner::Waiting(rx),
                }),
            },
        }
    }
}

impl Future for Completion {
    type Output = Result<(), FsmError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().inner {
            Inner::Done => Poll::Ready(Ok(())),
            Inner::Waiting(rx) => match Pin::new(rx).poll(cx) {
                Poll::Ready(Ok(result)) => Poll::Ready(result),
                Poll::Ready(Err(oneshot::Canceled)) => Poll::Ready(Err(FsmError::Canceled)),
                Poll::Pending => Poll::Pending,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn pending_completion_yields_sent_result() {
        let (tx, completion) = Completion::pending();
        assert!(!completion.is_done());

        tx.send(Err(FsmError::denied("Green", "Red"))).unwrap();
        let err = block_on(completion).unwrap_err();
        assert!(err.is_denied());
    }

    #[test]
    fn dropped_resolver_cancels() {
        let (tx, completion) = Completion::pending();
        drop(tx);

        assert!(matches!(block_on(completion), Err(FsmError::Canceled)));
    }

    #[test]
    fn already_sent_result_is_collapsed() {
        let (tx, completion) = Completion::pending();
        tx.send(Ok(())).unwrap();
        assert!(completion.resolved_now().unwrap().is_done());

        let (tx, completion) = Completion::pending();
        tx.send(Err(FsmError::denied("Green", "Red"))).unwrap();
        assert!(completion.resolved_now().unwrap_err().is_denied());

        let (_tx, completion) = Completion::pending();
        assert!(!completion.resolved_now().unwrap().is_done());

        let (tx, completion) = Completion::pending();
        drop(tx);
        let kept = completion.resolved_now().unwrap();
        assert!(matches!(block_on(kept), Err(FsmError::Canceled)));
    }
}
