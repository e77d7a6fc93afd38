//! Explicit continuations for callback-style steps.
//!
//! [`Next`] is consumed when invoked, so a step cannot advance its pipeline
//! twice. Dropping it without invoking is observed by the [`Completion`]
//! instead of stalling forever.

use tokio::sync::oneshot;

use crate::errors::BoxError;

/// Continuation handed to a callback-style step
#[derive(Debug)]
pub struct Next {
    sender: oneshot::Sender<Result<(), BoxError>>,
}

/// Receiving side of a [`Next`]
#[derive(Debug)]
pub struct Completion {
    receiver: oneshot::Receiver<Result<(), BoxError>>,
}

/// Why a continuation did not report success
#[derive(Debug)]
pub enum CompletionError {
    /// The step reported an error
    Failed(BoxError),
    /// The continuation was dropped without being invoked
    Dropped,
}

impl Next {
    pub fn channel() -> (Next, Completion) {
        let (sender, receiver) = oneshot::channel();
        (Next { sender }, Completion { receiver })
    }

    /// Advance with success
    pub fn done(self) {
        self.call(None);
    }

    /// Advance with an error
    pub fn fail(self, error: impl Into<BoxError>) {
        self.call(Some(error.into()));
    }

    /// Advance with an optional error
    pub fn call(self, error: Option<BoxError>) {
        let outcome = match error {
            Some(error) => Err(error),
            None => Ok(()),
        };
        // The pipeline may already be gone
        let _ = self.sender.send(outcome);
    }
}

impl Completion {
    /// Wait until the continuation is invoked or dropped
    pub async fn wait(self) -> Result<(), CompletionError> {
        match self.receiver.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(CompletionError::Failed(error)),
            Err(_) => Err(CompletionError::Dropped),
        }
    }
}
