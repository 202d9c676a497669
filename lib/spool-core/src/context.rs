//! Per-call cancellation and deadline.

use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::Error;

/// Cancellation signal and deadline attached to a [`crate::Request`].
///
/// An empty context never fires.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: Option<CancellationToken>,
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context that never fires.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires when `token` is cancelled.
    #[must_use]
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Fires once `deadline` is reached.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Cancellation token, if any.
    #[must_use]
    pub const fn token(&self) -> Option<&CancellationToken> {
        self.token.as_ref()
    }

    /// Deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The error this context reports if it has already fired.
    #[must_use]
    pub fn error(&self) -> Option<Error> {
        if self.token.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Some(Error::Cancelled);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Some(Error::DeadlineExceeded);
        }
        None
    }

    /// Resolves with the context's own error once it fires.
    ///
    /// Pending forever when neither a token nor a deadline is set.
    pub async fn done(&self) -> Error {
        let cancelled = async {
            match &self.token {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => {
                    tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await;
                }
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            () = cancelled => Error::Cancelled,
            () = expired => Error::DeadlineExceeded,
        }
    }
}
