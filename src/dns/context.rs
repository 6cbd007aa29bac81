use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::DnsError;

/// Cancellation and deadline for the DNS lookups of one check invocation.
///
/// The caller owns the timeout policy. A context without a deadline waits
/// for the resolver as long as it takes.
#[derive(Debug, Clone, Default)]
pub struct LookupContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl LookupContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Runs `lookup` until it completes, the context is cancelled or the
    /// deadline passes, whichever comes first.
    pub async fn run<T, F>(&self, lookup: F) -> Result<T, DnsError>
    where
        F: Future<Output = Result<T, DnsError>>,
    {
        if self.cancel.is_cancelled() {
            return Err(DnsError::Cancelled);
        }

        let guarded = async {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(DnsError::Cancelled),
                res = lookup => res,
            }
        };

        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, guarded)
                .await
                .unwrap_or(Err(DnsError::DeadlineExceeded)),
            None => guarded.await,
        }
    }
}
