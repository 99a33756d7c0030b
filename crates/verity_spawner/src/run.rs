//! Asynchronous handles over launched validation runs.

use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use verity_core::{ModuleRoot, ValidationError, ValidationResult};

/// Single-resolution handle over one launched replay, tagged with its
/// module root.
///
/// Resolution happens exactly once: [`wait`] consumes the pending
/// result. Waiting a second time, or waiting after [`cancel`], returns
/// [`ValidationError::Cancelled`] rather than hanging.
///
/// [`wait`]: ValidationRun::wait
/// [`cancel`]: ValidationRun::cancel
#[derive(Debug)]
pub struct ValidationRun {
    module_root: ModuleRoot,
    token: CancellationToken,
    result: Option<oneshot::Receiver<ValidationResult>>,
}

impl ValidationRun {
    pub(crate) fn new(
        module_root: ModuleRoot,
        token: CancellationToken,
        result: oneshot::Receiver<ValidationResult>,
    ) -> Self {
        Self {
            module_root,
            token,
            result: Some(result),
        }
    }

    /// A handle that is already resolved as cancelled, for launches the
    /// spawner could not schedule
    pub(crate) fn resolved_cancelled(module_root: ModuleRoot) -> Self {
        let token = CancellationToken::new();
        token.cancel();
        Self {
            module_root,
            token,
            result: None,
        }
    }

    /// The module root this run validates against
    #[must_use]
    pub fn module_root(&self) -> ModuleRoot {
        self.module_root
    }

    /// Ask the backing execution to stop at its next suspension point.
    /// Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether cancellation has been requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait for the run to resolve.
    ///
    /// # Errors
    ///
    /// Returns the run's error outcome, or `Cancelled` when waiting
    /// again, waiting after cancellation, or when shutdown dropped the
    /// run before it resolved
    pub async fn wait(&mut self) -> ValidationResult {
        match self.result.take() {
            Some(receiver) => match receiver.await {
                Ok(result) => result,
                // producer dropped without resolving: shutdown raced the run
                Err(_) => Err(ValidationError::Cancelled),
            },
            None => Err(ValidationError::Cancelled),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verity_core::{Bytes32, GlobalState};

    fn make_run() -> (ValidationRun, oneshot::Sender<ValidationResult>) {
        let (tx, rx) = oneshot::channel();
        let run = ValidationRun::new(Bytes32::compute(b"root"), CancellationToken::new(), rx);
        (run, tx)
    }

    #[tokio::test]
    async fn test_wait_resolves_sent_result() {
        let (mut run, tx) = make_run();
        let state = GlobalState::default();
        tx.send(Ok(state)).unwrap();
        assert_eq!(run.wait().await, Ok(state));
    }

    #[tokio::test]
    async fn test_second_wait_returns_cancelled() {
        let (mut run, tx) = make_run();
        tx.send(Ok(GlobalState::default())).unwrap();
        run.wait().await.unwrap();
        assert_eq!(run.wait().await, Err(ValidationError::Cancelled));
    }

    #[tokio::test]
    async fn test_dropped_producer_resolves_cancelled() {
        let (mut run, tx) = make_run();
        drop(tx);
        assert_eq!(run.wait().await, Err(ValidationError::Cancelled));
    }

    #[tokio::test]
    async fn test_resolved_cancelled() {
        let root = Bytes32::compute(b"root");
        let mut run = ValidationRun::resolved_cancelled(root);
        assert_eq!(run.module_root(), root);
        assert!(run.is_cancelled());
        assert_eq!(run.wait().await, Err(ValidationError::Cancelled));
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let (run, _tx) = make_run();
        assert!(!run.is_cancelled());
        run.cancel();
        run.cancel();
        assert!(run.is_cancelled());
    }
}
