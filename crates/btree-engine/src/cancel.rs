//! Cooperative cancellation signal.

use tokio_util::sync::CancellationToken;

/// A shareable cancellation flag.
///
/// Clones observe the same flag. A token made with [`CancelToken::child`]
/// reports cancelled when either itself or any ancestor token has been
/// cancelled, so cancelling a parallel child never touches its siblings while
/// cancelling the run still reaches every child.
///
/// The engine only reads the flag at its checkpoints; setting it is up to the
/// caller, possibly from another thread. No async runtime is involved.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: CancellationToken,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a token linked to this one.
    pub fn child(&self) -> Self {
        Self {
            inner: self.inner.child_token(),
        }
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    /// The underlying token, for callers that also await cancellation.
    pub fn as_cancellation_token(&self) -> &CancellationToken {
        &self.inner
    }
}

impl From<CancellationToken> for CancelToken {
    fn from(inner: CancellationToken) -> Self {
        Self { inner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn child_sees_parent_but_not_the_reverse() {
        let parent = CancelToken::new();
        let child = parent.child();
        let sibling = parent.child();

        child.cancel();
        assert!(child.is_cancelled());
        assert!(!sibling.is_cancelled());
        assert!(!parent.is_cancelled());

        parent.cancel();
        assert!(sibling.is_cancelled());
    }

    #[test]
    fn grandchildren_follow_a_cancelled_ancestor() {
        let external = CancellationToken::new();
        let run = CancelToken::from(external.clone());
        let grandchild = run.child().child();

        external.cancel();
        assert!(grandchild.is_cancelled());
        assert!(run.as_cancellation_token().is_cancelled());
    }
}
