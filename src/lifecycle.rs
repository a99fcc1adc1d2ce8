//! Session lifecycle signal and open options.
//!
//! A [`Lifecycle`] is a teardown signal: it is cancelled once, when the
//! owning [`Device`](crate::Device) is closed, and anyone holding a clone
//! can observe that. It does not interrupt a native call that is already
//! running. Lifecycles form a tree; cancelling a parent cancels every
//! child, never the reverse.

use tokio_util::sync::CancellationToken;

/// Cancellable signal tied to the life of an open device session.
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    token: CancellationToken,
}

impl Lifecycle {
    /// A fresh top-level lifecycle.
    pub fn new() -> Self {
        Self::default()
    }

    /// A child lifecycle that is cancelled when `self` is.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    /// Signal teardown to all observers. Repeated calls are no-ops.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether teardown has been signalled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once teardown has been signalled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// The underlying token, for use with `tokio::select!` and friends.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl From<CancellationToken> for Lifecycle {
    fn from(token: CancellationToken) -> Self {
        Self { token }
    }
}

/// Options for [`Device::open`](crate::Device::open).
///
/// Timeout, EOS and EOI configuration are not supported yet; the native
/// call is made with all three disabled.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Parent lifecycle to extend. `None` starts a fresh top-level one.
    pub base: Option<Lifecycle>,
}

impl Options {
    /// Extend `base` instead of starting a top-level lifecycle.
    pub fn with_base(mut self, base: Lifecycle) -> Self {
        self.base = Some(base);
        self
    }

    /// Derive the lifecycle for a newly opened device.
    pub(crate) fn lifecycle(&self) -> Lifecycle {
        match &self.base {
            Some(base) => base.child(),
            None => Lifecycle::new(),
        }
    }
}
