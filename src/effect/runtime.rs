use futures::future::BoxFuture;
use tracing::warn;

use super::Effects;

/// Task-based adapter: deferred releases are spawned onto the current tokio
/// runtime, so a cancelled scope never blocks the canceller.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioEffects;

impl Effects for TokioEffects {
    fn defer(&self, cleanup: BoxFuture<'static, ()>) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(cleanup);
            }
            Err(_) => warn!("no tokio runtime available; deferred release skipped"),
        }
    }
}

/// Blocking adapter: deferred releases are driven to completion in place,
/// before control returns to the canceller. Suits callers running the layer
/// under a synchronous executor.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlockingEffects;

impl Effects for BlockingEffects {
    fn defer(&self, cleanup: BoxFuture<'static, ()>) {
        futures::executor::block_on(cleanup);
    }
}
