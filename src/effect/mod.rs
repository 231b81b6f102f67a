//! Runtime capability contract: scoped acquisition with a three-way exit
//! signal.
//!
//! Sequencing of effectful steps and short-circuiting error propagation are
//! supplied by `async`/`.await` and `Result`/`?`. What a concrete runtime
//! must add is the ability to run a release action on *every* exit path of a
//! guarded block, including the one where the owning future is dropped
//! mid-flight. [`ReleaseGuard`] carries the resource together with its
//! release action, [`ExitCase`] tells the action how the scope ended, and
//! the [`Effects`] trait abstracts where a release runs when the scope is
//! already being torn down. [`TokioEffects`] and [`BlockingEffects`] are the
//! two conforming adapters.

mod runtime;

pub use runtime::{BlockingEffects, TokioEffects};

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::warn;

use crate::error::ScopedDbError;

/// How a guarded scope terminated. Passed to every release action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCase {
    /// The guarded block ran to completion.
    Completed,
    /// The guarded block returned an error.
    Errored,
    /// The owning future was dropped before the guarded block finished.
    Cancelled,
}

/// Dispatch capability for release actions that must run after their scope
/// is already being torn down (the [`ExitCase::Cancelled`] path).
///
/// This is the seam a concrete runtime plugs into: [`TokioEffects`] spawns
/// the cleanup onto the current runtime, [`BlockingEffects`] drives it to
/// completion in place.
pub trait Effects: Send + Sync {
    /// Run `cleanup` to completion, somewhere.
    fn defer(&self, cleanup: BoxFuture<'static, ()>);
}

type Release<R> =
    Box<dyn FnOnce(R, ExitCase) -> BoxFuture<'static, Result<(), ScopedDbError>> + Send>;

/// Owns a resource together with its release action and guarantees the
/// action runs exactly once, tagged with how the scope exited.
///
/// Call [`release`](Self::release) on the normal and error paths; if the
/// guard is instead dropped (the owning future was cancelled), the release
/// action is handed to the [`Effects`] capability tagged
/// [`ExitCase::Cancelled`].
pub struct ReleaseGuard<R: Send + 'static> {
    resource: Option<R>,
    release: Option<Release<R>>,
    effects: Arc<dyn Effects>,
}

impl<R: Send + 'static> ReleaseGuard<R> {
    pub fn new<F, Fut>(resource: R, effects: Arc<dyn Effects>, release: F) -> Self
    where
        F: FnOnce(R, ExitCase) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), ScopedDbError>> + Send + 'static,
    {
        let release: Release<R> = Box::new(move |resource, exit| Box::pin(release(resource, exit)));
        Self {
            resource: Some(resource),
            release: Some(release),
            effects,
        }
    }

    /// The guarded resource. Vacated only by [`release`](Self::release),
    /// which consumes the guard.
    pub fn get_mut(&mut self) -> &mut R {
        self.resource
            .as_mut()
            .expect("resource accessed after release")
    }

    /// Run the release action now, tagged with `exit`.
    pub async fn release(mut self, exit: ExitCase) -> Result<(), ScopedDbError> {
        match (self.resource.take(), self.release.take()) {
            (Some(resource), Some(release)) => release(resource, exit).await,
            _ => Ok(()),
        }
    }
}

impl<R: Send + 'static> Drop for ReleaseGuard<R> {
    fn drop(&mut self) {
        if let (Some(resource), Some(release)) = (self.resource.take(), self.release.take()) {
            self.effects.defer(Box::pin(async move {
                if let Err(err) = release(resource, ExitCase::Cancelled).await {
                    warn!(error = %err, "release action failed during cancellation");
                }
            }));
        }
    }
}

/// Resolve a guarded block: release with the matching exit case and apply
/// the error-precedence policy. The block's failure wins; a release failure
/// is surfaced only when the block succeeded, and logged otherwise.
pub async fn settle<R, T>(
    guard: ReleaseGuard<R>,
    outcome: Result<T, ScopedDbError>,
) -> Result<T, ScopedDbError>
where
    R: Send + 'static,
{
    match outcome {
        Ok(value) => {
            guard.release(ExitCase::Completed).await?;
            Ok(value)
        }
        Err(primary) => {
            if let Err(cleanup) = guard.release(ExitCase::Errored).await {
                warn!(error = %cleanup, "release failed while handling an earlier error");
            }
            Err(primary)
        }
    }
}
