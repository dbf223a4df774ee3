// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Execution Coordination
//!
//! An [`ExecutionCoordinator`] decides how a matched [`Command`]'s
//! handler actually runs: synchronously on the calling task, or
//! scheduled onto an async executor via a [`Promise`]. Front-ends pick
//! a strategy once, at [`crate::manager::CommandManager`] construction.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::command::Command;
use crate::context::Context;
use crate::error::CommandParseError;

/// A boxed, `'static` future resolving to a `Result<T, E>` — the
/// crate's uniform "eventually a result" type, used instead of
/// depending on any one async runtime's task handle.
pub struct Promise<T, E> {
    inner: BoxFuture<'static, Result<T, E>>,
}

impl<T: Send + 'static, E: Send + 'static> Promise<T, E> {
    pub fn ready(value: Result<T, E>) -> Self {
        Promise {
            inner: Box::pin(async move { value }),
        }
    }

    pub fn from_future(future: impl std::future::Future<Output = Result<T, E>> + Send + 'static) -> Self {
        Promise { inner: future.boxed() }
    }

    pub async fn await_result(self) -> Result<T, E> {
        self.inner.await
    }
}

/// Runs a matched command's handler, synchronously or by scheduling
/// it. Implementations decide what "scheduling" means for their
/// front-end (a `tokio::spawn`, a thread-pool submission, …); the
/// crate only needs the promise it returns to eventually resolve.
/// `command` arrives as an `Arc` (the same one `CommandTree::route`
/// hands back) so an asynchronous coordinator can move it into a
/// `'static` spawned future without cloning the tree.
pub trait ExecutionCoordinator<C>: Send + Sync {
    fn execute(&self, command: Arc<Command<C>>, ctx: Context<C>) -> Promise<Context<C>, CommandParseError>;
}

/// Runs the handler inline and returns an already-resolved promise.
/// The simplest strategy, appropriate for a synchronous terminal REPL
/// where nothing else is happening concurrently.
pub struct SynchronousCoordinator;

impl<C: Send + Sync + 'static> ExecutionCoordinator<C> for SynchronousCoordinator {
    fn execute(&self, command: Arc<Command<C>>, mut ctx: Context<C>) -> Promise<Context<C>, CommandParseError> {
        let result = command.invoke(&mut ctx).map_err(|cause| CommandParseError::CommandExecution { cause });
        Promise::ready(result.map(|()| ctx))
    }
}

/// Runs the handler inside the future returned by `spawn`, so a
/// slow handler doesn't block whatever is driving command dispatch.
/// `spawn` is supplied by the front-end (e.g. `tokio::spawn` wrapped
/// to match this signature) so the crate itself depends on no one
/// async runtime.
pub struct AsynchronousCoordinator<S> {
    spawn: S,
}

impl<S> AsynchronousCoordinator<S> {
    pub fn new(spawn: S) -> Self {
        AsynchronousCoordinator { spawn }
    }
}

impl<C, S, F> ExecutionCoordinator<C> for AsynchronousCoordinator<S>
where
    C: Send + Sync + 'static,
    S: Fn(BoxFuture<'static, Result<Context<C>, CommandParseError>>) -> F + Send + Sync,
    F: std::future::Future<Output = Result<Context<C>, CommandParseError>> + Send + 'static,
{
    fn execute(&self, command: Arc<Command<C>>, mut ctx: Context<C>) -> Promise<Context<C>, CommandParseError> {
        let future: BoxFuture<'static, Result<Context<C>, CommandParseError>> = Box::pin(async move {
            let result = command.invoke(&mut ctx).map_err(|cause| CommandParseError::CommandExecution { cause });
            result.map(|()| ctx)
        });
        Promise::from_future((self.spawn)(future))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synchronous_coordinator_runs_inline() {
        let coordinator = SynchronousCoordinator;
        let command = Arc::new(Command::<()>::new("ping", |_| Ok(())));
        let ctx = Context::new(());
        let promise = coordinator.execute(command, ctx);
        let result = futures::executor::block_on(promise.await_result());
        assert!(result.is_ok());
    }

    #[test]
    fn asynchronous_coordinator_runs_via_supplied_spawn() {
        let coordinator = AsynchronousCoordinator::new(|future: BoxFuture<'static, Result<Context<()>, CommandParseError>>| future);
        let command = Arc::new(Command::<()>::new("ping", |_| Ok(())));
        let ctx = Context::new(());
        let promise = coordinator.execute(command, ctx);
        let result = futures::executor::block_on(promise.await_result());
        assert!(result.is_ok());
    }
}
