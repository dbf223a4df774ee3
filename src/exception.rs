// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Exception Handling
//!
//! [`ExceptionController`] maps a [`CommandParseError`] to whichever
//! handler was registered for its kind, falling through to the next
//! most specific handler (and finally a catch-all sink) if a handler
//! declines by returning `Err` itself.

use std::sync::Arc;

use crate::context::Context;
use crate::error::CommandParseError;

/// Discriminates [`CommandParseError`] variants without borrowing the
/// payload, so handlers can be registered per kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    InvalidSyntax,
    NoSuchCommand,
    NoPermission,
    InvalidSender,
    ArgumentParse,
    FlagParse,
    CommandExecution,
    Internal,
}

impl ExceptionKind {
    pub fn of(error: &CommandParseError) -> Self {
        match error {
            CommandParseError::InvalidSyntax { .. } => ExceptionKind::InvalidSyntax,
            CommandParseError::NoSuchCommand { .. } => ExceptionKind::NoSuchCommand,
            CommandParseError::NoPermission { .. } => ExceptionKind::NoPermission,
            CommandParseError::InvalidSender { .. } => ExceptionKind::InvalidSender,
            CommandParseError::ArgumentParse { .. } => ExceptionKind::ArgumentParse,
            CommandParseError::FlagParse { .. } => ExceptionKind::FlagParse,
            CommandParseError::CommandExecution { .. } => ExceptionKind::CommandExecution,
            CommandParseError::Internal => ExceptionKind::Internal,
        }
    }
}

type Handler<C> = Arc<dyn Fn(&Context<C>, &CommandParseError) -> Result<(), CommandParseError> + Send + Sync>;

/// A prioritized chain of per-kind handlers plus one fallback sink.
/// Handlers are tried most-recently-registered-first for their kind;
/// a handler "declines" by returning the error back (possibly
/// unchanged, possibly rewritten) so the next handler in the chain —
/// or eventually the sink — gets a turn.
pub struct ExceptionController<C> {
    handlers: std::collections::HashMap<ExceptionKind, Vec<Handler<C>>>,
    sink: Handler<C>,
}

impl<C: Send + Sync + 'static> Default for ExceptionController<C> {
    fn default() -> Self {
        ExceptionController {
            handlers: std::collections::HashMap::new(),
            sink: Arc::new(|_ctx, error| {
                tracing::warn!(error = %error, caption = error.caption_key(), "unhandled command error");
                Ok(())
            }),
        }
    }
}

impl<C: Send + Sync + 'static> ExceptionController<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `kind`. Handlers registered later run
    /// first, so a front-end can layer a specific override on top of
    /// a broader default registered at startup.
    pub fn register(&mut self, kind: ExceptionKind, handler: impl Fn(&Context<C>, &CommandParseError) -> Result<(), CommandParseError> + Send + Sync + 'static) {
        self.handlers.entry(kind).or_default().push(Arc::new(handler));
    }

    /// Replace the catch-all sink run when no registered handler
    /// resolves the error.
    pub fn set_sink(&mut self, sink: impl Fn(&Context<C>, &CommandParseError) -> Result<(), CommandParseError> + Send + Sync + 'static) {
        self.sink = Arc::new(sink);
    }

    /// Dispatch `error` through the chain for its kind, then the sink
    /// if nothing resolved it.
    pub fn handle(&self, ctx: &Context<C>, error: CommandParseError) {
        let kind = ExceptionKind::of(&error);
        let mut current = error;
        if let Some(chain) = self.handlers.get(&kind) {
            for handler in chain.iter().rev() {
                match handler(ctx, &current) {
                    Ok(()) => return,
                    Err(rewritten) => current = rewritten,
                }
            }
        }
        let _ = (self.sink)(ctx, &current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_for_matching_kind_short_circuits_sink() {
        let mut controller: ExceptionController<()> = ExceptionController::new();
        let handled = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = handled.clone();
        controller.register(ExceptionKind::NoSuchCommand, move |_ctx, _err| {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        });
        let ctx = Context::new(());
        controller.handle(&ctx, CommandParseError::NoSuchCommand { input: "x".into() });
        assert!(handled.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn declining_handler_falls_through_to_sink() {
        let mut controller: ExceptionController<()> = ExceptionController::new();
        controller.register(ExceptionKind::NoSuchCommand, |_ctx, err| Err(err.clone()));
        let sink_ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = sink_ran.clone();
        controller.set_sink(move |_ctx, _err| {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        });
        let ctx = Context::new(());
        controller.handle(&ctx, CommandParseError::NoSuchCommand { input: "x".into() });
        assert!(sink_ran.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn unregistered_kind_goes_straight_to_sink() {
        let controller: ExceptionController<()> = ExceptionController::new();
        let ctx = Context::new(());
        // Default sink only logs; this just verifies no panic occurs.
        controller.handle(&ctx, CommandParseError::Internal);
    }
}
