// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Command Manager
//!
//! [`CommandManager`] is the front door a platform adapter calls: it
//! owns the [`CommandTree`], the [`ParserRegistry`], the
//! [`ExceptionController`], the pre/postprocessor chains, and an
//! [`ExecutionCoordinator`], and stitches them into the two operations
//! a front-end actually needs — [`CommandManager::execute_command`]
//! and [`CommandManager::suggest`].

use std::sync::Arc;

use crate::context::{Context, SenderMapper};
use crate::coordinator::{ExecutionCoordinator, Promise};
use crate::error::CommandParseError;
use crate::exception::{ExceptionController, ExceptionKind};
use crate::input::CommandInput;
use crate::parser::ParserRegistry;
use crate::suggestion::Suggestion;
use crate::suggestion_factory::SuggestionFactory;
use crate::tree::CommandTree;
use crate::command::Command;

/// Whether a preprocessor or postprocessor lets the pipeline continue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Halt,
}

type StageHook<C> = Arc<dyn Fn(&mut Context<C>) -> Flow + Send + Sync>;
type Provider<C> = Arc<dyn Fn(&mut Context<C>) + Send + Sync>;

/// Owns the tree, registries, and coordinator for one command
/// namespace, and runs the preprocess → route → execute → postprocess
/// pipeline for every invocation.
pub struct CommandManager<C> {
    tree: CommandTree<C>,
    parsers: ParserRegistry<C>,
    // Arc'd (rather than a plain field) so `execute_command` can clone
    // a handle into the `'static` continuation it hands the
    // coordinator, instead of borrowing `self` for the life of a
    // possibly-async execution.
    exceptions: Arc<ExceptionController<C>>,
    coordinator: Box<dyn ExecutionCoordinator<C>>,
    preprocessors: Vec<StageHook<C>>,
    postprocessors: Vec<StageHook<C>>,
    providers: Vec<Provider<C>>,
}

impl<C: Send + Sync + Clone + 'static> CommandManager<C> {
    pub fn new(coordinator: impl ExecutionCoordinator<C> + 'static) -> Self {
        CommandManager {
            tree: CommandTree::new(),
            parsers: ParserRegistry::new(),
            exceptions: Arc::new(ExceptionController::new()),
            coordinator: Box::new(coordinator),
            preprocessors: Vec::new(),
            postprocessors: Vec::new(),
            providers: Vec::new(),
        }
    }

    /// Register `command` into the tree. Fails with the same errors
    /// [`CommandTree::register`] does (ambiguous path, non-monotonic
    /// required components, a non-terminal greedy component).
    pub fn register_command(&self, command: Command<C>) -> Result<(), CommandParseError> {
        self.tree.register(command)
    }

    /// Freeze the tree against further registration.
    pub fn lock_registration(&self) {
        self.tree.lock_registration();
    }

    /// Register a handler for a class of failure. See
    /// [`ExceptionController::register`] for fallthrough semantics.
    pub fn register_exception_handler(
        &mut self,
        kind: ExceptionKind,
        handler: impl Fn(&Context<C>, &CommandParseError) -> Result<(), CommandParseError> + Send + Sync + 'static,
    ) {
        // Registration only ever happens before the manager is shared
        // (typically still a sole owner behind a not-yet-cloned Arc),
        // so this mirrors `CommandTree`'s construction-time mutability.
        Arc::get_mut(&mut self.exceptions)
            .expect("register_exception_handler called after the manager was shared")
            .register(kind, handler);
    }

    /// Replace the catch-all sink used when no registered handler
    /// resolves an error. See the same restriction as
    /// [`CommandManager::register_exception_handler`].
    pub fn set_exception_sink(&mut self, sink: impl Fn(&Context<C>, &CommandParseError) -> Result<(), CommandParseError> + Send + Sync + 'static) {
        Arc::get_mut(&mut self.exceptions)
            .expect("set_exception_sink called after the manager was shared")
            .set_sink(sink);
    }

    /// Run `hook` against the context before routing begins. A hook
    /// returning [`Flow::Halt`] short-circuits the whole invocation
    /// with [`CommandParseError::NoPermission`] — the only structural
    /// error a pipeline stage outside of parsing is entitled to raise.
    pub fn register_preprocessor(&mut self, hook: impl Fn(&mut Context<C>) -> Flow + Send + Sync + 'static) {
        self.preprocessors.push(Arc::new(hook));
    }

    /// Run `hook` against the context after a successful handler
    /// invocation, before the outcome is returned to the caller.
    pub fn register_postprocessor(&mut self, hook: impl Fn(&mut Context<C>) -> Flow + Send + Sync + 'static) {
        self.postprocessors.push(Arc::new(hook));
    }

    pub fn parser_registry(&mut self) -> &mut ParserRegistry<C> {
        &mut self.parsers
    }

    /// Make `value` available to every future invocation's
    /// [`Context::inject`]. Registered providers run once per
    /// [`CommandManager::execute_command`] call, right after the
    /// [`Context`] is constructed and before preprocessors see it.
    pub fn register_provider<T: Clone + Send + Sync + 'static>(&mut self, value: T) {
        self.providers.push(Arc::new(move |ctx| ctx.provide(value.clone())));
    }

    fn run_hooks(hooks: &[StageHook<C>], ctx: &mut Context<C>) -> Result<(), CommandParseError> {
        for hook in hooks {
            if hook(ctx) == Flow::Halt {
                return Err(CommandParseError::NoPermission {
                    target: "preprocessor".to_string(),
                    missing: "<unspecified>".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Translate `raw` through `mapper`, route `line` through the
    /// tree, and run the matched command's handler via the configured
    /// coordinator. Every failure, structural or from the handler
    /// itself, is routed through the [`ExceptionController`] before
    /// being returned, matching the bullet in the external interface
    /// that execution failures are reported, not just propagated.
    pub fn execute_command<Raw>(
        &self,
        raw: Raw,
        line: impl Into<String>,
        mapper: &dyn SenderMapper<Raw, C>,
    ) -> Promise<Context<C>, CommandParseError> {
        let sender = mapper.map_to_domain(raw);
        let mut ctx = Context::new(sender);
        for provider in &self.providers {
            provider(&mut ctx);
        }
        let mut input = CommandInput::new(line.into());

        if let Err(error) = Self::run_hooks(&self.preprocessors, &mut ctx) {
            self.exceptions.handle(&ctx, error.clone());
            return Promise::ready(Err(error));
        }

        let command = match self.tree.route(&mut ctx, &mut input) {
            Ok(command) => command,
            Err(error) => {
                self.exceptions.handle(&ctx, error.clone());
                return Promise::ready(Err(error));
            }
        };

        // Kept so a handler failure can still be reported against the
        // sender that issued it, even though the `Context` the
        // handler ran with is consumed by the coordinator's future.
        let sender_for_error = ctx.sender().clone();
        let promise = self.coordinator.execute(command, ctx);

        // The coordinator's promise may resolve on another task, so
        // the continuation that post-processes and reports its result
        // must be `'static` — it captures owned/Arc'd handles instead
        // of borrowing `self`.
        let exceptions = self.exceptions.clone();
        let postprocessors = self.postprocessors.clone();
        Promise::from_future(async move {
            match promise.await_result().await {
                Ok(mut ctx) => {
                    if let Err(error) = Self::run_hooks(&postprocessors, &mut ctx) {
                        exceptions.handle(&ctx, error.clone());
                        return Err(error);
                    }
                    Ok(ctx)
                }
                Err(error) => {
                    let ctx = Context::new(sender_for_error);
                    exceptions.handle(&ctx, error.clone());
                    Err(error)
                }
            }
        })
    }

    /// Completion candidates for the partial `line`, deduplicated via
    /// [`SuggestionFactory`].
    pub fn suggest<Raw>(&self, raw: Raw, line: impl Into<String>, mapper: &dyn SenderMapper<Raw, C>) -> Vec<Suggestion> {
        let sender = mapper.map_to_domain(raw);
        let ctx = Context::new(sender);
        let input = CommandInput::new(line.into());
        SuggestionFactory::new(&self.tree).suggest(&ctx, &input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::SynchronousCoordinator;
    use crate::context::IdentitySenderMapper;

    fn manager() -> CommandManager<u64> {
        let manager = CommandManager::new(SynchronousCoordinator);
        manager
            .register_command(Command::new("ping", |_ctx| Ok(())))
            .unwrap();
        manager
    }

    #[test]
    fn execute_command_runs_a_registered_command() {
        let manager = manager();
        let mapper = IdentitySenderMapper;
        let result = futures::executor::block_on(manager.execute_command(1u64, "ping", &mapper).await_result());
        assert!(result.is_ok());
    }

    #[test]
    fn execute_command_reports_no_such_command_to_exception_controller() {
        let mut manager = manager();
        let reported = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = reported.clone();
        manager.register_exception_handler(ExceptionKind::NoSuchCommand, move |_ctx, err| {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
            Err(err.clone())
        });
        let mapper = IdentitySenderMapper;
        let result = futures::executor::block_on(manager.execute_command(1u64, "pong", &mapper).await_result());
        assert!(result.is_err());
        assert!(reported.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn halting_preprocessor_blocks_execution() {
        let mut manager = manager();
        manager.register_preprocessor(|_ctx| Flow::Halt);
        let mapper = IdentitySenderMapper;
        let result = futures::executor::block_on(manager.execute_command(1u64, "ping", &mapper).await_result());
        assert!(matches!(result, Err(CommandParseError::NoPermission { .. })));
    }

    #[test]
    fn postprocessor_runs_after_successful_execution() {
        let mut manager = manager();
        let ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = ran.clone();
        manager.register_postprocessor(move |_ctx| {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
            Flow::Continue
        });
        let mapper = IdentitySenderMapper;
        let result = futures::executor::block_on(manager.execute_command(1u64, "ping", &mapper).await_result());
        assert!(result.is_ok());
        assert!(ran.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[test]
    fn register_provider_makes_value_injectable_during_execution() {
        let mut manager = CommandManager::new(SynchronousCoordinator);
        let seen: Arc<std::sync::Mutex<Option<&'static str>>> = Arc::new(std::sync::Mutex::new(None));
        let captured = seen.clone();
        manager.register_provider("database-handle".to_string());
        manager
            .register_command(Command::new("status", move |ctx| {
                if ctx.inject::<String>().is_some() {
                    *captured.lock().unwrap() = Some("found");
                }
                Ok(())
            }))
            .unwrap();
        let mapper = IdentitySenderMapper;
        let result = futures::executor::block_on(manager.execute_command(1u64, "status", &mapper).await_result());
        assert!(result.is_ok());
        assert_eq!(*seen.lock().unwrap(), Some("found"));
    }

    #[test]
    fn suggest_returns_registered_command_names() {
        let manager = manager();
        let mapper = IdentitySenderMapper;
        let suggestions = manager.suggest(1u64, "pi", &mapper);
        assert!(suggestions.iter().any(|s| s.value == "ping"));
    }
}
