// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Commands
//!
//! A [`Command`] is a named, ordered sequence of components plus an
//! optional flag set, a permission, and a handler invoked once the
//! whole sequence has matched.

use std::fmt;
use std::sync::Arc;

use crate::component::ErasedComponent;
use crate::context::{Context, Permission};
use crate::error::CommandExecutionError;
use crate::flag::CommandFlagParser;

/// The outcome of running a command's handler.
pub type CommandOutcome = Result<(), CommandExecutionError>;

type Handler<C> = Arc<dyn Fn(&mut Context<C>) -> CommandOutcome + Send + Sync>;

/// A fully described command: its component sequence, the flags it
/// admits, the permission required to run it, and the handler that
/// runs once every component has matched.
pub struct Command<C> {
    name: String,
    aliases: Vec<String>,
    description: Option<String>,
    components: Vec<Arc<dyn ErasedComponent<C>>>,
    flags: Option<Arc<CommandFlagParser<C>>>,
    permission: Permission<C>,
    handler: Handler<C>,
}

impl<C> fmt::Debug for Command<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl<C: Send + Sync + 'static> Command<C> {
    pub fn new(name: impl Into<String>, handler: impl Fn(&mut Context<C>) -> CommandOutcome + Send + Sync + 'static) -> Self {
        Command {
            name: name.into(),
            aliases: Vec::new(),
            description: None,
            components: Vec::new(),
            flags: None,
            permission: Permission::none(),
            handler: Arc::new(handler),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn component(mut self, component: impl ErasedComponent<C> + 'static) -> Self {
        self.components.push(Arc::new(component));
        self
    }

    pub fn flags(mut self, flags: CommandFlagParser<C>) -> Self {
        self.flags = Some(Arc::new(flags));
        self
    }

    pub fn with_permission(mut self, permission: Permission<C>) -> Self {
        self.permission = permission;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn components(&self) -> &[Arc<dyn ErasedComponent<C>>] {
        &self.components
    }

    pub fn flag_parser(&self) -> Option<&Arc<CommandFlagParser<C>>> {
        self.flags.as_ref()
    }

    pub fn permission(&self) -> &Permission<C> {
        &self.permission
    }

    /// Checked by [`crate::tree::CommandTree`] at registration: once an
    /// optional component appears in the sequence, no required
    /// component may follow it.
    pub fn is_required_monotonic(&self) -> bool {
        let mut seen_optional = false;
        for component in &self.components {
            if component.is_required() {
                if seen_optional {
                    return false;
                }
            } else {
                seen_optional = true;
            }
        }
        true
    }

    /// True if any component before the last is greedy — invalid,
    /// since a greedy component consumes everything after it.
    pub fn has_non_terminal_greedy(&self) -> bool {
        let last = self.components.len().saturating_sub(1);
        self.components
            .iter()
            .enumerate()
            .any(|(i, c)| c.is_greedy() && i != last)
    }

    pub fn invoke(&self, ctx: &mut Context<C>) -> CommandOutcome {
        (self.handler)(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::TypedComponent;
    use crate::parser::standard::IntParser;

    #[test]
    fn required_after_optional_is_rejected() {
        let command = Command::<()>::new("cmd", |_| Ok(()))
            .component(TypedComponent::<(), i32>::new("a", IntParser::new(0, 10)).optional())
            .component(TypedComponent::<(), i32>::new("b", IntParser::new(0, 10)));
        assert!(!command.is_required_monotonic());
    }

    #[test]
    fn all_required_is_monotonic() {
        let command = Command::<()>::new("cmd", |_| Ok(()))
            .component(TypedComponent::<(), i32>::new("a", IntParser::new(0, 10)))
            .component(TypedComponent::<(), i32>::new("b", IntParser::new(0, 10)));
        assert!(command.is_required_monotonic());
    }

    #[test]
    fn handler_runs_and_returns_outcome() {
        let command = Command::<()>::new("ping", |_ctx| Ok(()));
        let mut ctx = Context::new(());
        assert!(command.invoke(&mut ctx).is_ok());
    }
}
