// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Components
//!
//! A [`Command`](crate::command::Command) is an ordered sequence of
//! components. [`ErasedComponent`] is the object-safe view every
//! component exposes so a [`crate::tree::CommandTree`] can hold
//! components of differing value types `T` in one node list.

use std::sync::Arc;

use crate::context::{Context, Permission};
use crate::error::ArgumentParseError;
use crate::input::CommandInput;
use crate::parse_result::ParseResult;
use crate::parser::standard::LiteralParser;
use crate::parser::ArgumentParser;
use crate::suggestion::Suggestion;
use crate::typed_map::TypedKey;

/// Object-safe façade over a [`TypedComponent`] or [`LiteralComponent`],
/// letting a tree node hold heterogeneous components.
pub trait ErasedComponent<C>: Send + Sync {
    /// The declared name, used for ambiguity checks and `describe()`
    /// output. For a literal, this is also the only string it matches.
    fn name(&self) -> &str;

    /// True for components produced by [`LiteralComponent`] — matched
    /// by exact text rather than delegated to a value parser.
    fn is_literal(&self) -> bool;

    /// True if this component's underlying parser consumes the rest
    /// of the input unconditionally (a greedy string, for example).
    fn is_greedy(&self) -> bool;

    fn is_required(&self) -> bool;

    fn permission(&self) -> &Permission<C>;

    /// Attempt to consume this component's value(s) from `input`,
    /// binding the parsed value into `ctx` under this component's key
    /// if successful.
    fn try_parse(&self, ctx: &mut Context<C>, input: &mut CommandInput) -> ParseResult<(), ArgumentParseError>;

    fn suggestions(&self, ctx: &Context<C>, input: &CommandInput) -> Vec<Suggestion>;
}

/// A positional component backed by an [`ArgumentParser<C, T>`]. The
/// parsed value is stored into the invocation [`Context`] under
/// `key`, so a handler reads it back with `ctx.get(key)`.
pub struct TypedComponent<C, T> {
    name: String,
    key: TypedKey<T>,
    parser: Arc<dyn ArgumentParser<C, T>>,
    required: bool,
    greedy: bool,
    permission: Permission<C>,
}

impl<C: Send + Sync + 'static, T: Send + Sync + Clone + 'static> TypedComponent<C, T> {
    pub fn new(name: &'static str, parser: impl ArgumentParser<C, T> + 'static) -> Self {
        TypedComponent {
            name: name.to_string(),
            key: TypedKey::new(name),
            parser: Arc::new(parser),
            required: true,
            greedy: false,
            permission: Permission::none(),
        }
    }

    pub fn key(&self) -> TypedKey<T> {
        self.key
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Mark this component as consuming the remainder of the line.
    /// Only valid as a command's last component — enforced when the
    /// command is registered into a tree.
    pub fn greedy(mut self) -> Self {
        self.greedy = true;
        self
    }

    pub fn permission(mut self, permission: Permission<C>) -> Self {
        self.permission = permission;
        self
    }
}

impl<C, T> ErasedComponent<C> for TypedComponent<C, T>
where
    C: Send + Sync,
    T: Send + Sync + Clone + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn is_literal(&self) -> bool {
        false
    }

    fn is_greedy(&self) -> bool {
        self.greedy
    }

    fn is_required(&self) -> bool {
        self.required
    }

    fn permission(&self) -> &Permission<C> {
        &self.permission
    }

    fn try_parse(&self, ctx: &mut Context<C>, input: &mut CommandInput) -> ParseResult<(), ArgumentParseError> {
        input.skip_whitespace_unbounded();
        match self.parser.parse(ctx, input) {
            ParseResult::Success(value) => {
                ctx.set(self.key, value);
                ParseResult::success(())
            }
            ParseResult::Failure(cause) => ParseResult::failure(cause),
        }
    }

    fn suggestions(&self, ctx: &Context<C>, input: &CommandInput) -> Vec<Suggestion> {
        self.parser.suggestions(ctx, input)
    }
}

/// A component matched by exact (case-insensitive) text: a command's
/// own name, a literal subcommand keyword, or an enum-like fixed
/// branch. Never binds a value into the context — its presence on a
/// matched path is the information.
pub struct LiteralComponent<C> {
    parser: LiteralParser,
    permission: Permission<C>,
}

impl<C> LiteralComponent<C> {
    pub fn new(name: impl Into<String>) -> Self {
        LiteralComponent {
            parser: LiteralParser::new(name, Vec::new()),
            permission: Permission::none(),
        }
    }

    pub fn with_aliases(name: impl Into<String>, aliases: Vec<String>) -> Self {
        LiteralComponent {
            parser: LiteralParser::new(name, aliases),
            permission: Permission::none(),
        }
    }

    pub fn permission(mut self, permission: Permission<C>) -> Self {
        self.permission = permission;
        self
    }

    pub fn canonical(&self) -> &str {
        self.parser.canonical()
    }

    pub fn matches(&self, token: &str) -> bool {
        self.parser.matches(token)
    }
}

impl<C: Send + Sync> ErasedComponent<C> for LiteralComponent<C> {
    fn name(&self) -> &str {
        self.parser.canonical()
    }

    fn is_literal(&self) -> bool {
        true
    }

    fn is_greedy(&self) -> bool {
        false
    }

    fn is_required(&self) -> bool {
        true
    }

    fn permission(&self) -> &Permission<C> {
        &self.permission
    }

    fn try_parse(&self, ctx: &mut Context<C>, input: &mut CommandInput) -> ParseResult<(), ArgumentParseError> {
        input.skip_whitespace_unbounded();
        self.parser.parse(ctx, input).map(|_| ())
    }

    fn suggestions(&self, ctx: &Context<C>, input: &CommandInput) -> Vec<Suggestion> {
        self.parser.suggestions(ctx, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::standard::IntParser;

    #[test]
    fn typed_component_binds_parsed_value_into_context() {
        let component = TypedComponent::<(), i32>::new("amount", IntParser::new(0, 100));
        let key = component.key();
        let mut ctx = Context::new(());
        let mut input = CommandInput::new("42");
        assert!(component.try_parse(&mut ctx, &mut input).is_success());
        assert_eq!(ctx.get(key), Some(&42));
    }

    #[test]
    fn literal_component_matches_alias() {
        let component = LiteralComponent::<()>::with_aliases("teleport", vec!["tp".to_string()]);
        assert!(component.matches("tp"));
        assert!(component.matches("TELEPORT"));
        assert!(!component.matches("warp"));
    }
}
