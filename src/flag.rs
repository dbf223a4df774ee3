// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Flags
//!
//! `--name` / `-x` style named options, admitted at a single point in
//! a command's component sequence via [`CommandFlagParser`]. This is
//! the subtlest state machine in the crate: long form,
//! short form, combined presence-only short forms, and the handoff
//! back to positional parsing when a token isn't flag-shaped at all.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::context::{Context, Permission};
use crate::error::{ArgumentParseError, CommandParseError, FlagParseReason};
use crate::input::CommandInput;
use crate::parse_result::ParseResult;
use crate::parser::ArgumentParser;
use crate::suggestion::Suggestion;

/// Whether a flag may appear once or may be repeated across a single
/// invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlagMode {
    Single,
    Repeatable,
}

/// A value collected from a flag, erased so [`FlagStore`] can hold
/// flags of differing inner types in one map.
#[derive(Clone)]
struct FlagValue {
    type_id: TypeId,
    single: Option<Arc<dyn Any + Send + Sync>>,
    repeated: Vec<Arc<dyn Any + Send + Sync>>,
}

/// The flags collected during one invocation. Lives inside a
/// [`Context`] and is populated by [`CommandFlagParser::parse`].
#[derive(Default, Clone)]
pub struct FlagStore {
    presence: HashMap<String, ()>,
    repeated_presence: HashMap<String, ()>,
    values: HashMap<String, FlagValue>,
}

impl FlagStore {
    pub fn add_presence_flag(&mut self, name: &str) {
        self.presence.insert(name.to_string(), ());
    }

    pub fn has_presence_flag(&self, name: &str) -> bool {
        self.presence.contains_key(name)
    }

    pub fn add_value_flag<T: Send + Sync + 'static>(&mut self, name: &str, value: T, mode: FlagMode) {
        let entry = self.values.entry(name.to_string()).or_insert_with(|| FlagValue {
            type_id: TypeId::of::<T>(),
            single: None,
            repeated: Vec::new(),
        });
        let boxed: Arc<dyn Any + Send + Sync> = Arc::new(value);
        match mode {
            FlagMode::Single => entry.single = Some(boxed),
            FlagMode::Repeatable => entry.repeated.push(boxed),
        }
    }

    /// The latest (or only) value bound to a value flag.
    pub fn get<T: 'static>(&self, name: &str) -> Option<&T> {
        self.values
            .get(name)
            .and_then(|v| v.single.as_deref().or_else(|| v.repeated.last().map(|a| a.as_ref())))
            .and_then(|any| any.downcast_ref::<T>())
    }

    /// All values bound to a repeatable value flag, in the order
    /// given.
    pub fn get_all<T: 'static>(&self, name: &str) -> Vec<&T> {
        self.values
            .get(name)
            .map(|v| {
                v.repeated
                    .iter()
                    .filter_map(|any| any.downcast_ref::<T>())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// True if this flag (presence or value) was seen at all.
    pub fn contains(&self, name: &str) -> bool {
        self.presence.contains_key(name) || self.values.contains_key(name)
    }
}

/// Object-safe view over a [`CommandFlag`], so a [`CommandFlagParser`]
/// can hold flags whose inner parsers produce different types in one
/// collection.
pub trait ErasedFlag<C>: Send + Sync {
    fn name(&self) -> &str;
    fn aliases(&self) -> &[char];
    fn mode(&self) -> FlagMode;
    fn is_presence(&self) -> bool;
    fn permission(&self) -> &Permission<C>;
    fn description(&self) -> Option<&str>;

    /// Parse this flag's inner value (value flags only) and record it
    /// into `store`. Presence flags never call this.
    fn parse_value(
        &self,
        ctx: &Context<C>,
        input: &mut CommandInput,
        store: &mut FlagStore,
    ) -> ParseResult<(), ArgumentParseError>;

    fn suggest_value(&self, ctx: &Context<C>, input: &CommandInput) -> Vec<Suggestion>;
}

/// A named optional parameter: `--name` / `-x`. Presence flags
/// (`inner: None`) simply record that they were seen; value flags
/// delegate to an [`ArgumentParser`] for the token(s) following the
/// flag name.
pub struct CommandFlag<C, T> {
    name: String,
    aliases: Vec<char>,
    description: Option<String>,
    permission: Permission<C>,
    inner: Option<Arc<dyn ArgumentParser<C, T>>>,
    mode: FlagMode,
}

impl<C, T: Send + Sync + 'static> CommandFlag<C, T> {
    /// A presence-only flag (`T` is unused for these and typically
    /// instantiated as `()`).
    pub fn presence(name: impl Into<String>) -> CommandFlag<C, ()> {
        CommandFlag {
            name: name.into(),
            aliases: Vec::new(),
            description: None,
            permission: Permission::none(),
            inner: None,
            mode: FlagMode::Single,
        }
    }

    /// A value flag whose inner token(s) are parsed by `parser`.
    pub fn value(name: impl Into<String>, parser: impl ArgumentParser<C, T> + 'static) -> Self {
        CommandFlag {
            name: name.into(),
            aliases: Vec::new(),
            description: None,
            permission: Permission::none(),
            inner: Some(Arc::new(parser)),
            mode: FlagMode::Single,
        }
    }

    pub fn alias(mut self, alias: char) -> Self {
        self.aliases.push(alias.to_ascii_lowercase());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn permission(mut self, permission: Permission<C>) -> Self {
        self.permission = permission;
        self
    }

    pub fn repeatable(mut self) -> Self {
        self.mode = FlagMode::Repeatable;
        self
    }
}

impl<C: Send + Sync, T: Send + Sync + 'static> ErasedFlag<C> for CommandFlag<C, T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn aliases(&self) -> &[char] {
        &self.aliases
    }

    fn mode(&self) -> FlagMode {
        self.mode
    }

    fn is_presence(&self) -> bool {
        self.inner.is_none()
    }

    fn permission(&self) -> &Permission<C> {
        &self.permission
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn parse_value(
        &self,
        ctx: &Context<C>,
        input: &mut CommandInput,
        store: &mut FlagStore,
    ) -> ParseResult<(), ArgumentParseError> {
        let Some(parser) = &self.inner else {
            return ParseResult::success(());
        };
        match parser.parse(ctx, input) {
            ParseResult::Success(value) => {
                store.add_value_flag(&self.name, value, self.mode);
                ParseResult::success(())
            }
            ParseResult::Failure(e) => ParseResult::failure(e),
        }
    }

    fn suggest_value(&self, ctx: &Context<C>, input: &CommandInput) -> Vec<Suggestion> {
        match &self.inner {
            Some(parser) => parser.suggestions(ctx, input),
            None => Vec::new(),
        }
    }
}

/// The flag name the cursor was sitting just after when a value flag
/// finished parsing, consulted by the suggestion walk to offer the
/// flag's inner suggestions instead of flag names ("cursor
/// contract for mid-flag completion").
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LastParsedFlag(pub Option<String>);

/// Owns a set of [`CommandFlag`]s and parses all of them at the point
/// in a command where flags are admitted. Itself behaves like a
/// single positional component: it consumes every flag-shaped token
/// it finds, then stops (without consuming) at the first token that
/// isn't flag-shaped, handing the tree walk back its next positional.
pub struct CommandFlagParser<C> {
    flags: Vec<Arc<dyn ErasedFlag<C>>>,
}

impl<C> Default for CommandFlagParser<C> {
    fn default() -> Self {
        CommandFlagParser { flags: Vec::new() }
    }
}

impl<C> CommandFlagParser<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flag(mut self, flag: Arc<dyn ErasedFlag<C>>) -> Self {
        self.flags.push(flag);
        self
    }

    fn find_by_name(&self, name: &str) -> Option<&Arc<dyn ErasedFlag<C>>> {
        self.flags.iter().find(|f| f.name().eq_ignore_ascii_case(name))
    }

    fn find_by_alias(&self, alias: char) -> Option<&Arc<dyn ErasedFlag<C>>> {
        let alias = alias.to_ascii_lowercase();
        self.flags.iter().find(|f| f.aliases().contains(&alias))
    }

    /// Parse every flag token at the front of `input`, stopping at the
    /// first token that doesn't look like a flag. Returns the name of
    /// the last value flag successfully parsed, for mid-flag
    /// suggestion support.
    pub fn parse(
        &self,
        ctx: &Context<C>,
        input: &mut CommandInput,
        store: &mut FlagStore,
    ) -> Result<LastParsedFlag, CommandParseError> {
        let mut last_parsed = LastParsedFlag::default();
        loop {
            input.skip_whitespace_unbounded();
            let token = input.peek_token().to_string();
            if !token.starts_with('-') || token == "-" {
                return Ok(last_parsed);
            }

            if let Some(name) = token.strip_prefix("--") {
                input.read_token();
                self.parse_named(ctx, name, input, store, &mut last_parsed)?;
            } else if let Some(shorthand) = token.strip_prefix('-') {
                input.read_token();
                self.parse_short(ctx, shorthand, input, store, &mut last_parsed)?;
            } else {
                return Ok(last_parsed);
            }
        }
    }

    fn check_permission(&self, ctx: &Context<C>, flag: &Arc<dyn ErasedFlag<C>>, token: &str) -> Result<(), CommandParseError> {
        if flag.permission().is_satisfied_by(ctx.sender()) {
            Ok(())
        } else {
            Err(CommandParseError::FlagParse {
                reason: FlagParseReason::NoPermission,
                token: token.to_string(),
            })
        }
    }

    fn parse_named(
        &self,
        ctx: &Context<C>,
        name: &str,
        input: &mut CommandInput,
        store: &mut FlagStore,
        last_parsed: &mut LastParsedFlag,
    ) -> Result<(), CommandParseError> {
        let Some(flag) = self.find_by_name(name) else {
            return Err(CommandParseError::FlagParse {
                reason: FlagParseReason::UnknownFlag,
                token: name.to_string(),
            });
        };
        self.check_permission(ctx, flag, name)?;
        if flag.is_presence() {
            if store.has_presence_flag(flag.name()) && flag.mode() == FlagMode::Single {
                return Err(CommandParseError::FlagParse {
                    reason: FlagParseReason::DuplicateFlag,
                    token: name.to_string(),
                });
            }
            store.add_presence_flag(flag.name());
            return Ok(());
        }
        if store.contains(flag.name()) && flag.mode() == FlagMode::Single {
            return Err(CommandParseError::FlagParse {
                reason: FlagParseReason::DuplicateFlag,
                token: name.to_string(),
            });
        }
        input.skip_whitespace(1);
        if input.is_empty(true) {
            return Err(CommandParseError::FlagParse {
                reason: FlagParseReason::MissingArgument,
                token: flag.name().to_string(),
            });
        }
        match flag.parse_value(ctx, input, store) {
            ParseResult::Success(()) => {
                *last_parsed = LastParsedFlag(Some(flag.name().to_string()));
                Ok(())
            }
            ParseResult::Failure(cause) => Err(CommandParseError::ArgumentParse { cause }),
        }
    }

    fn parse_short(
        &self,
        ctx: &Context<C>,
        shorthand: &str,
        input: &mut CommandInput,
        store: &mut FlagStore,
        last_parsed: &mut LastParsedFlag,
    ) -> Result<(), CommandParseError> {
        let chars: Vec<char> = shorthand.chars().collect();
        if chars.len() == 1 {
            let alias = chars[0];
            let Some(flag) = self.find_by_alias(alias) else {
                return Err(CommandParseError::FlagParse {
                    reason: FlagParseReason::UnknownFlag,
                    token: alias.to_string(),
                });
            };
            self.check_permission(ctx, flag, &alias.to_string())?;
            if flag.is_presence() {
                if store.has_presence_flag(flag.name()) && flag.mode() == FlagMode::Single {
                    return Err(CommandParseError::FlagParse {
                        reason: FlagParseReason::DuplicateFlag,
                        token: alias.to_string(),
                    });
                }
                store.add_presence_flag(flag.name());
                return Ok(());
            }
            if store.contains(flag.name()) && flag.mode() == FlagMode::Single {
                return Err(CommandParseError::FlagParse {
                    reason: FlagParseReason::DuplicateFlag,
                    token: alias.to_string(),
                });
            }
            input.skip_whitespace(1);
            if input.is_empty(true) {
                return Err(CommandParseError::FlagParse {
                    reason: FlagParseReason::MissingArgument,
                    token: flag.name().to_string(),
                });
            }
            return match flag.parse_value(ctx, input, store) {
                ParseResult::Success(()) => {
                    *last_parsed = LastParsedFlag(Some(flag.name().to_string()));
                    Ok(())
                }
                ParseResult::Failure(cause) => Err(CommandParseError::ArgumentParse { cause }),
            };
        }

        // Combined short form: every character is a presence-only alias.
        for alias in chars {
            let Some(flag) = self.find_by_alias(alias) else {
                return Err(CommandParseError::FlagParse {
                    reason: FlagParseReason::UnknownFlag,
                    token: alias.to_string(),
                });
            };
            if !flag.is_presence() {
                return Err(CommandParseError::FlagParse {
                    reason: FlagParseReason::NoFlagStarted,
                    token: shorthand.to_string(),
                });
            }
            self.check_permission(ctx, flag, &alias.to_string())?;
            if store.has_presence_flag(flag.name()) && flag.mode() == FlagMode::Single {
                return Err(CommandParseError::FlagParse {
                    reason: FlagParseReason::DuplicateFlag,
                    token: alias.to_string(),
                });
            }
            store.add_presence_flag(flag.name());
        }
        Ok(())
    }

    /// Suggestions for the flag-admitting position: either flag names
    /// (`--who`, `--what`, …), or — per the mid-flag cursor contract —
    /// the inner suggestions of the flag that was just completed, if
    /// the cursor sits right after its value.
    pub fn suggestions(&self, ctx: &Context<C>, input: &CommandInput, last_parsed: &LastParsedFlag) -> Vec<Suggestion> {
        let token = input.peek_token();
        if token.is_empty() {
            if let Some(name) = &last_parsed.0 {
                if let Some(flag) = self.find_by_name(name) {
                    return flag.suggest_value(ctx, input);
                }
            }
        }
        self.flags
            .iter()
            .filter(|f| f.permission().is_satisfied_by(ctx.sender()))
            .map(|f| match f.description() {
                Some(desc) => Suggestion::with_tooltip(format!("--{}", f.name()), desc),
                None => Suggestion::new(format!("--{}", f.name())),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::standard::EnumParser;

    fn ctx() -> Context<()> {
        Context::new(())
    }

    #[test]
    fn combined_presence_flags_do_not_consume_value() {
        let parser = CommandFlagParser::<()>::new()
            .flag(Arc::new(CommandFlag::<(), ()>::presence("alpha").alias('a')))
            .flag(Arc::new(CommandFlag::<(), ()>::presence("beta").alias('b')));
        let ctx = ctx();
        let mut store = FlagStore::default();
        let mut input = CommandInput::new("-ab something");
        parser.parse(&ctx, &mut input, &mut store).unwrap();
        assert!(store.has_presence_flag("alpha"));
        assert!(store.has_presence_flag("beta"));
        assert_eq!(input.peek_token(), "something");
    }

    #[test]
    fn missing_value_flag_argument_errors() {
        let who = EnumParser::new(vec!["Alice".to_string(), "Bob".to_string()]);
        let parser = CommandFlagParser::<()>::new().flag(Arc::new(CommandFlag::value("n", who)));
        let ctx = ctx();
        let mut store = FlagStore::default();
        let mut input = CommandInput::new("--n");
        let err = parser.parse(&ctx, &mut input, &mut store).unwrap_err();
        match err {
            CommandParseError::FlagParse { reason, token } => {
                assert_eq!(reason, FlagParseReason::MissingArgument);
                assert_eq!(token, "n");
            }
            _ => panic!("expected FlagParse error"),
        }
    }

    #[test]
    fn duplicate_non_repeatable_flag_errors() {
        let parser = CommandFlagParser::<()>::new()
            .flag(Arc::new(CommandFlag::<(), ()>::presence("alpha")));
        let ctx = ctx();
        let mut store = FlagStore::default();
        let mut input = CommandInput::new("--alpha --alpha");
        let err = parser.parse(&ctx, &mut input, &mut store).unwrap_err();
        assert!(matches!(
            err,
            CommandParseError::FlagParse {
                reason: FlagParseReason::DuplicateFlag,
                ..
            }
        ));
    }

    #[test]
    fn non_flag_token_stops_without_consuming() {
        let parser = CommandFlagParser::<()>::new();
        let ctx = ctx();
        let mut store = FlagStore::default();
        let mut input = CommandInput::new("positional");
        parser.parse(&ctx, &mut input, &mut store).unwrap();
        assert_eq!(input.peek_token(), "positional");
    }
}
